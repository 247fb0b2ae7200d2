use rustc_hash::FxHashMap;

use crate::node::PipelineNode;
use crate::types::TypeId;

use super::GraphError;

/// Arena of pipeline nodes keyed by name, plus the structural
/// operations of the engine: add, rename, delete-with-cascade.
///
/// Insertion order is tracked separately so iteration and topological
/// ordering stay deterministic across runs.
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: FxHashMap<String, PipelineNode>,
    /// Names in insertion order; the tie-breaker for topological sort.
    order: Vec<String>,
}

impl GraphStore {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when the graph holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PipelineNode> {
        self.nodes.get(name)
    }

    /// Mutably borrow a node by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut PipelineNode> {
        self.nodes.get_mut(name)
    }

    /// Returns `true` if a node with `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Iterate nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &PipelineNode> {
        self.order.iter().filter_map(|n| self.nodes.get(n))
    }

    /// Node names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Find an unused name by appending `_1`, `_2`, … to `candidate`.
    ///
    /// `exception` lets a rename keep the node's own current name.
    fn unique_name(&self, candidate: &str, exception: Option<&str>) -> String {
        let mut name = candidate.to_string();
        let mut i = 1;
        while self.nodes.contains_key(&name) && Some(name.as_str()) != exception {
            name = format!("{candidate}_{i}");
            i += 1;
        }
        name
    }

    /// Create a node of `type_id` under a freshly allocated unique name
    /// and register it with its parents in both directions.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownParent`] if any parent name does not
    /// resolve; the graph is left untouched in that case.
    pub fn add_node(
        &mut self,
        type_id: impl Into<TypeId>,
        parents: &[&str],
    ) -> Result<&PipelineNode, GraphError> {
        for parent in parents {
            if !self.nodes.contains_key(*parent) {
                return Err(GraphError::UnknownParent {
                    name: (*parent).to_string(),
                });
            }
        }

        let type_id = type_id.into();
        let name = self.unique_name(&type_id, None);
        let node = PipelineNode::new(
            name.clone(),
            type_id,
            parents.iter().map(|p| (*p).to_string()).collect(),
        );

        for parent in parents {
            // Checked above; the arena cannot have lost the entry since.
            if let Some(p) = self.nodes.get_mut(*parent) {
                p.children.push(name.clone());
            }
        }

        self.order.push(name.clone());
        self.nodes.insert(name.clone(), node);
        tracing::debug!(node = %name, "node added");
        Ok(&self.nodes[&name])
    }

    /// Rename a node, uniquifying `requested` against every other live
    /// name, and update the name everywhere it is used as a key or an
    /// edge reference. Returns the name actually assigned.
    ///
    /// The caller is responsible for carrying any cache entry over to
    /// the new key.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if `name` does not resolve.
    pub fn rename_node(
        &mut self,
        name: &str,
        requested: &str,
    ) -> Result<String, GraphError> {
        if !self.nodes.contains_key(name) {
            return Err(GraphError::NodeNotFound {
                name: name.to_string(),
            });
        }
        let new_name = self.unique_name(requested, Some(name));
        if new_name == name {
            return Ok(new_name);
        }

        let mut node = self
            .nodes
            .remove(name)
            .ok_or_else(|| GraphError::NodeNotFound {
                name: name.to_string(),
            })?;

        // Rewrite edge references in place so parent input order is
        // preserved on every side.
        for parent in &node.parents {
            if let Some(p) = self.nodes.get_mut(parent) {
                for child in &mut p.children {
                    if child == name {
                        *child = new_name.clone();
                    }
                }
            }
        }
        for child in &node.children {
            if let Some(c) = self.nodes.get_mut(child) {
                for parent in &mut c.parents {
                    if parent == name {
                        *parent = new_name.clone();
                    }
                }
            }
        }
        if let Some(slot) = self.order.iter_mut().find(|n| n.as_str() == name) {
            *slot = new_name.clone();
        }

        tracing::debug!(from = %name, to = %new_name, "node renamed");
        node.name = new_name.clone();
        self.nodes.insert(new_name.clone(), node);
        Ok(new_name)
    }

    /// Delete a node and cascade to every child orphaned by the
    /// deletion. A child is deleted only when the cascade removed its
    /// last remaining parent; children with surviving parents keep
    /// living and merely lose the edge.
    ///
    /// Implemented with an explicit worklist so arbitrarily deep
    /// branches cannot exhaust the call stack. Returns the names of all
    /// deleted nodes so the caller can purge cache entries and cancel
    /// outstanding work.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] if `name` does not resolve.
    pub fn delete_branch(&mut self, name: &str) -> Result<Vec<String>, GraphError> {
        if !self.nodes.contains_key(name) {
            return Err(GraphError::NodeNotFound {
                name: name.to_string(),
            });
        }

        let mut deleted = Vec::new();
        let mut worklist = vec![name.to_string()];
        while let Some(current) = worklist.pop() {
            let Some(node) = self.nodes.remove(&current) else {
                continue;
            };
            self.order.retain(|n| n != &current);

            // Detach from surviving parents.
            for parent in &node.parents {
                if let Some(p) = self.nodes.get_mut(parent) {
                    p.children.retain(|c| c != &current);
                }
            }
            // Children lose the edge; the ones left without parents
            // join the worklist.
            for child in &node.children {
                if let Some(c) = self.nodes.get_mut(child) {
                    c.parents.retain(|p| p != &current);
                    if c.parents.is_empty() {
                        worklist.push(child.clone());
                    }
                }
            }
            deleted.push(current);
        }

        tracing::debug!(root = %name, count = deleted.len(), "branch deleted");
        Ok(deleted)
    }
}
