use rustc_hash::FxHashSet;

use crate::node::PipelineNode;

use super::GraphStore;

impl GraphStore {
    /// Nodes in a parents-before-children order.
    ///
    /// Repeatedly picks the first node (by insertion order) whose
    /// parents have all been placed, so the output is stable across
    /// runs — the property the session store relies on to serialize a
    /// valid replay order.
    pub fn topological_order(&self) -> impl Iterator<Item = &PipelineNode> {
        let mut placed: FxHashSet<&str> = FxHashSet::default();
        let mut ordered: Vec<&PipelineNode> = Vec::with_capacity(self.len());

        while ordered.len() < self.len() {
            let mut progressed = false;
            for node in self.iter() {
                if placed.contains(node.name.as_str()) {
                    continue;
                }
                if node.parents.iter().all(|p| placed.contains(p.as_str())) {
                    placed.insert(node.name.as_str());
                    ordered.push(node);
                    progressed = true;
                }
            }
            // The arena is acyclic by construction; a stalled pass
            // would mean a broken invariant, not valid input.
            debug_assert!(progressed, "cycle or dangling parent in graph arena");
            if !progressed {
                break;
            }
        }
        ordered.into_iter()
    }
}
