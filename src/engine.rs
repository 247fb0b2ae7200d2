//! The coordinating facade of the pipeline engine.
//!
//! [`PipelineEngine`] ties the components together: the
//! [`GraphStore`] topology, the [`Scheduler`], the shared
//! [`ResultCache`], the [`OperationRegistry`], and the event bus. It is
//! designed for single-coordinator use: structural edits and state
//! transitions happen only through `&mut self`, worker tasks reach back
//! exclusively through the completion channel, and the cache is the one
//! piece of state shared with concurrent readers.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pipelab::engine::PipelineEngine;
//! use pipelab::registry::{Operation, OperationError, OperationInputs, OperationRegistry};
//! use async_trait::async_trait;
//! use serde_json::{Value, json};
//!
//! struct LoadRows;
//!
//! #[async_trait]
//! impl Operation for LoadRows {
//!     async fn run(&self, _inputs: OperationInputs) -> Result<Value, OperationError> {
//!         Ok(json!([1, 2, 3]))
//!     }
//! }
//!
//! # async fn example() -> Result<(), pipelab::engine::EngineError> {
//! let registry = OperationRegistry::new().with_operation("load", 0, LoadRows);
//! let mut engine = PipelineEngine::new(registry);
//!
//! let load = engine.add_node("load", &[])?;
//! engine.request_run(&load)?;
//! engine.run_until_idle().await;
//!
//! assert!(engine.outcome(&load).unwrap().is_value());
//! # Ok(())
//! # }
//! ```

use miette::Diagnostic;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::cache::ResultCache;
use crate::event_bus::{EventBus, EventKind, EventStream};
use crate::graph::{GraphError, GraphStore};
use crate::node::NodeLayout;
use crate::outcome::Outcome;
use crate::registry::{OperationRegistry, RegistryError};
use crate::scheduler::{Scheduler, SchedulerError};
use crate::session::{self, SessionDocument, SessionError};
use crate::types::TypeId;

/// Errors surfaced by engine operations.
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Session(#[from] SessionError),
}

/// Coordinator owning the graph, scheduler, cache, and registry.
pub struct PipelineEngine {
    graph: GraphStore,
    scheduler: Scheduler,
    cache: Arc<ResultCache>,
    registry: Arc<OperationRegistry>,
    events: Arc<EventBus>,
}

impl PipelineEngine {
    /// Build an engine around a registry of operations.
    #[must_use]
    pub fn new(registry: OperationRegistry) -> Self {
        let cache = Arc::new(ResultCache::new());
        let registry = Arc::new(registry);
        let events = Arc::new(EventBus::new());
        let scheduler = Scheduler::new(
            Arc::clone(&cache),
            Arc::clone(&registry),
            Arc::clone(&events),
        );
        Self {
            graph: GraphStore::new(),
            scheduler,
            cache,
            registry,
            events,
        }
    }

    /// The graph topology (read-only; mutations go through the engine).
    #[must_use]
    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    /// Shared handle to the result cache, safe to read from other
    /// threads while the engine runs.
    #[must_use]
    pub fn cache(&self) -> Arc<ResultCache> {
        Arc::clone(&self.cache)
    }

    /// Subscribe to engine events.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Defensive copy of the cached outcome for `name`, if any.
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<Outcome> {
        self.cache.get(name)
    }

    /// Number of worker tasks currently in flight.
    #[must_use]
    pub fn outstanding_tasks(&self) -> usize {
        self.scheduler.outstanding_tasks()
    }

    /// Add a node of `type_id` under the given parents and return its
    /// allocated unique name.
    ///
    /// The type must be registered — creating a node that could never
    /// dispatch is rejected up front, matching the
    /// registration-time-validation rule of the registry. A parent
    /// count differing from the type's declared count is allowed but
    /// logged, since the UI may wire parents incrementally.
    pub fn add_node(&mut self, type_id: impl Into<TypeId>, parents: &[&str]) -> Result<String, EngineError> {
        let type_id = type_id.into();
        let declared = self.registry.parent_count(&type_id)?;
        if declared != parents.len() {
            warn!(
                %type_id,
                declared,
                got = parents.len(),
                "node created with unexpected parent count"
            );
        }
        let name = self.graph.add_node(type_id, parents)?.name.clone();
        Ok(name)
    }

    /// Rename a node, carrying its cache entry and any in-flight run
    /// bookkeeping over to the new name. Returns the name actually
    /// assigned (uniquified against other live names).
    pub fn rename_node(&mut self, name: &str, requested: &str) -> Result<String, EngineError> {
        let new_name = self.graph.rename_node(name, requested)?;
        if new_name != name {
            self.cache.rename(name, new_name.clone());
            self.scheduler.track_rename(name, &new_name);
            self.events.emit(EventKind::NodeRenamed {
                from: name.to_string(),
                to: new_name.clone(),
            });
        }
        Ok(new_name)
    }

    /// Delete a node and cascade to children orphaned by the deletion.
    ///
    /// Cache entries for every deleted node are purged and their
    /// outstanding tasks cancelled; late completions are ignored.
    /// Returns the deleted names.
    pub fn delete_branch(&mut self, name: &str) -> Result<Vec<String>, EngineError> {
        let deleted = self.graph.delete_branch(name)?;
        for node in &deleted {
            self.cache.delete(node);
            self.scheduler.forget_node(node);
            self.events.emit(EventKind::NodeRemoved { node: node.clone() });
        }
        Ok(deleted)
    }

    /// Set one parameter value on a node.
    pub fn set_parameter(
        &mut self,
        name: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<(), EngineError> {
        let node = self
            .graph
            .get_mut(name)
            .ok_or_else(|| GraphError::NodeNotFound {
                name: name.to_string(),
            })?;
        node.set_parameter(key, value);
        Ok(())
    }

    /// Replace a node's layout metadata (pass-through for the UI).
    pub fn set_layout(&mut self, name: &str, layout: NodeLayout) -> Result<(), EngineError> {
        let node = self
            .graph
            .get_mut(name)
            .ok_or_else(|| GraphError::NodeNotFound {
                name: name.to_string(),
            })?;
        node.layout = layout;
        Ok(())
    }

    /// Request a run of `name`; parents without cached results are
    /// triggered first and `name` re-requested automatically as they
    /// complete.
    pub fn request_run(&mut self, name: &str) -> Result<(), EngineError> {
        self.scheduler.request_run(&mut self.graph, name)?;
        Ok(())
    }

    /// Apply one pending worker completion, if any, without waiting.
    ///
    /// Returns `true` when a completion was applied.
    pub fn drain_one(&mut self) -> bool {
        match self.scheduler.try_next_completion() {
            Some(completion) => {
                self.finish(completion);
                true
            }
            None => false,
        }
    }

    /// Await and apply the next worker completion.
    ///
    /// Returns `false` when no task is outstanding.
    pub async fn pump(&mut self) -> bool {
        match self.scheduler.next_completion().await {
            Some(completion) => {
                self.finish(completion);
                true
            }
            None => false,
        }
    }

    /// Drive the engine until every outstanding task (including runs
    /// spawned by deferred continuations) has completed.
    pub async fn run_until_idle(&mut self) {
        while self.pump().await {}
    }

    fn finish(&mut self, completion: crate::scheduler::TaskCompletion) {
        let continuations = self.scheduler.apply_completion(&mut self.graph, completion);
        for node in continuations {
            // A continuation can outlive its requester (deleted
            // mid-flight); that is not an engine error.
            if let Err(err) = self.scheduler.request_run(&mut self.graph, &node) {
                warn!(%node, error = %err, "pending continuation dropped");
            }
        }
    }

    /// Snapshot the current graph as a session document.
    #[must_use]
    pub fn save_session(&self) -> SessionDocument {
        session::save(&self.graph)
    }

    /// Snapshot and encode in one step; a password seals the bytes.
    pub fn export_session(&self, password: Option<&str>) -> Result<Vec<u8>, EngineError> {
        Ok(self.save_session().encode(password)?)
    }

    /// Replace the current graph with one replayed from `doc`.
    ///
    /// Outstanding tasks are cancelled, the cache is cleared, and every
    /// restored node starts `Idle` — results are recomputed on demand.
    pub fn load_session(&mut self, doc: &SessionDocument) -> Result<(), EngineError> {
        // Replay into a scratch graph first so a malformed document
        // leaves the current session untouched.
        let mut graph = GraphStore::new();
        session::restore(doc, &mut graph)?;

        let old_names: Vec<String> = self.graph.names().map(str::to_string).collect();
        for name in &old_names {
            self.cache.delete(name);
            self.scheduler.forget_node(name);
        }
        self.graph = graph;
        Ok(())
    }

    /// Decode session bytes and replay them, prompting semantics
    /// included: sealed bytes without a password yield
    /// [`SessionError::PasswordRequired`].
    pub fn import_session(
        &mut self,
        bytes: &[u8],
        password: Option<&str>,
    ) -> Result<(), EngineError> {
        let doc = SessionDocument::decode(bytes, password)?;
        self.load_session(&doc)
    }

    /// Cancel all outstanding work; in-flight tasks complete as
    /// tombstones and write nothing.
    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
    }
}
