//! Dependency propagation and asynchronous dispatch.
//!
//! The scheduler decides, for each requested run, whether every parent
//! result is already cached. If one is missing, the request is deferred:
//! the requester is recorded as the missing parent's *pending
//! continuation* and the request retargets the parent — one parent at a
//! time, exactly as a user-driven pipeline resolves. When a node with
//! fully-cached parents is found, its operation is dispatched onto a
//! worker task wrapped by the error protector, and the completion is
//! delivered back to the coordinator over a channel.
//!
//! # Ordering and concurrency
//!
//! Parent-before-child execution is guaranteed only through the
//! propagation mechanism; independently triggered branches run with no
//! global ordering. Several tasks may run concurrently for the *same*
//! node; the cache keeps whichever completion lands last
//! (last-writer-wins), and the node leaves `Loading` only when its
//! outstanding count drains to zero.
//!
//! # Failure policy
//!
//! A parent's cached `Failure` does not short-circuit the child: it is
//! handed to the child operation as input, the typed input accessor
//! rejects it, and the failure resurfaces as the child's own `Failure`.
//! Errors therefore propagate downstream as ordinary data.
//!
//! # Cancellation
//!
//! Every dispatch carries a child [`CancellationToken`]. Deleting a
//! node cancels its outstanding tasks; a cancelled task completes as a
//! tombstone and writes nothing. Completions for nodes that no longer
//! exist are ignored.

mod task;

pub use task::RunningTask;
pub(crate) use task::TaskCompletion;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::ResultCache;
use crate::event_bus::{EventBus, EventKind};
use crate::graph::{GraphError, GraphStore};
use crate::outcome::Outcome;
use crate::registry::{OperationInputs, OperationRegistry, RegistryError, protect};
use crate::types::NodeState;

/// Errors surfaced synchronously by a run request.
#[derive(Debug, Error, Diagnostic)]
pub enum SchedulerError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),
}

/// Decides when a node may run, dispatches its operation, and applies
/// completions to the cache and node states.
///
/// Owned by the coordinating task; worker tasks only ever reach back in
/// through the completion channel.
pub struct Scheduler {
    cache: Arc<ResultCache>,
    registry: Arc<OperationRegistry>,
    events: Arc<EventBus>,
    completion_tx: flume::Sender<TaskCompletion>,
    completion_rx: flume::Receiver<TaskCompletion>,
    /// Running-task count per node name.
    outstanding: FxHashMap<String, usize>,
    /// Per-node cancellation tokens, children of `root_cancel`.
    cancel_tokens: FxHashMap<String, CancellationToken>,
    /// parent name → nodes to re-request once the parent completes.
    continuations: FxHashMap<String, Vec<String>>,
    /// old name → new name for nodes renamed while tasks were in flight.
    aliases: FxHashMap<String, String>,
    /// Parent of every per-node token; cancelling it stops everything.
    root_cancel: CancellationToken,
}

impl Scheduler {
    pub(crate) fn new(
        cache: Arc<ResultCache>,
        registry: Arc<OperationRegistry>,
        events: Arc<EventBus>,
    ) -> Self {
        let (completion_tx, completion_rx) = flume::unbounded();
        Self {
            cache,
            registry,
            events,
            completion_tx,
            completion_rx,
            outstanding: FxHashMap::default(),
            cancel_tokens: FxHashMap::default(),
            continuations: FxHashMap::default(),
            aliases: FxHashMap::default(),
            root_cancel: CancellationToken::new(),
        }
    }

    /// Total number of in-flight tasks across all nodes.
    #[must_use]
    pub fn outstanding_tasks(&self) -> usize {
        self.outstanding.values().sum()
    }

    /// Request a run of `name`, propagating to unmet parents first.
    ///
    /// Walks the parent list in order; at the first parent with no
    /// cache entry, records `name` (or the current walk target) as that
    /// parent's pending continuation and retargets the request — an
    /// iterative loop rather than recursion, so arbitrarily deep
    /// pipelines cannot exhaust the stack. Exactly one operation is
    /// dispatched per invocation: the first ancestor whose parents are
    /// all cached.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeNotFound`] for an unknown node, and
    /// [`RegistryError::UnknownType`] when the dispatched node's type
    /// was never registered.
    pub fn request_run(
        &mut self,
        graph: &mut GraphStore,
        name: &str,
    ) -> Result<(), SchedulerError> {
        let mut target = name.to_string();
        let inputs = loop {
            let node = graph
                .get(&target)
                .ok_or_else(|| GraphError::NodeNotFound {
                    name: target.clone(),
                })?;

            match self.gather_inputs(node.parents.as_slice(), &node.parameters) {
                Ok(inputs) => break inputs,
                Err(missing) => {
                    // Defer: the parent must produce a result first.
                    let pending = self.continuations.entry(missing.clone()).or_default();
                    if !pending.contains(&target) {
                        pending.push(target.clone());
                    }
                    debug!(node = %target, parent = %missing, "run deferred to parent");
                    self.events.emit(EventKind::RunDeferred {
                        node: target.clone(),
                        missing_parent: missing.clone(),
                    });
                    target = missing;
                }
            }
        };
        self.dispatch(graph, &target, inputs)
    }

    /// Snapshot parent outcomes and parameters, or report the first
    /// parent missing from the cache.
    fn gather_inputs(
        &self,
        parents: &[String],
        parameters: &FxHashMap<String, serde_json::Value>,
    ) -> Result<OperationInputs, String> {
        let mut gathered = Vec::with_capacity(parents.len());
        for parent in parents {
            match self.cache.get(parent) {
                Some(outcome) => gathered.push((parent.clone(), outcome)),
                None => return Err(parent.clone()),
            }
        }
        Ok(OperationInputs {
            parents: gathered,
            parameters: parameters.clone(),
        })
    }

    /// Mark the node `Loading` and fire its operation on a worker task.
    fn dispatch(
        &mut self,
        graph: &mut GraphStore,
        name: &str,
        inputs: OperationInputs,
    ) -> Result<(), SchedulerError> {
        let node = graph
            .get_mut(name)
            .ok_or_else(|| GraphError::NodeNotFound {
                name: name.to_string(),
            })?;
        let operation = self.registry.lookup(&node.type_id)?;

        node.state = NodeState::Loading;
        node.error_message = None;
        self.events.emit(EventKind::NodeStateChanged {
            node: name.to_string(),
            state: NodeState::Loading,
        });

        let task = RunningTask {
            id: Uuid::new_v4(),
            node: name.to_string(),
            cancel: self
                .cancel_tokens
                .entry(name.to_string())
                .or_insert_with(|| self.root_cancel.child_token())
                .clone(),
        };
        *self.outstanding.entry(name.to_string()).or_default() += 1;

        let tx = self.completion_tx.clone();
        let RunningTask { id, node, cancel } = task;
        let completion_node = node.clone();
        tokio::spawn(async move {
            // Inner spawn so a panicking operation surfaces as a
            // JoinError instead of killing the dispatch wrapper.
            let guarded = tokio::spawn(async move { protect(&*operation, inputs).await });
            let outcome = tokio::select! {
                () = cancel.cancelled() => None,
                joined = guarded => Some(match joined {
                    Ok(outcome) => outcome,
                    Err(err) => Outcome::failure("Panic", err.to_string()),
                }),
            };
            // Send failure means the engine is gone; nothing to do.
            let _ = tx.send(TaskCompletion {
                task: id,
                node: completion_node,
                outcome,
            });
        });

        debug!(node = %node, task = %id, "operation dispatched");
        self.events.emit(EventKind::RunDispatched { node, task: id });
        Ok(())
    }

    /// Await the next worker completion. Returns `None` when no task is
    /// outstanding.
    pub(crate) async fn next_completion(&mut self) -> Option<TaskCompletion> {
        if self.outstanding_tasks() == 0 {
            return None;
        }
        // The sender side lives on self, so recv cannot fail here.
        self.completion_rx.recv_async().await.ok()
    }

    /// Non-blocking variant of [`next_completion`](Self::next_completion).
    pub(crate) fn try_next_completion(&mut self) -> Option<TaskCompletion> {
        self.completion_rx.try_recv().ok()
    }

    /// Apply one completion: write the cache, settle the node state,
    /// and return the pending continuations to re-request.
    ///
    /// Completions for deleted nodes and tombstones from cancelled
    /// tasks are ignored safely.
    pub(crate) fn apply_completion(
        &mut self,
        graph: &mut GraphStore,
        completion: TaskCompletion,
    ) -> Vec<String> {
        let name = self.resolve_alias(completion.node);
        let drained = {
            let count = self.outstanding.entry(name.clone()).or_insert(0);
            *count = count.saturating_sub(1);
            *count == 0
        };
        if drained {
            self.outstanding.remove(&name);
            self.prune_aliases(&name);
        }

        let Some(outcome) = completion.outcome else {
            debug!(node = %name, task = %completion.task, "cancelled task discarded");
            return Vec::new();
        };

        if !graph.contains(&name) {
            warn!(node = %name, task = %completion.task, "completion for deleted node ignored");
            return Vec::new();
        }

        let failed = outcome.is_failure();
        let failure_message = outcome.failure_message().map(str::to_string);
        // Last-writer-wins: every completion overwrites the entry.
        self.cache.put(name.clone(), outcome);

        if drained {
            let state = if failed {
                NodeState::Fail
            } else {
                NodeState::Valid
            };
            if let Some(node) = graph.get_mut(&name) {
                node.state = state;
                node.error_message = failure_message;
            }
            self.events.emit(EventKind::NodeStateChanged {
                node: name.clone(),
                state,
            });
        }
        self.events.emit(EventKind::RunCompleted {
            node: name.clone(),
            task: completion.task,
            failed,
        });

        self.continuations.remove(&name).unwrap_or_default()
    }

    /// Cancel outstanding work for `name` and drop its bookkeeping.
    /// Called when the node is removed from the graph.
    pub(crate) fn forget_node(&mut self, name: &str) {
        if let Some(token) = self.cancel_tokens.remove(name) {
            token.cancel();
        }
        self.continuations.remove(name);
        for pending in self.continuations.values_mut() {
            pending.retain(|n| n != name);
        }
    }

    /// Follow a rename so in-flight completions land under the node's
    /// current name rather than the name it was dispatched under.
    pub(crate) fn track_rename(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        if let Some(count) = self.outstanding.remove(old) {
            self.outstanding.insert(new.to_string(), count);
            self.aliases.insert(old.to_string(), new.to_string());
        }
        if let Some(token) = self.cancel_tokens.remove(old) {
            self.cancel_tokens.insert(new.to_string(), token);
        }
        if let Some(pending) = self.continuations.remove(old) {
            self.continuations.insert(new.to_string(), pending);
        }
        for pending in self.continuations.values_mut() {
            for entry in pending.iter_mut() {
                if entry == old {
                    *entry = new.to_string();
                }
            }
        }
    }

    /// Cancel every outstanding task. Later dispatches get a fresh
    /// token tree, so the scheduler remains usable afterwards.
    pub(crate) fn shutdown(&mut self) {
        self.root_cancel.cancel();
        self.cancel_tokens.clear();
        self.root_cancel = CancellationToken::new();
    }

    fn resolve_alias(&self, mut name: String) -> String {
        while let Some(next) = self.aliases.get(&name) {
            name = next.clone();
        }
        name
    }

    /// Drop alias chains ending at `resolved` once its tasks drained.
    fn prune_aliases(&mut self, resolved: &str) {
        let stale: Vec<String> = self
            .aliases
            .keys()
            .filter(|k| self.resolve_alias((*k).clone()) == resolved)
            .cloned()
            .collect();
        for key in stale {
            self.aliases.remove(&key);
        }
    }
}
