//! # Pipelab: pipeline graph execution engine
//!
//! Pipelab is the execution core of an interactive visual pipeline
//! builder: users assemble a directed acyclic graph of processing
//! steps, each step wrapping a data-transformation operation, and the
//! engine computes and caches outputs as the graph is edited.
//!
//! ## Core Concepts
//!
//! - **Nodes**: Pipeline steps with a type, parameters, and
//!   parent/child edges, stored in a name-keyed arena
//! - **Outcomes**: Error-as-data results — a value or a typed failure,
//!   cached per node and handed downstream as ordinary input
//! - **Propagation**: Requesting a node with an uncomputed parent
//!   triggers the parent first and re-requests the node on completion
//! - **Scheduler**: Asynchronous per-node dispatch with
//!   last-writer-wins caching and cancellation on deletion
//! - **Sessions**: Explicit snapshots of topology and parameters,
//!   optionally sealed under a password
//!
//! ## Quick Start
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
//!         Ok(json!([1, 2, 3, 4]))
//!     }
//! }
//!
//! struct CountRows;
//!
//! #[async_trait]
//! impl Operation for CountRows {
//!     async fn run(&self, inputs: OperationInputs) -> Result<Value, OperationError> {
//!         let rows = inputs.require(0)?;
//!         let n = rows.as_array().map(Vec::len).unwrap_or(0);
//!         Ok(json!(n))
//!     }
//! }
//!
//! # async fn example() -> Result<(), pipelab::engine::EngineError> {
//! let registry = OperationRegistry::new()
//!     .with_operation("load", 0, LoadRows)
//!     .with_operation("count", 1, CountRows);
//! let mut engine = PipelineEngine::new(registry);
//!
//! let load = engine.add_node("load", &[])?;
//! let count = engine.add_node("count", &[load.as_str()])?;
//!
//! // Requesting `count` first triggers `load`, then re-runs `count`
//! // automatically once the parent result is cached.
//! engine.request_run(&count)?;
//! engine.run_until_idle().await;
//!
//! assert_eq!(
//!     engine.outcome(&count).unwrap().as_value(),
//!     Some(&json!(4)),
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! An operation error never crashes the engine: the scheduler wraps
//! every dispatch in an error protector that converts raised errors
//! into cached [`outcome::Outcome::Failure`] data. Downstream nodes
//! receive the failure as input, reject it through their typed input
//! accessors, and surface it as their own failure — so errors propagate
//! along the pipeline without a short-circuit rule.
//!
//! ## Module Guide
//!
//! - [`engine`] - Coordinating facade tying the components together
//! - [`graph`] - Topology store: add, rename, cascade deletion
//! - [`scheduler`] - Dependency propagation and async dispatch
//! - [`cache`] - Name-keyed outcome store with copy-on-read
//! - [`registry`] - Operation trait and node-type table
//! - [`outcome`] - Error-as-data result type
//! - [`session`] - Snapshot persistence, optionally sealed
//! - [`event_bus`] - Engine event fan-out for UI layers
//! - [`config`] / [`telemetry`] - Environment config and tracing setup

pub mod cache;
pub mod config;
pub mod engine;
pub mod event_bus;
pub mod graph;
pub mod node;
pub mod outcome;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod telemetry;
pub mod types;
