//! Operation registry: the seam between the engine and the concrete
//! data transformations it dispatches.
//!
//! The engine is agnostic to what an operation computes. It requires
//! only that operations are callable off the coordinating task,
//! idempotent enough to re-run, and looked up through an explicit
//! table built once at startup — unknown type identifiers are rejected
//! when the table is built, never at dispatch time.
//!
//! # Examples
//!
//! ```rust
//! use pipelab::registry::{Operation, OperationError, OperationInputs, OperationRegistry};
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//!
//! struct Constant(Value);
//!
//! #[async_trait]
//! impl Operation for Constant {
//!     async fn run(&self, _inputs: OperationInputs) -> Result<Value, OperationError> {
//!         Ok(self.0.clone())
//!     }
//! }
//!
//! let registry = OperationRegistry::new()
//!     .with_operation("answer", 0, Constant(json!(42)));
//! assert!(registry.lookup("answer").is_ok());
//! assert!(registry.lookup("mystery").is_err());
//! ```

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::outcome::Outcome;
use crate::types::TypeId;

/// Inputs handed to an operation: one cached [`Outcome`] per parent,
/// keyed by parent name, plus the node's own parameter values.
///
/// A parent's `Failure` is handed through as-is — the default policy is
/// that typed operations reject malformed input themselves, which turns
/// an upstream failure into the child's own failure and propagates it
/// downstream without a short-circuit rule in the scheduler.
#[derive(Clone, Debug, Default)]
pub struct OperationInputs {
    /// Parent outcomes keyed by parent node name, in parent order.
    pub parents: Vec<(String, Outcome)>,
    /// The node's parameter map.
    pub parameters: FxHashMap<String, Value>,
}

impl OperationInputs {
    /// The outcome of the parent at `index`, if present.
    #[must_use]
    pub fn parent(&self, index: usize) -> Option<&Outcome> {
        self.parents.get(index).map(|(_, o)| o)
    }

    /// Unwrap the value of the parent at `index`.
    ///
    /// # Errors
    ///
    /// [`OperationError::MissingInput`] when there is no such parent;
    /// [`OperationError::FailedInput`] when the parent's outcome is a
    /// failure — the fail-fast path that propagates upstream errors.
    pub fn require(&self, index: usize) -> Result<&Value, OperationError> {
        let (name, outcome) = self
            .parents
            .get(index)
            .ok_or(OperationError::MissingInput { index })?;
        match outcome {
            Outcome::Value(v) => Ok(v),
            Outcome::Failure { message, .. } => Err(OperationError::FailedInput {
                parent: name.clone(),
                message: message.clone(),
            }),
        }
    }

    /// A parameter value by name, if set.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }
}

/// A single data transformation: named inputs in, one value out.
///
/// Implementations run on worker tasks, so they must be `Send + Sync`
/// and must not assume exclusive access to anything but their inputs.
/// Raised errors are captured by the engine's error protector and
/// cached as [`Outcome::Failure`] — they never crash the process.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Execute the transformation.
    async fn run(&self, inputs: OperationInputs) -> Result<Value, OperationError>;
}

/// Errors raised inside a node's operation.
///
/// These are recovered locally by the error protector and stored as
/// failure outcomes; they never abort the engine or sibling nodes.
#[derive(Debug, Error, Diagnostic)]
pub enum OperationError {
    /// The operation expected a parent input that was not provided.
    #[error("missing input at position {index}")]
    #[diagnostic(code(pipelab::operation::missing_input))]
    MissingInput { index: usize },

    /// A parent delivered a failure outcome instead of a value.
    #[error("input from '{parent}' is a failure: {message}")]
    #[diagnostic(code(pipelab::operation::failed_input))]
    FailedInput { parent: String, message: String },

    /// A required parameter is absent or malformed.
    #[error("invalid parameter '{name}': {reason}")]
    #[diagnostic(code(pipelab::operation::invalid_parameter))]
    InvalidParameter { name: String, reason: String },

    /// JSON (de)serialization inside the operation failed.
    #[error(transparent)]
    #[diagnostic(code(pipelab::operation::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Any other operation-specific failure.
    #[error("{kind}: {message}")]
    #[diagnostic(code(pipelab::operation::other))]
    Other { kind: String, message: String },
}

impl OperationError {
    /// Short label used as the failure outcome's `kind`.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::MissingInput { .. } => "MissingInput",
            Self::FailedInput { .. } => "FailedInput",
            Self::InvalidParameter { .. } => "InvalidParameter",
            Self::Serde(_) => "Serde",
            Self::Other { kind, .. } => kind,
        }
    }

    /// Convenience constructor for ad-hoc operation failures.
    pub fn other(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Other {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Errors from building or querying the registry.
#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    /// Lookup or catalog binding referenced an unregistered type.
    #[error("unknown node type: {type_id}")]
    #[diagnostic(
        code(pipelab::registry::unknown_type),
        help("Register the operation before building the catalog.")
    )]
    UnknownType { type_id: String },

    /// The node-type catalog resource could not be read.
    #[error("failed to read node-type catalog: {source}")]
    #[diagnostic(code(pipelab::registry::catalog_io))]
    CatalogIo {
        #[source]
        source: std::io::Error,
    },

    /// The node-type catalog resource is not valid JSON.
    #[error("malformed node-type catalog: {source}")]
    #[diagnostic(code(pipelab::registry::catalog_parse))]
    CatalogParse {
        #[source]
        source: serde_json::Error,
    },
}

/// Declarative description of one node type, loaded from a
/// configuration resource shared with the UI layer.
///
/// The engine consumes `operation` and `parent_count`; the rest is
/// carried for the UI (menu placement, parameter form reference).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTypeSpec {
    /// Registered operation name this type dispatches to.
    pub operation: String,
    /// Number of parents the node expects.
    pub parent_count: usize,
    /// Reference to the parameter form definition (UI concern).
    #[serde(default)]
    pub parameter_schema: Option<String>,
    /// Menu path for the UI's node palette (UI concern).
    #[serde(default)]
    pub menu: Option<String>,
}

/// Parse a node-type catalog from a JSON configuration resource.
///
/// The catalog maps a type identifier to its [`NodeTypeSpec`]; bind it
/// against a registry with
/// [`OperationRegistry::validate_catalog`] once at startup.
pub fn load_catalog(
    path: impl AsRef<std::path::Path>,
) -> Result<FxHashMap<String, NodeTypeSpec>, RegistryError> {
    let raw = std::fs::read_to_string(path).map_err(|source| RegistryError::CatalogIo { source })?;
    serde_json::from_str(&raw).map_err(|source| RegistryError::CatalogParse { source })
}

struct Registration {
    operation: Arc<dyn Operation>,
    parent_count: usize,
}

/// Table mapping node-type identifiers to their operations and declared
/// parent counts, built once at startup.
#[derive(Default)]
pub struct OperationRegistry {
    operations: FxHashMap<TypeId, Registration>,
}

impl OperationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation under `type_id` with its expected parent
    /// count. Re-registering a type replaces the previous binding.
    pub fn register(
        &mut self,
        type_id: impl Into<TypeId>,
        parent_count: usize,
        operation: impl Operation + 'static,
    ) -> &mut Self {
        self.operations.insert(
            type_id.into(),
            Registration {
                operation: Arc::new(operation),
                parent_count,
            },
        );
        self
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with_operation(
        mut self,
        type_id: impl Into<TypeId>,
        parent_count: usize,
        operation: impl Operation + 'static,
    ) -> Self {
        self.register(type_id, parent_count, operation);
        self
    }

    /// Bind a declarative node-type catalog against the registered
    /// operations, rejecting any entry whose operation is unbound.
    ///
    /// This front-loads the failure: a catalog typo surfaces at startup
    /// instead of as a dispatch error mid-edit.
    pub fn validate_catalog(
        &self,
        catalog: &FxHashMap<String, NodeTypeSpec>,
    ) -> Result<(), RegistryError> {
        for spec in catalog.values() {
            if !self.operations.contains_key(&spec.operation) {
                return Err(RegistryError::UnknownType {
                    type_id: spec.operation.clone(),
                });
            }
        }
        Ok(())
    }

    /// Resolve the operation for `type_id`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownType`] when the identifier was never
    /// registered.
    pub fn lookup(&self, type_id: &str) -> Result<Arc<dyn Operation>, RegistryError> {
        self.operations
            .get(type_id)
            .map(|r| Arc::clone(&r.operation))
            .ok_or_else(|| RegistryError::UnknownType {
                type_id: type_id.to_string(),
            })
    }

    /// Declared parent count for `type_id`.
    pub fn parent_count(&self, type_id: &str) -> Result<usize, RegistryError> {
        self.operations
            .get(type_id)
            .map(|r| r.parent_count)
            .ok_or_else(|| RegistryError::UnknownType {
                type_id: type_id.to_string(),
            })
    }

    /// Registered type identifiers, for menu construction.
    pub fn type_ids(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}

/// Run `operation` under the error protector: the returned outcome is
/// always cacheable data, never a raised error.
pub async fn protect(operation: &dyn Operation, inputs: OperationInputs) -> Outcome {
    Outcome::from(operation.run(inputs).await)
}
