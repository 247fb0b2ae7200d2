//! Engine configuration resolved from the environment.
//!
//! Mirrors how the UI layer boots the engine: a node-type catalog path
//! and a default directory for session files, each overridable through
//! the environment (a `.env` file is honored via `dotenvy`).

use std::path::PathBuf;

/// Resolved startup configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Path of the declarative node-type catalog (JSON), if configured.
    pub node_types_path: Option<PathBuf>,
    /// Directory where session files are written by default.
    pub session_dir: PathBuf,
}

impl EngineConfig {
    /// Environment variable naming the node-type catalog file.
    pub const NODE_TYPES_VAR: &'static str = "PIPELAB_NODE_TYPES";
    /// Environment variable naming the session directory.
    pub const SESSION_DIR_VAR: &'static str = "PIPELAB_SESSION_DIR";

    /// Resolve configuration from the environment, loading a `.env`
    /// file when present.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            node_types_path: std::env::var(Self::NODE_TYPES_VAR).ok().map(PathBuf::from),
            session_dir: std::env::var(Self::SESSION_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_types_path: None,
            session_dir: PathBuf::from("."),
        }
    }
}
