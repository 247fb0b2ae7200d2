//! Session persistence: explicit snapshots of graph topology and
//! per-node parameters.
//!
//! A session is a JSON object keyed by node name; each entry records the
//! node's type, parent names, parameter values, and layout metadata.
//! Transient execution state and cached outcomes are deliberately
//! excluded — they are recomputed on demand after a restore.
//!
//! [`save`] walks the graph in topological order, so entries land in
//! the file parents-before-children and [`restore`] can replay them
//! through [`GraphStore::add_node`] as stored, re-establishing every
//! graph invariant instead of copying state.
//!
//! This module performs no I/O: it transforms between in-memory graphs
//! and byte buffers, and the caller decides where those bytes live.
//! That split is what makes the never-overwrite-after-failed-decrypt
//! policy trivial to honor.
//!
//! # Sealing
//!
//! With a password, [`SessionDocument::encode`] seals the JSON into an
//! opaque AES-256-GCM blob keyed by PBKDF2(password, fixed application
//! constant). A loader distinguishes the two forms only by whether the
//! bytes parse as JSON; [`SessionDocument::decode`] without a password
//! reports [`SessionError::PasswordRequired`] for sealed input so the
//! caller can prompt and retry.

mod crypto;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::graph::{GraphError, GraphStore};
use crate::node::NodeLayout;

/// Errors from encoding, decoding, or replaying a session.
#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    /// The bytes are not a valid plaintext session document.
    #[error("malformed session document: {source}")]
    #[diagnostic(code(pipelab::session::serialization))]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    /// Wrong password, or a corrupted/tampered sealed blob.
    #[error("session blob could not be decrypted")]
    #[diagnostic(
        code(pipelab::session::decryption),
        help("Re-prompt for the password; do not overwrite the session file.")
    )]
    Decryption,

    /// The bytes are a sealed blob and no password was supplied.
    #[error("session is encrypted; a password is required")]
    #[diagnostic(code(pipelab::session::password_required))]
    PasswordRequired,

    /// Replaying the stored topology violated a graph invariant,
    /// e.g. an entry references a parent that never appears.
    #[error("session replay failed: {source}")]
    #[diagnostic(code(pipelab::session::replay))]
    Replay {
        #[from]
        source: GraphError,
    },
}

/// One node's persisted slice of the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    #[serde(rename = "type")]
    pub type_id: String,
    pub parents: Vec<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub position: [f64; 2],
    #[serde(default)]
    pub size: [f64; 2],
    #[serde(default)]
    pub hidden: [bool; 2],
}

/// An ordered session snapshot, ready to encode to bytes.
///
/// Entry order is the order produced by [`save`]
/// (parents-before-children) and survives the JSON round trip.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionDocument {
    nodes: Vec<(String, SessionEntry)>,
}

impl SessionDocument {
    /// Entries in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SessionEntry)> {
        self.nodes.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// Number of stored nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` for an empty snapshot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Serialize to pretty JSON, preserving entry order.
    pub fn to_json(&self) -> Result<String, SessionError> {
        let mut object = Map::with_capacity(self.nodes.len());
        for (name, entry) in &self.nodes {
            let value = serde_json::to_value(entry)
                .map_err(|source| SessionError::Serialization { source })?;
            object.insert(name.clone(), value);
        }
        serde_json::to_string_pretty(&Value::Object(object))
            .map_err(|source| SessionError::Serialization { source })
    }

    /// Parse a plaintext JSON session document.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let object: Map<String, Value> = serde_json::from_str(json)
            .map_err(|source| SessionError::Serialization { source })?;
        let mut nodes = Vec::with_capacity(object.len());
        for (name, value) in object {
            let entry: SessionEntry = serde_json::from_value(value)
                .map_err(|source| SessionError::Serialization { source })?;
            nodes.push((name, entry));
        }
        Ok(Self { nodes })
    }

    /// Encode to bytes: plaintext JSON, or a sealed blob when a
    /// password is given.
    pub fn encode(&self, password: Option<&str>) -> Result<Vec<u8>, SessionError> {
        let json = self.to_json()?;
        match password {
            Some(pw) => crypto::seal(json.as_bytes(), pw),
            None => Ok(json.into_bytes()),
        }
    }

    /// Decode bytes produced by [`encode`](Self::encode).
    ///
    /// Attempts a plaintext parse first; bytes that fail it are treated
    /// as a sealed blob. Without a password that yields
    /// [`SessionError::PasswordRequired`]; with one, decryption errors
    /// surface as [`SessionError::Decryption`].
    pub fn decode(bytes: &[u8], password: Option<&str>) -> Result<Self, SessionError> {
        if let Ok(text) = std::str::from_utf8(bytes)
            && let Ok(doc) = Self::from_json(text)
        {
            return Ok(doc);
        }
        let Some(pw) = password else {
            return Err(SessionError::PasswordRequired);
        };
        let plaintext = crypto::open(bytes, pw)?;
        let text = std::str::from_utf8(&plaintext).map_err(|_| SessionError::Decryption)?;
        Self::from_json(text)
    }
}

/// Capture the graph as a session snapshot.
///
/// Walks [`GraphStore::topological_order`] so every entry precedes its
/// children, guaranteeing a valid replay order.
#[must_use]
pub fn save(graph: &GraphStore) -> SessionDocument {
    let nodes = graph
        .topological_order()
        .map(|node| {
            let parameters = node
                .parameters
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            (
                node.name.clone(),
                SessionEntry {
                    type_id: node.type_id.clone(),
                    parents: node.parents.clone(),
                    parameters,
                    position: node.layout.position,
                    size: node.layout.size,
                    hidden: node.layout.hidden,
                },
            )
        })
        .collect();
    SessionDocument { nodes }
}

/// Replay a session snapshot into `graph`.
///
/// Nodes are re-added through [`GraphStore::add_node`] in stored order
/// (parents-before-children by construction of [`save`]), renamed to
/// their stored names, and given their stored parameters and layout.
/// Execution state is not restored; every node starts `Idle`.
pub fn restore(doc: &SessionDocument, graph: &mut GraphStore) -> Result<(), SessionError> {
    for (stored_name, entry) in doc.iter() {
        let parents: Vec<&str> = entry.parents.iter().map(String::as_str).collect();
        let added = graph.add_node(entry.type_id.clone(), &parents)?.name.clone();
        let final_name = graph.rename_node(&added, stored_name)?;
        if final_name != stored_name {
            // Unreachable with a well-formed document (stored names are
            // unique), but a corrupt file should not panic the engine.
            tracing::warn!(stored = %stored_name, assigned = %final_name, "stored name collided during restore");
        }
        if let Some(node) = graph.get_mut(&final_name) {
            node.parameters = entry
                .parameters
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<FxHashMap<_, _>>();
            node.layout = NodeLayout {
                position: entry.position,
                size: entry.size,
                hidden: entry.hidden,
            };
        }
    }
    Ok(())
}
