//! Save a pipeline to a sealed session file and restore it.
//!
//! Run with: `cargo run --example session_roundtrip`

use async_trait::async_trait;
use pipelab::engine::PipelineEngine;
use pipelab::registry::{Operation, OperationError, OperationInputs, OperationRegistry};
use pipelab::session::SessionError;
use serde_json::{Value, json};

struct Constant(Value);

#[async_trait]
impl Operation for Constant {
    async fn run(&self, _inputs: OperationInputs) -> Result<Value, OperationError> {
        Ok(self.0.clone())
    }
}

struct CountRows;

#[async_trait]
impl Operation for CountRows {
    async fn run(&self, inputs: OperationInputs) -> Result<Value, OperationError> {
        Ok(json!(inputs.require(0)?.as_array().map(Vec::len).unwrap_or(0)))
    }
}

fn registry() -> OperationRegistry {
    OperationRegistry::new()
        .with_operation("load", 0, Constant(json!([1, 2, 3])))
        .with_operation("count", 1, CountRows)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pipelab::telemetry::init();

    let mut engine = PipelineEngine::new(registry());
    let load = engine.add_node("load", &[])?;
    let load = engine.rename_node(&load, "numbers")?;
    engine.add_node("count", &[load.as_str()])?;

    let path = std::env::temp_dir().join("pipelab-demo.session");
    std::fs::write(&path, engine.export_session(Some("hunter2"))?)?;
    println!("sealed session written to {}", path.display());

    // A fresh engine loads it back; the wrong password is rejected
    // without touching the file.
    let bytes = std::fs::read(&path)?;
    let mut restored = PipelineEngine::new(registry());
    match restored.import_session(&bytes, None) {
        Err(pipelab::engine::EngineError::Session(SessionError::PasswordRequired)) => {
            println!("no password: prompt the user and retry");
        }
        other => other?,
    }
    restored.import_session(&bytes, Some("hunter2"))?;

    let names: Vec<_> = restored.graph().names().collect();
    println!("restored nodes: {names:?}");
    Ok(())
}
