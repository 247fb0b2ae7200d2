//! Minimal end-to-end run: a two-step pipeline where requesting the
//! child first triggers the parent automatically.
//!
//! Run with: `cargo run --example quickstart`

use async_trait::async_trait;
use pipelab::engine::PipelineEngine;
use pipelab::registry::{Operation, OperationError, OperationInputs, OperationRegistry};
use serde_json::{Value, json};

struct LoadRows;

#[async_trait]
impl Operation for LoadRows {
    async fn run(&self, _inputs: OperationInputs) -> Result<Value, OperationError> {
        let rows: Vec<Value> = (0..10).map(|i| json!({"id": i})).collect();
        Ok(Value::Array(rows))
    }
}

struct FilterRows;

#[async_trait]
impl Operation for FilterRows {
    async fn run(&self, inputs: OperationInputs) -> Result<Value, OperationError> {
        let rows = inputs
            .require(0)?
            .as_array()
            .cloned()
            .ok_or_else(|| OperationError::other("TypeError", "input is not a row set"))?;
        let below = inputs
            .parameter("below")
            .and_then(Value::as_i64)
            .unwrap_or(i64::MAX);
        let kept: Vec<Value> = rows
            .into_iter()
            .filter(|r| r["id"].as_i64().is_some_and(|id| id < below))
            .collect();
        Ok(Value::Array(kept))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pipelab::telemetry::init();

    let registry = OperationRegistry::new()
        .with_operation("load", 0, LoadRows)
        .with_operation("filter", 1, FilterRows);
    let mut engine = PipelineEngine::new(registry);

    let load = engine.add_node("load", &[])?;
    let filter = engine.add_node("filter", &[load.as_str()])?;
    engine.set_parameter(&filter, "below", json!(4))?;

    // The filter's parent has never run: the engine defers the filter,
    // runs the load, then re-requests the filter with the cached rows.
    engine.request_run(&filter)?;
    engine.run_until_idle().await;

    println!("{load}:   {:?}", engine.outcome(&load).unwrap());
    println!("{filter}: {:?}", engine.outcome(&filter).unwrap());
    Ok(())
}
