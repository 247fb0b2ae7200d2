//! Shared fixtures: a small catalog of data operations in the shape the
//! engine was built for (load / filter / stats over JSON row sets).
#![allow(dead_code)] // each test binary uses a different subset

use async_trait::async_trait;
use pipelab::engine::PipelineEngine;
use pipelab::registry::{Operation, OperationError, OperationInputs, OperationRegistry};
use serde_json::{Value, json};
use std::time::Duration;

/// Source operation: produces a fixed ten-row table.
pub struct LoadRows;

#[async_trait]
impl Operation for LoadRows {
    async fn run(&self, _inputs: OperationInputs) -> Result<Value, OperationError> {
        let rows: Vec<Value> = (0..10)
            .map(|i| json!({"id": i, "group": if i % 2 == 0 { "even" } else { "odd" }}))
            .collect();
        Ok(Value::Array(rows))
    }
}

/// Keeps rows whose `id` is strictly below the `below` parameter.
pub struct FilterRows;

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
            .ok_or_else(|| OperationError::InvalidParameter {
                name: "below".to_string(),
                reason: "expected an integer".to_string(),
            })?;
        let kept: Vec<Value> = rows
            .into_iter()
            .filter(|r| r["id"].as_i64().is_some_and(|id| id < below))
            .collect();
        Ok(Value::Array(kept))
    }
}

/// Counts the rows of its single input.
pub struct CountRows;

#[async_trait]
impl Operation for CountRows {
    async fn run(&self, inputs: OperationInputs) -> Result<Value, OperationError> {
        let rows = inputs.require(0)?;
        let n = rows.as_array().map(Vec::len).unwrap_or(0);
        Ok(json!(n))
    }
}

/// Concatenates two row sets.
pub struct MergeRows;

#[async_trait]
impl Operation for MergeRows {
    async fn run(&self, inputs: OperationInputs) -> Result<Value, OperationError> {
        let mut rows = inputs
            .require(0)?
            .as_array()
            .cloned()
            .unwrap_or_default();
        rows.extend(inputs.require(1)?.as_array().cloned().unwrap_or_default());
        Ok(Value::Array(rows))
    }
}

/// Always fails, like a load pointed at a missing file.
pub struct AlwaysFails;

#[async_trait]
impl Operation for AlwaysFails {
    async fn run(&self, _inputs: OperationInputs) -> Result<Value, OperationError> {
        Err(OperationError::other("ValueError", "empty table"))
    }
}

/// Sleeps for the `delay_ms` parameter (default 50) before echoing the
/// `value` parameter, to hold a task in flight.
pub struct SlowEcho;

#[async_trait]
impl Operation for SlowEcho {
    async fn run(&self, inputs: OperationInputs) -> Result<Value, OperationError> {
        let delay = inputs
            .parameter("delay_ms")
            .and_then(Value::as_u64)
            .unwrap_or(50);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(inputs.parameter("value").cloned().unwrap_or(Value::Null))
    }
}

/// The full fixture catalog.
pub fn test_registry() -> OperationRegistry {
    OperationRegistry::new()
        .with_operation("load", 0, LoadRows)
        .with_operation("filter", 1, FilterRows)
        .with_operation("count", 1, CountRows)
        .with_operation("merge", 2, MergeRows)
        .with_operation("broken", 0, AlwaysFails)
        .with_operation("slow", 0, SlowEcho)
}

/// Engine wired with the fixture catalog.
pub fn test_engine() -> PipelineEngine {
    PipelineEngine::new(test_registry())
}
