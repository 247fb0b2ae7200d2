mod common;

use common::test_engine;
use pipelab::event_bus::EventKind;
use pipelab::types::NodeState;
use serde_json::json;

#[tokio::test]
async fn propagation_runs_parent_before_child() {
    let mut engine = test_engine();
    let mut events = engine.subscribe();

    let load = engine.add_node("load", &[]).unwrap();
    let filter = engine.add_node("filter", &[load.as_str()]).unwrap();
    engine.set_parameter(&filter, "below", json!(4)).unwrap();

    // Requesting the child first defers it and dispatches the parent.
    engine.request_run(&filter).unwrap();

    let deferred = events.try_next().unwrap();
    assert!(matches!(
        deferred.kind,
        EventKind::RunDeferred { ref node, ref missing_parent }
            if node == &filter && missing_parent == &load
    ));
    assert!(engine.outcome(&filter).is_none());
    assert_eq!(engine.outstanding_tasks(), 1);

    engine.run_until_idle().await;

    // Parent cached first, child re-requested automatically.
    let load_out = engine.outcome(&load).unwrap();
    assert_eq!(load_out.as_value().unwrap().as_array().unwrap().len(), 10);
    let filter_out = engine.outcome(&filter).unwrap();
    assert_eq!(filter_out.as_value().unwrap().as_array().unwrap().len(), 4);
    assert_eq!(engine.graph().get(&filter).unwrap().state, NodeState::Valid);
    assert_eq!(engine.graph().get(&load).unwrap().state, NodeState::Valid);

    // Dispatch order in the event log: load strictly before filter.
    let mut dispatches = Vec::new();
    while let Some(event) = events.try_next() {
        if let EventKind::RunDispatched { node, .. } = event.kind {
            dispatches.push(node);
        }
    }
    assert_eq!(dispatches, vec![load.clone(), filter.clone()]);
}

#[tokio::test]
async fn propagation_resolves_multiple_missing_parents_one_at_a_time() {
    let mut engine = test_engine();
    let a = engine.add_node("load", &[]).unwrap();
    let b = engine.add_node("load", &[]).unwrap();
    let merge = engine.add_node("merge", &[a.as_str(), b.as_str()]).unwrap();

    engine.request_run(&merge).unwrap();
    // Only the first missing parent is dispatched per invocation.
    assert_eq!(engine.outstanding_tasks(), 1);

    engine.run_until_idle().await;
    assert!(engine.outcome(&a).is_some());
    assert!(engine.outcome(&b).is_some());
    let merged = engine.outcome(&merge).unwrap();
    assert_eq!(merged.as_value().unwrap().as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn cached_parent_is_not_rerun() {
    let mut engine = test_engine();
    let load = engine.add_node("load", &[]).unwrap();
    let filter = engine.add_node("filter", &[load.as_str()]).unwrap();
    engine.set_parameter(&filter, "below", json!(2)).unwrap();

    engine.request_run(&load).unwrap();
    engine.run_until_idle().await;

    let mut events = engine.subscribe();
    engine.request_run(&filter).unwrap();
    engine.run_until_idle().await;

    // The parent result was cached, so only the child dispatched.
    let mut dispatches = Vec::new();
    while let Some(event) = events.try_next() {
        if let EventKind::RunDispatched { node, .. } = event.kind {
            dispatches.push(node);
        }
    }
    assert_eq!(dispatches, vec![filter]);
}

#[tokio::test]
async fn operation_error_becomes_failure_outcome() {
    let mut engine = test_engine();
    let broken = engine.add_node("broken", &[]).unwrap();

    engine.request_run(&broken).unwrap();
    engine.run_until_idle().await;

    let outcome = engine.outcome(&broken).unwrap();
    assert_eq!(outcome.failure_kind(), Some("ValueError"));
    let node = engine.graph().get(&broken).unwrap();
    assert_eq!(node.state, NodeState::Fail);
    assert!(
        node.error_message
            .as_deref()
            .is_some_and(|m| m.contains("empty table"))
    );
}

#[tokio::test]
async fn parent_failure_propagates_as_child_failure() {
    let mut engine = test_engine();
    let broken = engine.add_node("broken", &[]).unwrap();
    let count = engine.add_node("count", &[broken.as_str()]).unwrap();

    engine.request_run(&count).unwrap();
    engine.run_until_idle().await;

    // The failure was handed to the child as input; the child rejected
    // it and recorded its own failure.
    let outcome = engine.outcome(&count).unwrap();
    assert_eq!(outcome.failure_kind(), Some("FailedInput"));
    assert_eq!(engine.graph().get(&count).unwrap().state, NodeState::Fail);
    // The parent keeps its own failure record.
    assert_eq!(
        engine.outcome(&broken).unwrap().failure_kind(),
        Some("ValueError")
    );
}

#[tokio::test]
async fn retrigger_before_completion_is_allowed() {
    let mut engine = test_engine();
    let slow = engine.add_node("slow", &[]).unwrap();
    engine.set_parameter(&slow, "value", json!("done")).unwrap();
    engine.set_parameter(&slow, "delay_ms", json!(20)).unwrap();

    engine.request_run(&slow).unwrap();
    engine.request_run(&slow).unwrap();
    assert_eq!(engine.outstanding_tasks(), 2);
    assert_eq!(engine.graph().get(&slow).unwrap().state, NodeState::Loading);

    // First completion: one task still outstanding, state stays Loading.
    assert!(engine.pump().await);
    assert_eq!(engine.graph().get(&slow).unwrap().state, NodeState::Loading);

    // Last completion settles the state; the cache keeps the last write.
    engine.run_until_idle().await;
    assert_eq!(engine.graph().get(&slow).unwrap().state, NodeState::Valid);
    assert_eq!(engine.outcome(&slow).unwrap().as_value(), Some(&json!("done")));
}

#[tokio::test]
async fn completion_for_deleted_node_is_ignored() {
    let mut engine = test_engine();
    let slow = engine.add_node("slow", &[]).unwrap();
    engine.set_parameter(&slow, "delay_ms", json!(30)).unwrap();

    engine.request_run(&slow).unwrap();
    engine.delete_branch(&slow).unwrap();

    // Draining the tombstone must neither crash nor resurrect state.
    engine.run_until_idle().await;
    assert!(engine.outcome(&slow).is_none());
    assert!(engine.graph().get(&slow).is_none());
    assert_eq!(engine.outstanding_tasks(), 0);
}

#[tokio::test]
async fn cancelled_task_writes_nothing() {
    let mut engine = test_engine();
    let slow = engine.add_node("slow", &[]).unwrap();
    engine.set_parameter(&slow, "delay_ms", json!(200)).unwrap();

    engine.request_run(&slow).unwrap();
    engine.shutdown();
    engine.run_until_idle().await;

    assert!(engine.outcome(&slow).is_none());
}

#[tokio::test]
async fn rename_mid_flight_lands_under_new_name() {
    let mut engine = test_engine();
    let slow = engine.add_node("slow", &[]).unwrap();
    engine.set_parameter(&slow, "value", json!(7)).unwrap();
    engine.set_parameter(&slow, "delay_ms", json!(30)).unwrap();

    engine.request_run(&slow).unwrap();
    let renamed = engine.rename_node(&slow, "speedy").unwrap();
    engine.run_until_idle().await;

    assert!(engine.outcome(&slow).is_none());
    assert_eq!(engine.outcome(&renamed).unwrap().as_value(), Some(&json!(7)));
    assert_eq!(
        engine.graph().get(&renamed).unwrap().state,
        NodeState::Valid
    );
}

#[tokio::test]
async fn unknown_node_is_rejected_synchronously() {
    let mut engine = test_engine();
    assert!(engine.request_run("ghost").is_err());
}
