// tests/core_runtime.rs
//
// Drives the pure `CoreRuntime` with a synthetic clock: no Tokio, no
// threads, no sleeping.

use std::time::{Duration, Instant};

use serde_json::json;

use taskswarm::dag::Scheduler;
use taskswarm::engine::{
    CoreCommand, CoreRuntime, CoreStep, FailureReason, OutcomeStatus, ProgressEvent,
    RuntimeEvent, ScheduleOptions,
};
use taskswarm_test_utils::{SubtaskBuilder, TaskGraphBuilder};

fn dispatched(step: &CoreStep) -> Vec<String> {
    step.commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::DispatchTasks(tasks) => Some(tasks.iter().map(|t| t.id.clone())),
            _ => None,
        })
        .flatten()
        .collect()
}

fn cancelled(step: &CoreStep) -> Vec<String> {
    step.commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::Cancel(id) => Some(id.clone()),
            _ => None,
        })
        .collect()
}

fn completed(id: &str) -> RuntimeEvent {
    RuntimeEvent::TaskCompleted {
        subtask: id.to_string(),
        result: Ok(json!({ "from": id })),
    }
}

#[test]
fn start_respects_the_concurrency_bound() {
    let graph = TaskGraphBuilder::new()
        .node("a", "w", &[])
        .node("b", "w", &[])
        .node("c", "w", &[])
        .node("d", "w", &[])
        .build();
    let mut core = CoreRuntime::new(Scheduler::new(&graph), ScheduleOptions::new(2, None));
    let t0 = Instant::now();

    let step = core.start(t0);
    assert_eq!(dispatched(&step), vec!["a", "b"]);
    assert!(step.keep_running);
    assert_eq!(core.in_flight_count(), 2);

    let step = core.step(completed("b"), t0);
    assert_eq!(dispatched(&step), vec!["c"]);
    assert_eq!(core.in_flight_count(), 2);

    core.step(completed("a"), t0);
    core.step(completed("c"), t0);
    let step = core.step(completed("d"), t0);
    assert!(!step.keep_running);
    assert!(matches!(step.commands.last(), Some(CoreCommand::RequestExit)));

    let results = core.into_results();
    assert_eq!(results.completion_order(), &["b", "a", "c", "d"]);
}

#[test]
fn expired_deadline_times_out_and_frees_the_slot() {
    let graph = TaskGraphBuilder::new()
        .node("fast", "w", &[])
        .with_subtask(SubtaskBuilder::new("slow", "w").timeout(Duration::from_millis(500)))
        .node("next", "w", &[])
        .build();
    let options = ScheduleOptions::new(2, Some(Duration::from_secs(10)));
    let mut core = CoreRuntime::new(Scheduler::new(&graph), options);
    let t0 = Instant::now();

    core.start(t0);
    assert_eq!(core.next_deadline(), Some(t0 + Duration::from_millis(500)));

    // Nothing expires before the deadline.
    let step = core.expire_deadlines(t0 + Duration::from_millis(499));
    assert!(step.commands.is_empty());

    let step = core.expire_deadlines(t0 + Duration::from_millis(500));
    assert_eq!(cancelled(&step), vec!["slow"]);
    assert_eq!(dispatched(&step), vec!["next"], "slot of the timed out subtask is reused");
    assert!(step.commands.iter().any(|c| matches!(
        c,
        CoreCommand::Notify(ProgressEvent::Completed {
            subtask,
            status: OutcomeStatus::Failed,
            reason: Some(reason),
        }) if subtask == "slow" && reason == "timeout after 500ms"
    )));

    assert_eq!(
        core.scheduler().results().get("slow").and_then(|o| o.reason()),
        Some(&FailureReason::Timeout { after_ms: 500 })
    );
}

#[test]
fn late_result_after_timeout_is_discarded() {
    let graph = TaskGraphBuilder::new()
        .node("a", "w", &[])
        .node("b", "w", &["a"])
        .build();
    let options = ScheduleOptions::new(1, Some(Duration::from_secs(1)));
    let mut core = CoreRuntime::new(Scheduler::new(&graph), options);
    let t0 = Instant::now();

    core.start(t0);
    let step = core.expire_deadlines(t0 + Duration::from_secs(2));
    assert_eq!(cancelled(&step), vec!["a"]);
    assert!(!step.keep_running, "b fails with unmet dependencies, run is over");

    let late = core.step(completed("a"), t0 + Duration::from_secs(3));
    assert!(late.commands.is_empty());

    let results = core.into_results();
    assert_eq!(
        results.get("a").map(|o| o.status()),
        Some(OutcomeStatus::Failed),
        "the late success must not overwrite the timeout"
    );
    assert_eq!(
        results.get("b").and_then(|o| o.reason()),
        Some(&FailureReason::UnmetDependencies {
            unmet: vec!["a".into()]
        })
    );
}

#[test]
fn subtasks_without_timeout_have_no_deadline() {
    let graph = TaskGraphBuilder::new().node("a", "w", &[]).build();
    let mut core = CoreRuntime::new(Scheduler::new(&graph), ScheduleOptions::new(1, None));
    let t0 = Instant::now();

    core.start(t0);
    assert_eq!(core.next_deadline(), None);

    let step = core.expire_deadlines(t0 + Duration::from_secs(3600));
    assert!(cancelled(&step).is_empty());
    assert_eq!(core.in_flight_count(), 1);
}

#[test]
fn simultaneous_expiries_are_processed_in_declaration_order() {
    let graph = TaskGraphBuilder::new()
        .node("one", "w", &[])
        .node("two", "w", &[])
        .node("three", "w", &[])
        .build();
    let options = ScheduleOptions::new(3, Some(Duration::from_millis(100)));
    let mut core = CoreRuntime::new(Scheduler::new(&graph), options);
    let t0 = Instant::now();

    core.start(t0);
    let step = core.expire_deadlines(t0 + Duration::from_millis(100));

    assert_eq!(cancelled(&step), vec!["one", "two", "three"]);
    assert!(!step.keep_running);
    assert_eq!(core.into_results().completion_order(), &["one", "two", "three"]);
}

#[test]
fn stalled_graph_finishes_from_start() {
    let graph = TaskGraphBuilder::new()
        .node("x", "w", &["y"])
        .node("y", "w", &["x"])
        .build();
    let mut core = CoreRuntime::new(Scheduler::new(&graph), ScheduleOptions::default());

    let step = core.start(Instant::now());
    assert!(dispatched(&step).is_empty());
    assert!(!step.keep_running);
    assert!(step.commands.iter().any(|c| matches!(
        c,
        CoreCommand::Notify(ProgressEvent::RunFinished {
            succeeded: 0,
            failed: 2
        })
    )));
}
