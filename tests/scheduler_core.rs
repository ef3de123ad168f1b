// tests/scheduler_core.rs

use serde_json::json;

use taskswarm::dag::{Scheduler, Subtask, TaskGraph, TaskRunState};
use taskswarm::engine::{FailureReason, OutcomeStatus};
use taskswarm::errors::SwarmError;
use taskswarm_test_utils::{init_tracing, TaskGraphBuilder};

fn ids(tasks: &[taskswarm::dag::ScheduledTask]) -> Vec<&str> {
    tasks.iter().map(|t| t.id.as_str()).collect()
}

/// a -> b -> c
fn chain() -> TaskGraph {
    TaskGraphBuilder::new()
        .node("a", "echo", &[])
        .node("b", "echo", &["a"])
        .node("c", "echo", &["b"])
        .build()
}

#[test]
fn chain_dispatches_one_subtask_at_a_time() {
    init_tracing();
    let mut sched = Scheduler::new(&chain());

    assert_eq!(sched.ready_count(), 1);
    assert_eq!(sched.deps_satisfied("b"), Some(false));

    let first = sched.take_ready(10);
    assert_eq!(ids(&first), vec!["a"]);
    assert_eq!(sched.run_state_of("a"), Some(TaskRunState::Running));
    assert!(sched.take_ready(10).is_empty(), "b must wait for a");

    let step = sched.handle_completion("a", Ok(json!({"v": 1})));
    assert!(step.recorded);
    assert_eq!(step.newly_ready, vec!["b".to_string()]);
    assert_eq!(sched.deps_satisfied("b"), Some(true));

    let second = sched.take_ready(10);
    assert_eq!(ids(&second), vec!["b"]);
    assert_eq!(second[0].dependencies.get("a"), Some(&json!({"v": 1})));

    sched.handle_completion("b", Ok(json!(null)));
    let third = sched.take_ready(10);
    assert_eq!(ids(&third), vec!["c"]);
    let step = sched.handle_completion("c", Ok(json!(null)));

    assert!(step.run_just_finished);
    assert!(sched.is_finished());
    let results = sched.into_results();
    assert_eq!(results.completion_order(), &["a", "b", "c"]);
    assert!(results.all_succeeded());
}

#[test]
fn ready_subtasks_are_taken_in_declaration_order() {
    let graph = TaskGraphBuilder::new()
        .node("z", "echo", &[])
        .node("m", "echo", &[])
        .node("a", "echo", &[])
        .build();
    let mut sched = Scheduler::new(&graph);

    assert_eq!(ids(&sched.take_ready(2)), vec!["z", "m"]);
    assert_eq!(ids(&sched.take_ready(2)), vec!["a"]);
}

#[test]
fn failure_fails_transitive_dependents_without_running_them() {
    // a -> b -> c, and an unrelated d.
    let graph = TaskGraphBuilder::new()
        .node("a", "echo", &[])
        .node("b", "echo", &["a"])
        .node("c", "echo", &["b"])
        .node("d", "echo", &[])
        .build();
    let mut sched = Scheduler::new(&graph);

    assert_eq!(ids(&sched.take_ready(4)), vec!["a", "d"]);

    let step = sched.handle_completion(
        "a",
        Err(FailureReason::WorkerExecution {
            message: "boom".into(),
        }),
    );
    assert_eq!(step.newly_failed, vec!["b".to_string(), "c".to_string()]);
    assert!(!step.run_just_finished, "d is still running");

    let results = sched.results();
    assert_eq!(
        results.get("b").and_then(|o| o.reason()),
        Some(&FailureReason::UnmetDependencies {
            unmet: vec!["a".into()]
        })
    );
    assert_eq!(
        results.get("c").and_then(|o| o.reason()),
        Some(&FailureReason::UnmetDependencies {
            unmet: vec!["b".into()]
        })
    );

    sched.handle_completion("d", Ok(json!("ok")));
    assert!(sched.is_finished());

    let results = sched.into_results();
    assert_eq!(results.len(), 4);
    assert_eq!(results.get("d").map(|o| o.status()), Some(OutcomeStatus::Succeeded));
    assert_eq!(results.failed().count(), 3);
}

#[test]
fn diamond_waits_for_every_dependency() {
    let graph = TaskGraphBuilder::new()
        .node("root", "echo", &[])
        .node("left", "echo", &["root"])
        .node("right", "echo", &["root"])
        .node("join", "echo", &["left", "right"])
        .build();
    let mut sched = Scheduler::new(&graph);

    sched.take_ready(1);
    sched.handle_completion("root", Ok(json!(0)));
    assert_eq!(ids(&sched.take_ready(5)), vec!["left", "right"]);

    let step = sched.handle_completion("right", Ok(json!("r")));
    assert!(step.newly_ready.is_empty());
    let step = sched.handle_completion("left", Ok(json!("l")));
    assert_eq!(step.newly_ready, vec!["join".to_string()]);

    let join = sched.take_ready(1);
    let deps: Vec<&str> = join[0].dependencies.keys().map(String::as_str).collect();
    assert_eq!(deps, vec!["left", "right"]);
}

#[test]
fn cycle_is_resolved_by_the_no_progress_guard() {
    let graph = TaskGraphBuilder::new()
        .node("ok", "echo", &[])
        .node("x", "echo", &["y"])
        .node("y", "echo", &["x"])
        .build();
    let mut sched = Scheduler::new(&graph);

    assert_eq!(ids(&sched.take_ready(10)), vec!["ok"]);
    assert!(!sched.is_stalled(), "ok is still running");
    sched.handle_completion("ok", Ok(json!(1)));

    assert!(sched.is_stalled());
    let step = sched.resolve_stalled();
    assert_eq!(step.newly_failed, vec!["x".to_string(), "y".to_string()]);
    assert!(step.run_just_finished);

    let results = sched.into_results();
    assert_eq!(
        results.get("x").and_then(|o| o.reason()),
        Some(&FailureReason::UnmetDependencies {
            unmet: vec!["y".into()]
        })
    );
    assert_eq!(
        results.get("y").and_then(|o| o.reason()),
        Some(&FailureReason::UnmetDependencies {
            unmet: vec!["x".into()]
        })
    );
}

#[test]
fn dangling_dependency_is_reported_as_unmet() {
    let graph = TaskGraphBuilder::new()
        .node("lonely", "echo", &["ghost"])
        .build();
    let mut sched = Scheduler::new(&graph);

    assert_eq!(sched.ready_count(), 0);
    assert_eq!(sched.deps_satisfied("lonely"), Some(false));
    assert!(sched.is_stalled());

    sched.resolve_stalled();
    let results = sched.into_results();
    assert_eq!(
        results.get("lonely").and_then(|o| o.reason()),
        Some(&FailureReason::UnmetDependencies {
            unmet: vec!["ghost".into()]
        })
    );
}

#[test]
fn completions_for_unknown_or_idle_subtasks_are_ignored() {
    let mut sched = Scheduler::new(&chain());

    let step = sched.handle_completion("nope", Ok(json!(1)));
    assert!(!step.recorded);

    // b is pending, not running.
    let step = sched.handle_completion("b", Ok(json!(1)));
    assert!(!step.recorded);
    assert!(sched.results().is_empty());

    sched.take_ready(1);
    assert!(sched.handle_completion("a", Ok(json!(1))).recorded);
    assert!(!sched.handle_completion("a", Ok(json!(2))).recorded, "only one outcome per subtask");
    assert_eq!(sched.results().get("a").and_then(|o| o.payload()), Some(&json!(1)));
}

#[test]
fn resolve_stalled_is_a_noop_while_work_can_progress() {
    let mut sched = Scheduler::new(&chain());
    let step = sched.resolve_stalled();
    assert!(!step.recorded);
    assert_eq!(sched.pending_count(), 3);
}

#[test]
fn task_graph_rejects_duplicate_and_empty_ids() {
    let dup = TaskGraph::new(
        "p",
        vec![Subtask::new("a", "echo"), Subtask::new("a", "echo")],
    );
    assert!(matches!(dup, Err(SwarmError::DuplicateSubtask(id)) if id == "a"));

    let empty = TaskGraph::new("p", vec![Subtask::new("", "echo")]);
    assert!(matches!(empty, Err(SwarmError::ConfigError(_))));
}

#[test]
fn empty_graph_is_finished_immediately() {
    let graph = TaskGraph::new("empty", Vec::new()).unwrap();
    let sched = Scheduler::new(&graph);
    assert!(sched.is_finished());
    assert!(!sched.is_stalled());
    assert!(sched.into_results().is_empty());
}
