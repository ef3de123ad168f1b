// tests/report_markdown.rs

use serde_json::json;

use taskswarm::dag::Scheduler;
use taskswarm::engine::{FailureReason, ResultSet};
use taskswarm::plan::simple_plan;
use taskswarm::report::render_markdown;
use taskswarm_test_utils::TaskGraphBuilder;

/// Run `graph` through the scheduler with scripted results, one at a time.
fn run_scripted(
    graph: &taskswarm::dag::TaskGraph,
    mut result_for: impl FnMut(&str) -> Result<serde_json::Value, FailureReason>,
) -> ResultSet {
    let mut sched = Scheduler::new(graph);
    while !sched.is_finished() {
        let batch = sched.take_ready(1);
        if batch.is_empty() {
            sched.resolve_stalled();
            continue;
        }
        for task in batch {
            let result = result_for(&task.id);
            sched.handle_completion(&task.id, result);
        }
    }
    sched.into_results()
}

#[test]
fn report_has_one_section_per_subtask_in_declaration_order() {
    let graph = TaskGraphBuilder::new()
        .id("weekly")
        .node("r", "research", &[])
        .node("w", "writer", &["r"])
        .build();
    let results = run_scripted(&graph, |id| match id {
        "r" => Ok(json!({"text": "Found things."})),
        _ => Ok(json!({"words": 3})),
    });

    let md = render_markdown(&graph, &results);

    let expected = "\
# Report: weekly

2 subtasks: 2 succeeded, 0 failed.

## Research (task r)

Found things.

## Writer (task w)

```json
{
  \"words\": 3
}
```
";
    assert_eq!(md, expected);
}

#[test]
fn failures_and_missing_results_are_marked() {
    let graph = TaskGraphBuilder::new()
        .id("p")
        .node("a", "trends", &[])
        .node("b", "insights", &["a"])
        .build();
    let results = run_scripted(&graph, |_| {
        Err(FailureReason::Timeout { after_ms: 1500 })
    });

    let md = render_markdown(&graph, &results);
    assert!(md.contains("2 subtasks: 0 succeeded, 2 failed."));
    assert!(md.contains("## Trends (task a)\n\n**FAILED**: timeout after 1500ms"));
    assert!(md.contains("## Insights (task b)\n\n**FAILED**: unmet_dependencies: [a]"));

    // A result set from some other run has no entries for this graph.
    let md = render_markdown(&graph, &ResultSet::new());
    assert!(md.contains("2 without result"));
    assert_eq!(md.matches("_No result_").count(), 2);
}

#[test]
fn static_plan_has_the_fixed_shape() {
    let graph = simple_plan("quantum").expect("valid plan");

    let shape: Vec<(String, String, Vec<String>)> = graph
        .subtasks()
        .iter()
        .map(|s| (s.id.clone(), s.kind.clone(), s.dependencies.clone()))
        .collect();
    assert_eq!(
        shape,
        vec![
            ("t1".into(), "research".into(), vec![]),
            ("t2".into(), "trends".into(), vec!["t1".into()]),
            ("t3".into(), "insights".into(), vec!["t1".into(), "t2".into()]),
            ("t4".into(), "writer".into(), vec!["t3".into()]),
        ]
    );
    assert!(graph.subtasks().iter().all(|s| s.input == json!({"topic": "quantum"})));
    assert_ne!(simple_plan("quantum").expect("valid plan").id(), graph.id());
}

#[test]
fn result_set_serializes_in_completion_order() {
    let graph = TaskGraphBuilder::new()
        .node("a", "w", &[])
        .node("b", "w", &["a"])
        .build();
    let results = run_scripted(&graph, |id| match id {
        "a" => Err(FailureReason::WorkerExecution {
            message: "nope".into(),
        }),
        _ => Ok(json!(1)),
    });

    let value = serde_json::to_value(&results).expect("serializable");
    assert_eq!(
        value,
        json!([
            {
                "subtask_id": "a",
                "status": "failed",
                "reason": {"kind": "worker_execution", "message": "nope", "summary": "nope"}
            },
            {
                "subtask_id": "b",
                "status": "failed",
                "reason": {"kind": "unmet_dependencies", "unmet": ["a"], "summary": "unmet_dependencies: [a]"}
            }
        ])
    );
}
