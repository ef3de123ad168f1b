// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::{Result, SwarmError};

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = SwarmError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;
        Ok(PlanFile::new_unchecked(raw.config, raw.subtask))
    }
}

fn validate_raw_plan(plan: &RawPlanFile) -> Result<()> {
    ensure_has_subtasks(plan)?;
    validate_global_config(plan)?;
    validate_ids(plan)?;
    validate_subtask_dependencies(plan)?;
    validate_dag(plan)?;
    Ok(())
}

fn ensure_has_subtasks(plan: &RawPlanFile) -> Result<()> {
    if plan.subtask.is_empty() {
        return Err(SwarmError::ConfigError(
            "plan must contain at least one [[subtask]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(plan: &RawPlanFile) -> Result<()> {
    if plan.config.max_concurrency == 0 {
        return Err(SwarmError::ConfigError(
            "[config].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    if plan.config.poll_interval.is_zero() {
        return Err(SwarmError::ConfigError(
            "[config].poll_interval must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_ids(plan: &RawPlanFile) -> Result<()> {
    let mut seen = HashSet::new();
    for subtask in &plan.subtask {
        if subtask.id.trim().is_empty() {
            return Err(SwarmError::ConfigError(
                "subtask id must not be empty".to_string(),
            ));
        }
        if subtask.kind.trim().is_empty() {
            return Err(SwarmError::ConfigError(format!(
                "subtask '{}' has an empty `kind`",
                subtask.id
            )));
        }
        if !seen.insert(subtask.id.as_str()) {
            return Err(SwarmError::DuplicateSubtask(subtask.id.clone()));
        }
    }
    Ok(())
}

fn validate_subtask_dependencies(plan: &RawPlanFile) -> Result<()> {
    let ids: HashSet<&str> = plan.subtask.iter().map(|s| s.id.as_str()).collect();

    for subtask in &plan.subtask {
        for dep in &subtask.after {
            if dep == &subtask.id {
                return Err(SwarmError::ConfigError(format!(
                    "subtask '{}' cannot depend on itself in `after`",
                    subtask.id
                )));
            }
            if !ids.contains(dep.as_str()) {
                return Err(SwarmError::ConfigError(format!(
                    "subtask '{}' has unknown dependency '{}' in `after`",
                    subtask.id, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(plan: &RawPlanFile) -> Result<()> {
    // Edge direction: dep -> subtask.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for subtask in &plan.subtask {
        graph.add_node(subtask.id.as_str());
    }
    for subtask in &plan.subtask {
        for dep in &subtask.after {
            graph.add_edge(dep.as_str(), subtask.id.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(SwarmError::DagCycle(format!(
            "cycle detected in subtask graph involving subtask '{}'",
            cycle.node_id()
        ))),
    }
}
