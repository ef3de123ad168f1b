// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::dag::task_graph::TaskGraph;
use crate::types::SubtaskId;

/// Internal node structure: stores immediate deps and dependents by index.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies present in the graph (deduplicated, declared order).
    deps: Vec<usize>,
    /// Dependency ids that do not name any subtask in the graph.
    dangling: Vec<SubtaskId>,
    /// Direct dependents: subtasks that list this one as a dependency.
    dependents: Vec<usize>,
}

/// Index-based adjacency view of a [`TaskGraph`].
///
/// Node indices are declaration positions, which gives the scheduler a
/// stable ordering attribute for tie-breaking.
#[derive(Debug, Clone)]
pub struct DagGraph {
    ids: Vec<SubtaskId>,
    index: HashMap<SubtaskId, usize>,
    nodes: Vec<DagNode>,
}

impl DagGraph {
    pub fn from_graph(graph: &TaskGraph) -> Self {
        let ids: Vec<SubtaskId> = graph.subtasks().iter().map(|s| s.id.clone()).collect();
        let index: HashMap<SubtaskId, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut nodes = vec![DagNode::default(); ids.len()];

        // First pass: resolve dependency ids to indices.
        for (i, subtask) in graph.subtasks().iter().enumerate() {
            for dep in &subtask.dependencies {
                match index.get(dep) {
                    Some(&d) if !nodes[i].deps.contains(&d) => nodes[i].deps.push(d),
                    Some(_) => {}
                    None if !nodes[i].dangling.contains(dep) => nodes[i].dangling.push(dep.clone()),
                    None => {}
                }
            }
        }

        // Second pass: populate dependents based on deps.
        for i in 0..nodes.len() {
            let deps = nodes[i].deps.clone();
            for d in deps {
                nodes[d].dependents.push(i);
            }
        }

        Self { ids, index, nodes }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id_of(&self, idx: usize) -> &str {
        &self.ids[idx]
    }

    /// Return all subtask ids in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(|s| s.as_str())
    }

    /// Immediate dependencies that exist in the graph.
    pub fn dependencies_of(&self, idx: usize) -> &[usize] {
        &self.nodes[idx].deps
    }

    /// Dependency ids that reference subtasks missing from the graph.
    pub fn dangling_of(&self, idx: usize) -> &[SubtaskId] {
        &self.nodes[idx].dangling
    }

    /// Immediate dependents of a subtask.
    pub fn dependents_of(&self, idx: usize) -> &[usize] {
        &self.nodes[idx].dependents
    }

    /// Find one dependency cycle, if any, as a list of subtask ids.
    ///
    /// Only used for diagnostics: the scheduler does not rely on this to
    /// terminate, its no-progress guard handles cycles on its own.
    pub fn find_cycle(&self) -> Option<Vec<SubtaskId>> {
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for i in 0..self.nodes.len() {
            graph.add_node(i);
        }
        for (i, node) in self.nodes.iter().enumerate() {
            for &d in &node.deps {
                graph.add_edge(d, i, ());
            }
        }

        tarjan_scc(&graph)
            .into_iter()
            .find(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|mut scc| {
                scc.sort_unstable();
                scc.into_iter().map(|i| self.ids[i].clone()).collect()
            })
    }
}
