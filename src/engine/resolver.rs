// ABOUTME: Dependency resolution over a workflow's task set
// ABOUTME: Pure readiness computation plus graph validation helpers

use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{Graph, NodeIndex};
use std::collections::HashMap;

use super::error::{ExecutionError, Result};
use super::task::{Task, TaskStatus};

/// Names of the tasks eligible to start: pending, with every declared
/// dependency present in the workflow and completed. A failed dependency
/// never satisfies this, so its dependents stay pending.
pub fn ready(tasks: &IndexMap<String, Task>) -> Vec<String> {
    tasks
        .values()
        .filter(|task| task.status() == TaskStatus::Pending && dependencies_met(task, tasks))
        .map(|task| task.name().to_string())
        .collect()
}

fn dependencies_met(task: &Task, tasks: &IndexMap<String, Task>) -> bool {
    task.dependencies().iter().all(|dependency| {
        tasks
            .get(dependency)
            .map(|dep| dep.status() == TaskStatus::Completed)
            .unwrap_or(false)
    })
}

/// Pending tasks that can no longer run, with a human-readable reason.
/// Meaningful once the run has stalled: nothing running and nothing ready.
pub fn blocked(tasks: &IndexMap<String, Task>) -> Vec<(String, String)> {
    tasks
        .values()
        .filter(|task| task.status() == TaskStatus::Pending)
        .map(|task| (task.name().to_string(), blocked_reason(task, tasks)))
        .collect()
}

fn blocked_reason(task: &Task, tasks: &IndexMap<String, Task>) -> String {
    for dependency in task.dependencies() {
        match tasks.get(dependency) {
            None => return format!("dependency '{}' does not exist", dependency),
            Some(dep) if dep.status() == TaskStatus::Failed => {
                return format!("dependency '{}' failed", dependency)
            }
            Some(_) => {}
        }
    }
    "upstream dependencies are blocked".to_string()
}

/// Reject cyclic graphs before any task runs. Edges point from dependency
/// to dependent; dependencies naming absent tasks contribute no edge and
/// are handled by the stall path instead.
pub fn check_cycles(tasks: &IndexMap<String, Task>) -> Result<()> {
    let mut graph: Graph<&str, ()> = Graph::new();
    let mut indices: HashMap<&str, NodeIndex> = HashMap::new();

    for name in tasks.keys() {
        indices.insert(name.as_str(), graph.add_node(name.as_str()));
    }
    for task in tasks.values() {
        for dependency in task.dependencies() {
            if let Some(&from) = indices.get(dependency.as_str()) {
                graph.add_edge(from, indices[task.name()], ());
            }
        }
    }

    toposort(&graph, None)
        .map(|_| ())
        .map_err(|cycle| ExecutionError::CircularDependency {
            tasks: vec![graph[cycle.node_id()].to_string()],
        })
}
