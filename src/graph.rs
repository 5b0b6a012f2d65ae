//! Task graph model.
//!
//! A [`TaskGraph`] is the arena for one project: every retained task lives
//! in an id-keyed map and every relationship is an identifier. Canceled
//! tasks are removed on construction, and edges that do not connect two
//! retained tasks of the project are dropped with a warning.
//!
//! # Reference
//! Kahn (1962), "Topological sorting of large networks"

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{Result, ScheduleError};
use crate::models::{Task, TaskDependency, TaskStatus};
use crate::store::ScheduleStore;
use crate::validation::{classify_edge, ValidationErrorKind};

/// An edge removed while building the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedEdge {
    pub dependency: TaskDependency,
    pub reason: ValidationErrorKind,
}

/// The tasks and dependency edges of one project.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    project_id: String,
    tasks: HashMap<String, Task>,
    edges: Vec<TaskDependency>,
    dropped_edges: Vec<DroppedEdge>,
}

/// Loads a project's graph from the record store.
pub fn load_graph(store: &dyn ScheduleStore, project_id: &str) -> Result<TaskGraph> {
    let tasks = store.project_tasks(project_id)?;
    let edges = store.project_dependencies(project_id)?;
    Ok(TaskGraph::from_parts(project_id, tasks, edges))
}

impl TaskGraph {
    /// Builds a graph from raw records.
    ///
    /// - Tasks of other projects and canceled tasks are left out.
    /// - The first record wins on duplicate task ids.
    /// - Edges touching a canceled task are dropped silently; any other
    ///   unusable edge is dropped with a warning.
    /// - An edge reaching a task of another project is recorded as
    ///   [`ValidationErrorKind::CrossProjectEdge`], not as dangling.
    pub fn from_parts(
        project_id: impl Into<String>,
        tasks: Vec<Task>,
        edges: Vec<TaskDependency>,
    ) -> Self {
        let project_id = project_id.into();
        let mut by_id: HashMap<String, Task> = HashMap::with_capacity(tasks.len());
        let mut canceled = BTreeSet::new();
        let mut foreign = HashSet::new();

        for task in tasks {
            if task.project_id != project_id {
                warn!(
                    project_id = %project_id,
                    task_id = %task.id,
                    owner = %task.project_id,
                    "ignoring task owned by another project"
                );
                foreign.insert(task.id);
                continue;
            }
            if task.status == TaskStatus::Canceled {
                canceled.insert(task.id);
                continue;
            }
            if by_id.contains_key(&task.id) {
                warn!(project_id = %project_id, task_id = %task.id, "duplicate task id, keeping first");
                continue;
            }
            by_id.insert(task.id.clone(), task);
        }

        let mut kept = Vec::with_capacity(edges.len());
        let mut dropped_edges = Vec::new();
        for edge in edges {
            if canceled.contains(&edge.predecessor_id) || canceled.contains(&edge.successor_id) {
                debug!(
                    project_id = %project_id,
                    dependency_id = %edge.id,
                    "skipping dependency on canceled task"
                );
                continue;
            }
            let reason = classify_edge(&edge, &by_id).map(|reason| {
                let crosses = foreign.contains(&edge.predecessor_id)
                    || foreign.contains(&edge.successor_id);
                if reason == ValidationErrorKind::DanglingEdge && crosses {
                    ValidationErrorKind::CrossProjectEdge
                } else {
                    reason
                }
            });
            match reason {
                None => kept.push(edge),
                Some(reason) => {
                    warn!(
                        project_id = %project_id,
                        dependency_id = %edge.id,
                        predecessor = %edge.predecessor_id,
                        successor = %edge.successor_id,
                        ?reason,
                        "dropping malformed dependency"
                    );
                    dropped_edges.push(DroppedEdge {
                        dependency: edge,
                        reason,
                    });
                }
            }
        }

        Self {
            project_id,
            tasks: by_id,
            edges: kept,
            dropped_edges,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Tasks ordered by `sort_order`, then id.
    pub fn tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.values().collect();
        tasks.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.id.cmp(&b.id)));
        tasks
    }

    /// Retained dependency edges.
    pub fn edges(&self) -> &[TaskDependency] {
        &self.edges
    }

    /// Edges removed during construction.
    pub fn dropped_edges(&self) -> &[DroppedEdge] {
        &self.dropped_edges
    }

    /// Incoming edges of a task.
    pub fn predecessors(&self, task_id: &str) -> Vec<&TaskDependency> {
        self.edges
            .iter()
            .filter(|e| e.successor_id == task_id)
            .collect()
    }

    /// Outgoing edges of a task.
    pub fn successors(&self, task_id: &str) -> Vec<&TaskDependency> {
        self.edges
            .iter()
            .filter(|e| e.predecessor_id == task_id)
            .collect()
    }

    /// Direct children in the grouping hierarchy, ordered like [`tasks`](Self::tasks).
    pub fn children(&self, parent_id: &str) -> Vec<&Task> {
        self.tasks()
            .into_iter()
            .filter(|t| t.parent_id.as_deref() == Some(parent_id))
            .collect()
    }

    /// Tasks in dependency order.
    ///
    /// Kahn's algorithm; among ready tasks the smallest id goes first so the
    /// order is deterministic.
    ///
    /// # Errors
    /// [`ScheduleError::CyclicDependency`] naming every task that could not
    /// be ordered.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let nodes = self.tasks.keys().map(String::as_str);
        let edges = self
            .edges
            .iter()
            .map(|e| (e.predecessor_id.as_str(), e.successor_id.as_str()));

        match kahn_order(nodes, edges) {
            Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
            Err(stuck) => Err(ScheduleError::CyclicDependency {
                project_id: self.project_id.clone(),
                task_ids: stuck.into_iter().map(str::to_string).collect(),
            }),
        }
    }

    pub(crate) fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }
}

/// Kahn's algorithm over string ids.
///
/// Endpoints missing from `nodes` are added. The smallest ready id goes
/// first. On a cycle, `Err` holds every id left with unmet predecessors,
/// sorted.
pub(crate) fn kahn_order<'a>(
    nodes: impl IntoIterator<Item = &'a str>,
    edges: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> std::result::Result<Vec<&'a str>, Vec<&'a str>> {
    let mut in_degree: BTreeMap<&str, usize> = nodes.into_iter().map(|id| (id, 0)).collect();
    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();

    for (pred, succ) in edges {
        in_degree.entry(pred).or_insert(0);
        *in_degree.entry(succ).or_insert(0) += 1;
        outgoing.entry(pred).or_default().push(succ);
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(in_degree.len());

    while let Some(id) = ready.pop_first() {
        order.push(id);
        for &succ in outgoing.get(id).map(Vec::as_slice).unwrap_or_default() {
            if let Some(d) = in_degree.get_mut(succ) {
                *d -= 1;
                if *d == 0 {
                    ready.insert(succ);
                }
            }
        }
    }

    if order.len() < in_degree.len() {
        return Err(in_degree
            .into_iter()
            .filter(|(_, d)| *d > 0)
            .map(|(id, _)| id)
            .collect());
    }
    Ok(order)
}
