//! Structural checks for a project's task graph.
//!
//! Detects:
//! - Duplicate task or dependency IDs
//! - Dangling edges (endpoint outside the project's task set)
//! - Self-referencing dependencies
//! - Edges joining tasks of different projects
//! - Circular dependencies and circular parent/child grouping
//!
//! Graph loading uses [`classify_edge`] to drop bad edges one by one;
//! [`validate_graph`] reports every issue at once for callers that want a
//! full diagnosis (import previews, admin tooling).
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet};

use crate::graph::kahn_order;
use crate::models::{Task, TaskDependency};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// An edge references a task that isn't in the set.
    DanglingEdge,
    /// An edge connects a task to itself.
    SelfDependency,
    /// An edge connects tasks owned by different projects.
    CrossProjectEdge,
    /// Dependency edges or parent links form a cycle.
    CyclicDependency,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Classifies a single edge against an id-keyed task set.
///
/// Returns `None` for a usable edge.
pub fn classify_edge(
    edge: &TaskDependency,
    tasks: &HashMap<String, Task>,
) -> Option<ValidationErrorKind> {
    if edge.is_self_reference() {
        return Some(ValidationErrorKind::SelfDependency);
    }
    let (Some(pred), Some(succ)) = (
        tasks.get(&edge.predecessor_id),
        tasks.get(&edge.successor_id),
    ) else {
        return Some(ValidationErrorKind::DanglingEdge);
    };
    if pred.project_id != succ.project_id {
        return Some(ValidationErrorKind::CrossProjectEdge);
    }
    None
}

/// Validates a task set and its dependency edges.
///
/// Checks:
/// 1. No duplicate task IDs
/// 2. No duplicate dependency IDs
/// 3. Every edge is well-formed (see [`classify_edge`])
/// 4. Well-formed edges contain no cycle
/// 5. Parent links contain no cycle
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_graph(tasks: &[Task], edges: &[TaskDependency]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut by_id: HashMap<String, Task> = HashMap::new();
    for task in tasks {
        if by_id.contains_key(&task.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate task ID: {}", task.id),
            ));
        } else {
            by_id.insert(task.id.clone(), task.clone());
        }
    }

    let mut edge_ids = HashSet::new();
    let mut usable = Vec::new();
    for edge in edges {
        if !edge_ids.insert(edge.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate dependency ID: {}", edge.id),
            ));
        }
        match classify_edge(edge, &by_id) {
            None => usable.push(edge),
            Some(kind) => errors.push(ValidationError::new(
                kind,
                format!(
                    "Dependency '{}' ({} -> {}) is unusable: {:?}",
                    edge.id, edge.predecessor_id, edge.successor_id, kind
                ),
            )),
        }
    }

    if let Some(stuck) = find_dependency_cycle(&usable) {
        errors.push(ValidationError::new(
            ValidationErrorKind::CyclicDependency,
            format!(
                "Circular dependency detected; tasks left unordered: {}",
                stuck.join(", ")
            ),
        ));
    }

    if let Some(node) = find_parent_cycle(tasks) {
        errors.push(ValidationError::new(
            ValidationErrorKind::CyclicDependency,
            format!("Circular parent grouping detected involving task '{node}'"),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects a cycle among dependency edges with Kahn's algorithm.
///
/// Returns the sorted ids that could not be ordered: the cycle members and
/// anything downstream of them.
fn find_dependency_cycle(edges: &[&TaskDependency]) -> Option<Vec<String>> {
    let pairs = edges
        .iter()
        .map(|e| (e.predecessor_id.as_str(), e.successor_id.as_str()));
    kahn_order([], pairs)
        .err()
        .map(|stuck| stuck.into_iter().map(str::to_string).collect())
}

/// Detects a cycle in `parent_id` links by walking each chain upwards.
fn find_parent_cycle(tasks: &[Task]) -> Option<String> {
    let parents: HashMap<&str, &str> = tasks
        .iter()
        .filter_map(|t| t.parent_id.as_deref().map(|p| (t.id.as_str(), p)))
        .collect();

    let mut ids: Vec<&str> = parents.keys().copied().collect();
    ids.sort_unstable();

    for start in ids {
        let mut seen = HashSet::new();
        let mut current = start;
        while let Some(&parent) = parents.get(current) {
            if !seen.insert(current) {
                return Some(current.to_string());
            }
            current = parent;
        }
    }
    None
}
