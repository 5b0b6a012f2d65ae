//! Critical Path Method.
//!
//! # Algorithm
//!
//! 1. Order tasks topologically (cycles abort the project with
//!    [`ScheduleError::CyclicDependency`]).
//! 2. Forward pass: roots start at their own `start_date` or the origin;
//!    other tasks take the latest candidate start over incoming edges.
//! 3. Backward pass: tasks without successors finish at the project end
//!    (latest early finish); other tasks take the earliest candidate
//!    finish over outgoing edges.
//! 4. `float = late_start - early_start`, critical iff `float <= 0`.
//!
//! Any date that leaves chrono's calendar range (huge lag or duration)
//! fails the project with [`ScheduleError::DateOutOfRange`].
//!
//! Candidate starts per dependency type, for a successor of duration `d`:
//!
//! | Type | Forward candidate `ES(succ)` |
//! |------|------------------------------|
//! | FS | `EF(pred) + 1 + lag` |
//! | SS | `ES(pred) + lag` |
//! | FF | `EF(pred) - (d - 1) + lag` |
//! | SF | `ES(pred) - (d - 1) + lag` |
//!
//! The backward pass mirrors each rule to obtain a candidate `LF(pred)`.
//!
//! # Complexity
//! O(V + E) per project.
//!
//! # Reference
//! Kelley & Walker (1959), "Critical-Path Planning and Scheduling"

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::error::{Result, ScheduleError};
use crate::graph::{load_graph, TaskGraph};
use crate::models::{add_days, CpmFields, CpmUpdate, DependencyType, TaskDependency};
use crate::store::ScheduleStore;

/// Result of one CPM run over a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpmOutcome {
    pub project_id: String,
    /// Computed fields per task.
    pub timings: BTreeMap<String, CpmFields>,
    /// Critical task ids in dependency order.
    pub critical_path: Vec<String>,
    /// Earliest early start.
    pub project_start: Option<NaiveDate>,
    /// Latest early finish.
    pub project_end: Option<NaiveDate>,
}

impl CpmOutcome {
    /// Fields computed for a task.
    pub fn fields(&self, task_id: &str) -> Option<&CpmFields> {
        self.timings.get(task_id)
    }

    /// Inclusive project length in days (0 when empty).
    pub fn project_duration_days(&self) -> i64 {
        match (self.project_start, self.project_end) {
            (Some(start), Some(end)) => (end - start).num_days() + 1,
            _ => 0,
        }
    }

    /// Rows for the batched write.
    pub fn updates(&self) -> Vec<CpmUpdate> {
        self.timings
            .iter()
            .map(|(id, fields)| CpmUpdate::new(id.clone(), fields.clone()))
            .collect()
    }

    /// Copies the computed fields onto the graph's tasks.
    pub fn apply(&self, graph: &mut TaskGraph) {
        for (id, fields) in &self.timings {
            if let Some(task) = graph.task_mut(id) {
                task.cpm = fields.clone();
            }
        }
    }
}

/// Forward/backward pass calculator.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use site_schedule::graph::TaskGraph;
/// use site_schedule::models::{Task, TaskDependency};
/// use site_schedule::scheduler::CriticalPathEngine;
///
/// let graph = TaskGraph::from_parts(
///     "P1",
///     vec![
///         Task::new("dig", "P1").with_duration(2),
///         Task::new("pour", "P1").with_duration(1),
///     ],
///     vec![TaskDependency::finish_to_start("dig", "pour")],
/// );
/// let engine = CriticalPathEngine::new().with_origin(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
/// let outcome = engine.compute(&graph).unwrap();
/// assert_eq!(outcome.critical_path, vec!["dig", "pour"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CriticalPathEngine {
    origin: Option<NaiveDate>,
}

impl CriticalPathEngine {
    /// Creates an engine whose origin is the current date.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            origin: config.origin_date,
        }
    }

    /// Pins the start date used by tasks without one.
    pub fn with_origin(mut self, origin: NaiveDate) -> Self {
        self.origin = Some(origin);
        self
    }

    fn origin(&self) -> NaiveDate {
        self.origin
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Computes CPM fields for every task of a graph. Pure.
    pub fn compute(&self, graph: &TaskGraph) -> Result<CpmOutcome> {
        let project_id = graph.project_id().to_string();
        if graph.is_empty() {
            debug!(project_id = %project_id, "empty project, nothing to schedule");
            return Ok(CpmOutcome {
                project_id,
                ..CpmOutcome::default()
            });
        }

        let order = graph.topological_order()?;
        let origin = self.origin();

        let mut incoming: HashMap<&str, Vec<&TaskDependency>> = HashMap::new();
        let mut outgoing: HashMap<&str, Vec<&TaskDependency>> = HashMap::new();
        for edge in graph.edges() {
            incoming.entry(edge.successor_id.as_str()).or_default().push(edge);
            outgoing.entry(edge.predecessor_id.as_str()).or_default().push(edge);
        }

        // Forward pass
        let mut early: HashMap<&str, (NaiveDate, NaiveDate)> = HashMap::with_capacity(order.len());
        for id in &order {
            let task = graph.task(id).ok_or_else(|| missing(&project_id, id))?;
            let duration = task.effective_duration();
            let mut early_start = None;
            for edge in incoming.get(id.as_str()).into_iter().flatten() {
                let Some(&(pred_es, pred_ef)) = early.get(edge.predecessor_id.as_str()) else {
                    continue;
                };
                let candidate = forward_candidate(edge, pred_es, pred_ef, duration)
                    .ok_or_else(|| out_of_range(&project_id, id))?;
                early_start = early_start.max(Some(candidate));
            }
            let early_start = early_start.unwrap_or_else(|| task.start_date.unwrap_or(origin));
            let early_finish = add_days(early_start, duration - 1)
                .ok_or_else(|| out_of_range(&project_id, id))?;
            early.insert(id.as_str(), (early_start, early_finish));
        }

        let project_start = early.values().map(|&(es, _)| es).min();
        let project_end = early.values().map(|&(_, ef)| ef).max();
        let Some(end) = project_end else {
            return Ok(CpmOutcome {
                project_id,
                ..CpmOutcome::default()
            });
        };

        // Backward pass
        let mut late: HashMap<&str, (NaiveDate, NaiveDate)> = HashMap::with_capacity(order.len());
        for id in order.iter().rev() {
            let task = graph.task(id).ok_or_else(|| missing(&project_id, id))?;
            let duration = task.effective_duration();
            let mut late_finish: Option<NaiveDate> = None;
            for edge in outgoing.get(id.as_str()).into_iter().flatten() {
                let Some(&(succ_ls, succ_lf)) = late.get(edge.successor_id.as_str()) else {
                    continue;
                };
                let candidate = backward_candidate(edge, succ_ls, succ_lf, duration)
                    .ok_or_else(|| out_of_range(&project_id, id))?;
                late_finish = Some(late_finish.map_or(candidate, |lf| lf.min(candidate)));
            }
            let late_finish = late_finish.unwrap_or(end);
            let late_start = add_days(late_finish, 1 - duration)
                .ok_or_else(|| out_of_range(&project_id, id))?;
            late.insert(id.as_str(), (late_start, late_finish));
        }

        let mut timings = BTreeMap::new();
        let mut critical_path = Vec::new();
        for id in &order {
            let (Some(&(es, ef)), Some(&(ls, lf))) = (early.get(id.as_str()), late.get(id.as_str()))
            else {
                return Err(missing(&project_id, id));
            };
            let fields = CpmFields::from_dates(es, ef, ls, lf);
            if fields.is_critical_path {
                critical_path.push(id.clone());
            }
            timings.insert(id.clone(), fields);
        }

        info!(
            project_id = %project_id,
            tasks = timings.len(),
            critical = critical_path.len(),
            project_end = %end,
            "critical path computed"
        );

        Ok(CpmOutcome {
            project_id,
            timings,
            critical_path,
            project_start,
            project_end,
        })
    }

    /// Loads a project, computes CPM and writes the fields back in one batch.
    pub fn run(&self, store: &dyn ScheduleStore, project_id: &str) -> Result<CpmOutcome> {
        let graph = load_graph(store, project_id)?;
        let outcome = self.compute(&graph)?;
        if !outcome.timings.is_empty() {
            store.write_cpm_fields(project_id, &outcome.updates())?;
            debug!(project_id = %project_id, rows = outcome.timings.len(), "cpm fields written");
        }
        Ok(outcome)
    }

    /// Runs CPM for a project and returns its critical task ids.
    pub fn calculate_critical_path(
        &self,
        store: &dyn ScheduleStore,
        project_id: &str,
    ) -> Result<Vec<String>> {
        Ok(self.run(store, project_id)?.critical_path)
    }
}

/// Candidate early start of a successor; `None` on calendar overflow.
fn forward_candidate(
    edge: &TaskDependency,
    pred_es: NaiveDate,
    pred_ef: NaiveDate,
    succ_duration: i64,
) -> Option<NaiveDate> {
    let lag = edge.lag_days;
    let span = succ_duration - 1;
    match edge.dependency_type {
        DependencyType::FinishToStart => add_days(pred_ef, lag.checked_add(1)?),
        DependencyType::StartToStart => add_days(pred_es, lag),
        DependencyType::FinishToFinish => add_days(pred_ef, lag.checked_sub(span)?),
        DependencyType::StartToFinish => add_days(pred_es, lag.checked_sub(span)?),
    }
}

/// Candidate late finish of a predecessor; `None` on calendar overflow.
fn backward_candidate(
    edge: &TaskDependency,
    succ_ls: NaiveDate,
    succ_lf: NaiveDate,
    pred_duration: i64,
) -> Option<NaiveDate> {
    let lag = edge.lag_days;
    let span = pred_duration - 1;
    match edge.dependency_type {
        DependencyType::FinishToStart => add_days(succ_ls, (-1i64).checked_sub(lag)?),
        DependencyType::StartToStart => add_days(succ_ls, span.checked_sub(lag)?),
        DependencyType::FinishToFinish => add_days(succ_lf, 0i64.checked_sub(lag)?),
        DependencyType::StartToFinish => add_days(succ_lf, span.checked_sub(lag)?),
    }
}

fn out_of_range(project_id: &str, task_id: &str) -> ScheduleError {
    ScheduleError::DateOutOfRange {
        project_id: project_id.to_string(),
        task_id: task_id.to_string(),
    }
}

fn missing(project_id: &str, task_id: &str) -> ScheduleError {
    ScheduleError::TaskNotFound {
        project_id: project_id.to_string(),
        task_id: task_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Task, TaskStatus};
    use chrono::Duration;
    use crate::store::MemoryStore;

    fn jan(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn engine() -> CriticalPathEngine {
        CriticalPathEngine::new().with_origin(jan(1))
    }

    fn task(id: &str, duration: i64) -> Task {
        Task::new(id, "P1").with_duration(duration)
    }

    fn fs(pred: &str, succ: &str) -> TaskDependency {
        TaskDependency::finish_to_start(pred, succ)
    }

    fn assert_invariants(graph: &TaskGraph, outcome: &CpmOutcome) {
        for (id, f) in &outcome.timings {
            let d = graph.task(id).unwrap().effective_duration();
            let (es, ef) = (f.early_start.unwrap(), f.early_finish.unwrap());
            let (ls, lf) = (f.late_start.unwrap(), f.late_finish.unwrap());
            assert_eq!(ef, es + Duration::days(d - 1), "early finish of {id}");
            assert_eq!(lf, ls + Duration::days(d - 1), "late finish of {id}");
            assert_eq!(f.float_days, (ls - es).num_days(), "float of {id}");
            assert_eq!(f.is_critical_path, f.float_days <= 0, "criticality of {id}");
        }
    }

    #[test]
    fn test_simple_chain_all_critical() {
        let graph = TaskGraph::from_parts(
            "P1",
            vec![task("A", 2), task("B", 3), task("C", 4)],
            vec![fs("A", "B"), fs("B", "C")],
        );
        let outcome = engine().compute(&graph).unwrap();

        assert_eq!(outcome.critical_path, vec!["A", "B", "C"]);
        for f in outcome.timings.values() {
            assert_eq!(f.float_days, 0);
            assert_eq!(f.early_start, f.late_start);
        }
        assert_eq!(outcome.fields("A").unwrap().early_finish, Some(jan(2)));
        assert_eq!(outcome.fields("B").unwrap().early_start, Some(jan(3)));
        assert_eq!(outcome.fields("C").unwrap().early_finish, Some(jan(9)));
        assert_eq!(outcome.project_duration_days(), 9);
        assert_invariants(&graph, &outcome);
    }

    #[test]
    fn test_parallel_branches_float() {
        let graph = TaskGraph::from_parts(
            "P1",
            vec![task("X", 10), task("Y", 3), task("Z", 2)],
            vec![fs("X", "Z"), fs("Y", "Z")],
        );
        let outcome = engine().compute(&graph).unwrap();

        let x = outcome.fields("X").unwrap();
        let y = outcome.fields("Y").unwrap();
        let z = outcome.fields("Z").unwrap();
        assert_eq!(x.float_days, 0);
        assert!(x.is_critical_path);
        assert_eq!(y.float_days, 7);
        assert!(!y.is_critical_path);
        assert_eq!(y.late_start, Some(jan(8)));
        assert!(z.is_critical_path);
        assert_eq!(z.early_start, Some(jan(11)));
        assert_eq!(outcome.critical_path, vec!["X", "Z"]);
        assert_invariants(&graph, &outcome);
    }

    #[test]
    fn test_start_to_start_with_lag() {
        let graph = TaskGraph::from_parts(
            "P1",
            vec![task("A", 5), task("B", 3)],
            vec![fs("A", "B")
                .with_type(DependencyType::StartToStart)
                .with_lag(2)],
        );
        let outcome = engine().compute(&graph).unwrap();
        let b = outcome.fields("B").unwrap();
        assert_eq!(b.early_start, Some(jan(3)));
        assert_eq!(b.early_finish, Some(jan(5)));
        assert_eq!(outcome.fields("A").unwrap().late_start, Some(jan(1)));
        assert_eq!(outcome.critical_path, vec!["A", "B"]);
        assert_invariants(&graph, &outcome);
    }

    #[test]
    fn test_finish_to_finish() {
        let graph = TaskGraph::from_parts(
            "P1",
            vec![task("A", 4), task("B", 2)],
            vec![fs("A", "B")
                .with_type(DependencyType::FinishToFinish)
                .with_lag(1)],
        );
        let outcome = engine().compute(&graph).unwrap();
        let b = outcome.fields("B").unwrap();
        assert_eq!(b.early_start, Some(jan(4)));
        assert_eq!(b.early_finish, Some(jan(5)));
        let a = outcome.fields("A").unwrap();
        assert_eq!(a.late_finish, Some(jan(4)));
        assert_eq!(a.float_days, 0);
        assert_invariants(&graph, &outcome);
    }

    #[test]
    fn test_start_to_finish() {
        let graph = TaskGraph::from_parts(
            "P1",
            vec![task("A", 2).with_start(jan(5)), task("B", 3)],
            vec![fs("A", "B").with_type(DependencyType::StartToFinish)],
        );
        let outcome = engine().compute(&graph).unwrap();
        let b = outcome.fields("B").unwrap();
        // B must finish when A starts.
        assert_eq!(b.early_start, Some(jan(3)));
        assert_eq!(b.early_finish, Some(jan(5)));
        assert_eq!(outcome.project_end, Some(jan(6)));
        assert_eq!(b.float_days, 1);
        assert_invariants(&graph, &outcome);
    }

    #[test]
    fn test_negative_lag_is_lead_time() {
        let graph = TaskGraph::from_parts(
            "P1",
            vec![task("A", 5), task("B", 2)],
            vec![fs("A", "B").with_lag(-2)],
        );
        let outcome = engine().compute(&graph).unwrap();
        let b = outcome.fields("B").unwrap();
        assert_eq!(b.early_start, Some(jan(4)));
        assert_eq!(outcome.fields("A").unwrap().late_finish, Some(jan(5)));
        assert_eq!(outcome.critical_path, vec!["A", "B"]);
        assert_invariants(&graph, &outcome);
    }

    #[test]
    fn test_binding_candidate_wins() {
        // B is constrained by A (FS) and by C (SS + 6); the later candidate binds.
        let graph = TaskGraph::from_parts(
            "P1",
            vec![task("A", 2), task("B", 1), task("C", 1)],
            vec![
                fs("A", "B"),
                fs("C", "B").with_type(DependencyType::StartToStart).with_lag(6),
            ],
        );
        let outcome = engine().compute(&graph).unwrap();
        assert_eq!(outcome.fields("B").unwrap().early_start, Some(jan(7)));
        assert_eq!(outcome.fields("A").unwrap().float_days, 4);
        assert_eq!(outcome.critical_path, vec!["C", "B"]);
    }

    #[test]
    fn test_root_uses_own_start_date() {
        let graph = TaskGraph::from_parts(
            "P1",
            vec![task("A", 2).with_start(jan(20)), task("B", 2)],
            vec![],
        );
        let outcome = engine().compute(&graph).unwrap();
        assert_eq!(outcome.fields("A").unwrap().early_start, Some(jan(20)));
        assert_eq!(outcome.fields("B").unwrap().early_start, Some(jan(1)));
        assert_eq!(outcome.project_end, Some(jan(21)));
        assert_eq!(outcome.fields("B").unwrap().float_days, 19);
    }

    #[test]
    fn test_degenerate_duration_coerced() {
        let mut zero = task("A", 1);
        zero.duration_days = 0;
        let mut negative = task("B", 1);
        negative.duration_days = -3;
        let graph = TaskGraph::from_parts("P1", vec![zero, negative], vec![fs("A", "B")]);

        let outcome = engine().compute(&graph).unwrap();
        let a = outcome.fields("A").unwrap();
        assert_eq!(a.early_start, a.early_finish);
        assert_eq!(outcome.fields("B").unwrap().early_start, Some(jan(2)));
        assert_invariants(&graph, &outcome);
    }

    #[test]
    fn test_canceled_task_skipped() {
        let graph = TaskGraph::from_parts(
            "P1",
            vec![
                task("A", 2),
                task("LONG", 30).with_status(TaskStatus::Canceled),
                task("B", 2),
            ],
            vec![fs("A", "B"), fs("LONG", "B")],
        );
        let outcome = engine().compute(&graph).unwrap();
        assert!(outcome.fields("LONG").is_none());
        assert_eq!(outcome.fields("B").unwrap().early_start, Some(jan(3)));
        assert_eq!(outcome.critical_path, vec!["A", "B"]);
    }

    #[test]
    fn test_malformed_edges_do_not_abort() {
        let graph = TaskGraph::from_parts(
            "P1",
            vec![task("A", 2), task("B", 2)],
            vec![fs("A", "B"), fs("A", "A"), fs("GHOST", "B")],
        );
        let outcome = engine().compute(&graph).unwrap();
        assert_eq!(outcome.critical_path, vec!["A", "B"]);
    }

    #[test]
    fn test_cycle_is_an_error() {
        let graph = TaskGraph::from_parts(
            "P1",
            vec![task("A", 2), task("B", 2)],
            vec![fs("A", "B"), fs("B", "A")],
        );
        let err = engine().compute(&graph).unwrap_err();
        assert!(matches!(err, ScheduleError::CyclicDependency { .. }));
    }

    #[test]
    fn test_huge_lag_is_out_of_range() {
        let graph = TaskGraph::from_parts(
            "P1",
            vec![task("A", 2), task("B", 2)],
            vec![fs("A", "B").with_lag(200_000_000)],
        );
        match engine().compute(&graph) {
            Err(ScheduleError::DateOutOfRange {
                project_id,
                task_id,
            }) => {
                assert_eq!(project_id, "P1");
                assert_eq!(task_id, "B");
            }
            other => panic!("expected out-of-range error, got {other:?}"),
        }
    }

    #[test]
    fn test_extreme_lag_values_do_not_panic() {
        for lag in [i64::MAX, i64::MIN] {
            for kind in [
                DependencyType::FinishToStart,
                DependencyType::StartToStart,
                DependencyType::FinishToFinish,
                DependencyType::StartToFinish,
            ] {
                let graph = TaskGraph::from_parts(
                    "P1",
                    vec![task("A", 3), task("B", 3)],
                    vec![fs("A", "B").with_type(kind).with_lag(lag)],
                );
                assert!(matches!(
                    engine().compute(&graph),
                    Err(ScheduleError::DateOutOfRange { .. })
                ));
            }
        }
    }

    #[test]
    fn test_huge_duration_is_out_of_range() {
        let mut long = task("A", 1);
        long.duration_days = i64::MAX;
        let graph = TaskGraph::from_parts("P1", vec![long], vec![]);
        assert!(matches!(
            engine().compute(&graph),
            Err(ScheduleError::DateOutOfRange { task_id, .. }) if task_id == "A"
        ));
    }

    #[test]
    fn test_out_of_range_writes_nothing() {
        let store = MemoryStore::new();
        store.add_project("P1", "ORG");
        store.add_task(task("A", 2));
        store.add_task(task("B", 2));
        store.add_dependency("P1", fs("A", "B").with_lag(-200_000_000));

        assert!(engine().run(&store, "P1").is_err());
        assert_eq!(store.cpm_write_count(), 0);
    }

    #[test]
    fn test_empty_graph() {
        let graph = TaskGraph::from_parts("P1", vec![], vec![]);
        let outcome = engine().compute(&graph).unwrap();
        assert!(outcome.critical_path.is_empty());
        assert!(outcome.timings.is_empty());
        assert_eq!(outcome.project_duration_days(), 0);
    }

    #[test]
    fn test_idempotent() {
        let graph = TaskGraph::from_parts(
            "P1",
            vec![task("X", 10), task("Y", 3), task("Z", 2)],
            vec![fs("X", "Z"), fs("Y", "Z")],
        );
        let first = engine().compute(&graph).unwrap();
        let second = engine().compute(&graph).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_writes_single_batch() {
        let store = MemoryStore::new();
        store.add_project("P1", "ORG");
        store.add_task(task("A", 2));
        store.add_task(task("B", 3));
        store.add_dependency("P1", fs("A", "B"));

        let critical = engine().calculate_critical_path(&store, "P1").unwrap();
        assert_eq!(critical, vec!["A", "B"]);
        assert_eq!(store.cpm_write_count(), 1);

        let stored = store.task("P1", "B").unwrap();
        assert_eq!(stored.cpm.early_start, Some(jan(3)));
        assert!(stored.cpm.is_critical_path);
    }

    #[test]
    fn test_run_on_cycle_writes_nothing() {
        let store = MemoryStore::new();
        store.add_project("P1", "ORG");
        store.add_task(task("A", 2));
        store.add_task(task("B", 3));
        store.add_dependency("P1", fs("A", "B"));
        store.add_dependency("P1", fs("B", "A"));

        assert!(engine().run(&store, "P1").is_err());
        assert_eq!(store.cpm_write_count(), 0);
    }

    #[test]
    fn test_apply_to_graph() {
        let mut graph = TaskGraph::from_parts("P1", vec![task("A", 2)], vec![]);
        let outcome = engine().compute(&graph).unwrap();
        outcome.apply(&mut graph);
        assert!(graph.task("A").unwrap().cpm.is_critical_path);
    }
}
