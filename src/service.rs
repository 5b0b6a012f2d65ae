//! Scheduling service: the entry points an API layer calls.
//!
//! Every operation takes the organization or project id explicitly and
//! reaches persistence only through the [`ScheduleStore`] it was built with.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::conflicts::{ConflictDetector, ConflictReport};
use crate::error::Result;
use crate::gantt::{GanttAssembler, GanttPayload};
use crate::graph::load_graph;
use crate::models::{DateRange, TaskStatus};
use crate::scheduler::{BatchRecalculator, BatchReport, CriticalPathEngine};
use crate::store::ScheduleStore;

/// Facade over the critical path engine, conflict detector and Gantt
/// assembler.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use site_schedule::config::SchedulerConfig;
/// use site_schedule::models::{Task, TaskDependency};
/// use site_schedule::service::SchedulingService;
/// use site_schedule::store::MemoryStore;
///
/// let store = MemoryStore::new();
/// store.add_project("P1", "ORG");
/// store.add_task(Task::new("frame", "P1").with_duration(5));
/// store.add_task(Task::new("roof", "P1").with_duration(3));
/// store.add_dependency("P1", TaskDependency::finish_to_start("frame", "roof"));
///
/// let config = SchedulerConfig::default().with_origin(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
/// let service = SchedulingService::new(store, config).unwrap();
/// assert_eq!(service.calculate_critical_path("P1").unwrap(), vec!["frame", "roof"]);
/// ```
#[derive(Debug)]
pub struct SchedulingService<S: ScheduleStore> {
    store: S,
    config: SchedulerConfig,
    engine: CriticalPathEngine,
    detector: ConflictDetector,
    assembler: GanttAssembler,
    batch: BatchRecalculator,
}

impl<S: ScheduleStore> SchedulingService<S> {
    /// Builds the service after validating `config`.
    ///
    /// # Errors
    /// [`ScheduleError::InvalidConfig`](crate::ScheduleError::InvalidConfig)
    /// when the configuration is rejected.
    pub fn new(store: S, config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: CriticalPathEngine::from_config(&config),
            detector: ConflictDetector::new(),
            assembler: GanttAssembler::from_config(&config),
            batch: BatchRecalculator::from_config(&config),
            store,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Recomputes a project's CPM fields and returns its critical task ids.
    pub fn calculate_critical_path(&self, project_id: &str) -> Result<Vec<String>> {
        self.engine.calculate_critical_path(&self.store, project_id)
    }

    /// Crew and equipment conflicts across an organization.
    ///
    /// Either bound may be omitted; an omitted bound is open.
    pub fn detect_conflicts(
        &self,
        organization_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<ConflictReport> {
        self.detector
            .detect_all_conflicts(&self.store, organization_id, DateRange::new(start, end))
    }

    /// Chart payload for a project.
    ///
    /// CPM is rerun first when `recompute_on_read` is set or when an
    /// active task has never been scheduled.
    pub fn get_gantt_data(&self, project_id: &str) -> Result<GanttPayload> {
        let mut graph = load_graph(&self.store, project_id)?;
        let organization_id = self.store.project_organization(project_id)?;
        let crews = self.store.crews(&organization_id)?;

        let stale = graph
            .tasks()
            .iter()
            .any(|t| t.is_active() && !t.cpm.is_computed());
        if !(self.config.recompute_on_read || stale) {
            debug!(project_id = %project_id, "using stored cpm fields");
            return Ok(self.assembler.assemble(&graph, None, &crews));
        }

        let outcome = self.engine.compute(&graph)?;
        if !outcome.timings.is_empty() {
            self.store.write_cpm_fields(project_id, &outcome.updates())?;
        }
        outcome.apply(&mut graph);
        Ok(self.assembler.assemble(&graph, Some(&outcome), &crews))
    }

    /// Records progress on a task and reschedules its project.
    ///
    /// Returns the project's critical task ids after the update.
    pub fn update_task_progress(
        &self,
        project_id: &str,
        task_id: &str,
        completion_percentage: Option<u8>,
        status: Option<TaskStatus>,
    ) -> Result<Vec<String>> {
        self.store
            .update_task_progress(project_id, task_id, completion_percentage, status)?;
        info!(
            project_id = %project_id,
            task_id = %task_id,
            ?status,
            "task progress updated, recomputing"
        );
        self.calculate_critical_path(project_id)
    }

    /// Periodic recomputation over every active project.
    pub fn recalculate_all(&self) -> Result<BatchReport> {
        self.batch.run_all(&self.store)
    }
}
