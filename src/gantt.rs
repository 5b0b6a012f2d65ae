//! Gantt chart payload assembly.
//!
//! Combines a project's graph with critical path results into a single
//! read-only structure: task bars, milestones, dependency links, a per-crew
//! daily hours heat map and summary statistics.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SchedulerConfig;
use crate::graph::TaskGraph;
use crate::models::{CpmFields, Crew, DependencyType, Task, TaskStatus, TaskType};
use crate::scheduler::CpmOutcome;

/// Crew shown on a task bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewSummary {
    pub id: String,
    pub name: String,
    pub trade: String,
}

impl CrewSummary {
    fn from_crew(crew: &Crew) -> Self {
        Self {
            id: crew.id.clone(),
            name: crew.name.clone(),
            trade: crew.trade.clone(),
        }
    }

    /// Placeholder for a crew id without a record.
    fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            trade: String::new(),
        }
    }
}

/// One bar (or milestone diamond) of the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttTask {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration_days: i64,
    pub actual_start: Option<NaiveDate>,
    pub actual_end: Option<NaiveDate>,
    pub completion_percentage: u8,
    pub early_start: Option<NaiveDate>,
    pub early_finish: Option<NaiveDate>,
    pub late_start: Option<NaiveDate>,
    pub late_finish: Option<NaiveDate>,
    pub float_days: i64,
    pub is_critical_path: bool,
    pub crew: Option<CrewSummary>,
    pub assigned_users: Vec<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub color: Option<String>,
    pub sort_order: i32,
}

impl GanttTask {
    fn new(task: &Task, cpm: &CpmFields, crew: Option<CrewSummary>) -> Self {
        Self {
            id: task.id.clone(),
            name: task.name.clone(),
            parent_id: task.parent_id.clone(),
            task_type: task.task_type,
            status: task.status,
            start_date: task.start_date,
            end_date: task.end_date,
            duration_days: task.duration_days,
            actual_start: task.actual_start,
            actual_end: task.actual_end,
            completion_percentage: task.completion_percentage,
            early_start: cpm.early_start,
            early_finish: cpm.early_finish,
            late_start: cpm.late_start,
            late_finish: cpm.late_finish,
            float_days: cpm.float_days,
            is_critical_path: cpm.is_critical_path,
            crew,
            assigned_users: task.assigned_users.clone(),
            estimated_hours: task.estimated_hours,
            actual_hours: task.actual_hours,
            color: task.color.clone(),
            sort_order: task.sort_order,
        }
    }
}

/// A dependency link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GanttDependency {
    pub id: String,
    pub predecessor_id: String,
    pub successor_id: String,
    pub dependency_type: DependencyType,
    pub lag_days: i64,
}

/// Project-level statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GanttSummary {
    pub total_tasks: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub on_hold: usize,
    pub critical_tasks: usize,
    /// Mean completion percentage; 0 with no tasks.
    pub average_completion: f64,
    pub total_estimated_hours: f64,
    pub total_actual_hours: f64,
}

/// Everything the chart needs for one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GanttPayload {
    pub project_id: String,
    pub tasks: Vec<GanttTask>,
    pub milestones: Vec<GanttTask>,
    pub dependencies: Vec<GanttDependency>,
    /// crew id -> day -> allocated hours
    pub crew_allocation: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
    pub summary: GanttSummary,
    pub critical_path: Vec<String>,
    pub project_start: Option<NaiveDate>,
    pub project_end: Option<NaiveDate>,
}

impl GanttPayload {
    /// Hours booked for a crew on a day.
    pub fn crew_hours(&self, crew_id: &str, date: NaiveDate) -> f64 {
        self.crew_allocation
            .get(crew_id)
            .and_then(|days| days.get(&date))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Builds [`GanttPayload`]s.
#[derive(Debug, Clone)]
pub struct GanttAssembler {
    default_task_hours: f64,
}

impl Default for GanttAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl GanttAssembler {
    /// Assumes 8 hours for tasks without an estimate.
    pub fn new() -> Self {
        Self {
            default_task_hours: 8.0,
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            default_task_hours: config.default_task_hours,
        }
    }

    pub fn with_default_task_hours(mut self, hours: f64) -> Self {
        self.default_task_hours = hours;
        self
    }

    /// Assembles the payload.
    ///
    /// CPM fields come from `outcome` when given, otherwise from the
    /// fields stored on each task.
    pub fn assemble(
        &self,
        graph: &TaskGraph,
        outcome: Option<&CpmOutcome>,
        crews: &[Crew],
    ) -> GanttPayload {
        let crews_by_id: HashMap<&str, &Crew> = crews.iter().map(|c| (c.id.as_str(), c)).collect();
        let ordered = graph.tasks();

        let mut tasks = Vec::new();
        let mut milestones = Vec::new();
        for task in &ordered {
            let cpm = outcome
                .and_then(|o| o.fields(&task.id))
                .unwrap_or(&task.cpm);
            let crew = task.assigned_crew.as_deref().map(|id| {
                crews_by_id
                    .get(id)
                    .map(|c| CrewSummary::from_crew(c))
                    .unwrap_or_else(|| CrewSummary::unknown(id))
            });
            let row = GanttTask::new(task, cpm, crew);
            match task.task_type {
                TaskType::Normal => tasks.push(row),
                TaskType::Milestone => milestones.push(row),
            }
        }

        let dependencies = graph
            .edges()
            .iter()
            .map(|e| GanttDependency {
                id: e.id.clone(),
                predecessor_id: e.predecessor_id.clone(),
                successor_id: e.successor_id.clone(),
                dependency_type: e.dependency_type,
                lag_days: e.lag_days,
            })
            .collect();

        let critical_path = match outcome {
            Some(o) => o.critical_path.clone(),
            None => ordered
                .iter()
                .filter(|t| t.cpm.is_critical_path)
                .map(|t| t.id.clone())
                .collect(),
        };

        let (project_start, project_end) = match outcome {
            Some(o) => (o.project_start, o.project_end),
            None => (
                ordered.iter().filter_map(|t| t.start_date).min(),
                ordered.iter().filter_map(|t| t.end_date).max(),
            ),
        };

        let payload = GanttPayload {
            project_id: graph.project_id().to_string(),
            summary: summarize(&tasks, &milestones),
            crew_allocation: self.crew_allocation(&ordered),
            tasks,
            milestones,
            dependencies,
            critical_path,
            project_start,
            project_end,
        };

        debug!(
            project_id = %payload.project_id,
            tasks = payload.tasks.len(),
            milestones = payload.milestones.len(),
            crews = payload.crew_allocation.len(),
            "gantt payload assembled"
        );
        payload
    }

    /// Spreads each active crew task's hours evenly over its days.
    fn crew_allocation(&self, tasks: &[&Task]) -> BTreeMap<String, BTreeMap<NaiveDate, f64>> {
        let mut allocation: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for task in tasks.iter().filter(|t| t.is_active()) {
            let (Some(crew_id), Some(window)) = (task.assigned_crew.as_ref(), task.window()) else {
                continue;
            };
            let hours = task.estimated_hours.unwrap_or(self.default_task_hours);
            let daily_hours = hours / task.effective_duration() as f64;
            let days = allocation.entry(crew_id.clone()).or_default();
            for day in window.iter_days() {
                *days.entry(day).or_insert(0.0) += daily_hours;
            }
        }
        allocation
    }
}

fn summarize(tasks: &[GanttTask], milestones: &[GanttTask]) -> GanttSummary {
    let all: Vec<&GanttTask> = tasks.iter().chain(milestones).collect();
    if all.is_empty() {
        return GanttSummary::default();
    }

    let count = |status: TaskStatus| all.iter().filter(|t| t.status == status).count();
    let completion: f64 = all.iter().map(|t| f64::from(t.completion_percentage)).sum();

    GanttSummary {
        total_tasks: all.len(),
        completed: count(TaskStatus::Completed),
        in_progress: count(TaskStatus::InProgress),
        on_hold: count(TaskStatus::OnHold),
        critical_tasks: all.iter().filter(|t| t.is_critical_path).count(),
        average_completion: completion / all.len() as f64,
        total_estimated_hours: all.iter().filter_map(|t| t.estimated_hours).sum(),
        total_actual_hours: all.iter().filter_map(|t| t.actual_hours).sum(),
    }
}
