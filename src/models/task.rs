//! Task model.
//!
//! A task is a unit of site work belonging to exactly one project. Tasks
//! carry their planned window, progress, an optional crew assignment and
//! the timing fields written back by the critical path engine.
//!
//! Relationships (`parent_id`, `assigned_crew`) are stored as identifiers.
//! They are lookups into the owning project's task map or the organization's
//! crew list and never control lifetime.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{add_days, CpmFields, DateWindow};

/// Kind of schedule entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Regular work item.
    #[default]
    Normal,
    /// Zero-effort marker (inspection passed, permit issued, handover).
    Milestone,
}

/// Progress state of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    OnHold,
    Completed,
    Canceled,
}

impl TaskStatus {
    /// Whether work in this state still occupies resources.
    pub fn is_active(self) -> bool {
        !matches!(self, TaskStatus::Completed | TaskStatus::Canceled)
    }
}

/// A scheduled unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Owning project.
    pub project_id: String,
    /// Human-readable name.
    pub name: String,
    pub task_type: TaskType,
    pub status: TaskStatus,
    /// Planned first working day.
    pub start_date: Option<NaiveDate>,
    /// Planned last working day (inclusive).
    pub end_date: Option<NaiveDate>,
    /// Planned length in calendar days. Values below 1 are treated as 1.
    pub duration_days: i64,
    pub actual_start: Option<NaiveDate>,
    pub actual_end: Option<NaiveDate>,
    /// Progress, 0..=100.
    pub completion_percentage: u8,
    /// Grouping parent (not a dependency).
    pub parent_id: Option<String>,
    /// Crew doing the work.
    pub assigned_crew: Option<String>,
    /// Users responsible for the task.
    pub assigned_users: Vec<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    /// Display color for the chart bar (e.g. `#3b82f6`).
    pub color: Option<String>,
    /// Position among siblings in the chart.
    pub sort_order: i32,
    /// Fields computed by the critical path engine.
    #[serde(default)]
    pub cpm: CpmFields,
}

impl Task {
    /// Creates a one-day normal task in the given project.
    pub fn new(id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            name: String::new(),
            task_type: TaskType::Normal,
            status: TaskStatus::NotStarted,
            start_date: None,
            end_date: None,
            duration_days: 1,
            actual_start: None,
            actual_end: None,
            completion_percentage: 0,
            parent_id: None,
            assigned_crew: None,
            assigned_users: Vec::new(),
            estimated_hours: None,
            actual_hours: None,
            color: None,
            sort_order: 0,
            cpm: CpmFields::default(),
        }
    }

    /// Creates a milestone.
    pub fn milestone(id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self::new(id, project_id).with_type(TaskType::Milestone)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the planned window; `duration_days` follows the inclusive span.
    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self.duration_days = (end - start).num_days() + 1;
        self
    }

    /// Sets the start date and derives the end date from the current duration.
    ///
    /// The end date is cleared when it would fall outside the calendar.
    pub fn with_start(mut self, start: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = add_days(start, self.effective_duration() - 1);
        self
    }

    /// Sets the duration, keeping the end date aligned with the start date.
    pub fn with_duration(mut self, days: i64) -> Self {
        self.duration_days = days;
        if let Some(start) = self.start_date {
            self.end_date = add_days(start, self.effective_duration() - 1);
        }
        self
    }

    pub fn with_actual_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.actual_start = start;
        self.actual_end = end;
        self
    }

    /// Sets progress, clamped to 100.
    pub fn with_completion(mut self, percentage: u8) -> Self {
        self.completion_percentage = percentage.min(100);
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_crew(mut self, crew_id: impl Into<String>) -> Self {
        self.assigned_crew = Some(crew_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.assigned_users.push(user_id.into());
        self
    }

    pub fn with_hours(mut self, estimated: Option<f64>, actual: Option<f64>) -> Self {
        self.estimated_hours = estimated;
        self.actual_hours = actual;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Duration used in date arithmetic (at least one day).
    #[inline]
    pub fn effective_duration(&self) -> i64 {
        self.duration_days.max(1)
    }

    /// Whether the task still occupies its crew (not completed or canceled).
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    #[inline]
    pub fn is_milestone(&self) -> bool {
        self.task_type == TaskType::Milestone
    }

    /// Planned window, if both ends are set.
    pub fn window(&self) -> Option<DateWindow> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some(DateWindow::new(start, end)),
            _ => None,
        }
    }
}
