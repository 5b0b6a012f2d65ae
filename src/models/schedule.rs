//! Computed schedule fields.
//!
//! The critical path engine derives early/late dates and float for every
//! task. These values are written back in a single batch per project and
//! read by the Gantt assembler.
//!
//! # Reference
//! Kelley & Walker (1959), "Critical-Path Planning and Scheduling"

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// CPM timing attributes of one task.
///
/// Dates are inclusive working days: a one-day task has
/// `early_start == early_finish`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpmFields {
    pub early_start: Option<NaiveDate>,
    pub early_finish: Option<NaiveDate>,
    pub late_start: Option<NaiveDate>,
    pub late_finish: Option<NaiveDate>,
    /// Days the task can slip without moving the project end.
    pub float_days: i64,
    pub is_critical_path: bool,
}

impl CpmFields {
    /// Builds the fields from the four dates, deriving float and criticality.
    pub fn from_dates(
        early_start: NaiveDate,
        early_finish: NaiveDate,
        late_start: NaiveDate,
        late_finish: NaiveDate,
    ) -> Self {
        let float_days = (late_start - early_start).num_days();
        Self {
            early_start: Some(early_start),
            early_finish: Some(early_finish),
            late_start: Some(late_start),
            late_finish: Some(late_finish),
            float_days,
            is_critical_path: float_days <= 0,
        }
    }

    /// Whether a CPM run has populated these fields.
    pub fn is_computed(&self) -> bool {
        self.early_start.is_some() && self.late_start.is_some()
    }
}

/// One row of the batched CPM write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpmUpdate {
    pub task_id: String,
    pub fields: CpmFields,
}

impl CpmUpdate {
    pub fn new(task_id: impl Into<String>, fields: CpmFields) -> Self {
        Self {
            task_id: task_id.into(),
            fields,
        }
    }
}
