//! Engine configuration.
//!
//! Every field has a serde default so a partial (or empty) JSON document
//! yields a usable configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// Scheduling engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Start date for tasks without one. `None` = today (local time).
    #[serde(default)]
    pub origin_date: Option<NaiveDate>,

    /// Hours per task when `estimated_hours` is missing (crew heat map).
    #[serde(default = "default_task_hours")]
    pub default_task_hours: f64,

    /// Worker threads used by batch recomputation.
    #[serde(default = "default_max_parallel_projects")]
    pub max_parallel_projects: usize,

    /// Recompute CPM before assembling Gantt data.
    #[serde(default = "default_recompute_on_read")]
    pub recompute_on_read: bool,
}

fn default_task_hours() -> f64 {
    8.0
}

fn default_max_parallel_projects() -> usize {
    4
}

fn default_recompute_on_read() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            origin_date: None,
            default_task_hours: default_task_hours(),
            max_parallel_projects: default_max_parallel_projects(),
            recompute_on_read: default_recompute_on_read(),
        }
    }
}

impl SchedulerConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: SchedulerConfig = serde_json::from_str(content)
            .map_err(|e| ScheduleError::InvalidConfig(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Pins the origin date.
    pub fn with_origin(mut self, origin: NaiveDate) -> Self {
        self.origin_date = Some(origin);
        self
    }

    pub fn with_max_parallel_projects(mut self, n: usize) -> Self {
        self.max_parallel_projects = n;
        self
    }

    pub fn with_recompute_on_read(mut self, enabled: bool) -> Self {
        self.recompute_on_read = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_parallel_projects == 0 {
            return Err(ScheduleError::InvalidConfig(
                "max_parallel_projects must be at least 1".into(),
            ));
        }
        if !self.default_task_hours.is_finite() || self.default_task_hours < 0.0 {
            return Err(ScheduleError::InvalidConfig(format!(
                "default_task_hours must be a non-negative number, got {}",
                self.default_task_hours
            )));
        }
        Ok(())
    }
}
