use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = ScheduleError> = std::result::Result<T, E>;

/// Failures that abort a single project's computation.
///
/// Malformed edges and degenerate durations are not errors: they are
/// logged and repaired in place.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("Project '{project_id}' has a dependency cycle through: {}", task_ids.join(", "))]
    CyclicDependency {
        project_id: String,
        task_ids: Vec<String>,
    },

    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("Task '{task_id}' not found in project '{project_id}'")]
    TaskNotFound { project_id: String, task_id: String },

    #[error("Task '{task_id}' in project '{project_id}' schedules outside the supported date range")]
    DateOutOfRange { project_id: String, task_id: String },

    #[error("Recomputation of project '{project_id}' panicked: {message}")]
    Panicked { project_id: String, message: String },

    #[error("Record store failure: {0}")]
    Store(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ScheduleError {
    /// Wraps any store-side failure.
    pub fn store(err: impl std::fmt::Display) -> Self {
        ScheduleError::Store(err.to_string())
    }
}
