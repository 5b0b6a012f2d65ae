//! Periodic recomputation across projects.
//!
//! Each project's graph is independent, so projects run in parallel on a
//! dedicated rayon pool sized by `max_parallel_projects`. A failure (or
//! panic) in one project is logged with its id and recorded in the report;
//! the remaining projects still run.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, info_span, warn};

use crate::config::SchedulerConfig;
use crate::error::{Result, ScheduleError};
use crate::scheduler::CriticalPathEngine;
use crate::store::ScheduleStore;

/// A project whose recomputation failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectFailure {
    pub project_id: String,
    pub error: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// Projects recomputed, in input order.
    pub succeeded: Vec<String>,
    /// Projects that failed, in input order.
    pub failed: Vec<ProjectFailure>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs CPM over many projects with bounded parallelism.
#[derive(Debug, Clone)]
pub struct BatchRecalculator {
    engine: CriticalPathEngine,
    max_parallel: usize,
}

impl BatchRecalculator {
    pub fn new(engine: CriticalPathEngine, max_parallel: usize) -> Self {
        Self {
            engine,
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(
            CriticalPathEngine::from_config(config),
            config.max_parallel_projects,
        )
    }

    /// Recomputes every project the store reports as active.
    ///
    /// # Errors
    /// Only when the project listing itself fails.
    pub fn run_all(&self, store: &dyn ScheduleStore) -> Result<BatchReport> {
        let projects = store.active_projects()?;
        Ok(self.run(store, &projects))
    }

    /// Recomputes the given projects. Never fails as a whole.
    pub fn run(&self, store: &dyn ScheduleStore, project_ids: &[String]) -> BatchReport {
        let results: Vec<(String, Result<usize>)> = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_parallel)
            .thread_name(|i| format!("cpm-batch-{i}"))
            .build()
        {
            Ok(pool) => pool.install(|| {
                project_ids
                    .par_iter()
                    .map(|id| (id.clone(), self.run_project(store, id)))
                    .collect()
            }),
            Err(e) => {
                warn!("failed to build batch thread pool, running sequentially: {e}");
                project_ids
                    .iter()
                    .map(|id| (id.clone(), self.run_project(store, id)))
                    .collect()
            }
        };

        let mut report = BatchReport::default();
        for (project_id, result) in results {
            match result {
                Ok(_) => report.succeeded.push(project_id),
                Err(e) => {
                    error!(project_id = %project_id, "critical path recomputation failed: {e}");
                    report.failed.push(ProjectFailure {
                        project_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            succeeded = report.success_count(),
            failed = report.failure_count(),
            "batch recomputation finished"
        );
        report
    }

    /// Runs one project, converting a panic into an error.
    fn run_project(&self, store: &dyn ScheduleStore, project_id: &str) -> Result<usize> {
        let span = info_span!("recalculate_project", project_id = %project_id);
        let _enter = span.enter();

        catch_unwind(AssertUnwindSafe(|| {
            self.engine
                .run(store, project_id)
                .map(|outcome| outcome.critical_path.len())
        }))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            error!(project_id = %project_id, panic = %message, "project recomputation panicked");
            Err(ScheduleError::Panicked {
                project_id: project_id.to_string(),
                message,
            })
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
