//! Critical path scheduling.
//!
//! Provides the CPM calculator and the batch driver that recomputes every
//! active project on a periodic trigger.
//!
//! # Algorithm
//!
//! `CriticalPathEngine` runs a forward and a backward pass over a
//! project's dependency DAG with FS/SS/FF/SF semantics and signed lag.
//!
//! # Batch
//!
//! `BatchRecalculator` fans projects out over a bounded thread pool and
//! reports per-project success and failure.
//!
//! # References
//!
//! - Kelley & Walker (1959), "Critical-Path Planning and Scheduling"
//! - PMI (2017), "PMBOK Guide", 6.5.2.2 Critical Path Method

mod batch;
mod cpm;

pub use batch::{BatchRecalculator, BatchReport, ProjectFailure};
pub use cpm::{CpmOutcome, CriticalPathEngine};
