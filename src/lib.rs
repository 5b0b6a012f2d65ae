//! Construction scheduling engine.
//!
//! Computes critical paths over task dependency graphs, finds crew and
//! equipment double-bookings across an organization's projects, and
//! assembles Gantt chart payloads.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Task`, `TaskDependency`, `Crew`,
//!   `Equipment`, `CpmFields`, `DateWindow`
//! - **`validation`**: Graph integrity checks (duplicate ids, dangling and
//!   self edges, dependency and hierarchy cycles)
//! - **`graph`**: Per-project task arena with adjacency queries and
//!   topological order
//! - **`scheduler`**: Critical Path Method and batch recomputation
//! - **`conflicts`**: Crew and equipment conflict detection
//! - **`gantt`**: Chart payload assembly
//! - **`service`**: Entry points for an API layer
//! - **`store`**: Persistence contract and an in-memory implementation
//!
//! # Architecture
//!
//! The engine owns no persistence. Records are fetched up front through
//! [`store::ScheduleStore`], computation is in-memory, and computed fields
//! go back in one batched write per project.
//!
//! # References
//!
//! - Kelley & Walker (1959), "Critical-Path Planning and Scheduling"
//! - PMI (2017), "PMBOK Guide", 6.5.2.2 Critical Path Method

pub mod config;
pub mod conflicts;
pub mod error;
pub mod gantt;
pub mod graph;
pub mod models;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod validation;

pub use error::{Result, ScheduleError};
