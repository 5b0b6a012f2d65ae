//! Scheduling domain models.
//!
//! Core data types for construction project scheduling. Every relationship
//! (`parent_id`, `predecessor_id`, `successor_id`, `assigned_crew`,
//! `current_project`) is an identifier into an id-keyed collection, never
//! a direct reference.
//!
//! # Domain Mappings
//!
//! | Type | Site meaning |
//! |------|--------------|
//! | Task | Work package or milestone on the programme |
//! | TaskDependency | Precedence link (FS/SS/FF/SF + lag) |
//! | Crew | Trade crew assigned to tasks |
//! | Equipment | Plant checked out to a project |
//! | CpmFields | Early/late dates and float written back by CPM |

mod calendar;
mod dependency;
mod resource;
mod schedule;
mod task;

pub use calendar::{DateRange, DateWindow};
pub(crate) use calendar::add_days;
pub use dependency::{DependencyType, TaskDependency};
pub use resource::{Crew, Equipment, EquipmentAssignment, EquipmentStatus};
pub use schedule::{CpmFields, CpmUpdate};
pub use task::{Task, TaskStatus, TaskType};
