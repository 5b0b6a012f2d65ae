//! Shared site resources: crews and equipment.
//!
//! Crews are assigned to tasks and conflict through overlapping task
//! windows. Equipment is checked out to projects and conflicts when more
//! than one project holds the same unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A work crew.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crew {
    /// Unique crew identifier.
    pub id: String,
    pub organization_id: String,
    /// Human-readable name.
    pub name: String,
    /// Trade (e.g., "concrete", "electrical").
    pub trade: String,
    pub is_active: bool,
}

impl Crew {
    /// Creates an active crew.
    pub fn new(id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            organization_id: organization_id.into(),
            name: String::new(),
            trade: String::new(),
            is_active: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_trade(mut self, trade: impl Into<String>) -> Self {
        self.trade = trade.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Lifecycle state of an equipment unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    #[default]
    Available,
    InUse,
    Maintenance,
    Retired,
}

/// A piece of equipment (excavator, crane, lift).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    /// Unique equipment identifier.
    pub id: String,
    pub organization_id: String,
    /// Human-readable name.
    pub name: String,
    pub status: EquipmentStatus,
    /// Project currently holding the unit.
    pub current_project: Option<String>,
}

impl Equipment {
    /// Creates an available unit.
    pub fn new(id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            organization_id: organization_id.into(),
            name: String::new(),
            status: EquipmentStatus::Available,
            current_project: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks the unit as in use on a project.
    pub fn in_use_on(mut self, project_id: impl Into<String>) -> Self {
        self.status = EquipmentStatus::InUse;
        self.current_project = Some(project_id.into());
        self
    }

    pub fn with_status(mut self, status: EquipmentStatus) -> Self {
        self.status = status;
        self
    }

    #[inline]
    pub fn is_in_use(&self) -> bool {
        self.status == EquipmentStatus::InUse
    }
}

/// A record associating equipment with a project over an optional window.
///
/// Produced by field operations (delivery tickets, daily logs). A unit in
/// use should have assignments for at most one project at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentAssignment {
    pub equipment_id: String,
    pub project_id: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl EquipmentAssignment {
    /// Creates an open-ended assignment.
    pub fn new(equipment_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            equipment_id: equipment_id.into(),
            project_id: project_id.into(),
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_window(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }
}
