//! Dependency (precedence) model.
//!
//! A dependency links a predecessor task to a successor task within one
//! project. The four relationship types and a signed lag follow standard
//! precedence diagramming.
//!
//! # Reference
//! PMI (2017), "PMBOK Guide", 6.3.2 Precedence Diagramming Method

use serde::{Deserialize, Serialize};

/// Temporal relationship between two tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    /// Successor starts after the predecessor finishes.
    #[default]
    FinishToStart,
    /// Successor starts when the predecessor starts.
    StartToStart,
    /// Successor finishes when the predecessor finishes.
    FinishToFinish,
    /// Successor finishes when the predecessor starts.
    StartToFinish,
}

impl DependencyType {
    /// Short code (FS, SS, FF, SF).
    pub fn code(self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "FS",
            DependencyType::StartToStart => "SS",
            DependencyType::FinishToFinish => "FF",
            DependencyType::StartToFinish => "SF",
        }
    }
}

/// A precedence edge between two tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDependency {
    /// Edge identifier.
    pub id: String,
    pub predecessor_id: String,
    pub successor_id: String,
    pub dependency_type: DependencyType,
    /// Signed day offset. Negative values are lead time.
    pub lag_days: i64,
}

impl TaskDependency {
    /// Creates a finish-to-start edge with no lag.
    pub fn new(
        id: impl Into<String>,
        predecessor_id: impl Into<String>,
        successor_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            predecessor_id: predecessor_id.into(),
            successor_id: successor_id.into(),
            dependency_type: DependencyType::FinishToStart,
            lag_days: 0,
        }
    }

    /// Creates a finish-to-start edge with an id derived from its endpoints.
    pub fn finish_to_start(predecessor_id: &str, successor_id: &str) -> Self {
        Self::new(
            format!("{predecessor_id}->{successor_id}"),
            predecessor_id,
            successor_id,
        )
    }

    pub fn with_type(mut self, dependency_type: DependencyType) -> Self {
        self.dependency_type = dependency_type;
        self
    }

    pub fn with_lag(mut self, lag_days: i64) -> Self {
        self.lag_days = lag_days;
        self
    }

    /// Whether the edge points back at its own predecessor.
    #[inline]
    pub fn is_self_reference(&self) -> bool {
        self.predecessor_id == self.successor_id
    }
}
