//! Resource conflict detection.
//!
//! Two independent checks across every project of an organization:
//!
//! - **Crew double-booking**: two active tasks assigned to the same crew
//!   whose inclusive `[start_date, end_date]` windows share a day.
//! - **Equipment double-booking**: an `in_use` unit associated with more
//!   than one project in the scan.
//!
//! Completed and canceled tasks never conflict. Detection is read-only.
//!
//! # Complexity
//! Crew check: O(n log n + k) per crew after sorting by start date, where
//! k is the number of reported pairs.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{Crew, DateRange, DateWindow, Equipment, EquipmentAssignment, Task};
use crate::store::ScheduleStore;

/// Conflict classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    CrewDoubleBooking,
    EquipmentDoubleBooking,
}

/// Identity of a task involved in a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl TaskSummary {
    fn new(task: &Task, window: DateWindow) -> Self {
        Self {
            id: task.id.clone(),
            name: task.name.clone(),
            project_id: task.project_id.clone(),
            start_date: window.start,
            end_date: window.end,
        }
    }
}

/// Two tasks booking the same crew on overlapping days.
///
/// `task_a.id < task_b.id`; each pair is reported once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewConflict {
    pub crew_id: String,
    pub crew_name: String,
    pub conflict_type: ConflictType,
    pub overlap_start: NaiveDate,
    pub overlap_end: NaiveDate,
    pub overlap_days: i64,
    pub task_a: TaskSummary,
    pub task_b: TaskSummary,
}

impl CrewConflict {
    /// Whether the task is either side of the pair.
    pub fn involves(&self, task_id: &str) -> bool {
        self.task_a.id == task_id || self.task_b.id == task_id
    }

    /// The other side of the pair, if `task_id` is involved.
    pub fn counterpart(&self, task_id: &str) -> Option<&TaskSummary> {
        if self.task_a.id == task_id {
            Some(&self.task_b)
        } else if self.task_b.id == task_id {
            Some(&self.task_a)
        } else {
            None
        }
    }
}

/// An in-use unit associated with several projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentConflict {
    pub equipment_id: String,
    pub equipment_name: String,
    pub conflict_type: ConflictType,
    /// Involved projects, sorted.
    pub project_ids: Vec<String>,
}

/// Every conflict found for an organization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub organization_id: String,
    pub crew_conflicts: Vec<CrewConflict>,
    pub equipment_conflicts: Vec<EquipmentConflict>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.crew_conflicts.is_empty() && self.equipment_conflicts.is_empty()
    }

    pub fn total(&self) -> usize {
        self.crew_conflicts.len() + self.equipment_conflicts.len()
    }

    /// Crew conflicts involving a task, from either side of the pair.
    pub fn crew_conflicts_for(&self, task_id: &str) -> Vec<&CrewConflict> {
        self.crew_conflicts
            .iter()
            .filter(|c| c.involves(task_id))
            .collect()
    }

    /// Equipment conflicts naming a project.
    pub fn equipment_conflicts_for_project(&self, project_id: &str) -> Vec<&EquipmentConflict> {
        self.equipment_conflicts
            .iter()
            .filter(|c| c.project_ids.iter().any(|p| p == project_id))
            .collect()
    }
}

/// Crew and equipment conflict scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector;

impl ConflictDetector {
    pub fn new() -> Self {
        Self
    }

    /// Fetches an organization's crew work and equipment and scans both.
    pub fn detect_all_conflicts(
        &self,
        store: &dyn ScheduleStore,
        organization_id: &str,
        range: DateRange,
    ) -> Result<ConflictReport> {
        let tasks = store.crew_tasks(organization_id, &range)?;
        let crews = store.crews(organization_id)?;
        let equipment = store.equipment_in_use(organization_id)?;
        let assignments = store.equipment_assignments(organization_id, &range)?;

        let report = ConflictReport {
            organization_id: organization_id.to_string(),
            crew_conflicts: self.detect_crew_conflicts(&tasks, &crews, range),
            equipment_conflicts: self.detect_equipment_conflicts(&equipment, &assignments, range),
        };

        info!(
            organization_id = %organization_id,
            crew = report.crew_conflicts.len(),
            equipment = report.equipment_conflicts.len(),
            "conflict scan finished"
        );
        Ok(report)
    }

    /// Pairwise overlap check per crew.
    pub fn detect_crew_conflicts(
        &self,
        tasks: &[Task],
        crews: &[Crew],
        range: DateRange,
    ) -> Vec<CrewConflict> {
        let crew_names: HashMap<&str, &str> = crews
            .iter()
            .map(|c| (c.id.as_str(), c.name.as_str()))
            .collect();

        let mut by_crew: BTreeMap<&str, Vec<(&Task, DateWindow)>> = BTreeMap::new();
        for task in tasks.iter().filter(|t| t.is_active()) {
            let (Some(crew_id), Some(window)) = (task.assigned_crew.as_deref(), task.window())
            else {
                continue;
            };
            if !range.admits(&window) {
                continue;
            }
            by_crew.entry(crew_id).or_default().push((task, window));
        }

        let mut conflicts = Vec::new();
        for (crew_id, mut booked) in by_crew {
            booked.sort_by(|(a, wa), (b, wb)| wa.start.cmp(&wb.start).then_with(|| a.id.cmp(&b.id)));
            booked.dedup_by(|(a, _), (b, _)| a.id == b.id);

            let crew_name = crew_names.get(crew_id).copied().unwrap_or_else(|| {
                debug!(crew_id = %crew_id, "crew record missing, using id as name");
                crew_id
            });

            for (i, &(first, first_window)) in booked.iter().enumerate() {
                for &(second, second_window) in &booked[i + 1..] {
                    // Sorted by start: nothing later can overlap `first`.
                    if second_window.start > first_window.end {
                        break;
                    }
                    let Some(overlap) = first_window.intersection(&second_window) else {
                        continue;
                    };
                    let (a, b) = if first.id <= second.id {
                        (TaskSummary::new(first, first_window), TaskSummary::new(second, second_window))
                    } else {
                        (TaskSummary::new(second, second_window), TaskSummary::new(first, first_window))
                    };
                    conflicts.push(CrewConflict {
                        crew_id: crew_id.to_string(),
                        crew_name: crew_name.to_string(),
                        conflict_type: ConflictType::CrewDoubleBooking,
                        overlap_start: overlap.start,
                        overlap_end: overlap.end,
                        overlap_days: overlap.days(),
                        task_a: a,
                        task_b: b,
                    });
                }
            }
        }

        conflicts.sort_by(|x, y| {
            x.overlap_start
                .cmp(&y.overlap_start)
                .then_with(|| x.crew_id.cmp(&y.crew_id))
                .then_with(|| x.task_a.id.cmp(&y.task_a.id))
                .then_with(|| x.task_b.id.cmp(&y.task_b.id))
        });
        conflicts
    }

    /// Reports in-use units tied to more than one project.
    ///
    /// Units are identified by id: every in-use record of a unit
    /// contributes its `current_project`, and every assignment admitted by
    /// `range` contributes its project. The name comes from the first record.
    pub fn detect_equipment_conflicts(
        &self,
        equipment: &[Equipment],
        assignments: &[EquipmentAssignment],
        range: DateRange,
    ) -> Vec<EquipmentConflict> {
        let mut units: BTreeMap<&str, (&str, BTreeSet<&str>)> = BTreeMap::new();
        for record in equipment.iter().filter(|e| e.is_in_use()) {
            let (_, projects) = units
                .entry(record.id.as_str())
                .or_insert_with(|| (record.name.as_str(), BTreeSet::new()));
            projects.extend(record.current_project.as_deref());
        }

        for assignment in assignments
            .iter()
            .filter(|a| range.admits_bounds(a.start_date, a.end_date))
        {
            if let Some((_, projects)) = units.get_mut(assignment.equipment_id.as_str()) {
                projects.insert(assignment.project_id.as_str());
            }
        }

        units
            .into_iter()
            .filter(|(_, (_, projects))| projects.len() > 1)
            .map(|(id, (name, projects))| EquipmentConflict {
                equipment_id: id.to_string(),
                equipment_name: name.to_string(),
                conflict_type: ConflictType::EquipmentDoubleBooking,
                project_ids: projects.into_iter().map(str::to_string).collect(),
            })
            .collect()
    }
}
