//! Record-store contracts.
//!
//! The engine never owns persistence. It reads task graphs, crew work and
//! equipment through [`ScheduleStore`] and writes computed CPM fields back
//! in one batched call per project. Every method takes the organization or
//! project identifier explicitly; there is no ambient tenant.
//!
//! [`MemoryStore`] is a thread-safe in-memory implementation used by tests
//! and by callers that fetch records up front.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Result, ScheduleError};
use crate::models::{
    CpmUpdate, Crew, DateRange, Equipment, EquipmentAssignment, Task, TaskDependency, TaskStatus,
};

/// Queries and writes the scheduling core needs from persistence.
pub trait ScheduleStore: Send + Sync {
    /// All non-deleted tasks of a project (canceled included).
    fn project_tasks(&self, project_id: &str) -> Result<Vec<Task>>;

    /// Organization owning a project.
    fn project_organization(&self, project_id: &str) -> Result<String>;

    /// Dependency edges touching the project's tasks.
    ///
    /// May contain edges whose other endpoint lives elsewhere; the graph
    /// loader drops those.
    fn project_dependencies(&self, project_id: &str) -> Result<Vec<TaskDependency>>;

    /// Active, crew-assigned tasks across every project of an organization.
    ///
    /// Implementations may pre-filter by `range`; callers filter again.
    fn crew_tasks(&self, organization_id: &str, range: &DateRange) -> Result<Vec<Task>>;

    /// Crews of an organization.
    fn crews(&self, organization_id: &str) -> Result<Vec<Crew>>;

    /// Equipment records currently `in_use`.
    fn equipment_in_use(&self, organization_id: &str) -> Result<Vec<Equipment>>;

    /// Equipment-to-project association records.
    fn equipment_assignments(
        &self,
        organization_id: &str,
        range: &DateRange,
    ) -> Result<Vec<EquipmentAssignment>>;

    /// Writes CPM fields for a project in a single batch.
    fn write_cpm_fields(&self, project_id: &str, updates: &[CpmUpdate]) -> Result<()>;

    /// Records a progress update on a task.
    fn update_task_progress(
        &self,
        project_id: &str,
        task_id: &str,
        completion_percentage: Option<u8>,
        status: Option<TaskStatus>,
    ) -> Result<()>;

    /// Projects the periodic recompute should visit.
    fn active_projects(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Default)]
struct ProjectRecord {
    organization_id: String,
    tasks: Vec<Task>,
    dependencies: Vec<TaskDependency>,
    archived: bool,
}

#[derive(Debug, Default)]
struct Records {
    projects: BTreeMap<String, ProjectRecord>,
    crews: Vec<Crew>,
    equipment: Vec<Equipment>,
    assignments: Vec<EquipmentAssignment>,
    cpm_writes: usize,
}

/// In-memory record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an (initially empty) project.
    pub fn add_project(&self, project_id: impl Into<String>, organization_id: impl Into<String>) {
        if let Ok(mut records) = self.records.write() {
            records.projects.insert(
                project_id.into(),
                ProjectRecord {
                    organization_id: organization_id.into(),
                    ..ProjectRecord::default()
                },
            );
        }
    }

    /// Marks a project as archived; it drops out of [`ScheduleStore::active_projects`].
    pub fn archive_project(&self, project_id: &str) {
        if let Ok(mut records) = self.records.write() {
            if let Some(project) = records.projects.get_mut(project_id) {
                project.archived = true;
            }
        }
    }

    /// Adds a task to its project. Unknown projects are ignored.
    pub fn add_task(&self, task: Task) {
        if let Ok(mut records) = self.records.write() {
            if let Some(project) = records.projects.get_mut(&task.project_id) {
                project.tasks.push(task);
            }
        }
    }

    /// Adds a dependency to a project.
    pub fn add_dependency(&self, project_id: &str, dependency: TaskDependency) {
        if let Ok(mut records) = self.records.write() {
            if let Some(project) = records.projects.get_mut(project_id) {
                project.dependencies.push(dependency);
            }
        }
    }

    pub fn add_crew(&self, crew: Crew) {
        if let Ok(mut records) = self.records.write() {
            records.crews.push(crew);
        }
    }

    pub fn add_equipment(&self, equipment: Equipment) {
        if let Ok(mut records) = self.records.write() {
            records.equipment.push(equipment);
        }
    }

    pub fn add_equipment_assignment(&self, assignment: EquipmentAssignment) {
        if let Ok(mut records) = self.records.write() {
            records.assignments.push(assignment);
        }
    }

    /// Looks up a stored task.
    pub fn task(&self, project_id: &str, task_id: &str) -> Option<Task> {
        let records = self.records.read().ok()?;
        records
            .projects
            .get(project_id)?
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
    }

    /// Number of batched CPM writes received so far.
    pub fn cpm_write_count(&self) -> usize {
        self.records.read().map(|r| r.cpm_writes).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Records>> {
        self.records
            .read()
            .map_err(|_| ScheduleError::store("record lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Records>> {
        self.records
            .write()
            .map_err(|_| ScheduleError::store("record lock poisoned"))
    }

    fn project_ids_of(records: &Records, organization_id: &str) -> Vec<String> {
        records
            .projects
            .iter()
            .filter(|(_, p)| p.organization_id == organization_id)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl ScheduleStore for MemoryStore {
    fn project_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        let records = self.read()?;
        records
            .projects
            .get(project_id)
            .map(|p| p.tasks.clone())
            .ok_or_else(|| ScheduleError::ProjectNotFound(project_id.to_string()))
    }

    fn project_organization(&self, project_id: &str) -> Result<String> {
        let records = self.read()?;
        records
            .projects
            .get(project_id)
            .map(|p| p.organization_id.clone())
            .ok_or_else(|| ScheduleError::ProjectNotFound(project_id.to_string()))
    }

    fn project_dependencies(&self, project_id: &str) -> Result<Vec<TaskDependency>> {
        let records = self.read()?;
        records
            .projects
            .get(project_id)
            .map(|p| p.dependencies.clone())
            .ok_or_else(|| ScheduleError::ProjectNotFound(project_id.to_string()))
    }

    fn crew_tasks(&self, organization_id: &str, range: &DateRange) -> Result<Vec<Task>> {
        let records = self.read()?;
        let tasks = Self::project_ids_of(&records, organization_id)
            .iter()
            .filter_map(|id| records.projects.get(id))
            .flat_map(|p| p.tasks.iter())
            .filter(|t| t.is_active() && t.assigned_crew.is_some())
            .filter(|t| range.admits_bounds(t.start_date, t.end_date))
            .cloned()
            .collect();
        Ok(tasks)
    }

    fn crews(&self, organization_id: &str) -> Result<Vec<Crew>> {
        let records = self.read()?;
        Ok(records
            .crews
            .iter()
            .filter(|c| c.organization_id == organization_id)
            .cloned()
            .collect())
    }

    fn equipment_in_use(&self, organization_id: &str) -> Result<Vec<Equipment>> {
        let records = self.read()?;
        Ok(records
            .equipment
            .iter()
            .filter(|e| e.organization_id == organization_id && e.is_in_use())
            .cloned()
            .collect())
    }

    fn equipment_assignments(
        &self,
        organization_id: &str,
        range: &DateRange,
    ) -> Result<Vec<EquipmentAssignment>> {
        let records = self.read()?;
        let owned: Vec<&str> = records
            .equipment
            .iter()
            .filter(|e| e.organization_id == organization_id)
            .map(|e| e.id.as_str())
            .collect();
        Ok(records
            .assignments
            .iter()
            .filter(|a| owned.contains(&a.equipment_id.as_str()))
            .filter(|a| range.admits_bounds(a.start_date, a.end_date))
            .cloned()
            .collect())
    }

    fn write_cpm_fields(&self, project_id: &str, updates: &[CpmUpdate]) -> Result<()> {
        let mut records = self.write()?;
        let project = records
            .projects
            .get_mut(project_id)
            .ok_or_else(|| ScheduleError::ProjectNotFound(project_id.to_string()))?;
        for update in updates {
            if let Some(task) = project.tasks.iter_mut().find(|t| t.id == update.task_id) {
                task.cpm = update.fields.clone();
            }
        }
        records.cpm_writes += 1;
        Ok(())
    }

    fn update_task_progress(
        &self,
        project_id: &str,
        task_id: &str,
        completion_percentage: Option<u8>,
        status: Option<TaskStatus>,
    ) -> Result<()> {
        let mut records = self.write()?;
        let project = records
            .projects
            .get_mut(project_id)
            .ok_or_else(|| ScheduleError::ProjectNotFound(project_id.to_string()))?;
        let task = project
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| ScheduleError::TaskNotFound {
                project_id: project_id.to_string(),
                task_id: task_id.to_string(),
            })?;
        if let Some(pct) = completion_percentage {
            task.completion_percentage = pct.min(100);
        }
        if let Some(status) = status {
            task.status = status;
        }
        Ok(())
    }

    fn active_projects(&self) -> Result<Vec<String>> {
        let records = self.read()?;
        Ok(records
            .projects
            .iter()
            .filter(|(_, p)| !p.archived)
            .map(|(id, _)| id.clone())
            .collect())
    }
}
