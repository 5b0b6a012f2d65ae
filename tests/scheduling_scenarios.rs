//! End-to-end scheduling scenarios through the service facade.

use chrono::NaiveDate;
use site_schedule::config::SchedulerConfig;
use site_schedule::models::{
    Crew, DependencyType, Equipment, EquipmentAssignment, Task, TaskDependency, TaskStatus,
};
use site_schedule::service::SchedulingService;
use site_schedule::store::{MemoryStore, ScheduleStore};
use site_schedule::ScheduleError;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn jan(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

fn service_with(store: MemoryStore) -> SchedulingService<MemoryStore> {
    init_tracing();
    SchedulingService::new(store, SchedulerConfig::default().with_origin(jan(1))).unwrap()
}

/// Checks the date arithmetic every scheduled task must satisfy.
fn assert_cpm_invariants(store: &MemoryStore, project_id: &str) {
    for task in store.project_tasks(project_id).unwrap() {
        if task.status == TaskStatus::Canceled {
            continue;
        }
        let cpm = &task.cpm;
        let (es, ef, ls, lf) = (
            cpm.early_start.unwrap(),
            cpm.early_finish.unwrap(),
            cpm.late_start.unwrap(),
            cpm.late_finish.unwrap(),
        );
        let span = task.effective_duration() - 1;
        assert_eq!(cpm.float_days, (ls - es).num_days(), "float of {}", task.id);
        assert_eq!(cpm.is_critical_path, cpm.float_days <= 0, "criticality of {}", task.id);
        assert_eq!((ef - es).num_days(), span, "early span of {}", task.id);
        assert_eq!((lf - ls).num_days(), span, "late span of {}", task.id);
    }
}

#[test]
fn test_simple_chain() {
    let store = MemoryStore::new();
    store.add_project("P1", "ORG");
    store.add_task(Task::new("T1", "P1").with_duration(2));
    store.add_task(Task::new("T2", "P1").with_duration(3));
    store.add_task(Task::new("T3", "P1").with_duration(4));
    store.add_dependency("P1", TaskDependency::finish_to_start("T1", "T2"));
    store.add_dependency("P1", TaskDependency::finish_to_start("T2", "T3"));
    let svc = service_with(store);

    let critical = svc.calculate_critical_path("P1").unwrap();
    assert_eq!(critical, vec!["T1", "T2", "T3"]);

    for id in ["T1", "T2", "T3"] {
        let task = svc.store().task("P1", id).unwrap();
        assert_eq!(task.cpm.float_days, 0);
        assert_eq!(task.cpm.early_start, task.cpm.late_start);
    }
    assert_eq!(svc.store().task("P1", "T3").unwrap().cpm.early_finish, Some(jan(9)));
    assert_cpm_invariants(svc.store(), "P1");
}

#[test]
fn test_parallel_branches() {
    let store = MemoryStore::new();
    store.add_project("P1", "ORG");
    store.add_task(Task::new("X", "P1").with_duration(10));
    store.add_task(Task::new("Y", "P1").with_duration(3));
    store.add_task(Task::new("Z", "P1").with_duration(2));
    store.add_dependency("P1", TaskDependency::finish_to_start("X", "Z"));
    store.add_dependency("P1", TaskDependency::finish_to_start("Y", "Z"));
    let svc = service_with(store);

    let critical = svc.calculate_critical_path("P1").unwrap();
    assert!(critical.contains(&"X".to_string()));
    assert!(critical.contains(&"Z".to_string()));
    assert!(!critical.contains(&"Y".to_string()));

    let y = svc.store().task("P1", "Y").unwrap();
    assert_eq!(y.cpm.float_days, 7);
    assert_eq!(svc.store().task("P1", "X").unwrap().cpm.float_days, 0);
    assert_eq!(svc.store().task("P1", "Z").unwrap().cpm.early_start, Some(jan(11)));
    assert_cpm_invariants(svc.store(), "P1");
}

#[test]
fn test_crew_overlap() {
    let store = MemoryStore::new();
    store.add_project("P1", "ORG");
    store.add_crew(Crew::new("C1", "ORG").with_name("Framing crew"));
    store.add_task(Task::new("A", "P1").with_dates(jan(1), jan(5)).with_crew("C1"));
    store.add_task(Task::new("B", "P1").with_dates(jan(3), jan(10)).with_crew("C1"));
    let svc = service_with(store);

    let report = svc.detect_conflicts("ORG", None, None).unwrap();
    assert_eq!(report.crew_conflicts.len(), 1);
    let conflict = &report.crew_conflicts[0];
    assert_eq!(conflict.crew_id, "C1");
    assert_eq!(conflict.crew_name, "Framing crew");
    assert_eq!(conflict.overlap_start, jan(3));
    assert_eq!(conflict.overlap_end, jan(5));

    // Either side finds the same pair.
    assert_eq!(report.crew_conflicts_for("A"), report.crew_conflicts_for("B"));
    assert_eq!(report.crew_conflicts_for("A").len(), 1);
}

#[test]
fn test_crew_overlap_across_projects() {
    let store = MemoryStore::new();
    store.add_project("P1", "ORG");
    store.add_project("P2", "ORG");
    store.add_task(Task::new("A", "P1").with_dates(jan(1), jan(5)).with_crew("C1"));
    store.add_task(Task::new("B", "P2").with_dates(jan(5), jan(6)).with_crew("C1"));
    let svc = service_with(store);

    let report = svc.detect_conflicts("ORG", Some(jan(1)), Some(jan(31))).unwrap();
    assert_eq!(report.crew_conflicts.len(), 1);
    assert_eq!(report.crew_conflicts[0].task_a.project_id, "P1");
    assert_eq!(report.crew_conflicts[0].task_b.project_id, "P2");
    assert_eq!(report.crew_conflicts[0].overlap_days, 1);
}

#[test]
fn test_equipment_double_booking() {
    let store = MemoryStore::new();
    store.add_project("P1", "ORG");
    store.add_project("P2", "ORG");
    store.add_equipment(Equipment::new("E1", "ORG").with_name("Excavator").in_use_on("P1"));
    store.add_equipment_assignment(EquipmentAssignment::new("E1", "P2"));
    let svc = service_with(store);

    let report = svc.detect_conflicts("ORG", None, None).unwrap();
    assert_eq!(report.equipment_conflicts.len(), 1);
    assert_eq!(report.equipment_conflicts[0].equipment_name, "Excavator");
    assert_eq!(report.equipment_conflicts[0].project_ids, vec!["P1", "P2"]);
    assert!(report.crew_conflicts.is_empty());
}

#[test]
fn test_equipment_rows_sharing_an_id() {
    let store = MemoryStore::new();
    store.add_project("P1", "ORG");
    store.add_project("P2", "ORG");
    store.add_equipment(Equipment::new("E1", "ORG").with_name("Crane").in_use_on("P1"));
    store.add_equipment(Equipment::new("E1", "ORG").with_name("Crane").in_use_on("P2"));
    let svc = service_with(store);

    let report = svc.detect_conflicts("ORG", None, None).unwrap();
    assert_eq!(report.equipment_conflicts.len(), 1);
    assert_eq!(report.equipment_conflicts[0].equipment_id, "E1");
    assert_eq!(report.equipment_conflicts[0].project_ids, vec!["P1", "P2"]);
}

#[test]
fn test_empty_project() {
    let store = MemoryStore::new();
    store.add_project("EMPTY", "ORG");
    let svc = service_with(store);

    assert!(svc.calculate_critical_path("EMPTY").unwrap().is_empty());

    let payload = svc.get_gantt_data("EMPTY").unwrap();
    assert!(payload.tasks.is_empty());
    assert!(payload.milestones.is_empty());
    assert!(payload.dependencies.is_empty());
    assert_eq!(payload.summary.total_tasks, 0);
    assert_eq!(payload.summary.completed, 0);
    assert_eq!(payload.summary.average_completion, 0.0);
    assert_eq!(payload.summary.total_estimated_hours, 0.0);
    assert_eq!(svc.store().cpm_write_count(), 0);
}

#[test]
fn test_idempotent_recompute() {
    let store = MemoryStore::new();
    store.add_project("P1", "ORG");
    store.add_task(Task::new("A", "P1").with_duration(4));
    store.add_task(Task::new("B", "P1").with_duration(2));
    store.add_task(Task::new("C", "P1").with_duration(3));
    store.add_dependency(
        "P1",
        TaskDependency::new("ab", "A", "B")
            .with_type(DependencyType::StartToStart)
            .with_lag(1),
    );
    store.add_dependency(
        "P1",
        TaskDependency::new("bc", "B", "C")
            .with_type(DependencyType::FinishToFinish)
            .with_lag(-1),
    );
    let svc = service_with(store);

    let first = svc.calculate_critical_path("P1").unwrap();
    let snapshot: Vec<_> = svc
        .store()
        .project_tasks("P1")
        .unwrap()
        .into_iter()
        .map(|t| t.cpm)
        .collect();

    let second = svc.calculate_critical_path("P1").unwrap();
    let again: Vec<_> = svc
        .store()
        .project_tasks("P1")
        .unwrap()
        .into_iter()
        .map(|t| t.cpm)
        .collect();

    assert_eq!(first, second);
    assert_eq!(snapshot, again);
    assert_cpm_invariants(svc.store(), "P1");
}

#[test]
fn test_malformed_edges_do_not_fail() {
    let store = MemoryStore::new();
    store.add_project("P1", "ORG");
    store.add_task(Task::new("A", "P1").with_duration(0));
    store.add_task(Task::new("B", "P1").with_duration(2));
    store.add_dependency("P1", TaskDependency::finish_to_start("A", "B"));
    store.add_dependency("P1", TaskDependency::finish_to_start("A", "GHOST"));
    store.add_dependency("P1", TaskDependency::finish_to_start("B", "B"));
    let svc = service_with(store);

    assert_eq!(svc.calculate_critical_path("P1").unwrap(), vec!["A", "B"]);
    let a = svc.store().task("P1", "A").unwrap();
    assert_eq!(a.cpm.early_start, a.cpm.early_finish);
    assert_cpm_invariants(svc.store(), "P1");
}

#[test]
fn test_cycle_reported_and_batch_continues() {
    let store = MemoryStore::new();
    store.add_project("LOOP", "ORG");
    store.add_task(Task::new("A", "LOOP"));
    store.add_task(Task::new("B", "LOOP"));
    store.add_dependency("LOOP", TaskDependency::finish_to_start("A", "B"));
    store.add_dependency("LOOP", TaskDependency::finish_to_start("B", "A"));
    store.add_project("OK", "ORG");
    store.add_task(Task::new("A", "OK").with_duration(3));
    let svc = service_with(store);

    let err = svc.calculate_critical_path("LOOP").unwrap_err();
    assert!(matches!(err, ScheduleError::CyclicDependency { .. }));

    let report = svc.recalculate_all().unwrap();
    assert_eq!(report.succeeded, vec!["OK"]);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.failed[0].project_id, "LOOP");
    assert!(svc.store().task("OK", "A").unwrap().cpm.is_computed());
}

#[test]
fn test_status_change_reschedules() {
    let store = MemoryStore::new();
    store.add_project("P1", "ORG");
    store.add_task(Task::new("A", "P1").with_duration(2));
    store.add_task(Task::new("B", "P1").with_duration(5));
    store.add_task(Task::new("C", "P1").with_duration(1));
    store.add_dependency("P1", TaskDependency::finish_to_start("A", "C"));
    store.add_dependency("P1", TaskDependency::finish_to_start("B", "C"));
    let svc = service_with(store);

    assert_eq!(svc.calculate_critical_path("P1").unwrap(), vec!["B", "C"]);

    // Canceling B leaves A driving C.
    let critical = svc
        .update_task_progress("P1", "B", None, Some(TaskStatus::Canceled))
        .unwrap();
    assert_eq!(critical, vec!["A", "C"]);
    assert_cpm_invariants(svc.store(), "P1");
}

#[test]
fn test_gantt_payload_end_to_end() {
    let store = MemoryStore::new();
    store.add_project("P1", "ORG");
    store.add_crew(Crew::new("C1", "ORG").with_name("Steel").with_trade("ironwork"));
    store.add_task(
        Task::new("A", "P1")
            .with_name("Erect columns")
            .with_dates(jan(1), jan(2))
            .with_crew("C1")
            .with_hours(Some(20.0), None),
    );
    store.add_task(Task::milestone("M", "P1").with_name("Topped out"));
    store.add_dependency("P1", TaskDependency::finish_to_start("A", "M"));
    let svc = service_with(store);

    let payload = svc.get_gantt_data("P1").unwrap();
    assert_eq!(payload.tasks.len(), 1);
    assert_eq!(payload.milestones.len(), 1);
    assert_eq!(payload.milestones[0].early_start, Some(jan(3)));
    assert_eq!(payload.crew_hours("C1", jan(1)), 10.0);
    assert_eq!(payload.crew_hours("C1", jan(2)), 10.0);
    assert_eq!(payload.critical_path, vec!["A", "M"]);
    assert_eq!(payload.project_end, Some(jan(3)));

    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["tasks"][0]["crew"]["trade"], "ironwork");
}
