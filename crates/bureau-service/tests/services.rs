//! End-to-end behaviour of the entity services over an in-memory store.

use std::sync::Arc;

use bureau_core::{
  Error, PermissionRecord, SubjectId,
  model::{Module, Organization, ProjectStatus, TaskStatus},
  reference::{Subject, TaskType},
};
use bureau_service::{
  Bureau, DocumentService, Flags, ServiceConfig,
  employee::{EmployeePayload, EmployeeView},
  project::ProjectPayload,
  task::{TaskPayload, TaskView},
};
use bureau_store_sqlite::SqliteStore;
use chrono::{Months, NaiveDate};
use uuid::Uuid;

struct Fixture {
  bureau:    Bureau<SqliteStore>,
  u:         Subject,
  v:         Subject,
  task_type: TaskType,
  project:   Uuid,
}

async fn fixture() -> Fixture {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let config = ServiceConfig { page_concurrency: 2, default_page_size: 3, ..Default::default() };
  let bureau = Bureau::new(Arc::new(store), config);

  let u = bureau.store().add_subject("u", "Ursula Underhill").await.unwrap();
  let v = bureau.store().add_subject("v", "Victor Vance").await.unwrap();
  let task_type = bureau.store().add_task_type("feature", "Feature").await.unwrap();
  let project = bureau.projects.create(project_payload("Atlas", None), u.id).await.unwrap().id;

  Fixture { bureau, u, v, task_type, project }
}

fn project_payload(name: &str, manager: Option<SubjectId>) -> ProjectPayload {
  ProjectPayload {
    name: name.into(),
    status: ProjectStatus::Active,
    finish_date: None,
    manager,
    labels: None,
  }
}

fn task_payload(f: &Fixture, title: &str, labels: Option<Vec<Uuid>>) -> TaskPayload {
  TaskPayload {
    title:                title.into(),
    body:                 None,
    assignee:             f.u.id,
    status:               TaskStatus::Draft,
    priority:             0,
    start_date:           None,
    target_date:          None,
    project:              f.project,
    task_type:            f.task_type.id,
    parent:               None,
    cancellation_comment: None,
    labels,
  }
}

fn employee_payload(user: SubjectId, identifier: &str, name: &str) -> EmployeePayload {
  EmployeePayload {
    user,
    identifier: identifier.into(),
    name: name.into(),
    phone: None,
    birth_date: None,
    rank: 0,
    organization: None,
    department: None,
    position: None,
  }
}

fn label_ids(view: &TaskView) -> Vec<Uuid> { view.labels.iter().map(|l| l.id).collect() }

fn date(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

// ─── Task lifecycle ──────────────────────────────────────────────────────────

#[tokio::test]
async fn task_lifecycle_scenario() {
  let f = fixture().await;
  let store = f.bureau.store();
  let l1 = store.add_label("l1", None).await.unwrap();
  let l2 = store.add_label("l2", Some("green".into())).await.unwrap();
  let l3 = store.add_label("l3", None).await.unwrap();

  let mut payload = task_payload(&f, "Design draft", Some(vec![l1.id, l2.id]));
  payload.target_date = Some(date(2025, 1, 10));
  let created = f.bureau.tasks.create(payload, f.u.id).await.unwrap();

  let got = f.bureau.tasks.get(created.id, f.u.id).await.unwrap();
  assert_eq!(got.title, "Design draft");
  assert_eq!(got.target_date, Some(date(2025, 1, 10)));
  assert_eq!(label_ids(&got), vec![l1.id, l2.id]);
  assert_eq!(got.project.name, "Atlas");
  assert_eq!(got.task_type, f.task_type);
  assert_eq!(got.assignee.as_ref().map(|s| s.login.as_str()), Some("u"));
  assert_eq!(got.audit.author_name.as_deref(), Some("Ursula Underhill"));
  assert!(got.readers.iter().any(|r| r.subject == f.u.id && r.can_edit));

  let err = f.bureau.tasks.get(created.id, f.v.id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(id) if id == created.id));

  let replaced = f
    .bureau
    .tasks
    .replace(created.id, task_payload(&f, "Design draft", Some(vec![l3.id])), f.u.id)
    .await
    .unwrap();
  assert_eq!(replaced.reg_number, created.reg_number);

  let got = f.bureau.tasks.get(created.id, f.u.id).await.unwrap();
  assert_eq!(label_ids(&got), vec![l3.id]);
}

#[tokio::test]
async fn replace_without_labels_keeps_them() {
  let f = fixture().await;
  let l1 = f.bureau.store().add_label("l1", None).await.unwrap();

  let created = f.bureau.tasks.create(task_payload(&f, "a", Some(vec![l1.id])), f.u.id).await.unwrap();
  let replaced = f.bureau.tasks.replace(created.id, task_payload(&f, "b", None), f.u.id).await.unwrap();

  assert_eq!(replaced.title, "b");
  assert_eq!(label_ids(&replaced), vec![l1.id]);
}

#[tokio::test]
async fn start_date_defaults_and_template_targets_next_month() {
  let f = fixture().await;
  let template = f.bureau.tasks.template();
  assert_eq!(template.status, TaskStatus::Draft);
  assert_eq!(template.target_date, template.start_date.checked_add_months(Months::new(1)));

  let created = f.bureau.tasks.create(task_payload(&f, "t", None), f.u.id).await.unwrap();
  assert_eq!(created.start_date, template.start_date);
  assert_eq!(created.reg_number.len(), 6);
}

// ─── Visibility & permissions ────────────────────────────────────────────────

#[tokio::test]
async fn visibility_follows_the_read_flag() {
  let f = fixture().await;
  let id = f.bureau.projects.create(project_payload("Hidden", None), f.u.id).await.unwrap().id;

  let edit_only = Flags { read: false, edit: true, delete: false };
  f.bureau.projects.share(id, f.v.id, edit_only, f.u.id).await.unwrap();
  assert!(matches!(f.bureau.projects.get(id, f.v.id).await, Err(Error::NotFound(_))));

  f.bureau.projects.share(id, f.v.id, Flags::READ, f.u.id).await.unwrap();
  let seen = f.bureau.projects.get(id, f.v.id).await.unwrap();
  assert_eq!(seen.name, "Hidden");
}

#[tokio::test]
async fn creator_holds_every_capability() {
  let f = fixture().await;
  let view = f.bureau.projects.create(project_payload("Mine", None), f.u.id).await.unwrap();

  let readers = f.bureau.projects.readers(view.id, f.u.id).await.unwrap();
  assert_eq!(readers, vec![PermissionRecord::owner(f.u.id, view.id)]);
  assert!(f.bureau.projects.get(view.id, f.u.id).await.is_ok());
}

#[tokio::test]
async fn replace_without_edit_is_denied_and_changes_nothing() {
  let f = fixture().await;
  let created = f.bureau.tasks.create(task_payload(&f, "Original", None), f.u.id).await.unwrap();
  f.bureau.tasks.share(created.id, f.v.id, Flags::READ, f.u.id).await.unwrap();

  let err = f
    .bureau
    .tasks
    .replace(created.id, task_payload(&f, "Hijacked", None), f.v.id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PermissionDenied { subject, .. } if subject == f.v.id));

  let got = f.bureau.tasks.get(created.id, f.u.id).await.unwrap();
  assert_eq!(got.title, "Original");
  assert_eq!(got.audit.last_modifier, f.u.id);
}

#[tokio::test]
async fn sharing_requires_edit_and_readers_require_read() {
  let f = fixture().await;
  let id = f.project;

  assert!(matches!(f.bureau.projects.readers(id, f.v.id).await, Err(Error::NotFound(_))));
  assert!(matches!(
    f.bureau.projects.share(id, f.v.id, Flags::FULL, f.v.id).await,
    Err(Error::PermissionDenied { .. })
  ));

  f.bureau.projects.share(id, f.v.id, Flags::READ, f.u.id).await.unwrap();
  let readers = f.bureau.projects.readers(id, f.v.id).await.unwrap();
  assert_eq!(readers.len(), 2);
  assert_eq!(readers[1], PermissionRecord::reader(f.v.id, id));
}

#[tokio::test]
async fn delete_requires_capability() {
  let f = fixture().await;
  let created = f.bureau.tasks.create(task_payload(&f, "Doomed", None), f.u.id).await.unwrap();
  f.bureau.tasks.share(created.id, f.v.id, Flags::EDIT, f.u.id).await.unwrap();

  assert!(matches!(
    f.bureau.tasks.delete(created.id, f.v.id).await,
    Err(Error::PermissionDenied { .. })
  ));
  assert_eq!(f.bureau.tasks.delete(created.id, f.u.id).await.unwrap(), 1);
  assert!(matches!(f.bureau.tasks.get(created.id, f.u.id).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn read_only_replace_is_denied_before_the_payload_is_checked() {
  let f = fixture().await;
  f.bureau.projects.share(f.project, f.v.id, Flags::READ, f.u.id).await.unwrap();

  let bad_manager = project_payload("Taken", Some(SubjectId(999)));
  let err = f.bureau.projects.replace(f.project, bad_manager, f.v.id).await.unwrap_err();
  assert!(matches!(err, Error::PermissionDenied { subject, .. } if subject == f.v.id), "{err}");

  let bad_label = ProjectPayload { labels: Some(vec![Uuid::new_v4()]), ..project_payload("Taken", None) };
  let err = f.bureau.projects.replace(f.project, bad_label, f.v.id).await.unwrap_err();
  assert!(matches!(err, Error::PermissionDenied { .. }), "{err}");

  let employee =
    f.bureau.employees.create(employee_payload(f.u.id, "e-1", "Ursula"), f.u.id).await.unwrap();
  f.bureau.employees.share(employee.id, f.v.id, Flags::READ, f.u.id).await.unwrap();
  let err = f
    .bureau
    .employees
    .replace(employee.id, employee_payload(SubjectId(999), "e-1", "Nobody"), f.v.id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PermissionDenied { .. }), "{err}");

  assert_eq!(f.bureau.projects.get(f.project, f.u.id).await.unwrap().name, "Atlas");
  assert_eq!(f.bureau.employees.get(employee.id, f.u.id).await.unwrap().name, "Ursula");
}

#[tokio::test]
async fn sharing_with_an_unknown_subject_is_rejected() {
  let f = fixture().await;

  let err = f.bureau.projects.share(f.project, SubjectId(999), Flags::READ, f.u.id).await.unwrap_err();
  assert!(matches!(err, Error::Validation(_)), "{err}");
  assert_eq!(f.bureau.projects.readers(f.project, f.u.id).await.unwrap().len(), 1);
}

// ─── Write-side validation ───────────────────────────────────────────────────

#[tokio::test]
async fn unresolved_references_abort_before_any_write() {
  let f = fixture().await;
  let real = f.bureau.store().add_label("real", None).await.unwrap();

  let cases = [
    task_payload(&f, "bad label", Some(vec![real.id, Uuid::new_v4()])),
    TaskPayload { task_type: Uuid::new_v4(), ..task_payload(&f, "bad type", None) },
    TaskPayload { project: Uuid::new_v4(), ..task_payload(&f, "bad project", None) },
    TaskPayload { assignee: SubjectId(999), ..task_payload(&f, "bad assignee", None) },
    TaskPayload { parent: Some(Uuid::new_v4()), ..task_payload(&f, "bad parent", None) },
  ];
  for payload in cases {
    let err = f.bureau.tasks.create(payload, f.u.id).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "{err}");
  }

  assert_eq!(f.bureau.tasks.list(0, 0, f.u.id).await.unwrap().total, 0);
}

#[tokio::test]
async fn project_must_be_visible_to_the_creator() {
  let f = fixture().await;
  let mut payload = task_payload(&f, "Borrowed", None);
  payload.assignee = f.v.id;

  let err = f.bureau.tasks.create(payload, f.v.id).await.unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn employee_references_are_validated() {
  let f = fixture().await;
  let payload = employee_payload(SubjectId(999), "e-1", "Nobody");
  let err = f.bureau.employees.create(payload.clone(), f.u.id).await.unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  let payload = EmployeePayload { user: f.v.id, department: Some(Uuid::new_v4()), ..payload };
  let err = f.bureau.employees.create(payload, f.u.id).await.unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn absent_optional_relations_leave_slots_empty() {
  let f = fixture().await;
  let project = f.bureau.projects.get(f.project, f.u.id).await.unwrap();
  assert!(project.manager.is_none());
  assert!(project.labels.is_empty());

  let org = f
    .bureau
    .organizations
    .create(Organization { identifier: "acme".into(), name: "Acme".into(), rank: 1 }, f.u.id)
    .await
    .unwrap();
  let dept = f.bureau.store().add_department("ops", "Operations", Some(org.id)).await.unwrap();

  let employee = f
    .bureau
    .employees
    .create(
      EmployeePayload {
        organization: Some(org.id),
        department: Some(dept.id),
        ..employee_payload(f.v.id, "e-1", "Victor")
      },
      f.u.id,
    )
    .await
    .unwrap();
  assert_eq!(employee.organization.map(|o| o.name).as_deref(), Some("Acme"));
  assert_eq!(employee.department.map(|d| d.identifier).as_deref(), Some("ops"));
  assert!(employee.position.is_none());
  assert_eq!(employee.user_id, f.v.id);
  assert_eq!(employee.user.map(|u| u.display_name).as_deref(), Some("Victor Vance"));
}

#[tokio::test]
async fn manager_slot_is_filled_when_present() {
  let f = fixture().await;
  let view = f.bureau.projects.create(project_payload("Led", Some(f.v.id)), f.u.id).await.unwrap();
  assert_eq!(view.manager.map(|m| m.display_name).as_deref(), Some("Victor Vance"));

  let err = f
    .bureau
    .projects
    .create(project_payload("Unled", Some(SubjectId(999))), f.u.id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn missing_required_relation_fails_the_aggregate() {
  let f = fixture().await;
  let created = f.bureau.tasks.create(task_payload(&f, "Orphan", None), f.u.id).await.unwrap();

  f.bureau.projects.delete(f.project, f.u.id).await.unwrap();

  let err = f.bureau.tasks.get(created.id, f.u.id).await.unwrap_err();
  assert!(matches!(err, Error::BrokenRelation { relation: "project", .. }), "{err}");
  assert!(f.bureau.tasks.list(0, 0, f.u.id).await.is_err());
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn employee_lookups_go_through_visibility() {
  let f = fixture().await;
  let created =
    f.bureau.employees.create(employee_payload(f.v.id, "e-7", "Victor"), f.u.id).await.unwrap();

  let by_identifier = f.bureau.employees.get_by_identifier("e-7", f.u.id).await.unwrap();
  assert_eq!(by_identifier.map(|e| e.id), Some(created.id));
  assert!(f.bureau.employees.get_by_identifier("e-7", f.v.id).await.unwrap().is_none());
  assert!(f.bureau.employees.get_by_identifier("e-8", f.u.id).await.unwrap().is_none());

  assert!(f.bureau.employees.current(f.v.id).await.unwrap().is_none());
  assert!(f.bureau.employees.current(f.u.id).await.unwrap().is_none());

  f.bureau.employees.share(created.id, f.v.id, Flags::READ, f.u.id).await.unwrap();
  let own = f.bureau.employees.current(f.v.id).await.unwrap().unwrap();
  assert_eq!(own.identifier, "e-7");

  let own = f.bureau.employees.get_by_key("current", f.v.id).await.unwrap();
  assert_eq!(own.map(|e| e.id), Some(created.id));
  let by_id = f.bureau.employees.get_by_key(&created.id.to_string(), f.u.id).await.unwrap();
  assert_eq!(by_id.map(|e| e.name).as_deref(), Some("Victor"));
  assert!(matches!(
    f.bureau.employees.get_by_key("nobody", f.u.id).await,
    Err(Error::Validation(_))
  ));
}

#[tokio::test]
async fn employee_search_matches_identifier_or_name() {
  let f = fixture().await;
  for (identifier, name) in [("e-1", "Victor"), ("e-2", "Vera"), ("x-3", "Ursula")] {
    f.bureau.employees.create(employee_payload(f.u.id, identifier, name), f.u.id).await.unwrap();
  }

  let names = |found: Vec<EmployeeView>| {
    found.into_iter().map(|e| e.name).collect::<Vec<_>>()
  };
  assert_eq!(names(f.bureau.employees.search("V", f.u.id).await.unwrap()), ["Victor", "Vera"]);
  assert_eq!(names(f.bureau.employees.search("x-", f.u.id).await.unwrap()), ["Ursula"]);
  assert!(f.bureau.employees.search("e", f.v.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn catalog_entries_are_found_by_identifier() {
  let f = fixture().await;
  let acme = Organization { identifier: "acme".into(), name: "Acme".into(), rank: 1 };
  let created = f.bureau.organizations.create(acme, f.u.id).await.unwrap();

  let found = f.bureau.organizations.get_by_identifier("acme", f.u.id).await.unwrap().unwrap();
  assert_eq!(found.id, created.id);
  assert_eq!(found.body.name, "Acme");
  assert!(f.bureau.organizations.get_by_identifier("acme", f.v.id).await.unwrap().is_none());
  assert!(f.bureau.positions.get_by_identifier("acme", f.u.id).await.unwrap().is_none());
}

// ─── Paging ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pages_preserve_order_and_report_the_visible_total() {
  let f = fixture().await;
  for n in 0..5 {
    let module = Module {
      identifier:  format!("m{n}"),
      name:        format!("Module {n}"),
      description: None,
      is_on:       n % 2 == 0,
    };
    f.bureau.modules.create(module, f.u.id).await.unwrap();
  }

  let page = f.bureau.modules.list(2, 1, f.u.id).await.unwrap();
  assert_eq!(page.total, 5);
  let ids: Vec<_> = page.items.iter().map(|m| m.body.identifier.as_str()).collect();
  assert_eq!(ids, ["m1", "m2"]);

  let all = f.bureau.modules.list(0, 3, f.u.id).await.unwrap();
  assert_eq!(all.items.len(), 5);

  let first = f.bureau.modules.first_page(f.u.id).await.unwrap();
  assert_eq!(first.items.len(), 3);

  let others = f.bureau.modules.list(10, 0, f.v.id).await.unwrap();
  assert_eq!(others.total, 0);
  assert!(others.items.is_empty());
}

#[tokio::test]
async fn concurrent_replaces_apply_one_payload_whole() {
  let f = fixture().await;
  let created = f.bureau.tasks.create(task_payload(&f, "Start", None), f.u.id).await.unwrap();

  let a = TaskPayload { priority: 1, status: TaskStatus::InProgress, ..task_payload(&f, "A", None) };
  let b = TaskPayload { priority: 2, status: TaskStatus::Done, ..task_payload(&f, "B", None) };

  let (ra, rb) = tokio::join!(
    f.bureau.tasks.replace(created.id, a, f.u.id),
    f.bureau.tasks.replace(created.id, b, f.u.id),
  );
  ra.unwrap();
  rb.unwrap();

  let got = f.bureau.tasks.get(created.id, f.u.id).await.unwrap();
  match got.title.as_str() {
    "A" => assert_eq!((got.priority, got.status), (1, TaskStatus::InProgress)),
    "B" => assert_eq!((got.priority, got.status), (2, TaskStatus::Done)),
    other => panic!("unexpected title {other}"),
  }
}

// ─── Startup ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn opens_the_store_named_in_the_config_file() {
  let dir = tempfile::tempdir().unwrap();
  let db = dir.path().join("bureau.db");
  let cfg = dir.path().join("bureau.toml");
  std::fs::write(&cfg, format!("store_path = {:?}\npage_concurrency = 4\n", db.display().to_string()))
    .unwrap();

  let bureau = Bureau::load(Some(cfg.as_path())).await.unwrap();
  assert_eq!(bureau.modules.config().page_concurrency, 4);

  let owner = bureau.store().add_subject("owner", "Owner").await.unwrap();
  let module = Module { identifier: "m".into(), name: "M".into(), description: None, is_on: true };
  bureau.modules.create(module, owner.id).await.unwrap();
  assert!(db.exists());
}
