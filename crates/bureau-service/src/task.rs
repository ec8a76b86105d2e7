//! Tasks: the aggregate with the widest slot table.

use std::sync::Arc;

use bureau_core::{
  Document, Draft, Error, PermissionRecord, Result, SubjectId,
  model::{Project, ProjectStatus, Task, TaskStatus},
  reference::{Label, Subject, TaskType},
  store::DocumentStore,
};
use chrono::{Months, NaiveDate, Utc};
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  aggregate::{Aggregator, AuditView, Flags, Listing, Relation, found, lookup, present},
  config::ServiceConfig,
  service::DocumentService,
};

const PROJECT: Relation = Relation::required("project");
const TASK_TYPE: Relation = Relation::required("task_type");
const ASSIGNEE: Relation = Relation::optional("assignee");
const LABELS: Relation = Relation::optional("labels");
const PARENT: Relation = Relation::optional("parent");

// ─── Payload & view ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct TaskPayload {
  pub title:                String,
  #[serde(default)]
  pub body:                 Option<String>,
  pub assignee:             SubjectId,
  #[serde(default)]
  pub status:               TaskStatus,
  #[serde(default)]
  pub priority:             i32,
  /// Defaults to today.
  #[serde(default)]
  pub start_date:           Option<NaiveDate>,
  #[serde(default)]
  pub target_date:          Option<NaiveDate>,
  pub project:              Uuid,
  pub task_type:            Uuid,
  #[serde(default)]
  pub parent:               Option<Uuid>,
  #[serde(default)]
  pub cancellation_comment: Option<String>,
  /// On replace, `None` keeps the current labels.
  #[serde(default)]
  pub labels:               Option<Vec<Uuid>>,
}

impl TaskPayload {
  fn into_draft(self, reg_number: String) -> Draft<Task> {
    let body = Task {
      reg_number,
      title: self.title,
      body: self.body,
      assignee: self.assignee,
      status: self.status,
      priority: self.priority,
      start_date: self.start_date.unwrap_or_else(today),
      target_date: self.target_date,
      project: self.project,
      task_type: self.task_type,
      parent: self.parent,
      cancellation_comment: self.cancellation_comment,
    };
    Draft { body, labels: self.labels }
  }
}

/// Defaults offered to a client about to create a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskTemplate {
  pub status:      TaskStatus,
  pub priority:    i32,
  pub start_date:  NaiveDate,
  pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
  pub id:     Uuid,
  pub name:   String,
  pub status: ProjectStatus,
}

impl From<Document<Project>> for ProjectSummary {
  fn from(doc: Document<Project>) -> Self {
    Self { id: doc.id, name: doc.body.name, status: doc.body.status }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
  pub id:                   Uuid,
  pub reg_number:           String,
  pub title:                String,
  pub body:                 Option<String>,
  pub status:               TaskStatus,
  pub priority:             i32,
  pub start_date:           NaiveDate,
  pub target_date:          Option<NaiveDate>,
  pub parent:               Option<Uuid>,
  pub cancellation_comment: Option<String>,
  pub project:              ProjectSummary,
  pub task_type:            TaskType,
  pub assignee_id:          SubjectId,
  pub assignee:             Option<Subject>,
  pub labels:               Vec<Label>,
  pub audit:                AuditView,
  pub readers:              Vec<PermissionRecord>,
}

// ─── Service ─────────────────────────────────────────────────────────────────

fn today() -> NaiveDate { Utc::now().date_naive() }

/// A random six-digit registration number.
fn reg_number() -> String { format!("{:06}", 100_000 + OsRng.next_u32() % 900_000) }

pub struct TaskService<S> {
  agg: Aggregator<S>,
}

impl<S: DocumentStore> TaskService<S> {
  pub fn new(store: Arc<S>, config: Arc<ServiceConfig>) -> Self {
    Self { agg: Aggregator::new(store, config) }
  }

  /// A blank task due one month from today.
  pub fn template(&self) -> TaskTemplate {
    let start_date = today();
    TaskTemplate {
      status: TaskStatus::Draft,
      priority: 0,
      start_date,
      target_date: start_date.checked_add_months(Months::new(1)),
    }
  }

  async fn assemble(&self, doc: Document<Task>, subject: SubjectId) -> Result<TaskView> {
    let store = self.agg.store();
    let Document { id, audit, body: task, .. } = doc;

    let (audit, project, task_type, assignee, labels, readers) = tokio::try_join!(
      self.agg.audit(&audit),
      PROJECT.require(task.project, found(store.get_by_id::<Project>(task.project, subject))),
      TASK_TYPE.require(task.task_type, lookup(store.get_task_type(task.task_type))),
      ASSIGNEE.resolve(task.assignee, lookup(store.get_subject(task.assignee))),
      LABELS.resolve(id, present(store.labels_of::<Task>(id))),
      self.agg.readers_slot::<Task>(id),
    )?;

    Ok(TaskView {
      id,
      reg_number: task.reg_number,
      title: task.title,
      body: task.body,
      status: task.status,
      priority: task.priority,
      start_date: task.start_date,
      target_date: task.target_date,
      parent: task.parent,
      cancellation_comment: task.cancellation_comment,
      project: project.into(),
      task_type,
      assignee_id: task.assignee,
      assignee,
      labels: labels.unwrap_or_default(),
      audit,
      readers,
    })
  }

  /// Resolve every reference in `payload` before anything is written.
  async fn validate(&self, payload: &TaskPayload, subject: SubjectId) -> Result<()> {
    let store = self.agg.store();

    tokio::try_join!(
      PROJECT.reference(payload.project, found(store.get_by_id::<Project>(payload.project, subject))),
      TASK_TYPE.reference(payload.task_type, lookup(store.get_task_type(payload.task_type))),
      ASSIGNEE.reference(payload.assignee, lookup(store.get_subject(payload.assignee))),
      PARENT.reference_if(payload.parent, |id| found(store.get_by_id::<Task>(id, subject))),
      self.agg.labels(payload.labels.as_deref().unwrap_or_default()),
    )?;
    Ok(())
  }
}

impl<S: DocumentStore> DocumentService for TaskService<S> {
  type Payload = TaskPayload;
  type View = TaskView;

  fn config(&self) -> &ServiceConfig { self.agg.config() }

  async fn list(&self, limit: i64, offset: i64, subject: SubjectId) -> Result<Listing<TaskView>> {
    self.agg.list(limit, offset, subject, |doc| self.assemble(doc, subject)).await
  }

  async fn get(&self, id: Uuid, subject: SubjectId) -> Result<TaskView> {
    let doc = self.agg.store().get_by_id::<Task>(id, subject).await.map_err(Into::<Error>::into)?;
    self.assemble(doc, subject).await
  }

  async fn create(&self, payload: TaskPayload, subject: SubjectId) -> Result<TaskView> {
    self.validate(&payload, subject).await?;

    let draft = payload.into_draft(reg_number());
    let doc = self.agg.store().insert(draft, subject).await.map_err(Into::<Error>::into)?;
    tracing::debug!(id = %doc.id, reg_number = %doc.body.reg_number, %subject, "task created");
    self.assemble(doc, subject).await
  }

  async fn replace(&self, id: Uuid, payload: TaskPayload, subject: SubjectId) -> Result<TaskView> {
    let store = self.agg.store();
    self.agg.require_edit::<Task>(id, subject).await?;

    let ((), current) =
      tokio::try_join!(self.validate(&payload, subject), found(store.get_by_id::<Task>(id, subject)))?;
    // Edit without read leaves nothing to carry the registration number from.
    let current = current.ok_or(Error::NotFound(id))?;

    let draft = payload.into_draft(current.body.reg_number);
    let doc = store.update(id, draft, subject).await.map_err(Into::<Error>::into)?;
    self.assemble(doc, subject).await
  }

  async fn delete(&self, id: Uuid, subject: SubjectId) -> Result<u64> {
    self.agg.delete::<Task>(id, subject).await
  }

  async fn share(&self, id: Uuid, grantee: SubjectId, flags: Flags, subject: SubjectId) -> Result<()> {
    self.agg.share::<Task>(id, grantee, flags, subject).await
  }

  async fn readers(&self, id: Uuid, subject: SubjectId) -> Result<Vec<PermissionRecord>> {
    self.agg.readers::<Task>(id, subject).await
  }
}
