//! Employees and their place in the office frame.

use std::sync::Arc;

use bureau_core::{
  Document, Draft, Error, PermissionRecord, Result, SubjectId,
  model::{Employee, Organization, Position},
  reference::{Department, Subject},
  store::DocumentStore,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  aggregate::{Aggregator, AuditView, Flags, Listing, Relation, found, lookup},
  config::ServiceConfig,
  service::DocumentService,
};

const USER: Relation = Relation::optional("user");
const ORGANIZATION: Relation = Relation::optional("organization");
const DEPARTMENT: Relation = Relation::optional("department");
const POSITION: Relation = Relation::optional("position");

/// Path key naming the caller's own employee record.
pub const CURRENT: &str = "current";

#[derive(Debug, Clone, Deserialize)]
pub struct EmployeePayload {
  pub user:         SubjectId,
  pub identifier:   String,
  pub name:         String,
  #[serde(default)]
  pub phone:        Option<String>,
  #[serde(default)]
  pub birth_date:   Option<NaiveDate>,
  #[serde(default)]
  pub rank:         i32,
  #[serde(default)]
  pub organization: Option<Uuid>,
  #[serde(default)]
  pub department:   Option<Uuid>,
  #[serde(default)]
  pub position:     Option<Uuid>,
}

impl From<EmployeePayload> for Draft<Employee> {
  fn from(p: EmployeePayload) -> Self {
    Draft::new(Employee {
      user:         p.user,
      identifier:   p.identifier,
      name:         p.name,
      phone:        p.phone,
      birth_date:   p.birth_date,
      rank:         p.rank,
      organization: p.organization,
      department:   p.department,
      position:     p.position,
    })
  }
}

/// Identifier and name of a related frame entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameRef {
  pub id:         Uuid,
  pub identifier: String,
  pub name:       String,
}

impl From<Document<Organization>> for FrameRef {
  fn from(doc: Document<Organization>) -> Self {
    Self { id: doc.id, identifier: doc.body.identifier, name: doc.body.name }
  }
}

impl From<Document<Position>> for FrameRef {
  fn from(doc: Document<Position>) -> Self {
    Self { id: doc.id, identifier: doc.body.identifier, name: doc.body.name }
  }
}

impl From<Department> for FrameRef {
  fn from(d: Department) -> Self { Self { id: d.id, identifier: d.identifier, name: d.name } }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeView {
  pub id:           Uuid,
  pub user_id:      SubjectId,
  pub user:         Option<Subject>,
  pub identifier:   String,
  pub name:         String,
  pub phone:        Option<String>,
  pub birth_date:   Option<NaiveDate>,
  pub rank:         i32,
  pub organization: Option<FrameRef>,
  pub department:   Option<FrameRef>,
  pub position:     Option<FrameRef>,
  pub audit:        AuditView,
  pub readers:      Vec<PermissionRecord>,
}

pub struct EmployeeService<S> {
  agg: Aggregator<S>,
}

impl<S: DocumentStore> EmployeeService<S> {
  pub fn new(store: Arc<S>, config: Arc<ServiceConfig>) -> Self {
    Self { agg: Aggregator::new(store, config) }
  }

  async fn assemble(&self, doc: Document<Employee>, subject: SubjectId) -> Result<EmployeeView> {
    let store = self.agg.store();
    let Document { id, audit, body: e, .. } = doc;

    let (audit, user, organization, department, position, readers) = tokio::try_join!(
      self.agg.audit(&audit),
      USER.resolve(e.user, lookup(store.get_subject(e.user))),
      ORGANIZATION.resolve_if(e.organization, |o| found(store.get_by_id::<Organization>(o, subject))),
      DEPARTMENT.resolve_if(e.department, |d| lookup(store.get_department(d))),
      POSITION.resolve_if(e.position, |p| found(store.get_by_id::<Position>(p, subject))),
      self.agg.readers_slot::<Employee>(id),
    )?;

    Ok(EmployeeView {
      id,
      user_id: e.user,
      user,
      identifier: e.identifier,
      name: e.name,
      phone: e.phone,
      birth_date: e.birth_date,
      rank: e.rank,
      organization: organization.map(FrameRef::from),
      department: department.map(FrameRef::from),
      position: position.map(FrameRef::from),
      audit,
      readers,
    })
  }

  async fn validate(&self, payload: &EmployeePayload, subject: SubjectId) -> Result<()> {
    let store = self.agg.store();

    tokio::try_join!(
      USER.reference(payload.user, lookup(store.get_subject(payload.user))),
      ORGANIZATION
        .reference_if(payload.organization, |o| found(store.get_by_id::<Organization>(o, subject))),
      DEPARTMENT.reference_if(payload.department, |d| lookup(store.get_department(d))),
      POSITION.reference_if(payload.position, |p| found(store.get_by_id::<Position>(p, subject))),
    )?;
    Ok(())
  }

  async fn assemble_found(
    &self,
    doc: Option<Document<Employee>>,
    subject: SubjectId,
  ) -> Result<Option<EmployeeView>> {
    match doc {
      Some(doc) => self.assemble(doc, subject).await.map(Some),
      None => Ok(None),
    }
  }

  /// The visible employee with this personnel identifier, if any.
  pub async fn get_by_identifier(
    &self,
    identifier: impl Into<String>,
    subject: SubjectId,
  ) -> Result<Option<EmployeeView>> {
    let doc = self
      .agg
      .store()
      .get_by_identifier::<Employee>(identifier.into(), subject)
      .await
      .map_err(Into::<Error>::into)?;
    self.assemble_found(doc, subject).await
  }

  /// The caller's own employee record, if one is visible to them.
  pub async fn current(&self, subject: SubjectId) -> Result<Option<EmployeeView>> {
    let doc = self
      .agg
      .store()
      .find_by_field::<Employee>("user", serde_json::json!(subject.0), subject)
      .await
      .map_err(Into::<Error>::into)?;
    self.assemble_found(doc, subject).await
  }

  /// Resolve a path key: `"current"` names the caller's own record, anything
  /// else must be a document id.
  pub async fn get_by_key(&self, key: &str, subject: SubjectId) -> Result<Option<EmployeeView>> {
    if key == CURRENT {
      return self.current(subject).await;
    }
    let id = Uuid::parse_str(key).map_err(|_| Error::Validation(format!("employee key {key:?} is not an id")))?;
    self.get(id, subject).await.map(Some)
  }

  /// Visible employees whose identifier or name contains `keyword`,
  /// ignoring ASCII case.
  pub async fn search(&self, keyword: impl Into<String>, subject: SubjectId) -> Result<Vec<EmployeeView>> {
    let docs =
      self.agg.store().search::<Employee>(keyword.into(), subject).await.map_err(Into::<Error>::into)?;
    self.agg.assemble_all(docs, |doc| self.assemble(doc, subject)).await
  }
}

impl<S: DocumentStore> DocumentService for EmployeeService<S> {
  type Payload = EmployeePayload;
  type View = EmployeeView;

  fn config(&self) -> &ServiceConfig { self.agg.config() }

  async fn list(&self, limit: i64, offset: i64, subject: SubjectId) -> Result<Listing<EmployeeView>> {
    self.agg.list(limit, offset, subject, |doc| self.assemble(doc, subject)).await
  }

  async fn get(&self, id: Uuid, subject: SubjectId) -> Result<EmployeeView> {
    let doc = self.agg.store().get_by_id::<Employee>(id, subject).await.map_err(Into::<Error>::into)?;
    self.assemble(doc, subject).await
  }

  async fn create(&self, payload: EmployeePayload, subject: SubjectId) -> Result<EmployeeView> {
    self.validate(&payload, subject).await?;
    let doc = self.agg.store().insert(Draft::from(payload), subject).await.map_err(Into::<Error>::into)?;
    self.assemble(doc, subject).await
  }

  async fn replace(&self, id: Uuid, payload: EmployeePayload, subject: SubjectId) -> Result<EmployeeView> {
    self.agg.require_edit::<Employee>(id, subject).await?;
    self.validate(&payload, subject).await?;
    let doc = self
      .agg
      .store()
      .update(id, Draft::from(payload), subject)
      .await
      .map_err(Into::<Error>::into)?;
    self.assemble(doc, subject).await
  }

  async fn delete(&self, id: Uuid, subject: SubjectId) -> Result<u64> {
    self.agg.delete::<Employee>(id, subject).await
  }

  async fn share(&self, id: Uuid, grantee: SubjectId, flags: Flags, subject: SubjectId) -> Result<()> {
    self.agg.share::<Employee>(id, grantee, flags, subject).await
  }

  async fn readers(&self, id: Uuid, subject: SubjectId) -> Result<Vec<PermissionRecord>> {
    self.agg.readers::<Employee>(id, subject).await
  }
}
