//! Projects.

use std::sync::Arc;

use bureau_core::{
  Document, Draft, Error, PermissionRecord, Result, SubjectId,
  model::{Project, ProjectStatus},
  reference::{Label, Subject},
  store::DocumentStore,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  aggregate::{Aggregator, AuditView, Flags, Listing, Relation, lookup, present},
  config::ServiceConfig,
  service::DocumentService,
};

const MANAGER: Relation = Relation::optional("manager");
const LABELS: Relation = Relation::optional("labels");

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectPayload {
  pub name:        String,
  #[serde(default)]
  pub status:      ProjectStatus,
  #[serde(default)]
  pub finish_date: Option<NaiveDate>,
  #[serde(default)]
  pub manager:     Option<SubjectId>,
  #[serde(default)]
  pub labels:      Option<Vec<Uuid>>,
}

impl From<ProjectPayload> for Draft<Project> {
  fn from(payload: ProjectPayload) -> Self {
    let body = Project {
      name:        payload.name,
      status:      payload.status,
      finish_date: payload.finish_date,
      manager:     payload.manager,
    };
    Draft { body, labels: payload.labels }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
  pub id:          Uuid,
  pub name:        String,
  pub status:      ProjectStatus,
  pub finish_date: Option<NaiveDate>,
  pub manager:     Option<Subject>,
  pub labels:      Vec<Label>,
  pub audit:       AuditView,
  pub readers:     Vec<PermissionRecord>,
}

pub struct ProjectService<S> {
  agg: Aggregator<S>,
}

impl<S: DocumentStore> ProjectService<S> {
  pub fn new(store: Arc<S>, config: Arc<ServiceConfig>) -> Self {
    Self { agg: Aggregator::new(store, config) }
  }

  async fn assemble(&self, doc: Document<Project>) -> Result<ProjectView> {
    let store = self.agg.store();
    let Document { id, audit, body: project, .. } = doc;

    let (audit, manager, labels, readers) = tokio::try_join!(
      self.agg.audit(&audit),
      MANAGER.resolve_if(project.manager, |m| lookup(store.get_subject(m))),
      LABELS.resolve(id, present(store.labels_of::<Project>(id))),
      self.agg.readers_slot::<Project>(id),
    )?;

    Ok(ProjectView {
      id,
      name: project.name,
      status: project.status,
      finish_date: project.finish_date,
      manager,
      labels: labels.unwrap_or_default(),
      audit,
      readers,
    })
  }

  async fn validate(&self, payload: &ProjectPayload) -> Result<()> {
    let store = self.agg.store();

    tokio::try_join!(
      MANAGER.reference_if(payload.manager, |m| lookup(store.get_subject(m))),
      self.agg.labels(payload.labels.as_deref().unwrap_or_default()),
    )?;
    Ok(())
  }
}

impl<S: DocumentStore> DocumentService for ProjectService<S> {
  type Payload = ProjectPayload;
  type View = ProjectView;

  fn config(&self) -> &ServiceConfig { self.agg.config() }

  async fn list(&self, limit: i64, offset: i64, subject: SubjectId) -> Result<Listing<ProjectView>> {
    self.agg.list(limit, offset, subject, |doc| self.assemble(doc)).await
  }

  async fn get(&self, id: Uuid, subject: SubjectId) -> Result<ProjectView> {
    let doc = self.agg.store().get_by_id::<Project>(id, subject).await.map_err(Into::<Error>::into)?;
    self.assemble(doc).await
  }

  async fn create(&self, payload: ProjectPayload, subject: SubjectId) -> Result<ProjectView> {
    self.validate(&payload).await?;
    let doc = self.agg.store().insert(Draft::from(payload), subject).await.map_err(Into::<Error>::into)?;
    self.assemble(doc).await
  }

  async fn replace(&self, id: Uuid, payload: ProjectPayload, subject: SubjectId) -> Result<ProjectView> {
    self.agg.require_edit::<Project>(id, subject).await?;
    self.validate(&payload).await?;
    let doc = self
      .agg
      .store()
      .update(id, Draft::from(payload), subject)
      .await
      .map_err(Into::<Error>::into)?;
    self.assemble(doc).await
  }

  async fn delete(&self, id: Uuid, subject: SubjectId) -> Result<u64> {
    self.agg.delete::<Project>(id, subject).await
  }

  async fn share(&self, id: Uuid, grantee: SubjectId, flags: Flags, subject: SubjectId) -> Result<()> {
    self.agg.share::<Project>(id, grantee, flags, subject).await
  }

  async fn readers(&self, id: Uuid, subject: SubjectId) -> Result<Vec<PermissionRecord>> {
    self.agg.readers::<Project>(id, subject).await
  }
}
