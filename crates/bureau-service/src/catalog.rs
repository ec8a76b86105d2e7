//! Flat catalog entities: organizations, positions and modules.
//!
//! These carry no references beyond audit and readers, so one generic
//! service covers all of them.

use std::{marker::PhantomData, sync::Arc};

use bureau_core::{Document, Draft, Entity, Error, PermissionRecord, Result, SubjectId, store::DocumentStore};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  aggregate::{Aggregator, AuditView, Flags, Listing},
  config::ServiceConfig,
  service::DocumentService,
};

#[derive(Debug, Clone, Serialize)]
pub struct CatalogView<T> {
  pub id:      Uuid,
  #[serde(flatten)]
  pub body:    T,
  pub audit:   AuditView,
  pub readers: Vec<PermissionRecord>,
}

pub struct CatalogService<S, T> {
  agg:   Aggregator<S>,
  _kind: PhantomData<fn() -> T>,
}

impl<S: DocumentStore, T: Entity> CatalogService<S, T> {
  pub fn new(store: Arc<S>, config: Arc<ServiceConfig>) -> Self {
    Self { agg: Aggregator::new(store, config), _kind: PhantomData }
  }

  async fn assemble(&self, doc: Document<T>) -> Result<CatalogView<T>> {
    let Document { id, audit, body, .. } = doc;
    let (audit, readers) = tokio::try_join!(self.agg.audit(&audit), self.agg.readers_slot::<T>(id))?;
    Ok(CatalogView { id, body, audit, readers })
  }

  /// The visible entry with this identifier, if any.
  pub async fn get_by_identifier(
    &self,
    identifier: impl Into<String>,
    subject: SubjectId,
  ) -> Result<Option<CatalogView<T>>> {
    let doc =
      self.agg.store().get_by_identifier::<T>(identifier.into(), subject).await.map_err(Into::<Error>::into)?;
    match doc {
      Some(doc) => self.assemble(doc).await.map(Some),
      None => Ok(None),
    }
  }
}

impl<S: DocumentStore, T: Entity> DocumentService for CatalogService<S, T> {
  type Payload = T;
  type View = CatalogView<T>;

  fn config(&self) -> &ServiceConfig { self.agg.config() }

  async fn list(&self, limit: i64, offset: i64, subject: SubjectId) -> Result<Listing<CatalogView<T>>> {
    self.agg.list(limit, offset, subject, |doc| self.assemble(doc)).await
  }

  async fn get(&self, id: Uuid, subject: SubjectId) -> Result<CatalogView<T>> {
    let doc = self.agg.store().get_by_id::<T>(id, subject).await.map_err(Into::<Error>::into)?;
    self.assemble(doc).await
  }

  async fn create(&self, payload: T, subject: SubjectId) -> Result<CatalogView<T>> {
    let doc = self.agg.store().insert(Draft::new(payload), subject).await.map_err(Into::<Error>::into)?;
    self.assemble(doc).await
  }

  async fn replace(&self, id: Uuid, payload: T, subject: SubjectId) -> Result<CatalogView<T>> {
    let doc =
      self.agg.store().update(id, Draft::new(payload), subject).await.map_err(Into::<Error>::into)?;
    self.assemble(doc).await
  }

  async fn delete(&self, id: Uuid, subject: SubjectId) -> Result<u64> {
    self.agg.delete::<T>(id, subject).await
  }

  async fn share(&self, id: Uuid, grantee: SubjectId, flags: Flags, subject: SubjectId) -> Result<()> {
    self.agg.share::<T>(id, grantee, flags, subject).await
  }

  async fn readers(&self, id: Uuid, subject: SubjectId) -> Result<Vec<PermissionRecord>> {
    self.agg.readers::<T>(id, subject).await
  }
}
