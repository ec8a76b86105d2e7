//! Aggregate assembly: joining a primary document with its related entities.
//!
//! Each view declares its secondary slots as a table of [`Relation`]s. A
//! required slot that fails (or finds nothing) fails the whole aggregate; an
//! optional slot that fails is left empty. Slots are fetched concurrently and
//! joined with a single wait-all; the first required failure drops the
//! outstanding siblings.

use std::{fmt, future::Future, sync::Arc};

use bureau_core::{
  Audit, Capability, Document, Entity, Error, PermissionRecord, Result, SubjectId,
  reference::Label,
  store::DocumentStore,
};
use chrono::{DateTime, Utc};
use futures::{StreamExt as _, TryStreamExt as _, future::try_join_all, stream};
use serde::Serialize;
use uuid::Uuid;

use crate::config::ServiceConfig;

// ─── Slot table ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Need {
  Required,
  Optional,
}

/// One secondary slot of an aggregate view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
  pub name: &'static str,
  pub need: Need,
}

impl Relation {
  pub const fn required(name: &'static str) -> Self { Self { name, need: Need::Required } }

  pub const fn optional(name: &'static str) -> Self { Self { name, need: Need::Optional } }

  /// Await a slot fetch and apply this relation's failure policy.
  pub async fn resolve<T>(
    self,
    key: impl fmt::Display,
    fetch: impl Future<Output = Result<Option<T>>>,
  ) -> Result<Option<T>> {
    match (self.need, fetch.await) {
      (_, Ok(Some(value))) => Ok(Some(value)),
      (Need::Optional, Ok(None)) => Ok(None),
      (Need::Required, Ok(None)) => {
        tracing::warn!(relation = self.name, %key, "required relation missing");
        Err(Error::BrokenRelation { relation: self.name, key: key.to_string() })
      }
      (Need::Required, Err(e)) => Err(e),
      (Need::Optional, Err(e)) => {
        if !e.is_expected() {
          tracing::warn!(relation = self.name, %key, error = %e, "optional relation failed; left empty");
        }
        Ok(None)
      }
    }
  }

  /// Like [`resolve`](Self::resolve), for slots a view cannot be built
  /// without.
  pub async fn require<T>(
    self,
    key: impl fmt::Display,
    fetch: impl Future<Output = Result<Option<T>>>,
  ) -> Result<T> {
    let key = key.to_string();
    match self.resolve(&key, fetch).await? {
      Some(value) => Ok(value),
      None => Err(Error::BrokenRelation { relation: self.name, key }),
    }
  }

  /// Resolve a slot whose key is itself optional. No key, no fetch.
  pub async fn resolve_if<K, T, Fut>(self, key: Option<K>, fetch: impl FnOnce(K) -> Fut) -> Result<Option<T>>
  where
    K: fmt::Display + Copy,
    Fut: Future<Output = Result<Option<T>>>,
  {
    match key {
      Some(key) => self.resolve(key, fetch(key)).await,
      None => Ok(None),
    }
  }

  /// Resolve a reference supplied on the write path. Anything short of a
  /// resolved entity is a validation failure.
  pub async fn reference<T>(
    self,
    key: impl fmt::Display,
    fetch: impl Future<Output = Result<Option<T>>>,
  ) -> Result<T> {
    match fetch.await {
      Ok(Some(value)) => Ok(value),
      Ok(None) | Err(Error::NotFound(_) | Error::PermissionDenied { .. }) => {
        Err(Error::Validation(format!("{} {key} does not resolve", self.name)))
      }
      Err(e) => Err(e),
    }
  }

  /// [`reference`](Self::reference) for a field the payload may leave out.
  pub async fn reference_if<K, T, Fut>(self, key: Option<K>, fetch: impl FnOnce(K) -> Fut) -> Result<Option<T>>
  where
    K: fmt::Display + Copy,
    Fut: Future<Output = Result<Option<T>>>,
  {
    match key {
      Some(key) => self.reference(key, fetch(key)).await.map(Some),
      None => Ok(None),
    }
  }
}

/// Slots every view carries.
pub const AUTHOR: Relation = Relation::optional("author");
pub const LAST_MODIFIER: Relation = Relation::optional("last_modifier");
pub const READERS: Relation = Relation::required("readers");
pub const LABEL: Relation = Relation::required("label");
pub const GRANTEE: Relation = Relation::required("grantee");

// ─── Fetch adapters ──────────────────────────────────────────────────────────

/// A lookup that always produces a value on success.
pub async fn present<T, E: Into<Error>>(fetch: impl Future<Output = Result<T, E>>) -> Result<Option<T>> {
  fetch.await.map(Some).map_err(Into::into)
}

/// A lookup whose not-found outcome is an empty slot.
pub async fn found<T, E: Into<Error>>(fetch: impl Future<Output = Result<T, E>>) -> Result<Option<T>> {
  match fetch.await.map_err(Into::into) {
    Ok(value) => Ok(Some(value)),
    Err(Error::NotFound(_)) => Ok(None),
    Err(e) => Err(e),
  }
}

/// A lookup that already reports absence as `None`.
pub async fn lookup<T, E: Into<Error>>(
  fetch: impl Future<Output = Result<Option<T>, E>>,
) -> Result<Option<T>> {
  fetch.await.map_err(Into::into)
}

// ─── Shared view parts ───────────────────────────────────────────────────────

/// Audit metadata with display names resolved.
#[derive(Debug, Clone, Serialize)]
pub struct AuditView {
  pub author:             SubjectId,
  pub author_name:        Option<String>,
  pub reg_date:           DateTime<Utc>,
  pub last_modifier:      SubjectId,
  pub last_modifier_name: Option<String>,
  pub last_mod_date:      DateTime<Utc>,
}

/// One page of aggregates plus the size of the visible set.
#[derive(Debug, Clone, Serialize)]
pub struct Listing<V> {
  pub total: u64,
  pub items: Vec<V>,
}

// ─── Aggregator ──────────────────────────────────────────────────────────────

/// The store and configuration shared by every entity service, plus the
/// aggregation steps they have in common.
pub struct Aggregator<S> {
  pub(crate) store:  Arc<S>,
  pub(crate) config: Arc<ServiceConfig>,
}

impl<S> Clone for Aggregator<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), config: Arc::clone(&self.config) }
  }
}

impl<S: DocumentStore> Aggregator<S> {
  pub fn new(store: Arc<S>, config: Arc<ServiceConfig>) -> Self { Self { store, config } }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &ServiceConfig { &self.config }

  /// Resolve author and last-modifier display names.
  pub async fn audit(&self, audit: &Audit) -> Result<AuditView> {
    let (author_name, last_modifier_name) = tokio::try_join!(
      AUTHOR.resolve(audit.author, lookup(self.store.display_name(audit.author))),
      LAST_MODIFIER.resolve(audit.last_modifier, lookup(self.store.display_name(audit.last_modifier))),
    )?;

    Ok(AuditView {
      author: audit.author,
      author_name,
      reg_date: audit.reg_date,
      last_modifier: audit.last_modifier,
      last_modifier_name,
      last_mod_date: audit.last_mod_date,
    })
  }

  /// The access-control list slot of an aggregate.
  pub async fn readers_slot<T: Entity>(&self, id: Uuid) -> Result<Vec<PermissionRecord>> {
    READERS.require(id, present(self.store.list_readers(T::TABLE, id))).await
  }

  /// Fetch a page and its total, then assemble every row with at most
  /// `page_concurrency` rows in flight.
  pub async fn list<T, V, F, Fut>(
    &self,
    limit: i64,
    offset: i64,
    subject: SubjectId,
    assemble: F,
  ) -> Result<Listing<V>>
  where
    T: Entity,
    F: FnMut(Document<T>) -> Fut,
    Fut: Future<Output = Result<V>>,
  {
    let (docs, total) = tokio::try_join!(
      async { self.store.get_page::<T>(limit, offset, subject).await.map_err(Into::<Error>::into) },
      async { self.store.count::<T>(subject).await.map_err(Into::<Error>::into) },
    )?;

    let items = self.assemble_all(docs, assemble).await?;
    Ok(Listing { total, items })
  }

  /// Assemble documents in order, at most `page_concurrency` at a time.
  pub async fn assemble_all<T, V, F, Fut>(&self, docs: Vec<Document<T>>, assemble: F) -> Result<Vec<V>>
  where
    F: FnMut(Document<T>) -> Fut,
    Fut: Future<Output = Result<V>>,
  {
    stream::iter(docs)
      .map(assemble)
      .buffered(self.config.page_concurrency())
      .try_collect()
      .await
  }

  /// Fail with `PermissionDenied` unless `subject` may edit the document.
  /// Runs before any payload is looked at.
  pub async fn require_edit<T: Entity>(&self, id: Uuid, subject: SubjectId) -> Result<()> {
    if self.store.has_capability(T::TABLE, subject, id, Capability::Edit).await {
      return Ok(());
    }
    tracing::info!(kind = T::KIND, %id, %subject, "edit denied");
    Err(Error::PermissionDenied { subject, entity: id, capability: Capability::Edit })
  }

  /// Resolve every label id of a write payload.
  pub async fn labels(&self, ids: &[Uuid]) -> Result<Vec<Label>> {
    try_join_all(ids.iter().map(|&id| LABEL.reference(id, lookup(self.store.get_label(id))))).await
  }

  /// The ACL of a document the subject can read.
  pub async fn readers<T: Entity>(&self, id: Uuid, subject: SubjectId) -> Result<Vec<PermissionRecord>> {
    if !self.store.has_capability(T::TABLE, subject, id, Capability::Read).await {
      return Err(Error::NotFound(id));
    }
    self.store.list_readers(T::TABLE, id).await.map_err(Into::into)
  }

  /// Grant `grantee` the given flags on a document. Requires `can_edit`.
  pub async fn share<T: Entity>(
    &self,
    id: Uuid,
    grantee: SubjectId,
    flags: Flags,
    subject: SubjectId,
  ) -> Result<()> {
    self.require_edit::<T>(id, subject).await?;
    GRANTEE.reference(grantee, lookup(self.store.get_subject(grantee))).await?;

    let record = PermissionRecord {
      subject:    grantee,
      entity_id:  id,
      can_read:   flags.read,
      can_edit:   flags.edit,
      can_delete: flags.delete,
    };
    self.store.grant(T::TABLE, record).await.map_err(Into::into)
  }

  pub async fn delete<T: Entity>(&self, id: Uuid, subject: SubjectId) -> Result<u64> {
    self.store.delete::<T>(id, subject).await.map_err(Into::into)
  }
}

/// Capability flags for [`Aggregator::share`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
pub struct Flags {
  #[serde(default)]
  pub read:   bool,
  #[serde(default)]
  pub edit:   bool,
  #[serde(default)]
  pub delete: bool,
}

impl Flags {
  pub const READ: Self = Self { read: true, edit: false, delete: false };
  pub const EDIT: Self = Self { read: true, edit: true, delete: false };
  pub const FULL: Self = Self { read: true, edit: true, delete: true };
}
