//! The per-entity service boundary.

use bureau_core::{PermissionRecord, Result, SubjectId};
use uuid::Uuid;

use crate::{
  aggregate::{Flags, Listing},
  config::ServiceConfig,
};

/// What every entity service exposes upward.
///
/// Reads return fully assembled views; writes validate references, run one
/// repository transaction and return the committed view. Failures are
/// [`bureau_core::Error`]s: `NotFound`, `PermissionDenied` and `Validation`
/// are the expected outcomes.
pub trait DocumentService {
  /// What a client submits on create and replace.
  type Payload;
  /// The assembled aggregate returned by every read.
  type View;

  fn config(&self) -> &ServiceConfig;

  async fn list(&self, limit: i64, offset: i64, subject: SubjectId) -> Result<Listing<Self::View>>;

  async fn get(&self, id: Uuid, subject: SubjectId) -> Result<Self::View>;

  async fn create(&self, payload: Self::Payload, subject: SubjectId) -> Result<Self::View>;

  async fn replace(&self, id: Uuid, payload: Self::Payload, subject: SubjectId) -> Result<Self::View>;

  async fn delete(&self, id: Uuid, subject: SubjectId) -> Result<u64>;

  /// Grant `grantee` access to a document. The caller needs `can_edit`.
  async fn share(&self, id: Uuid, grantee: SubjectId, flags: Flags, subject: SubjectId) -> Result<()>;

  async fn readers(&self, id: Uuid, subject: SubjectId) -> Result<Vec<PermissionRecord>>;

  /// The first page at the configured default size.
  async fn first_page(&self, subject: SubjectId) -> Result<Listing<Self::View>> {
    self.list(self.config().default_page_size, 0, subject).await
  }
}
