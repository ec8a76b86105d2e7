//! Error taxonomy shared by every layer.
//!
//! `NotFound`, `PermissionDenied` and `Validation` are expected outcomes and
//! are surfaced as typed results. `Transaction` and `Storage` wrap backend
//! failures.

use thiserror::Error;
use uuid::Uuid;

use crate::{entity::SubjectId, permission::Capability};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// The document does not exist, or the subject cannot see it. The two are
  /// deliberately indistinguishable.
  #[error("document not found: {0}")]
  NotFound(Uuid),

  #[error("subject {subject} lacks {capability} on {entity}")]
  PermissionDenied {
    subject:    SubjectId,
    entity:     Uuid,
    capability: Capability,
  },

  #[error("validation failed: {0}")]
  Validation(String),

  /// A related entity an aggregate cannot be assembled without is missing.
  #[error("required {relation} {key} is missing")]
  BrokenRelation {
    relation: &'static str,
    key:      String,
  },

  /// A statement inside a write transaction failed; nothing was committed.
  #[error("transaction failed: {0}")]
  Transaction(#[source] BoxError),

  #[error("storage error: {0}")]
  Storage(#[source] BoxError),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Whether this is one of the recoverable, caller-facing outcomes
  /// (`NotFound`, `PermissionDenied`, `Validation`).
  pub fn is_expected(&self) -> bool {
    matches!(
      self,
      Self::NotFound(_) | Self::PermissionDenied { .. } | Self::Validation(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
