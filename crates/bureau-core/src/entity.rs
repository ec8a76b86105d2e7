//! The document envelope shared by every protected entity type.
//!
//! A [`Document`] pairs server-set identity and audit metadata with a
//! type-specific body. Which tables hold the body, its permission records and
//! its label associations is declared once per type through [`EntityTable`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

// ─── Subjects ────────────────────────────────────────────────────────────────

/// The acting identity for audit stamping and permission checks.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SubjectId(pub i64);

impl fmt::Display for SubjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Table metadata ──────────────────────────────────────────────────────────

/// Storage layout of one entity type: a primary table, its permission side
/// table and, optionally, a label association table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityTable {
  pub name:    &'static str,
  pub readers: &'static str,
  pub labels:  Option<&'static str>,
}

/// A business object stored through the generic document repository.
pub trait Entity:
  Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
  /// Human-readable type name used in log fields.
  const KIND: &'static str;
  const TABLE: EntityTable;
}

// ─── Envelope ────────────────────────────────────────────────────────────────

/// Server-set audit metadata. Never client-writable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
  pub author:        SubjectId,
  pub reg_date:      DateTime<Utc>,
  pub last_modifier: SubjectId,
  pub last_mod_date: DateTime<Utc>,
}

/// A persisted document as seen by one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document<T> {
  pub id:     Uuid,
  pub audit:  Audit,
  /// Associated label ids, in insertion order. Always empty for types whose
  /// table has no label association.
  pub labels: Vec<Uuid>,
  pub body:   T,
}

/// The client-writable part of a document.
#[derive(Debug, Clone)]
pub struct Draft<T> {
  pub body:   T,
  /// On insert `None` means no labels. On update `None` leaves the stored
  /// associations untouched and `Some` replaces them wholesale.
  pub labels: Option<Vec<Uuid>>,
}

impl<T> Draft<T> {
  pub fn new(body: T) -> Self { Self { body, labels: None } }

  pub fn with_labels(mut self, labels: Vec<Uuid>) -> Self {
    self.labels = Some(labels);
    self
  }
}
