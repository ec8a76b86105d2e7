//! Permission records: the per-subject, per-document access-control list.
//!
//! Permissions are not entity state. They live in a side table next to each
//! primary table and are looked up by `(subject, entity_id)`.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::entity::SubjectId;

/// A capability a subject may hold on a document.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Capability {
  Read,
  Edit,
  Delete,
}

impl Capability {
  /// Name of the readers-table column holding this flag.
  pub fn column(self) -> &'static str {
    match self {
      Self::Read => "can_read",
      Self::Edit => "can_edit",
      Self::Delete => "can_delete",
    }
  }
}

/// One row of a `<entity>_readers` table.
///
/// At most one record exists per `(subject, entity_id)`; a later grant
/// replaces the flags of an earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
  pub subject:    SubjectId,
  pub entity_id:  Uuid,
  pub can_read:   bool,
  pub can_edit:   bool,
  pub can_delete: bool,
}

impl PermissionRecord {
  /// The record inserted for a document's author at creation time.
  pub fn owner(subject: SubjectId, entity_id: Uuid) -> Self {
    Self { subject, entity_id, can_read: true, can_edit: true, can_delete: true }
  }

  /// Read-only access.
  pub fn reader(subject: SubjectId, entity_id: Uuid) -> Self {
    Self { subject, entity_id, can_read: true, can_edit: false, can_delete: false }
  }

  pub fn allows(&self, capability: Capability) -> bool {
    match capability {
      Capability::Read => self.can_read,
      Capability::Edit => self.can_edit,
      Capability::Delete => self.can_delete,
    }
  }
}
