//! Reference data: unprotected single-table lookups that documents point at.
//!
//! None of these carry permission records; any subject may resolve them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::SubjectId;

/// A directory entry for an acting identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub id:           SubjectId,
  pub login:        String,
  pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
  pub id:         Uuid,
  pub identifier: String,
  pub color:      Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskType {
  pub id:         Uuid,
  pub identifier: String,
  pub name:       String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
  pub id:           Uuid,
  pub identifier:   String,
  pub name:         String,
  pub organization: Option<Uuid>,
}
