//! Concrete document bodies.
//!
//! Each body is the client-writable business state of one entity type; the
//! envelope fields (id, audit, labels) live in [`Document`](crate::Document).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::entity::{Entity, EntityTable, SubjectId};

// ─── Statuses ────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
  #[default]
  Draft,
  InProgress,
  Done,
  Canceled,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectStatus {
  #[default]
  Draft,
  Active,
  OnHold,
  Finished,
  Canceled,
}

// ─── Projects module ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
  pub reg_number:           String,
  pub title:                String,
  pub body:                 Option<String>,
  pub assignee:             SubjectId,
  pub status:               TaskStatus,
  pub priority:             i32,
  pub start_date:           NaiveDate,
  pub target_date:          Option<NaiveDate>,
  pub project:              Uuid,
  pub task_type:            Uuid,
  pub parent:               Option<Uuid>,
  pub cancellation_comment: Option<String>,
}

impl Entity for Task {
  const KIND: &'static str = "task";
  const TABLE: EntityTable = EntityTable {
    name:    "tasks",
    readers: "task_readers",
    labels:  Some("task_labels"),
  };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  pub name:        String,
  pub status:      ProjectStatus,
  pub finish_date: Option<NaiveDate>,
  pub manager:     Option<SubjectId>,
}

impl Entity for Project {
  const KIND: &'static str = "project";
  const TABLE: EntityTable = EntityTable {
    name:    "projects",
    readers: "project_readers",
    labels:  Some("project_labels"),
  };
}

// ─── Office frame ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
  /// The directory subject this employee record describes.
  pub user:         SubjectId,
  pub identifier:   String,
  pub name:         String,
  pub phone:        Option<String>,
  pub birth_date:   Option<NaiveDate>,
  pub rank:         i32,
  pub organization: Option<Uuid>,
  pub department:   Option<Uuid>,
  pub position:     Option<Uuid>,
}

impl Entity for Employee {
  const KIND: &'static str = "employee";
  const TABLE: EntityTable = EntityTable {
    name:    "employees",
    readers: "employee_readers",
    labels:  None,
  };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
  pub identifier: String,
  pub name:       String,
  pub rank:       i32,
}

impl Entity for Organization {
  const KIND: &'static str = "organization";
  const TABLE: EntityTable = EntityTable {
    name:    "organizations",
    readers: "organization_readers",
    labels:  None,
  };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
  pub identifier: String,
  pub name:       String,
  pub rank:       i32,
}

impl Entity for Position {
  const KIND: &'static str = "position";
  const TABLE: EntityTable = EntityTable {
    name:    "positions",
    readers: "position_readers",
    labels:  None,
  };
}

// ─── Platform ────────────────────────────────────────────────────────────────

/// An installable application module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
  pub identifier:  String,
  pub name:        String,
  pub description: Option<String>,
  pub is_on:       bool,
}

impl Entity for Module {
  const KIND: &'static str = "module";
  const TABLE: EntityTable = EntityTable {
    name:    "modules",
    readers: "module_readers",
    labels:  None,
  };
}
