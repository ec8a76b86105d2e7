//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings and document bodies as compact JSON.

use bureau_core::{
  Audit, Document, Entity, PermissionRecord, SubjectId,
  reference::{Department, Label, Subject, TaskType},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON scalars ────────────────────────────────────────────────────────────

/// The SQL value `json_extract` yields for a JSON scalar, so the two compare
/// equal.
pub fn json_scalar(value: serde_json::Value) -> rusqlite::types::Value {
  use rusqlite::types::Value as Sql;
  use serde_json::Value as Json;

  match value {
    Json::Null => Sql::Null,
    Json::Bool(b) => Sql::Integer(b.into()),
    Json::Number(n) => match n.as_i64() {
      Some(i) => Sql::Integer(i),
      None => n.as_f64().map_or(Sql::Null, Sql::Real),
    },
    Json::String(s) => Sql::Text(s),
    other => Sql::Text(other.to_string()),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw columns of one primary-table row plus its label ids.
pub struct RawDocument {
  pub id:            String,
  pub author:        i64,
  pub reg_date:      String,
  pub last_mod_user: i64,
  pub last_mod_date: String,
  pub body_json:     String,
  pub labels:        Vec<String>,
}

impl RawDocument {
  /// Column list matching [`RawDocument::from_row`], for a table aliased `d`.
  pub const COLUMNS: &'static str =
    "d.id, d.author, d.reg_date, d.last_mod_user, d.last_mod_date, d.body_json";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      author:        row.get(1)?,
      reg_date:      row.get(2)?,
      last_mod_user: row.get(3)?,
      last_mod_date: row.get(4)?,
      body_json:     row.get(5)?,
      labels:        Vec::new(),
    })
  }

  pub fn into_document<T: Entity>(self) -> Result<Document<T>> {
    let labels = self
      .labels
      .iter()
      .map(String::as_str)
      .map(decode_uuid)
      .collect::<Result<Vec<_>>>()?;

    Ok(Document {
      id: decode_uuid(&self.id)?,
      audit: Audit {
        author:        SubjectId(self.author),
        reg_date:      decode_dt(&self.reg_date)?,
        last_modifier: SubjectId(self.last_mod_user),
        last_mod_date: decode_dt(&self.last_mod_date)?,
      },
      labels,
      body: serde_json::from_str(&self.body_json)?,
    })
  }
}

/// Raw columns of a `<entity>_readers` row.
pub struct RawPermission {
  pub reader:     i64,
  pub entity_id:  String,
  pub can_read:   bool,
  pub can_edit:   bool,
  pub can_delete: bool,
}

impl RawPermission {
  pub const COLUMNS: &'static str = "reader, entity_id, can_read, can_edit, can_delete";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      reader:     row.get(0)?,
      entity_id:  row.get(1)?,
      can_read:   row.get(2)?,
      can_edit:   row.get(3)?,
      can_delete: row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<PermissionRecord> {
    Ok(PermissionRecord {
      subject:    SubjectId(self.reader),
      entity_id:  decode_uuid(&self.entity_id)?,
      can_read:   self.can_read,
      can_edit:   self.can_edit,
      can_delete: self.can_delete,
    })
  }
}

pub struct RawLabel {
  pub id:         String,
  pub identifier: String,
  pub color:      Option<String>,
}

impl RawLabel {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { id: row.get(0)?, identifier: row.get(1)?, color: row.get(2)? })
  }

  pub fn into_label(self) -> Result<Label> {
    Ok(Label {
      id:         decode_uuid(&self.id)?,
      identifier: self.identifier,
      color:      self.color,
    })
  }
}

pub struct RawTaskType {
  pub id:         String,
  pub identifier: String,
  pub name:       String,
}

impl RawTaskType {
  pub fn into_task_type(self) -> Result<TaskType> {
    Ok(TaskType {
      id:         decode_uuid(&self.id)?,
      identifier: self.identifier,
      name:       self.name,
    })
  }
}

pub struct RawDepartment {
  pub id:           String,
  pub identifier:   String,
  pub name:         String,
  pub organization: Option<String>,
}

impl RawDepartment {
  pub fn into_department(self) -> Result<Department> {
    Ok(Department {
      id:           decode_uuid(&self.id)?,
      identifier:   self.identifier,
      name:         self.name,
      organization: self.organization.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

pub fn subject_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subject> {
  Ok(Subject {
    id:           SubjectId(row.get(0)?),
    login:        row.get(1)?,
    display_name: row.get(2)?,
  })
}
