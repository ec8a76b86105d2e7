//! SQL schema for the Bureau SQLite store.
//!
//! Reference tables are static DDL. Document tables are generated from each
//! entity type's [`EntityTable`] so every type gets the same three-table
//! layout. Executed once at connection startup; idempotent thanks to
//! `CREATE TABLE IF NOT EXISTS`.

use bureau_core::{
  Entity, EntityTable,
  model::{Employee, Module, Organization, Position, Project, Task},
};

/// Connection settings and unprotected reference tables.
const REFERENCE_SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS subjects (
    subject_id   INTEGER PRIMARY KEY,
    login        TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS labels (
    label_id   TEXT PRIMARY KEY,
    identifier TEXT NOT NULL UNIQUE,
    color      TEXT
);

CREATE TABLE IF NOT EXISTS task_types (
    task_type_id TEXT PRIMARY KEY,
    identifier   TEXT NOT NULL UNIQUE,
    name         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS departments (
    department_id TEXT PRIMARY KEY,
    identifier    TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL,
    organization  TEXT
);
";

/// Every document table the store manages.
pub const DOCUMENT_TABLES: [EntityTable; 6] = [
  Organization::TABLE,
  Position::TABLE,
  Employee::TABLE,
  Project::TABLE,
  Task::TABLE,
  Module::TABLE,
];

/// DDL for one document type: primary table, readers table and, if declared,
/// the label association table.
pub fn document_ddl(table: EntityTable) -> String {
  let EntityTable { name, readers, labels } = table;

  // Audit columns are server-set; the business body is stored as JSON.
  let mut ddl = format!(
    "
CREATE TABLE IF NOT EXISTS {name} (
    id            TEXT PRIMARY KEY,
    author        INTEGER NOT NULL,
    reg_date      TEXT NOT NULL,
    last_mod_user INTEGER NOT NULL,
    last_mod_date TEXT NOT NULL,
    body_json     TEXT NOT NULL
);

-- At most one record per (reader, entity).
CREATE TABLE IF NOT EXISTS {readers} (
    reader     INTEGER NOT NULL,
    entity_id  TEXT NOT NULL REFERENCES {name}(id) ON DELETE CASCADE,
    can_read   INTEGER NOT NULL DEFAULT 1,
    can_edit   INTEGER NOT NULL DEFAULT 0,
    can_delete INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (reader, entity_id)
);

CREATE INDEX IF NOT EXISTS {readers}_entity_idx ON {readers}(entity_id);
"
  );

  if let Some(labels) = labels {
    ddl.push_str(&format!(
      "
CREATE TABLE IF NOT EXISTS {labels} (
    entity_id TEXT NOT NULL REFERENCES {name}(id) ON DELETE CASCADE,
    label_id  TEXT NOT NULL REFERENCES labels(label_id),
    PRIMARY KEY (entity_id, label_id)
);
"
    ));
  }

  ddl
}

/// The complete schema batch.
pub fn schema() -> String {
  let mut sql = REFERENCE_SCHEMA.to_owned();
  for table in DOCUMENT_TABLES {
    sql.push_str(&document_ddl(table));
  }
  sql.push_str("\nPRAGMA user_version = 1;\n");
  sql
}
