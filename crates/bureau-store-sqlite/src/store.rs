//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`].

use std::path::Path;

use bureau_core::{
  Capability, Document, Draft, Entity, EntityTable, PermissionRecord, SubjectId,
  reference::{Department, Label, Subject, TaskType},
  store::DocumentStore,
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawDepartment, RawLabel, RawTaskType, encode_uuid, subject_from_row,
  },
  schema::schema,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Bureau document store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// are serialised through the connection's worker thread, so each write
/// transaction runs to completion before the next statement starts.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let sql = schema();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Reference data ────────────────────────────────────────────────────────

  /// Register a directory subject. The id is assigned by the store.
  pub async fn add_subject(
    &self,
    login: impl Into<String>,
    display_name: impl Into<String>,
  ) -> Result<Subject> {
    let login = login.into();
    let display_name = display_name.into();

    let (login, display_name, id) = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (login, display_name) VALUES (?1, ?2)",
          rusqlite::params![login, display_name],
        )?;
        let id = conn.last_insert_rowid();
        Ok((login, display_name, id))
      })
      .await?;

    Ok(Subject { id: SubjectId(id), login, display_name })
  }

  pub async fn add_label(
    &self,
    identifier: impl Into<String>,
    color: Option<String>,
  ) -> Result<Label> {
    let label = Label { id: Uuid::new_v4(), identifier: identifier.into(), color };

    let id_str = encode_uuid(label.id);
    let identifier = label.identifier.clone();
    let color = label.color.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO labels (label_id, identifier, color) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, identifier, color],
        )?;
        Ok(())
      })
      .await?;

    Ok(label)
  }

  pub async fn add_task_type(
    &self,
    identifier: impl Into<String>,
    name: impl Into<String>,
  ) -> Result<TaskType> {
    let task_type = TaskType { id: Uuid::new_v4(), identifier: identifier.into(), name: name.into() };

    let id_str = encode_uuid(task_type.id);
    let identifier = task_type.identifier.clone();
    let name = task_type.name.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO task_types (task_type_id, identifier, name) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, identifier, name],
        )?;
        Ok(())
      })
      .await?;

    Ok(task_type)
  }

  pub async fn add_department(
    &self,
    identifier: impl Into<String>,
    name: impl Into<String>,
    organization: Option<Uuid>,
  ) -> Result<Department> {
    let department = Department {
      id: Uuid::new_v4(),
      identifier: identifier.into(),
      name: name.into(),
      organization,
    };

    let id_str = encode_uuid(department.id);
    let identifier = department.identifier.clone();
    let name = department.name.clone();
    let org_str = organization.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO departments (department_id, identifier, name, organization)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, identifier, name, org_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(department)
  }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  // ── Permissions ───────────────────────────────────────────────────────────

  async fn has_capability(
    &self,
    table:      EntityTable,
    subject:    SubjectId,
    entity_id:  Uuid,
    capability: Capability,
  ) -> bool {
    self.check_capability(table, subject, entity_id, capability).await
  }

  async fn list_readers(
    &self,
    table:     EntityTable,
    entity_id: Uuid,
  ) -> Result<Vec<PermissionRecord>> {
    self.readers(table, entity_id).await
  }

  async fn grant(&self, table: EntityTable, record: PermissionRecord) -> Result<()> {
    self.upsert_permission(table, record).await
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn get_page<T: Entity>(
    &self,
    limit:   i64,
    offset:  i64,
    subject: SubjectId,
  ) -> Result<Vec<Document<T>>> {
    self.page(limit, offset, subject).await
  }

  async fn get_by_id<T: Entity>(&self, id: Uuid, subject: SubjectId) -> Result<Document<T>> {
    self.find(id, subject).await
  }

  async fn find_by_field<T: Entity>(
    &self,
    field:   &'static str,
    value:   serde_json::Value,
    subject: SubjectId,
  ) -> Result<Option<Document<T>>> {
    self.first_matching(field, value, subject).await
  }

  async fn search<T: Entity>(&self, keyword: String, subject: SubjectId) -> Result<Vec<Document<T>>> {
    self.keyword_search(keyword, subject).await
  }

  async fn count<T: Entity>(&self, subject: SubjectId) -> Result<u64> {
    self.visible_count::<T>(subject).await
  }

  async fn insert<T: Entity>(&self, draft: Draft<T>, author: SubjectId) -> Result<Document<T>> {
    self.insert_document(draft, author).await
  }

  async fn update<T: Entity>(
    &self,
    id:     Uuid,
    draft:  Draft<T>,
    editor: SubjectId,
  ) -> Result<Document<T>> {
    self.update_document(id, draft, editor).await
  }

  async fn delete<T: Entity>(&self, id: Uuid, subject: SubjectId) -> Result<u64> {
    self.delete_document::<T>(id, subject).await
  }

  // ── References ────────────────────────────────────────────────────────────

  async fn get_label(&self, id: Uuid) -> Result<Option<Label>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawLabel> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT label_id, identifier, color FROM labels WHERE label_id = ?1",
            rusqlite::params![id_str],
            RawLabel::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawLabel::into_label).transpose()
  }

  async fn labels_of<T: Entity>(&self, id: Uuid) -> Result<Vec<Label>> {
    let Some(label_table) = T::TABLE.labels else {
      return Ok(Vec::new());
    };
    let id_str = encode_uuid(id);

    let raws: Vec<RawLabel> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT l.label_id, l.identifier, l.color
           FROM {label_table} a
           JOIN labels l ON l.label_id = a.label_id
           WHERE a.entity_id = ?1
           ORDER BY a.rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawLabel::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLabel::into_label).collect()
  }

  async fn get_task_type(&self, id: Uuid) -> Result<Option<TaskType>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTaskType> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT task_type_id, identifier, name FROM task_types WHERE task_type_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawTaskType {
                id:         row.get(0)?,
                identifier: row.get(1)?,
                name:       row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawTaskType::into_task_type).transpose()
  }

  async fn get_department(&self, id: Uuid) -> Result<Option<Department>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDepartment> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT department_id, identifier, name, organization
             FROM departments WHERE department_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawDepartment {
                id:           row.get(0)?,
                identifier:   row.get(1)?,
                name:         row.get(2)?,
                organization: row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawDepartment::into_department).transpose()
  }

  // ── Directory ─────────────────────────────────────────────────────────────

  async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>> {
    Ok(self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT subject_id, login, display_name FROM subjects WHERE subject_id = ?1",
            rusqlite::params![id.0],
            subject_from_row,
          )
          .optional()?)
      })
      .await?)
  }
}
