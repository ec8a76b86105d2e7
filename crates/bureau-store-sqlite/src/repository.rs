//! The generic document repository.
//!
//! One implementation serves every [`Entity`]; the tables it touches come from
//! `T::TABLE`. Reads join the primary table with its readers table so only
//! documents the subject may read are ever returned. Writes run inside a
//! single SQLite transaction that is rolled back on drop if any statement
//! fails.

use bureau_core::{Capability, Document, Draft, Entity, EntityTable, PermissionRecord, SubjectId};
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RawDocument, encode_dt, encode_uuid, json_scalar},
  permissions::upsert_sql,
  store::SqliteStore,
};

// ─── Statement helpers ───────────────────────────────────────────────────────

/// Label ids of one document, in association order.
fn load_labels(
  conn:   &rusqlite::Connection,
  labels: &str,
  id:     &str,
) -> rusqlite::Result<Vec<String>> {
  let mut stmt =
    conn.prepare(&format!("SELECT label_id FROM {labels} WHERE entity_id = ?1 ORDER BY rowid"))?;
  let rows = stmt
    .query_map(rusqlite::params![id], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(rows)
}

/// Insert one association row per label. Duplicate ids collapse; unknown ids
/// violate the foreign key and abort the enclosing transaction.
fn insert_labels(
  conn:   &rusqlite::Connection,
  labels: &str,
  id:     &str,
  set:    &[String],
) -> rusqlite::Result<()> {
  let mut stmt =
    conn.prepare(&format!("INSERT OR IGNORE INTO {labels} (entity_id, label_id) VALUES (?1, ?2)"))?;
  for label in set {
    stmt.execute(rusqlite::params![id, label])?;
  }
  Ok(())
}

fn reject_unlabelled(table: EntityTable, labels: Option<&Vec<Uuid>>) -> Result<()> {
  match (table.labels, labels) {
    (None, Some(set)) if !set.is_empty() => Err(Error::Core(bureau_core::Error::Validation(
      format!("{} does not carry labels", table.name),
    ))),
    _ => Ok(()),
  }
}

impl SqliteStore {
  /// Log a failed write transaction with full context and wrap it.
  fn transaction_failed(
    table:   EntityTable,
    op:      &'static str,
    subject: SubjectId,
    source:  tokio_rusqlite::Error,
  ) -> Error {
    tracing::error!(
      table = table.name,
      op,
      %subject,
      error = %source,
      "write transaction rolled back"
    );
    Error::Transaction { table: table.name, source }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub(crate) async fn page<T: Entity>(
    &self,
    limit:   i64,
    offset:  i64,
    subject: SubjectId,
  ) -> Result<Vec<Document<T>>> {
    let table = T::TABLE;
    // SQLite treats a negative LIMIT as "no limit".
    let (limit, offset) = if limit > 0 { (limit, offset.max(0)) } else { (-1, 0) };

    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {cols}
           FROM {name} d
           JOIN {readers} r ON r.entity_id = d.id
           WHERE r.reader = ?1 AND r.can_read = 1
           ORDER BY d.rowid
           LIMIT ?2 OFFSET ?3",
          cols = RawDocument::COLUMNS,
          name = table.name,
          readers = table.readers,
        ))?;
        let mut rows = stmt
          .query_map(rusqlite::params![subject.0, limit, offset], RawDocument::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        if let Some(labels) = table.labels {
          for raw in &mut rows {
            raw.labels = load_labels(conn, labels, &raw.id)?;
          }
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  pub(crate) async fn find<T: Entity>(
    &self,
    id:      Uuid,
    subject: SubjectId,
  ) -> Result<Document<T>> {
    let table = T::TABLE;
    let id_str = encode_uuid(id);

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!(
              "SELECT {cols}
               FROM {name} d
               JOIN {readers} r ON r.entity_id = d.id
               WHERE r.reader = ?1 AND r.can_read = 1 AND d.id = ?2",
              cols = RawDocument::COLUMNS,
              name = table.name,
              readers = table.readers,
            ),
            rusqlite::params![subject.0, id_str],
            RawDocument::from_row,
          )
          .optional()?;

        let Some(mut raw) = raw else { return Ok(None) };
        if let Some(labels) = table.labels {
          raw.labels = load_labels(conn, labels, &raw.id)?;
        }
        Ok(Some(raw))
      })
      .await?;

    match raw {
      Some(raw) => raw.into_document(),
      None => {
        tracing::debug!(table = table.name, %id, %subject, "document not visible");
        Err(Error::Core(bureau_core::Error::NotFound(id)))
      }
    }
  }

  pub(crate) async fn first_matching<T: Entity>(
    &self,
    field:   &'static str,
    value:   serde_json::Value,
    subject: SubjectId,
  ) -> Result<Option<Document<T>>> {
    let table = T::TABLE;
    let path = format!("$.{field}");
    let value = json_scalar(value);

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!(
              "SELECT {cols}
               FROM {name} d
               JOIN {readers} r ON r.entity_id = d.id
               WHERE r.reader = ?1 AND r.can_read = 1
                 AND json_extract(d.body_json, ?2) = ?3
               ORDER BY d.rowid
               LIMIT 1",
              cols = RawDocument::COLUMNS,
              name = table.name,
              readers = table.readers,
            ),
            rusqlite::params![subject.0, path, value],
            RawDocument::from_row,
          )
          .optional()?;

        let Some(mut raw) = raw else { return Ok(None) };
        if let Some(labels) = table.labels {
          raw.labels = load_labels(conn, labels, &raw.id)?;
        }
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  pub(crate) async fn keyword_search<T: Entity>(
    &self,
    keyword: String,
    subject: SubjectId,
  ) -> Result<Vec<Document<T>>> {
    let table = T::TABLE;
    let keyword = keyword.to_ascii_lowercase();

    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {cols}
           FROM {name} d
           JOIN {readers} r ON r.entity_id = d.id
           WHERE r.reader = ?1 AND r.can_read = 1
             AND (instr(lower(coalesce(json_extract(d.body_json, '$.identifier'), '')), ?2) > 0
               OR instr(lower(coalesce(json_extract(d.body_json, '$.name'), '')), ?2) > 0)
           ORDER BY d.rowid",
          cols = RawDocument::COLUMNS,
          name = table.name,
          readers = table.readers,
        ))?;
        let mut rows = stmt
          .query_map(rusqlite::params![subject.0, keyword], RawDocument::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        if let Some(labels) = table.labels {
          for raw in &mut rows {
            raw.labels = load_labels(conn, labels, &raw.id)?;
          }
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  pub(crate) async fn visible_count<T: Entity>(&self, subject: SubjectId) -> Result<u64> {
    let table = T::TABLE;

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "SELECT COUNT(*)
             FROM {name} d
             JOIN {readers} r ON r.entity_id = d.id
             WHERE r.reader = ?1 AND r.can_read = 1",
            name = table.name,
            readers = table.readers,
          ),
          rusqlite::params![subject.0],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(count.max(0) as u64)
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  pub(crate) async fn insert_document<T: Entity>(
    &self,
    draft:  Draft<T>,
    author: SubjectId,
  ) -> Result<Document<T>> {
    let table = T::TABLE;
    reject_unlabelled(table, draft.labels.as_ref())?;

    let id = Uuid::new_v4();
    let id_str = encode_uuid(id);
    let now_str = encode_dt(Utc::now());
    let body_json = serde_json::to_string(&draft.body)?;
    let labels: Vec<String> = draft.labels.unwrap_or_default().into_iter().map(encode_uuid).collect();
    let owner = PermissionRecord::owner(author, id);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          &format!(
            "INSERT INTO {} (id, author, reg_date, last_mod_user, last_mod_date, body_json)
             VALUES (?1, ?2, ?3, ?2, ?3, ?4)",
            table.name,
          ),
          rusqlite::params![id_str, author.0, now_str, body_json],
        )?;
        tx.execute(
          &upsert_sql(table),
          rusqlite::params![author.0, id_str, owner.can_read, owner.can_edit, owner.can_delete],
        )?;
        if let Some(label_table) = table.labels {
          insert_labels(&tx, label_table, &id_str, &labels)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(|source| Self::transaction_failed(table, "insert", author, source))?;

    tracing::debug!(table = table.name, kind = T::KIND, %id, subject = %author, "document inserted");
    self.find(id, author).await
  }

  pub(crate) async fn update_document<T: Entity>(
    &self,
    id:     Uuid,
    draft:  Draft<T>,
    editor: SubjectId,
  ) -> Result<Document<T>> {
    let table = T::TABLE;

    // Permission first, existence second.
    self.require_capability(table, editor, id, Capability::Edit).await?;
    reject_unlabelled(table, draft.labels.as_ref())?;

    let id_str = encode_uuid(id);
    let now_str = encode_dt(Utc::now());
    let body_json = serde_json::to_string(&draft.body)?;
    let labels: Option<Vec<String>> =
      draft.labels.map(|set| set.into_iter().map(encode_uuid).collect());

    let updated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          &format!(
            "UPDATE {} SET body_json = ?1, last_mod_user = ?2, last_mod_date = ?3 WHERE id = ?4",
            table.name,
          ),
          rusqlite::params![body_json, editor.0, now_str, id_str],
        )?;
        if changed == 0 {
          // Dropping `tx` rolls back.
          return Ok(false);
        }

        if let (Some(label_table), Some(set)) = (table.labels, labels) {
          tx.execute(
            &format!("DELETE FROM {label_table} WHERE entity_id = ?1"),
            rusqlite::params![id_str],
          )?;
          insert_labels(&tx, label_table, &id_str, &set)?;
        }
        tx.commit()?;
        Ok(true)
      })
      .await
      .map_err(|source| Self::transaction_failed(table, "update", editor, source))?;

    if !updated {
      tracing::debug!(table = table.name, %id, subject = %editor, "update matched no row");
      return Err(Error::Core(bureau_core::Error::NotFound(id)));
    }

    tracing::debug!(table = table.name, kind = T::KIND, %id, subject = %editor, "document updated");
    self.find(id, editor).await
  }

  pub(crate) async fn delete_document<T: Entity>(
    &self,
    id:      Uuid,
    subject: SubjectId,
  ) -> Result<u64> {
    let table = T::TABLE;
    self.require_capability(table, subject, id, Capability::Delete).await?;

    let id_str = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(label_table) = table.labels {
          tx.execute(
            &format!("DELETE FROM {label_table} WHERE entity_id = ?1"),
            rusqlite::params![id_str],
          )?;
        }
        tx.execute(
          &format!("DELETE FROM {} WHERE entity_id = ?1", table.readers),
          rusqlite::params![id_str],
        )?;
        let removed =
          tx.execute(&format!("DELETE FROM {} WHERE id = ?1", table.name), rusqlite::params![id_str])?;
        tx.commit()?;
        Ok(removed)
      })
      .await
      .map_err(|source| Self::transaction_failed(table, "delete", subject, source))?;

    tracing::debug!(table = table.name, kind = T::KIND, %id, %subject, removed, "document deleted");
    Ok(removed as u64)
  }
}
