//! The permission store: reads and upserts against `<entity>_readers` tables.

use bureau_core::{Capability, EntityTable, PermissionRecord, SubjectId};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RawPermission, encode_uuid},
  store::SqliteStore,
};

/// Upsert statement for a readers table. Parameters:
/// `(reader, entity_id, can_read, can_edit, can_delete)`.
pub(crate) fn upsert_sql(table: EntityTable) -> String {
  format!(
    "INSERT INTO {readers} (reader, entity_id, can_read, can_edit, can_delete)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (reader, entity_id) DO UPDATE SET
       can_read   = excluded.can_read,
       can_edit   = excluded.can_edit,
       can_delete = excluded.can_delete",
    readers = table.readers,
  )
}

impl SqliteStore {
  /// The record for `(subject, entity_id)`, if any.
  pub(crate) async fn read_permission(
    &self,
    table:     EntityTable,
    subject:   SubjectId,
    entity_id: Uuid,
  ) -> Result<Option<PermissionRecord>> {
    let id_str = encode_uuid(entity_id);

    let raw: Option<RawPermission> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {} FROM {} WHERE reader = ?1 AND entity_id = ?2",
              RawPermission::COLUMNS,
              table.readers,
            ),
            rusqlite::params![subject.0, id_str],
            RawPermission::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPermission::into_record).transpose()
  }

  /// Fail-closed capability check.
  pub(crate) async fn check_capability(
    &self,
    table:      EntityTable,
    subject:    SubjectId,
    entity_id:  Uuid,
    capability: Capability,
  ) -> bool {
    match self.read_permission(table, subject, entity_id).await {
      Ok(Some(record)) => record.allows(capability),
      Ok(None) => false,
      Err(e) => {
        tracing::warn!(
          table = table.name,
          %subject,
          entity = %entity_id,
          %capability,
          error = %e,
          "permission lookup failed; denying"
        );
        false
      }
    }
  }

  /// Like [`check_capability`](Self::check_capability) but produces the
  /// typed denial. Denials are logged server-side only.
  pub(crate) async fn require_capability(
    &self,
    table:      EntityTable,
    subject:    SubjectId,
    entity_id:  Uuid,
    capability: Capability,
  ) -> Result<()> {
    if self.check_capability(table, subject, entity_id, capability).await {
      return Ok(());
    }

    tracing::info!(
      table = table.name,
      %subject,
      entity = %entity_id,
      %capability,
      "permission denied"
    );
    Err(Error::Core(bureau_core::Error::PermissionDenied {
      subject,
      entity: entity_id,
      capability,
    }))
  }

  pub(crate) async fn readers(
    &self,
    table:     EntityTable,
    entity_id: Uuid,
  ) -> Result<Vec<PermissionRecord>> {
    let id_str = encode_uuid(entity_id);

    let raws: Vec<RawPermission> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM {} WHERE entity_id = ?1 ORDER BY rowid",
          RawPermission::COLUMNS,
          table.readers,
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawPermission::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPermission::into_record).collect()
  }

  pub(crate) async fn upsert_permission(
    &self,
    table:  EntityTable,
    record: PermissionRecord,
  ) -> Result<()> {
    let PermissionRecord { subject, entity_id, can_read, can_edit, can_delete } = record;
    let id_str = encode_uuid(entity_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &upsert_sql(table),
          rusqlite::params![subject.0, id_str, can_read, can_edit, can_delete],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(
      table = table.readers,
      %subject,
      entity = %entity_id,
      can_read,
      can_edit,
      can_delete,
      "permission granted"
    );
    Ok(())
  }
}
