//! The `DocumentStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `bureau-store-sqlite`).
//! The aggregation services in `bureau-service` depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  entity::{Document, Draft, Entity, EntityTable, SubjectId},
  permission::{Capability, PermissionRecord},
  reference::{Department, Label, Subject, TaskType},
};

/// Abstraction over an access-controlled document store.
///
/// Every document carries a set of [`PermissionRecord`]s in a side table.
/// Reads only ever see documents the subject holds `can_read` on; writes check
/// the relevant capability before touching any row and run as one
/// transaction.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Permissions ───────────────────────────────────────────────────────

  /// Whether `subject` holds `capability` on the document `entity_id` of
  /// `table`.
  ///
  /// Fails closed: a missing record or a storage failure yields `false`.
  fn has_capability(
    &self,
    table: EntityTable,
    subject: SubjectId,
    entity_id: Uuid,
    capability: Capability,
  ) -> impl Future<Output = bool> + Send + '_;

  /// The full access-control list of a document, in insertion order.
  fn list_readers(
    &self,
    table: EntityTable,
    entity_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PermissionRecord>, Self::Error>> + Send + '_;

  /// Upsert a permission record. A later grant for the same
  /// `(subject, entity_id)` replaces the earlier flags.
  fn grant(
    &self,
    table: EntityTable,
    record: PermissionRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Document reads ───────────────────────────────────────────────────

  /// Documents visible to `subject`, oldest first. `limit <= 0` means
  /// unbounded.
  fn get_page<T: Entity>(
    &self,
    limit: i64,
    offset: i64,
    subject: SubjectId,
  ) -> impl Future<Output = Result<Vec<Document<T>>, Self::Error>> + Send + '_;

  /// A single visible document. A document the subject cannot read is
  /// reported exactly like a missing one.
  fn get_by_id<T: Entity>(
    &self,
    id: Uuid,
    subject: SubjectId,
  ) -> impl Future<Output = Result<Document<T>, Self::Error>> + Send + '_;

  /// The first visible document (oldest first) whose body field `field`
  /// equals `value`.
  fn find_by_field<T: Entity>(
    &self,
    field: &'static str,
    value: serde_json::Value,
    subject: SubjectId,
  ) -> impl Future<Output = Result<Option<Document<T>>, Self::Error>> + Send + '_;

  /// Visible documents whose `identifier` or `name` contains `keyword`,
  /// ignoring ASCII case. Oldest first.
  fn search<T: Entity>(
    &self,
    keyword: String,
    subject: SubjectId,
  ) -> impl Future<Output = Result<Vec<Document<T>>, Self::Error>> + Send + '_;

  /// A visible document by its business identifier.
  fn get_by_identifier<T: Entity>(
    &self,
    identifier: String,
    subject: SubjectId,
  ) -> impl Future<Output = Result<Option<Document<T>>, Self::Error>> + Send + '_ {
    self.find_by_field("identifier", serde_json::Value::String(identifier), subject)
  }

  /// Cardinality of the set [`get_page`](Self::get_page) draws from.
  fn count<T: Entity>(
    &self,
    subject: SubjectId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Transactional writes ────────────────────────────────────────

  /// Persist a new document, its author's owner record and its labels in
  /// one transaction, then return the committed document.
  fn insert<T: Entity>(
    &self,
    draft: Draft<T>,
    author: SubjectId,
  ) -> impl Future<Output = Result<Document<T>, Self::Error>> + Send + '_;

  /// Replace the business fields (and, if supplied, the labels) of a
  /// document.
  ///
  /// Checks `can_edit` first; then fails with not-found if the row vanished.
  fn update<T: Entity>(
    &self,
    id: Uuid,
    draft: Draft<T>,
    editor: SubjectId,
  ) -> impl Future<Output = Result<Document<T>, Self::Error>> + Send + '_;

  /// Hard-delete a document with its permission and label rows. Checks
  /// `can_delete` first. Returns the number of primary rows removed.
  fn delete<T: Entity>(
    &self,
    id: Uuid,
    subject: SubjectId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── References ────────────────────────────────────────────────────────

  fn get_label(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Label>, Self::Error>> + Send + '_;

  /// Labels associated with a document, in association order.
  fn labels_of<T: Entity>(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<Label>, Self::Error>> + Send + '_;

  fn get_task_type(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<TaskType>, Self::Error>> + Send + '_;

  fn get_department(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Department>, Self::Error>> + Send + '_;

  // ── Directory ─────────────────────────────────────────────────────────

  fn get_subject(
    &self,
    id: SubjectId,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// Display name used for audit rendering.
  fn display_name(
    &self,
    id: SubjectId,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_ {
    async move { Ok(self.get_subject(id).await?.map(|s| s.display_name)) }
  }
}
