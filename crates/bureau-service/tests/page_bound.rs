//! The page-level concurrency ceiling, observed through a store wrapper that
//! records how many per-row fetches overlap.

use std::{
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use bureau_core::{
  Capability, Document, Draft, Entity, EntityTable, PermissionRecord, SubjectId,
  model::Organization,
  reference::{Department, Label, Subject, TaskType},
  store::DocumentStore,
};
use bureau_service::{Bureau, DocumentService, ServiceConfig};
use bureau_store_sqlite::{Error, SqliteStore};
use uuid::Uuid;

/// Delegates to SQLite, holding every `list_readers` call open briefly so
/// overlapping calls are observable.
struct Gauged {
  inner:     SqliteStore,
  in_flight: AtomicUsize,
  peak:      AtomicUsize,
}

impl Gauged {
  fn new(inner: SqliteStore) -> Self {
    Self { inner, in_flight: AtomicUsize::new(0), peak: AtomicUsize::new(0) }
  }
}

impl DocumentStore for Gauged {
  type Error = Error;

  async fn has_capability(
    &self,
    table: EntityTable,
    subject: SubjectId,
    entity_id: Uuid,
    capability: Capability,
  ) -> bool {
    self.inner.has_capability(table, subject, entity_id, capability).await
  }

  async fn list_readers(&self, table: EntityTable, entity_id: Uuid) -> Result<Vec<PermissionRecord>, Error> {
    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(20)).await;
    let result = self.inner.list_readers(table, entity_id).await;
    self.in_flight.fetch_sub(1, Ordering::SeqCst);
    result
  }

  async fn grant(&self, table: EntityTable, record: PermissionRecord) -> Result<(), Error> {
    self.inner.grant(table, record).await
  }

  async fn get_page<T: Entity>(
    &self,
    limit: i64,
    offset: i64,
    subject: SubjectId,
  ) -> Result<Vec<Document<T>>, Error> {
    self.inner.get_page(limit, offset, subject).await
  }

  async fn get_by_id<T: Entity>(&self, id: Uuid, subject: SubjectId) -> Result<Document<T>, Error> {
    self.inner.get_by_id(id, subject).await
  }

  async fn find_by_field<T: Entity>(
    &self,
    field: &'static str,
    value: serde_json::Value,
    subject: SubjectId,
  ) -> Result<Option<Document<T>>, Error> {
    self.inner.find_by_field(field, value, subject).await
  }

  async fn search<T: Entity>(&self, keyword: String, subject: SubjectId) -> Result<Vec<Document<T>>, Error> {
    self.inner.search(keyword, subject).await
  }

  async fn count<T: Entity>(&self, subject: SubjectId) -> Result<u64, Error> {
    self.inner.count::<T>(subject).await
  }

  async fn insert<T: Entity>(&self, draft: Draft<T>, author: SubjectId) -> Result<Document<T>, Error> {
    self.inner.insert(draft, author).await
  }

  async fn update<T: Entity>(
    &self,
    id: Uuid,
    draft: Draft<T>,
    editor: SubjectId,
  ) -> Result<Document<T>, Error> {
    self.inner.update(id, draft, editor).await
  }

  async fn delete<T: Entity>(&self, id: Uuid, subject: SubjectId) -> Result<u64, Error> {
    self.inner.delete::<T>(id, subject).await
  }

  async fn get_label(&self, id: Uuid) -> Result<Option<Label>, Error> { self.inner.get_label(id).await }

  async fn labels_of<T: Entity>(&self, id: Uuid) -> Result<Vec<Label>, Error> {
    self.inner.labels_of::<T>(id).await
  }

  async fn get_task_type(&self, id: Uuid) -> Result<Option<TaskType>, Error> {
    self.inner.get_task_type(id).await
  }

  async fn get_department(&self, id: Uuid) -> Result<Option<Department>, Error> {
    self.inner.get_department(id).await
  }

  async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, Error> {
    self.inner.get_subject(id).await
  }
}

async fn peak_for(page_concurrency: usize, rows: usize) -> (usize, usize) {
  let inner = SqliteStore::open_in_memory().await.expect("in-memory store");
  let owner = inner.add_subject("owner", "Owner").await.unwrap();
  let store = Arc::new(Gauged::new(inner));
  let config = ServiceConfig { page_concurrency, ..Default::default() };
  let bureau = Bureau::new(Arc::clone(&store), config);

  for n in 0..rows {
    let org = Organization { identifier: format!("o{n}"), name: format!("Org {n}"), rank: n as i32 };
    bureau.organizations.create(org, owner.id).await.unwrap();
  }
  store.peak.store(0, Ordering::SeqCst);

  let page = bureau.organizations.list(0, 0, owner.id).await.unwrap();
  let order: Vec<_> = page.items.iter().map(|o| o.body.rank).collect();
  assert_eq!(order, (0..rows as i32).collect::<Vec<_>>());

  (store.peak.load(Ordering::SeqCst), page.items.len())
}

#[tokio::test]
async fn page_assembly_never_exceeds_the_ceiling() {
  let (peak, len) = peak_for(2, 6).await;
  assert_eq!(len, 6);
  assert_eq!(peak, 2);
}

#[tokio::test]
async fn a_ceiling_of_zero_still_makes_progress() {
  let (peak, len) = peak_for(0, 3).await;
  assert_eq!(len, 3);
  assert_eq!(peak, 1);
}

#[tokio::test]
async fn rows_overlap_up_to_the_ceiling() {
  let (peak, _) = peak_for(8, 4).await;
  assert_eq!(peak, 4);
}
