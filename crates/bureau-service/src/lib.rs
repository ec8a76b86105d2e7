//! Aggregation services over a [`DocumentStore`].
//!
//! Each entity type gets a service implementing [`DocumentService`]. Reads
//! join the primary document with its related entities, fetched concurrently;
//! writes resolve every supplied reference before the repository is touched.

#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod employee;
pub mod error;
pub mod project;
pub mod service;
pub mod task;

use std::{path::Path, sync::Arc};

use bureau_core::{
  model::{Module, Organization, Position},
  store::DocumentStore,
};
use bureau_store_sqlite::SqliteStore;

pub use self::{
  aggregate::{Flags, Listing},
  catalog::CatalogService,
  config::ServiceConfig,
  employee::EmployeeService,
  project::ProjectService,
  service::DocumentService,
  task::TaskService,
};

/// Every entity service, sharing one store and one configuration.
pub struct Bureau<S> {
  store:             Arc<S>,
  pub tasks:         TaskService<S>,
  pub projects:      ProjectService<S>,
  pub employees:     EmployeeService<S>,
  pub organizations: CatalogService<S, Organization>,
  pub positions:     CatalogService<S, Position>,
  pub modules:       CatalogService<S, Module>,
}

impl<S: DocumentStore> Bureau<S> {
  pub fn new(store: Arc<S>, config: ServiceConfig) -> Self {
    let config = Arc::new(config);
    Self {
      tasks: TaskService::new(Arc::clone(&store), Arc::clone(&config)),
      projects: ProjectService::new(Arc::clone(&store), Arc::clone(&config)),
      employees: EmployeeService::new(Arc::clone(&store), Arc::clone(&config)),
      organizations: CatalogService::new(Arc::clone(&store), Arc::clone(&config)),
      positions: CatalogService::new(Arc::clone(&store), Arc::clone(&config)),
      modules: CatalogService::new(Arc::clone(&store), config),
      store,
    }
  }

  /// The underlying store, for seeding reference data.
  pub fn store(&self) -> &S { &self.store }
}

impl Bureau<SqliteStore> {
  /// Open the SQLite store named by `config.store_path`.
  pub async fn open(config: ServiceConfig) -> error::Result<Self> {
    let store = SqliteStore::open(&config.store_path).await?;
    tracing::info!(path = %config.store_path.display(), page_concurrency = config.page_concurrency(), "bureau opened");
    Ok(Self::new(Arc::new(store), config))
  }

  /// Read configuration from `path` and the environment, then open.
  pub async fn load(path: Option<&Path>) -> error::Result<Self> {
    Self::open(ServiceConfig::load(path)?).await
  }
}
