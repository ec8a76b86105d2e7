//! SQLite backend for the Bureau document store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every entity type shares one generic
//! repository; the per-type tables are declared by
//! [`EntityTable`](bureau_core::EntityTable).

mod encode;
mod permissions;
mod repository;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
