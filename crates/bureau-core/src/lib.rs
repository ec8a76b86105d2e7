//! Core types and trait definitions for the Bureau document store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::DocumentStore`]; the service layer
//! depends on that abstraction only.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod entity;
pub mod error;
pub mod model;
pub mod permission;
pub mod reference;
pub mod store;

pub use entity::{Audit, Document, Draft, Entity, EntityTable, SubjectId};
pub use error::{Error, Result};
pub use permission::{Capability, PermissionRecord};
