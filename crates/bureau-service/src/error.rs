//! Errors raised while wiring services together.
//!
//! Operations themselves return [`bureau_core::Error`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("configuration error: {0}")]
  Config(#[from] ::config::ConfigError),

  #[error("store error: {0}")]
  Store(#[from] bureau_store_sqlite::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
