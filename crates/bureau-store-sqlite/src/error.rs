//! Error type for `bureau-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] bureau_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A statement inside a write transaction failed and the transaction was
  /// rolled back.
  #[error("transaction on {table} rolled back: {source}")]
  Transaction {
    table:  &'static str,
    #[source]
    source: tokio_rusqlite::Error,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl From<Error> for bureau_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(e) => e,
      Error::Json(e) => Self::Serialization(e),
      e @ Error::Transaction { .. } => Self::Transaction(Box::new(e)),
      other => Self::Storage(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
