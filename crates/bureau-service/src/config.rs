//! Service configuration.
//!
//! Read from an optional TOML file, then overridden by `BUREAU_*` environment
//! variables. Every key has a default, so an empty configuration is valid.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
  /// SQLite database file opened by [`Bureau::open`](crate::Bureau::open).
  pub store_path:        PathBuf,
  /// Ceiling on rows assembled concurrently within one page. It counts rows,
  /// not store calls: each row in flight still fetches its own slots side by
  /// side, so the number of overlapping store calls can reach this value times
  /// the slot count of the entity.
  pub page_concurrency:  usize,
  /// Limit used by [`DocumentService::first_page`](crate::DocumentService::first_page).
  pub default_page_size: i64,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      store_path:        PathBuf::from("bureau.db"),
      page_concurrency:  8,
      default_page_size: 20,
    }
  }
}

impl ServiceConfig {
  /// Layer `path` (if it exists) and the environment over the defaults.
  pub fn load(path: Option<&Path>) -> Result<Self, ::config::ConfigError> {
    let mut builder = ::config::Config::builder();
    if let Some(path) = path {
      builder = builder.add_source(::config::File::from(path.to_path_buf()).required(false));
    }
    builder
      .add_source(::config::Environment::with_prefix("BUREAU"))
      .build()?
      .try_deserialize()
  }

  /// The page ceiling, never below one.
  pub fn page_concurrency(&self) -> usize { self.page_concurrency.max(1) }
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = ServiceConfig::load(Some(Path::new("/nonexistent/bureau.toml"))).unwrap();
    assert_eq!(cfg.page_concurrency, 8);
    assert_eq!(cfg.default_page_size, 20);
  }

  #[test]
  fn file_values_override_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "page_concurrency = 3\nstore_path = \"/tmp/x.db\"").unwrap();

    let cfg = ServiceConfig::load(Some(file.path())).unwrap();
    assert_eq!(cfg.page_concurrency, 3);
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/x.db"));
    assert_eq!(cfg.default_page_size, 20);
  }

  #[test]
  fn zero_concurrency_is_clamped() {
    let cfg = ServiceConfig { page_concurrency: 0, ..Default::default() };
    assert_eq!(cfg.page_concurrency(), 1);
  }
}
