//! Error type for `bonfire-store-sqlite`.
//!
//! Every variant is a storage failure; expected conditions are reported
//! through the outcome types in [`bonfire_core::store`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("timestamp out of range: {0} ms")]
  Timestamp(i64),

  #[error("corrupt row: {0}")]
  Corrupt(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
