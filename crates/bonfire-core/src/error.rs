//! Error types for `bonfire-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid identifier: {0}")]
  InvalidId(#[from] uuid::Error),

  #[error("invalid location {0:?}: expected `<world> <x> <y> <z>`")]
  InvalidLocation(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
