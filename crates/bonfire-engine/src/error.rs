//! Engine error type and its caller-facing classification.

use bonfire_core::{
  bonfire::{BonfireId, BonfireLocation},
  player::PlayerId,
};
use thiserror::Error;

/// Broad class of an [`Error`], used by callers to decide how to present it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// No player, bonfire or binding matches.
  NotFound,
  /// Several players match a name.
  Ambiguous,
  /// Duplicate registration.
  AlreadyExists,
  /// The target bonfire holds its maximum number of players.
  Full,
  /// The store and the world disagree; should never happen.
  Inconsistent,
  /// I/O or transaction failure in the store.
  StorageFailure,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("no player found with name {0:?}")]
  PlayerNotFound(String),

  #[error("{count} players found with name {name:?}")]
  AmbiguousPlayer { name: String, count: usize },

  #[error("no bonfire found at {0}")]
  NoBonfireAt(BonfireLocation),

  #[error("bonfire {0} is not registered")]
  BonfireNotFound(BonfireId),

  #[error("player {0} does not have a respawn set")]
  NoRespawnSet(PlayerId),

  #[error("bonfire {0} is already registered")]
  AlreadyExists(BonfireId),

  #[error("cannot register bonfire {bonfire_id}: its location is held by bonfire {occupant}")]
  LocationTaken { bonfire_id: BonfireId, occupant: BonfireId },

  #[error("bonfire {bonfire_id} already holds {capacity} players")]
  BonfireFull { bonfire_id: BonfireId, capacity: u32 },

  #[error("player {player_id} is bound to bonfire {bonfire_id}, which is missing from the store")]
  Inconsistent { player_id: PlayerId, bonfire_id: BonfireId },

  #[error("store error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::PlayerNotFound(_)
      | Self::NoBonfireAt(_)
      | Self::BonfireNotFound(_)
      | Self::NoRespawnSet(_) => ErrorKind::NotFound,
      Self::AmbiguousPlayer { .. } => ErrorKind::Ambiguous,
      Self::AlreadyExists(_) | Self::LocationTaken { .. } => ErrorKind::AlreadyExists,
      Self::BonfireFull { .. } => ErrorKind::Full,
      Self::Inconsistent { .. } => ErrorKind::Inconsistent,
      Self::Storage(_) => ErrorKind::StorageFailure,
    }
  }

  /// Wrap a store failure, logging it. Every store call in the engine maps
  /// its error through here.
  pub(crate) fn storage<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    tracing::error!(error = %e, "store operation failed");
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
