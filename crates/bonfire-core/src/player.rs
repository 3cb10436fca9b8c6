//! Players and their respawn bindings.
//!
//! A player is identified by a stable id that survives sessions; display
//! names are resolved to ids by the host through
//! [`crate::world::PlayerDirectory`] and may be shared by several players.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  bonfire::{Bonfire, BonfireId},
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
  pub fn new_v4() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for PlayerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl FromStr for PlayerId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Ok(Self(Uuid::parse_str(s)?)) }
}

/// A player record as known to the host server, online or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownPlayer {
  pub player_id: PlayerId,
  pub name:      String,
}

/// A player's respawn point. At most one exists per player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerBinding {
  pub player_id:  PlayerId,
  pub bonfire_id: BonfireId,
  pub bound_at:   DateTime<Utc>,
}

/// A binding joined against its bonfire row.
///
/// `bonfire` is `None` only when the store has lost the row the binding
/// points at, which should never happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RespawnRecord {
  pub binding: PlayerBinding,
  pub bonfire: Option<Bonfire>,
}
