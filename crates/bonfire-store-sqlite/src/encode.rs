//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as Unix milliseconds, durations as whole seconds,
//! and ids as hyphenated lowercase UUID strings.

use std::time::Duration;

use bonfire_core::{
  bonfire::{Bonfire, BonfireId, BonfireLocation},
  player::{PlayerBinding, PlayerId, RespawnRecord},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Ids ──────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_bonfire_id(id: BonfireId) -> String { encode_uuid(id.0) }

pub fn encode_player_id(id: PlayerId) -> String { encode_uuid(id.0) }

// ─── Time ─────────────────────────────────────────────────────────────────────

pub fn encode_ts(dt: DateTime<Utc>) -> i64 { dt.timestamp_millis() }

pub fn decode_ts(ms: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp_millis(ms).ok_or(Error::Timestamp(ms))
}

/// Sub-second precision is dropped; saturates at `i64::MAX` seconds.
pub fn encode_ttl(d: Duration) -> i64 {
  i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}

pub fn decode_ttl(secs: i64) -> Result<Duration> {
  u64::try_from(secs)
    .map(Duration::from_secs)
    .map_err(|_| Error::Corrupt(format!("negative time_until_destroy: {secs}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawBonfire::from_row`], qualified with alias `b`.
pub const BONFIRE_COLUMNS: &str =
  "b.bonfire_id, b.world, b.x, b.y, b.z, b.state_changed_at, b.time_until_destroy";

/// Raw values read directly from a `bonfires` row.
#[derive(Debug, Clone)]
pub struct RawBonfire {
  pub bonfire_id:         String,
  pub world:              String,
  pub x:                  i32,
  pub y:                  i32,
  pub z:                  i32,
  pub state_changed_at:   i64,
  pub time_until_destroy: i64,
}

impl RawBonfire {
  pub fn from_bonfire(b: &Bonfire) -> Self {
    Self {
      bonfire_id:         encode_bonfire_id(b.bonfire_id),
      world:              b.location.world.clone(),
      x:                  b.location.x,
      y:                  b.location.y,
      z:                  b.location.z,
      state_changed_at:   encode_ts(b.state_changed_at),
      time_until_destroy: encode_ttl(b.time_until_destroy),
    }
  }

  /// Read [`BONFIRE_COLUMNS`] starting at column `at`.
  pub fn from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      bonfire_id:         row.get(at)?,
      world:              row.get(at + 1)?,
      x:                  row.get(at + 2)?,
      y:                  row.get(at + 3)?,
      z:                  row.get(at + 4)?,
      state_changed_at:   row.get(at + 5)?,
      time_until_destroy: row.get(at + 6)?,
    })
  }

  pub fn into_bonfire(self) -> Result<Bonfire> {
    Ok(Bonfire {
      bonfire_id:         BonfireId(decode_uuid(&self.bonfire_id)?),
      location:           BonfireLocation::new(self.world, self.x, self.y, self.z),
      state_changed_at:   decode_ts(self.state_changed_at)?,
      time_until_destroy: decode_ttl(self.time_until_destroy)?,
    })
  }
}

/// Raw values read directly from a `player_bindings` row.
#[derive(Debug, Clone)]
pub struct RawBinding {
  pub player_id:  String,
  pub bonfire_id: String,
  pub bound_at:   i64,
}

impl RawBinding {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      player_id:  row.get(0)?,
      bonfire_id: row.get(1)?,
      bound_at:   row.get(2)?,
    })
  }

  pub fn into_binding(self) -> Result<PlayerBinding> {
    Ok(PlayerBinding {
      player_id:  PlayerId(decode_uuid(&self.player_id)?),
      bonfire_id: BonfireId(decode_uuid(&self.bonfire_id)?),
      bound_at:   decode_ts(self.bound_at)?,
    })
  }
}

/// A `player_bindings` row left-joined with `bonfires`.
pub struct RawRespawn {
  pub binding: RawBinding,
  pub bonfire: Option<RawBonfire>,
}

impl RawRespawn {
  /// Binding columns first, then [`BONFIRE_COLUMNS`] from the outer join.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    let binding = RawBinding::from_row(row)?;
    let joined: Option<String> = row.get(3)?;
    let bonfire = match joined {
      Some(_) => Some(RawBonfire::from_row(row, 3)?),
      None => None,
    };
    Ok(Self { binding, bonfire })
  }

  pub fn into_record(self) -> Result<RespawnRecord> {
    Ok(RespawnRecord {
      binding: self.binding.into_binding()?,
      bonfire: self.bonfire.map(RawBonfire::into_bonfire).transpose()?,
    })
  }
}
