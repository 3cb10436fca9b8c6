//! Bonfire types — the persisted record behind a physical bonfire in the
//! world.
//!
//! A bonfire row exists exactly as long as its physical object does. While no
//! player is bound to it, the expiry clock runs from `state_changed_at`; once
//! `state_changed_at + time_until_destroy` has passed, the sweeper removes it.

use std::{fmt, str::FromStr, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Identity of the in-world object backing a bonfire. Assigned by the world
/// when the object is created and stable across restarts.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BonfireId(pub Uuid);

impl BonfireId {
  pub fn new_v4() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for BonfireId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl FromStr for BonfireId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Ok(Self(Uuid::parse_str(s)?)) }
}

// ─── Location ────────────────────────────────────────────────────────────────

/// A block coordinate inside a named world.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BonfireLocation {
  pub world: String,
  pub x:     i32,
  pub y:     i32,
  pub z:     i32,
}

impl BonfireLocation {
  pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
    Self { world: world.into(), x, y, z }
  }
}

impl fmt::Display for BonfireLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({}, {}, {})", self.world, self.x, self.y, self.z)
  }
}

/// Parses the whitespace-separated form `<world> <x> <y> <z>`.
impl FromStr for BonfireLocation {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidLocation(s.to_owned());
    let parts: Vec<&str> = s.split_whitespace().collect();
    let [world, x, y, z] = parts.as_slice() else {
      return Err(invalid());
    };
    let coord = |v: &str| v.parse::<i32>().map_err(|_| invalid());
    Ok(Self::new(*world, coord(x)?, coord(y)?, coord(z)?))
  }
}

// ─── Bonfire ─────────────────────────────────────────────────────────────────

/// One row per physical bonfire object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bonfire {
  pub bonfire_id:         BonfireId,
  pub location:           BonfireLocation,
  /// Creation time, or the last time the bonfire lost its final binding.
  pub state_changed_at:   DateTime<Utc>,
  pub time_until_destroy: Duration,
}

impl Bonfire {
  /// A freshly placed bonfire whose expiry clock starts at `now`.
  pub fn new(
    bonfire_id: BonfireId,
    location: BonfireLocation,
    now: DateTime<Utc>,
    time_until_destroy: Duration,
  ) -> Self {
    Self { bonfire_id, location, state_changed_at: now, time_until_destroy }
  }

  /// The instant after which an unbound bonfire may be removed. `None` when
  /// the deadline does not fit in a timestamp, i.e. the bonfire never expires.
  pub fn deadline(&self) -> Option<DateTime<Utc>> {
    let ttl = TimeDelta::from_std(self.time_until_destroy).ok()?;
    self.state_changed_at.checked_add_signed(ttl)
  }

  /// Whether the expiry deadline has passed. Says nothing about bindings;
  /// only orphaned bonfires are ever considered for expiry.
  pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
    self.deadline().is_some_and(|deadline| now >= deadline)
  }
}

/// Where a bonfire stands with respect to the sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExpiryState {
  /// At least one player is bound; the clock is not running.
  Bound { players: usize },
  /// No bindings; will expire at `deadline`.
  Orphaned { deadline: Option<DateTime<Utc>> },
  /// No bindings and the deadline has passed; the next sweep removes it.
  Expired,
}

impl ExpiryState {
  pub fn of(bonfire: &Bonfire, players: usize, now: DateTime<Utc>) -> Self {
    if players > 0 {
      Self::Bound { players }
    } else if bonfire.is_past_deadline(now) {
      Self::Expired
    } else {
      Self::Orphaned { deadline: bonfire.deadline() }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bonfire_at(now: DateTime<Utc>, ttl_secs: u64) -> Bonfire {
    Bonfire::new(
      BonfireId::new_v4(),
      BonfireLocation::new("world", 10, 64, -3),
      now,
      Duration::from_secs(ttl_secs),
    )
  }

  #[test]
  fn deadline_is_inclusive() {
    let t0 = Utc::now();
    let b = bonfire_at(t0, 600);
    assert!(!b.is_past_deadline(t0 + TimeDelta::seconds(599)));
    assert!(b.is_past_deadline(t0 + TimeDelta::seconds(600)));
  }

  #[test]
  fn oversized_ttl_never_expires() {
    let b = bonfire_at(Utc::now(), u64::MAX);
    assert_eq!(b.deadline(), None);
    assert!(!b.is_past_deadline(DateTime::<Utc>::MAX_UTC));
  }

  #[test]
  fn bound_bonfire_is_never_expired() {
    let t0 = Utc::now();
    let b = bonfire_at(t0, 1);
    let later = t0 + TimeDelta::days(365);
    assert_eq!(ExpiryState::of(&b, 2, later), ExpiryState::Bound { players: 2 });
    assert_eq!(ExpiryState::of(&b, 0, later), ExpiryState::Expired);
  }

  #[test]
  fn parse_location() {
    let loc: BonfireLocation = "abyss -12 70 4".parse().unwrap();
    assert_eq!(loc, BonfireLocation::new("abyss", -12, 70, 4));
    assert!("abyss 1 2".parse::<BonfireLocation>().is_err());
    assert!("abyss 1 two 3".parse::<BonfireLocation>().is_err());
  }
}
