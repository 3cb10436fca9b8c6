//! The `BonfireStore` trait and its operation outcomes.
//!
//! The trait is implemented by storage backends (e.g. `bonfire-store-sqlite`).
//! The engine depends on this abstraction, not on any concrete backend.
//!
//! Expected conditions (duplicate ids, missing rows, a full bonfire) come back
//! as typed outcomes. `Self::Error` is reserved for storage failures.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  bonfire::{Bonfire, BonfireId, BonfireLocation},
  player::{PlayerBinding, PlayerId, RespawnRecord},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of [`BonfireStore::register_bonfire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
  Registered(Bonfire),
  /// A row with this id already exists; nothing was written.
  AlreadyExists,
  /// Another bonfire id is registered at the same location; nothing was
  /// written.
  LocationTaken(BonfireId),
}

/// Result of [`BonfireStore::bind_player`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
  Bound {
    binding:  PlayerBinding,
    /// The bonfire the player was bound to before, if it was a different one.
    previous: Option<BonfireId>,
  },
  /// The target bonfire has no row; nothing was written.
  NoSuchBonfire,
  /// The target bonfire already holds `capacity` other players.
  Full { capacity: u32 },
}

/// Result of [`BonfireStore::delete_bonfire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedBonfire {
  pub bonfire:           Bonfire,
  /// Bindings removed along with the row.
  pub released_bindings: usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a bonfire store backend.
///
/// Every method is atomic on its own. Methods that read and then write
/// (`bind_player`, `unbind_player`, `delete_if_expired`) do so inside a
/// single transaction, so a sweep decision and a concurrent bind can never
/// both succeed against the same bonfire.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait BonfireStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Bonfires ──────────────────────────────────────────────────────────

  /// Insert a new bonfire row.
  fn register_bonfire(
    &self,
    bonfire: Bonfire,
  ) -> impl Future<Output = Result<RegisterOutcome, Self::Error>> + Send + '_;

  /// Retrieve a bonfire by id. Returns `None` if not found.
  fn get_bonfire(
    &self,
    id: BonfireId,
  ) -> impl Future<Output = Result<Option<Bonfire>, Self::Error>> + Send + '_;

  /// Retrieve the bonfire registered at `location`, if any.
  fn bonfire_at<'a>(
    &'a self,
    location: &'a BonfireLocation,
  ) -> impl Future<Output = Result<Option<Bonfire>, Self::Error>> + Send + 'a;

  /// List every bonfire together with the number of players bound to it.
  fn list_bonfires(
    &self,
  ) -> impl Future<Output = Result<Vec<(Bonfire, usize)>, Self::Error>> + Send + '_;

  /// All bonfires with zero bindings, regardless of deadline.
  fn orphaned_bonfires(
    &self,
  ) -> impl Future<Output = Result<Vec<Bonfire>, Self::Error>> + Send + '_;

  /// Orphaned bonfires whose deadline is at or before `now`.
  fn expired_orphans(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Bonfire>, Self::Error>> + Send + '_;

  /// Delete a bonfire and every binding that references it. Returns `None`
  /// if no such row existed.
  fn delete_bonfire(
    &self,
    id: BonfireId,
  ) -> impl Future<Output = Result<Option<DeletedBonfire>, Self::Error>> + Send + '_;

  /// Delete a bonfire only if, at the moment of deletion, it has no bindings
  /// and its deadline is at or before `now`. Returns the deleted row.
  ///
  /// The deleted bonfire is queued for world removal in the same
  /// transaction; it stays in [`pending_world_removals`] until
  /// [`complete_world_removal`] is called for it.
  ///
  /// [`pending_world_removals`]: Self::pending_world_removals
  /// [`complete_world_removal`]: Self::complete_world_removal
  fn delete_if_expired(
    &self,
    id: BonfireId,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Bonfire>, Self::Error>> + Send + '_;

  /// Expired bonfires whose world object has not been confirmed gone, oldest
  /// first.
  fn pending_world_removals(
    &self,
  ) -> impl Future<Output = Result<Vec<Bonfire>, Self::Error>> + Send + '_;

  /// Drop `id` from the world removal queue. Returns `false` if it was not
  /// queued.
  fn complete_world_removal(
    &self,
    id: BonfireId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Bindings ──────────────────────────────────────────────────────────

  /// The player's binding joined with its bonfire row.
  fn respawn_of(
    &self,
    player: PlayerId,
  ) -> impl Future<Output = Result<Option<RespawnRecord>, Self::Error>> + Send + '_;

  /// Bind `player` to `bonfire`, replacing any previous binding.
  ///
  /// With `capacity` set, the bind is refused when the bonfire already holds
  /// that many *other* players. If the replaced binding leaves its old
  /// bonfire with no players, that bonfire's expiry clock restarts at `now`.
  fn bind_player(
    &self,
    player: PlayerId,
    bonfire: BonfireId,
    now: DateTime<Utc>,
    capacity: Option<u32>,
  ) -> impl Future<Output = Result<BindOutcome, Self::Error>> + Send + '_;

  /// Remove the player's binding. If that leaves the bonfire with no players,
  /// its expiry clock restarts at `now`. Returns `None` if the player had no
  /// binding.
  fn unbind_player(
    &self,
    player: PlayerId,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<PlayerBinding>, Self::Error>> + Send + '_;

  /// Every binding that points at `bonfire`.
  fn bindings_for(
    &self,
    bonfire: BonfireId,
  ) -> impl Future<Output = Result<Vec<PlayerBinding>, Self::Error>> + Send + '_;
}
