//! Binding Service — get, set and remove a player's bonfire respawn.

use std::sync::Arc;

use bonfire_core::{
  bonfire::{BonfireId, BonfireLocation},
  clock::Clock,
  player::{KnownPlayer, PlayerId},
  store::{BindOutcome, BonfireStore},
  world::PlayerDirectory,
};

use crate::{Error, Result};

/// Player-facing operations over [`BonfireStore`] bindings.
pub struct BindingService<S> {
  store:       Arc<S>,
  clock:       Arc<dyn Clock>,
  max_players: Option<u32>,
}

impl<S> Clone for BindingService<S> {
  fn clone(&self) -> Self {
    Self {
      store:       Arc::clone(&self.store),
      clock:       Arc::clone(&self.clock),
      max_players: self.max_players,
    }
  }
}

impl<S: BonfireStore> BindingService<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, max_players: Option<u32>) -> Self {
    Self { store, clock, max_players }
  }

  /// Location of the player's bound bonfire, or `None` if none is set.
  ///
  /// A binding whose bonfire row is gone is reported as
  /// [`Error::Inconsistent`] and logged at error level.
  pub async fn get(&self, player: PlayerId) -> Result<Option<BonfireLocation>> {
    let Some(record) = self.store.respawn_of(player).await.map_err(Error::storage)? else {
      return Ok(None);
    };

    match record.bonfire {
      Some(bonfire) => Ok(Some(bonfire.location)),
      None => {
        let bonfire_id = record.binding.bonfire_id;
        tracing::error!(
          player_id = %player,
          bonfire_id = %bonfire_id,
          "binding references a bonfire that is not in the store"
        );
        Err(Error::Inconsistent { player_id: player, bonfire_id })
      }
    }
  }

  /// Bind the player to `bonfire`, replacing any previous binding. Ignores
  /// the configured player cap. Returns the previously bound bonfire, if it
  /// was a different one.
  pub async fn set(&self, player: PlayerId, bonfire: BonfireId) -> Result<Option<BonfireId>> {
    self.bind_with_capacity(player, bonfire, None).await
  }

  /// Bind the player to `bonfire` the way a player does in game: like
  /// [`set`](Self::set), but refused with [`Error::BonfireFull`] when the
  /// bonfire already holds the configured maximum of other players.
  pub async fn bind(&self, player: PlayerId, bonfire: BonfireId) -> Result<Option<BonfireId>> {
    self.bind_with_capacity(player, bonfire, self.max_players).await
  }

  async fn bind_with_capacity(
    &self,
    player: PlayerId,
    bonfire: BonfireId,
    capacity: Option<u32>,
  ) -> Result<Option<BonfireId>> {
    let now = self.clock.now();
    let outcome = self
      .store
      .bind_player(player, bonfire, now, capacity)
      .await
      .map_err(Error::storage)?;

    match outcome {
      BindOutcome::Bound { previous, .. } => {
        tracing::info!(
          player_id = %player,
          bonfire_id = %bonfire,
          previous = ?previous,
          "respawn bound"
        );
        Ok(previous)
      }
      BindOutcome::NoSuchBonfire => Err(Error::BonfireNotFound(bonfire)),
      BindOutcome::Full { capacity } => {
        Err(Error::BonfireFull { bonfire_id: bonfire, capacity })
      }
    }
  }

  /// Remove the player's binding. Returns the bonfire it pointed at, or
  /// [`Error::NoRespawnSet`] if there was none.
  pub async fn remove(&self, player: PlayerId) -> Result<BonfireId> {
    let now = self.clock.now();
    let removed = self
      .store
      .unbind_player(player, now)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::NoRespawnSet(player))?;

    tracing::info!(
      player_id = %player,
      bonfire_id = %removed.bonfire_id,
      "respawn removed"
    );
    Ok(removed.bonfire_id)
  }
}

/// Resolve a typed name to every player record that carries it.
pub fn resolve_players<D>(directory: &D, name: &str) -> Result<Vec<KnownPlayer>>
where
  D: PlayerDirectory + ?Sized,
{
  let mut players = directory.players_named(name);
  players.sort_by_key(|p| p.player_id);
  players.dedup_by_key(|p| p.player_id);
  if players.is_empty() {
    return Err(Error::PlayerNotFound(name.to_owned()));
  }
  Ok(players)
}

/// Resolve a typed name to exactly one player.
pub fn resolve_single_player<D>(directory: &D, name: &str) -> Result<KnownPlayer>
where
  D: PlayerDirectory + ?Sized,
{
  let mut players = resolve_players(directory, name)?;
  match players.len() {
    1 => Ok(players.remove(0)),
    count => Err(Error::AmbiguousPlayer { name: name.to_owned(), count }),
  }
}
