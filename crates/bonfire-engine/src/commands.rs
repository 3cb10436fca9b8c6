//! Operator command surface, for a chat or console front end.
//!
//! | Command | Effect |
//! |---------|--------|
//! | `respawn get <player>` | Show each matching player's respawn |
//! | `respawn set <player> <x> <y> <z>` | Bind the player to the bonfire at the coordinate |
//! | `respawn remove <player>` | Clear the player's respawn |
//! | `bonfire check <x> <y> <z>` | Is the bonfire at the coordinate registered? |
//!
//! Coordinates are resolved in the issuer's current world. Player names go
//! through the host's [`PlayerDirectory`]; `set` and `remove` refuse names
//! shared by several players.

use std::sync::Arc;

use bonfire_core::{
  bonfire::BonfireLocation,
  store::BonfireStore,
  world::{PhysicalBonfireProbe, PlayerDirectory},
};
use clap::{Parser, Subcommand};

use crate::{
  BindingService, Error, ErrorKind, RegistrationGateway, Result,
  binding::{resolve_players, resolve_single_player},
};

// ─── Grammar ─────────────────────────────────────────────────────────────────

/// A command line as typed after the command prefix, split on whitespace.
#[derive(Debug, Parser)]
#[command(name = "bonfire", no_binary_name = true)]
pub struct ChatCommand {
  #[command(subcommand)]
  pub command: Command,
}

impl ChatCommand {
  /// Parse the words of a command, e.g. `["respawn", "get", "Steve"]`.
  pub fn parse_words<I, T>(words: I) -> Result<Self, clap::Error>
  where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
  {
    Self::try_parse_from(words)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
  /// Manipulate players' bonfire respawns.
  Respawn {
    #[command(subcommand)]
    action: RespawnAction,
  },
  /// Inspect bonfires.
  Bonfire {
    #[command(subcommand)]
    action: BonfireAction,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum RespawnAction {
  /// Show the respawn of every player with this name.
  Get { player: String },
  /// Set the respawn; ignores the bonfire's player limit.
  #[command(allow_negative_numbers = true)]
  Set { player: String, x: i32, y: i32, z: i32 },
  /// Remove the respawn.
  Remove { player: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum BonfireAction {
  /// Report whether the bonfire at the coordinate is registered.
  #[command(allow_negative_numbers = true)]
  Check { x: i32, y: i32, z: i32 },
}

// ─── Replies ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyLevel {
  Info,
  Success,
  Error,
}

/// One line of feedback for the issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
  pub level:   ReplyLevel,
  pub message: String,
}

impl Reply {
  pub fn info(message: impl Into<String>) -> Self {
    Self { level: ReplyLevel::Info, message: message.into() }
  }

  pub fn success(message: impl Into<String>) -> Self {
    Self { level: ReplyLevel::Success, message: message.into() }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self { level: ReplyLevel::Error, message: message.into() }
  }
}

// ─── Execution ───────────────────────────────────────────────────────────────

/// Everything a command needs to run.
pub struct CommandContext<S, P, D> {
  pub bindings: BindingService<S>,
  pub gateway:  RegistrationGateway<S>,
  pub probe:    Arc<P>,
  pub players:  Arc<D>,
}

impl<S, P, D> CommandContext<S, P, D>
where
  S: BonfireStore,
  P: PhysicalBonfireProbe,
  D: PlayerDirectory,
{
  /// Run `command` on behalf of an issuer standing in `world`.
  ///
  /// Expected failures (unknown or ambiguous names, no bonfire, no respawn)
  /// come back as `Err` for the caller to display; see [`Error::kind`].
  pub async fn execute(&self, world: &str, command: Command) -> Result<Vec<Reply>> {
    match command {
      Command::Respawn { action: RespawnAction::Get { player } } => self.respawn_get(&player).await,
      Command::Respawn { action: RespawnAction::Set { player, x, y, z } } => {
        self.respawn_set(&player, BonfireLocation::new(world, x, y, z)).await
      }
      Command::Respawn { action: RespawnAction::Remove { player } } => {
        self.respawn_remove(&player).await
      }
      Command::Bonfire { action: BonfireAction::Check { x, y, z } } => {
        self.bonfire_check(BonfireLocation::new(world, x, y, z)).await
      }
    }
  }

  async fn respawn_get(&self, name: &str) -> Result<Vec<Reply>> {
    let targets = resolve_players(self.players.as_ref(), name)?;
    let mut replies = Vec::with_capacity(targets.len() + 1);
    if targets.len() > 1 {
      replies.push(Reply::info(
        "Multiple players found with that name, checking respawn for all.",
      ));
    }

    for target in targets {
      let reply = match self.bindings.get(target.player_id).await {
        Ok(Some(location)) => {
          Reply::info(format!("Bonfire for player {} is at {location}.", target.name))
        }
        Ok(None) => Reply::info(format!(
          "Player {} does not have a bonfire respawn set.",
          target.name
        )),
        Err(e) if e.kind() == ErrorKind::Inconsistent => Reply::error(format!(
          "Bonfire for player {} not found in the database. This is bad and should not happen!",
          target.name
        )),
        Err(e) => return Err(e),
      };
      replies.push(reply);
    }
    Ok(replies)
  }

  async fn respawn_set(&self, name: &str, location: BonfireLocation) -> Result<Vec<Reply>> {
    let target = resolve_single_player(self.players.as_ref(), name)?;
    let bonfire_id = self
      .gateway
      .lookup_by_location(&location)
      .await?
      .ok_or_else(|| Error::NoBonfireAt(location))?;

    self.bindings.set(target.player_id, bonfire_id).await?;
    Ok(vec![Reply::info(format!("Respawn set for player {}.", target.name))])
  }

  async fn respawn_remove(&self, name: &str) -> Result<Vec<Reply>> {
    let target = resolve_single_player(self.players.as_ref(), name)?;
    self.bindings.remove(target.player_id).await?;
    Ok(vec![Reply::info(format!("Respawn removed from player {}.", target.name))])
  }

  async fn bonfire_check(&self, location: BonfireLocation) -> Result<Vec<Reply>> {
    let Some(bonfire_id) = self.probe.identify(&location) else {
      return Err(Error::NoBonfireAt(location));
    };

    let reply = if self.gateway.is_registered(bonfire_id).await? {
      Reply::success("Bonfire is registered in the database.")
    } else {
      Reply::error("Bonfire is not registered in the database.")
    };
    Ok(vec![reply])
  }
}

/// Render an execution error as a reply line.
pub fn error_reply(error: &Error) -> Reply {
  let message = match error {
    Error::PlayerNotFound(_) => "No player found with that name.".to_owned(),
    Error::AmbiguousPlayer { .. } => {
      "Multiple players found with that name, not changing respawn.".to_owned()
    }
    Error::NoBonfireAt(_) => "No bonfire found at this location.".to_owned(),
    Error::NoRespawnSet(_) => "Player does not have a respawn set.".to_owned(),
    other => other.to_string(),
  };
  Reply::error(message)
}
