//! `bonfire` — operator console for the bonfire respawn store.
//!
//! Works directly on the SQLite file named by `store_path` in the config, so
//! it can inspect and repair bindings while the game server is down. Players
//! are addressed by id here; name lookup needs the live server.
//!
//! # Usage
//!
//! ```
//! bonfire --config bonfire.toml list
//! bonfire respawn get 1f0c…
//! bonfire respawn set 1f0c… abyss 10 64 -3
//! bonfire expired --json
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, Result};
use bonfire_core::{
  bonfire::{Bonfire, BonfireId, BonfireLocation, ExpiryState},
  clock::{Clock, SystemClock},
  player::PlayerId,
  store::BonfireStore,
};
use bonfire_engine::{BindingService, EngineConfig, RegistrationGateway};
use bonfire_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "bonfire", author, version, about = "Bonfire respawn store console")]
struct Args {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "bonfire.toml")]
  config: PathBuf,

  /// Print machine-readable JSON instead of text.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
  /// List every bonfire with its player count and expiry state.
  List,
  /// List the bonfires the next sweep would remove.
  Expired,
  /// Show one bonfire and the players bound to it.
  Show { bonfire: BonfireId },
  /// Inspect or edit a player's respawn.
  Respawn {
    #[command(subcommand)]
    action: RespawnCmd,
  },
  /// Remove a bonfire row and every binding to it. Does not touch the world.
  Unregister { bonfire: BonfireId },
}

#[derive(Subcommand, Debug)]
enum RespawnCmd {
  Get { player: PlayerId },
  /// Bind the player to the bonfire at a coordinate; ignores the player limit.
  #[command(allow_negative_numbers = true)]
  Set { player: PlayerId, world: String, x: i32, y: i32, z: i32 },
  Remove { player: PlayerId },
}

/// One line of `list` / `expired` output.
#[derive(Serialize)]
struct BonfireRow {
  #[serde(flatten)]
  bonfire: Bonfire,
  players: usize,
  expiry:  ExpiryState,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Logs go to stderr so `--json` output stays clean.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let cfg = EngineConfig::load(&args.config)
    .with_context(|| format!("failed to read config {}", args.config.display()))?;
  let store_path = cfg.resolved_store_path();
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  let clock: Arc<dyn Clock> = Arc::new(SystemClock);
  let bindings = BindingService::new(store.clone(), clock.clone(), cfg.max_players_per_bonfire);
  let gateway = RegistrationGateway::new(store.clone(), clock.clone(), cfg.time_until_destroy());

  match args.command {
    Cmd::List => {
      let now = clock.now();
      let rows: Vec<BonfireRow> = store
        .list_bonfires()
        .await?
        .into_iter()
        .map(|(bonfire, players)| BonfireRow {
          expiry: ExpiryState::of(&bonfire, players, now),
          bonfire,
          players,
        })
        .collect();
      print_rows(&rows, args.json)?;
    }
    Cmd::Expired => {
      let now = clock.now();
      let rows: Vec<BonfireRow> = store
        .expired_orphans(now)
        .await?
        .into_iter()
        .map(|bonfire| BonfireRow { bonfire, players: 0, expiry: ExpiryState::Expired })
        .collect();
      print_rows(&rows, args.json)?;
    }
    Cmd::Show { bonfire } => {
      let found = store
        .get_bonfire(bonfire)
        .await?
        .with_context(|| format!("bonfire {bonfire} is not registered"))?;
      let players = store.bindings_for(bonfire).await?;
      if args.json {
        let out = serde_json::json!({ "bonfire": found, "bindings": players });
        println!("{}", serde_json::to_string_pretty(&out)?);
      } else {
        println!("{} at {}", found.bonfire_id, found.location);
        for binding in players {
          println!("  {} (since {})", binding.player_id, binding.bound_at.to_rfc3339());
        }
      }
    }
    Cmd::Respawn { action: RespawnCmd::Get { player } } => {
      match bindings.get(player).await? {
        Some(location) => println!("Bonfire for player {player} is at {location}."),
        None => println!("Player {player} does not have a bonfire respawn set."),
      }
    }
    Cmd::Respawn { action: RespawnCmd::Set { player, world, x, y, z } } => {
      let location = BonfireLocation::new(world, x, y, z);
      let bonfire = gateway
        .lookup_by_location(&location)
        .await?
        .with_context(|| format!("no bonfire registered at {location}"))?;
      bindings.set(player, bonfire).await?;
      println!("Respawn set for player {player}.");
    }
    Cmd::Respawn { action: RespawnCmd::Remove { player } } => {
      bindings.remove(player).await?;
      println!("Respawn removed from player {player}.");
    }
    Cmd::Unregister { bonfire } => {
      let deleted = gateway.unregister(bonfire).await?;
      println!(
        "Unregistered {} at {} ({} bindings released).",
        bonfire, deleted.bonfire.location, deleted.released_bindings
      );
    }
  }

  Ok(())
}

fn print_rows(rows: &[BonfireRow], json: bool) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(rows)?);
    return Ok(());
  }
  for row in rows {
    let state = match row.expiry {
      ExpiryState::Bound { players } => format!("bound ({players} players)"),
      ExpiryState::Orphaned { deadline: Some(at) } => format!("expires {}", at.to_rfc3339()),
      ExpiryState::Orphaned { deadline: None } => "never expires".to_owned(),
      ExpiryState::Expired => "expired".to_owned(),
    };
    println!("{}  {:<32}  {state}", row.bonfire.bonfire_id, row.bonfire.location.to_string());
  }
  Ok(())
}
