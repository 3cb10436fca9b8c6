//! Lifecycle engine for bonfire respawn points.
//!
//! Ties a [`bonfire_core::store::BonfireStore`] to the host world:
//!
//! - [`RegistrationGateway`] mirrors bonfires being placed and destroyed;
//! - [`BindingService`] gets, sets and removes player respawns;
//! - [`Sweeper`] periodically removes bonfires nobody has been bound to for
//!   their `time_until_destroy`;
//! - [`commands`] exposes the operator command surface.
//!
//! # Wiring
//!
//! ```rust,ignore
//! let store = Arc::new(SqliteStore::open(cfg.resolved_store_path()).await?);
//! let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//! let sweeper = Arc::new(Sweeper::new(store, probe, world, clock, cfg.sweep_interval()));
//! let handle = sweeper.spawn();
//! // ...
//! handle.shutdown().await;
//! ```

pub mod binding;
pub mod commands;
pub mod error;
pub mod registration;
pub mod settings;
pub mod sweeper;

pub use binding::BindingService;
pub use error::{Error, ErrorKind, Result};
pub use registration::RegistrationGateway;
pub use settings::EngineConfig;
pub use sweeper::{SweepReport, Sweeper, SweeperHandle};

#[cfg(test)]
mod tests;
