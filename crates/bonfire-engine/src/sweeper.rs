//! Lifecycle Sweeper — periodically removes bonfires that have had no bound
//! players for longer than their `time_until_destroy`.
//!
//! Each tick:
//!
//! 1. retries world removals still queued in the store from earlier ticks
//!    (or from before a restart);
//! 2. lists orphaned bonfires whose deadline has passed;
//! 3. for each, probes the world to see whether the bonfire object is still
//!    there, deletes the row through [`BonfireStore::delete_if_expired`]
//!    (which re-checks, in one transaction, that nobody has bound to it since
//!    the listing, and queues the world removal), and only then asks the
//!    world to remove the object.
//!
//! Rows go before world objects: a bind racing the sweep either lands first
//! and blocks the delete, or finds the row gone and fails cleanly. The world
//! is never cleared underneath a live binding, and a queued removal is only
//! dropped once the world confirms the object is gone.

use std::{sync::Arc, time::Duration};

use bonfire_core::{
  bonfire::{Bonfire, BonfireId},
  clock::Clock,
  store::BonfireStore,
  world::{PhysicalBonfireProbe, WorldEditor},
};
use chrono::{DateTime, Utc};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::{Error, Result};

// ─── Report ──────────────────────────────────────────────────────────────────

/// What one sweep tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
  /// Expired orphans listed at the start of the tick.
  pub candidates:       usize,
  /// Bonfires whose row was deleted this tick.
  pub expired:          Vec<BonfireId>,
  /// Deleted rows whose world object was already gone or replaced.
  pub drifted:          usize,
  /// Candidates that gained a binding (or vanished) before the delete.
  pub skipped:          usize,
  /// Store writes that failed; retried next tick.
  pub storage_failures: usize,
  /// World removals that failed; left queued for the next tick.
  pub world_failures:   usize,
  /// Queued world removals that succeeded this tick.
  pub retried:          usize,
}

// ─── Sweeper ─────────────────────────────────────────────────────────────────

pub struct Sweeper<S, P, W> {
  store:    Arc<S>,
  probe:    Arc<P>,
  world:    Arc<W>,
  clock:    Arc<dyn Clock>,
  interval: Duration,
}

impl<S, P, W> Sweeper<S, P, W>
where
  S: BonfireStore + 'static,
  P: PhysicalBonfireProbe + 'static,
  W: WorldEditor + 'static,
{
  pub fn new(
    store: Arc<S>,
    probe: Arc<P>,
    world: Arc<W>,
    clock: Arc<dyn Clock>,
    interval: Duration,
  ) -> Self {
    Self { store, probe, world, clock, interval }
  }

  /// Bonfires whose world removal is waiting for the next tick.
  pub async fn pending_world_removals(&self) -> Result<Vec<BonfireId>> {
    let queued = self.store.pending_world_removals().await.map_err(Error::storage)?;
    Ok(queued.into_iter().map(|b| b.bonfire_id).collect())
  }

  /// Run one sweep. Fails only if the expired orphans cannot be listed;
  /// per-bonfire failures are logged, counted and retried next tick.
  pub async fn tick(&self) -> Result<SweepReport> {
    let mut report = SweepReport::default();
    self.retry_pending(&mut report).await;

    let now = self.clock.now();
    let candidates = self.store.expired_orphans(now).await.map_err(Error::storage)?;
    report.candidates = candidates.len();

    for candidate in candidates {
      self.expire(candidate, now, &mut report).await;
    }

    if !report.expired.is_empty() || report.storage_failures > 0 || report.world_failures > 0 {
      tracing::info!(
        expired = report.expired.len(),
        drifted = report.drifted,
        skipped = report.skipped,
        storage_failures = report.storage_failures,
        world_failures = report.world_failures,
        "sweep finished"
      );
    } else {
      tracing::debug!(candidates = report.candidates, "sweep finished");
    }
    Ok(report)
  }

  async fn expire(&self, candidate: Bonfire, now: DateTime<Utc>, report: &mut SweepReport) {
    let bonfire_id = candidate.bonfire_id;
    let in_world = self.probe.identify(&candidate.location) == Some(bonfire_id);

    let deleted = match self.store.delete_if_expired(bonfire_id, now).await {
      Ok(Some(deleted)) => deleted,
      Ok(None) => {
        tracing::debug!(bonfire_id = %bonfire_id, "bonfire rebound before expiry; skipping");
        report.skipped += 1;
        return;
      }
      Err(e) => {
        tracing::error!(bonfire_id = %bonfire_id, error = %e, "failed to delete expired bonfire");
        report.storage_failures += 1;
        return;
      }
    };
    report.expired.push(bonfire_id);

    if !in_world {
      tracing::warn!(
        bonfire_id = %bonfire_id,
        location = %deleted.location,
        "expired bonfire no longer present in the world; dropped stale row"
      );
      report.drifted += 1;
      self.complete(bonfire_id, report).await;
      return;
    }

    match self.world.remove_bonfire(&deleted).await {
      Ok(()) => {
        tracing::info!(bonfire_id = %bonfire_id, location = %deleted.location, "bonfire expired");
        self.complete(bonfire_id, report).await;
      }
      Err(e) => {
        tracing::warn!(
          bonfire_id = %bonfire_id,
          error = %e,
          "failed to remove expired bonfire from the world; will retry"
        );
        report.world_failures += 1;
      }
    }
  }

  async fn retry_pending(&self, report: &mut SweepReport) {
    let queued = match self.store.pending_world_removals().await {
      Ok(queued) => queued,
      Err(e) => {
        tracing::error!(error = %e, "failed to list queued world removals");
        report.storage_failures += 1;
        return;
      }
    };

    for bonfire in queued {
      // Already gone, or a new bonfire has been placed on the spot since.
      if self.probe.identify(&bonfire.location) != Some(bonfire.bonfire_id) {
        self.complete(bonfire.bonfire_id, report).await;
        continue;
      }
      match self.world.remove_bonfire(&bonfire).await {
        Ok(()) => {
          report.retried += 1;
          self.complete(bonfire.bonfire_id, report).await;
        }
        Err(e) => {
          tracing::warn!(bonfire_id = %bonfire.bonfire_id, error = %e, "world removal retry failed");
          report.world_failures += 1;
        }
      }
    }
  }

  /// Drop a bonfire from the world removal queue. On failure the entry stays
  /// queued; the next retry finds the object gone and clears it.
  async fn complete(&self, bonfire_id: BonfireId, report: &mut SweepReport) {
    if let Err(e) = self.store.complete_world_removal(bonfire_id).await {
      tracing::error!(bonfire_id = %bonfire_id, error = %e, "failed to clear queued world removal");
      report.storage_failures += 1;
    }
  }

  /// Start ticking on the tokio runtime. The first tick runs immediately.
  pub fn spawn(self: Arc<Self>) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let join = tokio::spawn(async move {
      let mut interval = tokio::time::interval(self.interval);
      interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
      tracing::info!(interval = ?self.interval, "sweeper started");

      loop {
        tokio::select! {
          _ = interval.tick() => {
            if let Err(e) = self.tick().await {
              tracing::error!(error = %e, "sweep failed; retrying next tick");
            }
          }
          _ = shutdown_rx.changed() => break,
        }
      }

      tracing::info!("sweeper stopped");
    });

    SweeperHandle { shutdown: shutdown_tx, join }
  }
}

/// Owns a running sweeper task. Dropping the handle also stops the task
/// at its next wake-up.
pub struct SweeperHandle {
  shutdown: watch::Sender<bool>,
  join:     JoinHandle<()>,
}

impl SweeperHandle {
  /// Stop the sweeper, letting an in-flight tick finish first.
  pub async fn shutdown(self) {
    let _ = self.shutdown.send(true);
    if let Err(e) = self.join.await {
      tracing::error!(error = %e, "sweeper task panicked");
    }
  }
}
