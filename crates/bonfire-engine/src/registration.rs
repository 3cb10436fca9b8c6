//! Registration Gateway — keeps bonfire rows in step with bonfire objects
//! being placed and destroyed in the world.

use std::{sync::Arc, time::Duration};

use bonfire_core::{
  bonfire::{Bonfire, BonfireId, BonfireLocation},
  clock::Clock,
  store::{BonfireStore, DeletedBonfire, RegisterOutcome},
};

use crate::{Error, Result};

pub struct RegistrationGateway<S> {
  store:              Arc<S>,
  clock:              Arc<dyn Clock>,
  time_until_destroy: Duration,
}

impl<S> Clone for RegistrationGateway<S> {
  fn clone(&self) -> Self {
    Self {
      store:              Arc::clone(&self.store),
      clock:              Arc::clone(&self.clock),
      time_until_destroy: self.time_until_destroy,
    }
  }
}

impl<S: BonfireStore> RegistrationGateway<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, time_until_destroy: Duration) -> Self {
    Self { store, clock, time_until_destroy }
  }

  /// Record a newly placed bonfire. Its expiry clock starts now.
  ///
  /// If another id is still registered at `location`, the world replaced that
  /// bonfire without telling us; the stale row and its bindings are dropped
  /// before the new one is written.
  pub async fn register(&self, bonfire_id: BonfireId, location: BonfireLocation) -> Result<Bonfire> {
    let bonfire = Bonfire::new(bonfire_id, location, self.clock.now(), self.time_until_destroy);

    let mut outcome = self
      .store
      .register_bonfire(bonfire.clone())
      .await
      .map_err(Error::storage)?;

    if let RegisterOutcome::LocationTaken(stale) = outcome {
      tracing::warn!(
        bonfire_id = %bonfire_id,
        stale_id = %stale,
        location = %bonfire.location,
        "location held by a stale bonfire row; replacing it"
      );
      self.store.delete_bonfire(stale).await.map_err(Error::storage)?;
      outcome = self
        .store
        .register_bonfire(bonfire)
        .await
        .map_err(Error::storage)?;
    }

    match outcome {
      RegisterOutcome::Registered(bonfire) => {
        tracing::info!(
          bonfire_id = %bonfire.bonfire_id,
          location = %bonfire.location,
          "bonfire registered"
        );
        Ok(bonfire)
      }
      RegisterOutcome::AlreadyExists => Err(Error::AlreadyExists(bonfire_id)),
      // Someone else claimed the spot between our delete and insert.
      RegisterOutcome::LocationTaken(occupant) => {
        Err(Error::LocationTaken { bonfire_id, occupant })
      }
    }
  }

  /// Drop a destroyed bonfire and every binding that pointed at it.
  pub async fn unregister(&self, bonfire_id: BonfireId) -> Result<DeletedBonfire> {
    let deleted = self
      .store
      .delete_bonfire(bonfire_id)
      .await
      .map_err(Error::storage)?
      .ok_or(Error::BonfireNotFound(bonfire_id))?;

    tracing::info!(
      bonfire_id = %bonfire_id,
      location = %deleted.bonfire.location,
      released_bindings = deleted.released_bindings,
      "bonfire unregistered"
    );
    Ok(deleted)
  }

  /// The id of the bonfire registered at `location`.
  pub async fn lookup_by_location(&self, location: &BonfireLocation) -> Result<Option<BonfireId>> {
    let found = self.store.bonfire_at(location).await.map_err(Error::storage)?;
    Ok(found.map(|b| b.bonfire_id))
  }

  pub async fn is_registered(&self, bonfire_id: BonfireId) -> Result<bool> {
    let found = self.store.get_bonfire(bonfire_id).await.map_err(Error::storage)?;
    Ok(found.is_some())
  }
}
