//! Collaborator traits implemented by the host game server.
//!
//! The store never touches the world directly. These traits are the only
//! window the engine has onto blocks, entities and player records.

use std::future::Future;

use crate::{
  bonfire::{Bonfire, BonfireId, BonfireLocation},
  player::KnownPlayer,
};

/// Answers "which bonfire object, if any, sits at this coordinate".
pub trait PhysicalBonfireProbe: Send + Sync {
  /// The id of the bonfire object physically present at `location`, or
  /// `None` if the block there is not a bonfire.
  fn identify(&self, location: &BonfireLocation) -> Option<BonfireId>;
}

/// Mutates the world on behalf of the sweeper.
pub trait WorldEditor: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Clear the bonfire's block and remove the entity tied to it.
  fn remove_bonfire<'a>(
    &'a self,
    bonfire: &'a Bonfire,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Resolves human-entered names to player records.
pub trait PlayerDirectory: Send + Sync {
  /// Every known player, online or offline, whose name is exactly `name`.
  /// Several players may share a name.
  fn players_named(&self, name: &str) -> Vec<KnownPlayer>;
}
