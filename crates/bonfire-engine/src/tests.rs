//! Engine tests against an in-memory `SqliteStore` and a fake world.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use bonfire_core::{
  bonfire::{Bonfire, BonfireId, BonfireLocation},
  clock::Clock,
  player::{KnownPlayer, PlayerBinding, PlayerId, RespawnRecord},
  store::{BindOutcome, BonfireStore, DeletedBonfire, RegisterOutcome},
  world::{PhysicalBonfireProbe, PlayerDirectory, WorldEditor},
};
use bonfire_store_sqlite::SqliteStore;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::{
  BindingService, Error, ErrorKind, RegistrationGateway, SweepReport, Sweeper,
  commands::{
    BonfireAction, ChatCommand, Command, CommandContext, ReplyLevel, RespawnAction,
  },
};

// ─── Fakes ───────────────────────────────────────────────────────────────────

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
  fn at(now: DateTime<Utc>) -> Self { Self(Mutex::new(now)) }

  fn set(&self, now: DateTime<Utc>) { *self.0.lock().unwrap() = now; }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> { *self.0.lock().unwrap() }
}

#[derive(Debug, thiserror::Error)]
#[error("world unavailable")]
struct WorldDown;

/// Blocks keyed by location, plus a log of removals.
#[derive(Default)]
struct FakeWorld {
  blocks:  Mutex<HashMap<BonfireLocation, BonfireId>>,
  removed: Mutex<Vec<BonfireId>>,
  failing: AtomicBool,
}

impl FakeWorld {
  fn place(&self, location: BonfireLocation, id: BonfireId) {
    self.blocks.lock().unwrap().insert(location, id);
  }

  fn clear(&self, location: &BonfireLocation) { self.blocks.lock().unwrap().remove(location); }

  fn removed(&self) -> Vec<BonfireId> { self.removed.lock().unwrap().clone() }
}

impl PhysicalBonfireProbe for FakeWorld {
  fn identify(&self, location: &BonfireLocation) -> Option<BonfireId> {
    self.blocks.lock().unwrap().get(location).copied()
  }
}

impl WorldEditor for FakeWorld {
  type Error = WorldDown;

  async fn remove_bonfire(&self, bonfire: &Bonfire) -> Result<(), WorldDown> {
    if self.failing.load(Ordering::SeqCst) {
      return Err(WorldDown);
    }
    self.clear(&bonfire.location);
    self.removed.lock().unwrap().push(bonfire.bonfire_id);
    Ok(())
  }
}

struct FakeDirectory(Vec<KnownPlayer>);

impl PlayerDirectory for FakeDirectory {
  fn players_named(&self, name: &str) -> Vec<KnownPlayer> {
    self.0.iter().filter(|p| p.name == name).cloned().collect()
  }
}

#[derive(Debug, thiserror::Error)]
#[error("disk unavailable")]
struct DiskDown;

/// A store that fails every call, except that every location reports as
/// held by `occupant` and deleting the occupant finds nothing.
struct StubStore {
  occupant: BonfireId,
}

impl BonfireStore for StubStore {
  type Error = DiskDown;

  async fn register_bonfire(&self, _: Bonfire) -> Result<RegisterOutcome, DiskDown> {
    Ok(RegisterOutcome::LocationTaken(self.occupant))
  }

  async fn get_bonfire(&self, _: BonfireId) -> Result<Option<Bonfire>, DiskDown> { Err(DiskDown) }

  async fn bonfire_at(&self, _: &BonfireLocation) -> Result<Option<Bonfire>, DiskDown> {
    Err(DiskDown)
  }

  async fn list_bonfires(&self) -> Result<Vec<(Bonfire, usize)>, DiskDown> { Err(DiskDown) }

  async fn orphaned_bonfires(&self) -> Result<Vec<Bonfire>, DiskDown> { Err(DiskDown) }

  async fn expired_orphans(&self, _: DateTime<Utc>) -> Result<Vec<Bonfire>, DiskDown> {
    Err(DiskDown)
  }

  async fn delete_bonfire(&self, _: BonfireId) -> Result<Option<DeletedBonfire>, DiskDown> {
    Ok(None)
  }

  async fn delete_if_expired(
    &self,
    _: BonfireId,
    _: DateTime<Utc>,
  ) -> Result<Option<Bonfire>, DiskDown> {
    Err(DiskDown)
  }

  async fn pending_world_removals(&self) -> Result<Vec<Bonfire>, DiskDown> { Err(DiskDown) }

  async fn complete_world_removal(&self, _: BonfireId) -> Result<bool, DiskDown> { Err(DiskDown) }

  async fn respawn_of(&self, _: PlayerId) -> Result<Option<RespawnRecord>, DiskDown> {
    Err(DiskDown)
  }

  async fn bind_player(
    &self,
    _: PlayerId,
    _: BonfireId,
    _: DateTime<Utc>,
    _: Option<u32>,
  ) -> Result<BindOutcome, DiskDown> {
    Err(DiskDown)
  }

  async fn unbind_player(
    &self,
    _: PlayerId,
    _: DateTime<Utc>,
  ) -> Result<Option<PlayerBinding>, DiskDown> {
    Err(DiskDown)
  }

  async fn bindings_for(&self, _: BonfireId) -> Result<Vec<PlayerBinding>, DiskDown> {
    Err(DiskDown)
  }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

const TEN_MINUTES: Duration = Duration::from_secs(600);

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() }

fn mins(n: i64) -> TimeDelta { TimeDelta::minutes(n) }

fn loc(x: i32) -> BonfireLocation { BonfireLocation::new("abyss", x, 64, 0) }

struct Harness {
  store:    Arc<SqliteStore>,
  clock:    Arc<ManualClock>,
  world:    Arc<FakeWorld>,
  bindings: BindingService<SqliteStore>,
  gateway:  RegistrationGateway<SqliteStore>,
  sweeper:  Arc<Sweeper<SqliteStore, FakeWorld, FakeWorld>>,
}

impl Harness {
  async fn new() -> Self {
    let store = SqliteStore::open_in_memory().await.expect("in-memory store");
    Self::with_store(store, None)
  }

  fn with_store(store: SqliteStore, max_players: Option<u32>) -> Self {
    let store = Arc::new(store);
    let clock = Arc::new(ManualClock::at(t0()));
    let world = Arc::new(FakeWorld::default());
    let dyn_clock: Arc<dyn Clock> = clock.clone();

    Self {
      bindings: BindingService::new(store.clone(), dyn_clock.clone(), max_players),
      gateway: RegistrationGateway::new(store.clone(), dyn_clock.clone(), TEN_MINUTES),
      sweeper: Arc::new(Sweeper::new(
        store.clone(),
        world.clone(),
        world.clone(),
        dyn_clock,
        Duration::from_secs(60),
      )),
      store,
      clock,
      world,
    }
  }

  /// A bonfire placed in the world and registered at `(x, 64, 0)`.
  async fn place(&self, x: i32) -> BonfireId {
    let id = BonfireId::new_v4();
    self.world.place(loc(x), id);
    self.gateway.register(id, loc(x)).await.unwrap();
    id
  }

  fn commands(&self, players: Vec<KnownPlayer>) -> CommandContext<SqliteStore, FakeWorld, FakeDirectory> {
    CommandContext {
      bindings: self.bindings.clone(),
      gateway:  self.gateway.clone(),
      probe:    self.world.clone(),
      players:  Arc::new(FakeDirectory(players)),
    }
  }
}

fn player(name: &str) -> KnownPlayer {
  KnownPlayer { player_id: PlayerId::new_v4(), name: name.to_owned() }
}

// ─── Binding Service ─────────────────────────────────────────────────────────

#[tokio::test]
async fn set_then_get_returns_location() {
  let h = Harness::new().await;
  let first = h.place(1).await;
  let second = h.place(2).await;
  let alice = PlayerId::new_v4();

  assert_eq!(h.bindings.get(alice).await.unwrap(), None);

  assert_eq!(h.bindings.set(alice, first).await.unwrap(), None);
  assert_eq!(h.bindings.get(alice).await.unwrap(), Some(loc(1)));

  assert_eq!(h.bindings.set(alice, second).await.unwrap(), Some(first));
  assert_eq!(h.bindings.get(alice).await.unwrap(), Some(loc(2)));
}

#[tokio::test]
async fn remove_then_get_returns_none() {
  let h = Harness::new().await;
  let b = h.place(1).await;
  let alice = PlayerId::new_v4();
  h.bindings.set(alice, b).await.unwrap();

  assert_eq!(h.bindings.remove(alice).await.unwrap(), b);
  assert_eq!(h.bindings.get(alice).await.unwrap(), None);

  let err = h.bindings.remove(alice).await.unwrap_err();
  assert!(matches!(err, Error::NoRespawnSet(p) if p == alice));
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn set_to_unregistered_bonfire_is_not_found() {
  let h = Harness::new().await;
  let alice = PlayerId::new_v4();

  let err = h.bindings.set(alice, BonfireId::new_v4()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert_eq!(h.bindings.get(alice).await.unwrap(), None);
}

#[tokio::test]
async fn at_most_one_binding_per_player() {
  let h = Harness::new().await;
  let bonfires = [h.place(1).await, h.place(2).await, h.place(3).await];
  let alice = PlayerId::new_v4();

  for (i, b) in bonfires.iter().cycle().take(7).enumerate() {
    if i % 3 == 2 {
      let _ = h.bindings.remove(alice).await;
    }
    h.bindings.set(alice, *b).await.unwrap();

    let mut total = 0;
    for b in &bonfires {
      total += h
        .store
        .bindings_for(*b)
        .await
        .unwrap()
        .iter()
        .filter(|binding| binding.player_id == alice)
        .count();
    }
    assert_eq!(total, 1);
  }
}

#[tokio::test]
async fn bind_honours_capacity_but_set_does_not() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let h = Harness::with_store(store, Some(1));
  let b = h.place(1).await;
  let alice = PlayerId::new_v4();
  let bob = PlayerId::new_v4();

  h.bindings.bind(alice, b).await.unwrap();
  let err = h.bindings.bind(bob, b).await.unwrap_err();
  assert!(matches!(err, Error::BonfireFull { capacity: 1, .. }));
  assert_eq!(err.kind(), ErrorKind::Full);

  h.bindings.set(bob, b).await.unwrap();
  assert_eq!(h.store.bindings_for(b).await.unwrap().len(), 2);
}

#[tokio::test]
async fn dangling_binding_is_inconsistent() {
  let dir = std::env::temp_dir().join(format!("bonfire-engine-{}", uuid::Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("data.db");
  let alice = PlayerId::new_v4();
  let ghost = BonfireId::new_v4();

  // Create the schema, then write a binding behind the store's back with
  // foreign keys off.
  drop(SqliteStore::open(&path).await.unwrap());
  {
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.pragma_update(None, "foreign_keys", false).unwrap();
    conn
      .execute(
        "INSERT INTO player_bindings (player_id, bonfire_id, bound_at) VALUES (?1, ?2, 0)",
        rusqlite::params![alice.to_string(), ghost.to_string()],
      )
      .unwrap();
  }

  let h = Harness::with_store(SqliteStore::open(&path).await.unwrap(), None);
  let err = h.bindings.get(alice).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Inconsistent { player_id, bonfire_id } if player_id == alice && bonfire_id == ghost
  ));
  assert_eq!(err.kind(), ErrorKind::Inconsistent);

  drop(h);
  let _ = std::fs::remove_dir_all(dir);
}

// ─── Registration Gateway ────────────────────────────────────────────────────

#[tokio::test]
async fn register_starts_clock_now() {
  let h = Harness::new().await;
  h.clock.set(t0() + mins(3));
  let id = BonfireId::new_v4();

  let b = h.gateway.register(id, loc(1)).await.unwrap();
  assert_eq!(b.state_changed_at, t0() + mins(3));
  assert_eq!(b.time_until_destroy, TEN_MINUTES);
  assert!(h.gateway.is_registered(id).await.unwrap());
  assert_eq!(h.gateway.lookup_by_location(&loc(1)).await.unwrap(), Some(id));
  assert_eq!(h.gateway.lookup_by_location(&loc(9)).await.unwrap(), None);
}

#[tokio::test]
async fn duplicate_registration_is_reported() {
  let h = Harness::new().await;
  let id = h.place(1).await;

  let err = h.gateway.register(id, loc(2)).await.unwrap_err();
  assert!(matches!(err, Error::AlreadyExists(dup) if dup == id));
  assert_eq!(err.kind(), ErrorKind::AlreadyExists);
  assert_eq!(h.gateway.lookup_by_location(&loc(2)).await.unwrap(), None);
}

#[tokio::test]
async fn registering_over_stale_row_replaces_it() {
  let h = Harness::new().await;
  let stale = h.place(1).await;
  let alice = PlayerId::new_v4();
  h.bindings.set(alice, stale).await.unwrap();

  let fresh = BonfireId::new_v4();
  h.gateway.register(fresh, loc(1)).await.unwrap();

  assert!(!h.gateway.is_registered(stale).await.unwrap());
  assert_eq!(h.gateway.lookup_by_location(&loc(1)).await.unwrap(), Some(fresh));
  assert_eq!(h.bindings.get(alice).await.unwrap(), None);
}

#[tokio::test]
async fn unregister_cascades_bindings() {
  let h = Harness::new().await;
  let b = h.place(1).await;
  let alice = PlayerId::new_v4();
  let bob = PlayerId::new_v4();
  h.bindings.set(alice, b).await.unwrap();
  h.bindings.set(bob, b).await.unwrap();

  let deleted = h.gateway.unregister(b).await.unwrap();
  assert_eq!(deleted.released_bindings, 2);
  assert_eq!(h.bindings.get(alice).await.unwrap(), None);
  assert_eq!(h.bindings.get(bob).await.unwrap(), None);
  assert!(h.store.bindings_for(b).await.unwrap().is_empty());

  let err = h.gateway.unregister(b).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Sweeper ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unbound_bonfire_expires_ten_minutes_after_last_unbind() {
  let h = Harness::new().await;
  let b1 = h.place(1).await;
  let p1 = PlayerId::new_v4();

  h.clock.set(t0() + mins(1));
  h.bindings.set(p1, b1).await.unwrap();

  h.clock.set(t0() + mins(11));
  let report = h.sweeper.tick().await.unwrap();
  assert!(report.expired.is_empty());
  assert!(h.gateway.is_registered(b1).await.unwrap());

  h.bindings.remove(p1).await.unwrap();

  // The unbind restarted the clock; the creation time no longer counts.
  h.clock.set(t0() + mins(20));
  assert!(h.sweeper.tick().await.unwrap().expired.is_empty());

  h.clock.set(t0() + mins(21));
  let report = h.sweeper.tick().await.unwrap();
  assert_eq!(report.expired, vec![b1]);
  assert!(!h.gateway.is_registered(b1).await.unwrap());
  assert_eq!(h.world.removed(), vec![b1]);
  assert_eq!(h.world.identify(&loc(1)), None);
}

#[tokio::test]
async fn orphan_is_not_expired_before_deadline() {
  let h = Harness::new().await;
  let b = h.place(1).await;

  h.clock.set(t0() + mins(10) - TimeDelta::seconds(1));
  let report = h.sweeper.tick().await.unwrap();
  assert_eq!(report.candidates, 0);

  h.clock.set(t0() + mins(10));
  let report = h.sweeper.tick().await.unwrap();
  assert_eq!(report.expired, vec![b]);
}

#[tokio::test]
async fn bound_bonfire_is_never_swept() {
  let h = Harness::new().await;
  let b = h.place(1).await;
  h.bindings.set(PlayerId::new_v4(), b).await.unwrap();

  h.clock.set(t0() + TimeDelta::days(3650));
  let report = h.sweeper.tick().await.unwrap();
  assert_eq!(report, SweepReport::default());
  assert!(h.gateway.is_registered(b).await.unwrap());
  assert!(h.world.removed().is_empty());
}

#[tokio::test]
async fn drifted_bonfire_row_is_still_dropped() {
  let h = Harness::new().await;
  let b = h.place(1).await;
  // Someone broke the block without the gateway hearing about it.
  h.world.clear(&loc(1));

  h.clock.set(t0() + mins(15));
  let report = h.sweeper.tick().await.unwrap();
  assert_eq!(report.expired, vec![b]);
  assert_eq!(report.drifted, 1);
  assert!(!h.gateway.is_registered(b).await.unwrap());
  assert!(h.world.removed().is_empty());
}

#[tokio::test]
async fn replaced_block_is_left_alone() {
  let h = Harness::new().await;
  let b = h.place(1).await;
  let newcomer = BonfireId::new_v4();
  h.world.place(loc(1), newcomer);

  h.clock.set(t0() + mins(15));
  let report = h.sweeper.tick().await.unwrap();
  assert_eq!(report.drifted, 1);
  assert!(!h.gateway.is_registered(b).await.unwrap());
  assert_eq!(h.world.identify(&loc(1)), Some(newcomer));
}

#[tokio::test]
async fn failed_world_removal_is_retried_next_tick() {
  let h = Harness::new().await;
  let b = h.place(1).await;
  h.world.failing.store(true, Ordering::SeqCst);

  h.clock.set(t0() + mins(15));
  let report = h.sweeper.tick().await.unwrap();
  assert_eq!(report.expired, vec![b]);
  assert_eq!(report.world_failures, 1);
  assert!(!h.gateway.is_registered(b).await.unwrap());
  assert_eq!(h.sweeper.pending_world_removals().await.unwrap(), vec![b]);

  h.world.failing.store(false, Ordering::SeqCst);
  let report = h.sweeper.tick().await.unwrap();
  assert_eq!(report.retried, 1);
  assert_eq!(h.world.removed(), vec![b]);
  assert!(h.sweeper.pending_world_removals().await.unwrap().is_empty());
}

#[tokio::test]
async fn queued_world_removal_survives_sweeper_restart() {
  let h = Harness::new().await;
  let b = h.place(1).await;
  h.world.failing.store(true, Ordering::SeqCst);

  h.clock.set(t0() + mins(15));
  let report = h.sweeper.tick().await.unwrap();
  assert_eq!(report.world_failures, 1);
  assert!(!h.gateway.is_registered(b).await.unwrap());

  // The process restarts: a new sweeper over the same store and world.
  h.world.failing.store(false, Ordering::SeqCst);
  let dyn_clock: Arc<dyn Clock> = h.clock.clone();
  let restarted = Sweeper::new(
    h.store.clone(),
    h.world.clone(),
    h.world.clone(),
    dyn_clock,
    Duration::from_secs(60),
  );
  assert_eq!(restarted.pending_world_removals().await.unwrap(), vec![b]);

  let report = restarted.tick().await.unwrap();
  assert_eq!(report.retried, 1);
  assert_eq!(h.world.removed(), vec![b]);
  assert_eq!(h.world.identify(&loc(1)), None);
  assert!(restarted.pending_world_removals().await.unwrap().is_empty());
}

#[tokio::test]
async fn queued_removal_skips_bonfire_placed_on_the_spot() {
  let h = Harness::new().await;
  let b = h.place(1).await;
  h.world.failing.store(true, Ordering::SeqCst);
  h.clock.set(t0() + mins(15));
  h.sweeper.tick().await.unwrap();

  // The old block is broken and a new bonfire placed before the retry.
  h.world.failing.store(false, Ordering::SeqCst);
  let newcomer = h.place(1).await;
  assert_ne!(newcomer, b);

  let report = h.sweeper.tick().await.unwrap();
  assert_eq!(report.retried, 0);
  assert_eq!(h.world.identify(&loc(1)), Some(newcomer));
  assert!(h.world.removed().is_empty());
  assert!(h.sweeper.pending_world_removals().await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_sweep_and_bind_never_both_win() {
  let h = Harness::new().await;

  for x in 0..50 {
    h.clock.set(t0());
    let b = h.place(x).await;
    h.clock.set(t0() + mins(15));

    let alice = PlayerId::new_v4();
    let (swept, bound) = tokio::join!(h.sweeper.tick(), h.bindings.set(alice, b));
    swept.unwrap();

    let registered = h.gateway.is_registered(b).await.unwrap();
    match bound {
      Ok(_) => {
        assert!(registered, "bonfire {x} deleted while bound");
        assert_eq!(h.bindings.get(alice).await.unwrap(), Some(loc(x)));
        assert_eq!(h.world.identify(&loc(x)), Some(b));
      }
      Err(e) => {
        assert_eq!(e.kind(), ErrorKind::NotFound);
        assert!(!registered);
        assert_eq!(h.bindings.get(alice).await.unwrap(), None);
        assert_eq!(h.world.identify(&loc(x)), None);
      }
    }
  }
}

#[tokio::test]
async fn several_expired_bonfires_are_processed_independently() {
  let h = Harness::new().await;
  let a = h.place(1).await;
  let b = h.place(2).await;
  let kept = h.place(3).await;
  h.world.clear(&loc(2));
  h.bindings.set(PlayerId::new_v4(), kept).await.unwrap();

  h.clock.set(t0() + mins(30));
  let mut report = h.sweeper.tick().await.unwrap();
  report.expired.sort();
  let mut expected = vec![a, b];
  expected.sort();
  assert_eq!(report.expired, expected);
  assert_eq!(report.drifted, 1);
  assert_eq!(h.world.removed(), vec![a]);
  assert!(h.gateway.is_registered(kept).await.unwrap());
}

#[tokio::test]
async fn spawned_sweeper_runs_and_shuts_down() {
  let h = Harness::new().await;
  let b = h.place(1).await;
  h.clock.set(t0() + mins(15));

  let handle = h.sweeper.clone().spawn();
  let mut gone = false;
  for _ in 0..100 {
    if !h.gateway.is_registered(b).await.unwrap() {
      gone = true;
      break;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  handle.shutdown().await;

  assert!(gone, "sweeper did not expire the bonfire");
  assert_eq!(h.world.removed(), vec![b]);
}

// ─── Storage failures ────────────────────────────────────────────────────────

fn stub_store() -> Arc<StubStore> { Arc::new(StubStore { occupant: BonfireId::new_v4() }) }

#[tokio::test]
async fn store_failures_surface_as_storage_failure() {
  let store = stub_store();
  let clock: Arc<dyn Clock> = Arc::new(ManualClock::at(t0()));
  let bindings = BindingService::new(store.clone(), clock.clone(), None);
  let gateway = RegistrationGateway::new(store.clone(), clock.clone(), TEN_MINUTES);
  let alice = PlayerId::new_v4();
  let b = BonfireId::new_v4();

  let errors = [
    bindings.get(alice).await.unwrap_err(),
    bindings.set(alice, b).await.unwrap_err(),
    bindings.remove(alice).await.unwrap_err(),
    gateway.lookup_by_location(&loc(1)).await.unwrap_err(),
    gateway.is_registered(b).await.unwrap_err(),
  ];
  for err in errors {
    assert!(matches!(err, Error::Storage(_)), "{err:?}");
    assert_eq!(err.kind(), ErrorKind::StorageFailure);
  }
}

#[tokio::test]
async fn sweep_fails_when_store_is_down() {
  let world = Arc::new(FakeWorld::default());
  let clock: Arc<dyn Clock> = Arc::new(ManualClock::at(t0()));
  let sweeper =
    Sweeper::new(stub_store(), world.clone(), world, clock, Duration::from_secs(60));

  let err = sweeper.tick().await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::StorageFailure);
}

#[tokio::test]
async fn location_lost_to_another_bonfire_names_both() {
  let store = stub_store();
  let occupant = store.occupant;
  let clock: Arc<dyn Clock> = Arc::new(ManualClock::at(t0()));
  let gateway = RegistrationGateway::new(store, clock, TEN_MINUTES);
  let id = BonfireId::new_v4();

  let err = gateway.register(id, loc(1)).await.unwrap_err();
  assert!(matches!(
    err,
    Error::LocationTaken { bonfire_id, occupant: other } if bonfire_id == id && other == occupant
  ));
  assert_eq!(err.kind(), ErrorKind::AlreadyExists);
  assert!(err.to_string().contains(&id.to_string()));
  assert!(err.to_string().contains(&occupant.to_string()));
}

// ─── Commands ────────────────────────────────────────────────────────────────

fn parse(line: &str) -> Command { ChatCommand::parse_words(line.split_whitespace()).unwrap().command }

#[test]
fn parses_negative_coordinates() {
  assert_eq!(
    parse("respawn set Alice -10 64 -3"),
    Command::Respawn {
      action: RespawnAction::Set { player: "Alice".into(), x: -10, y: 64, z: -3 },
    }
  );
  assert_eq!(
    parse("bonfire check 1 -2 3"),
    Command::Bonfire { action: BonfireAction::Check { x: 1, y: -2, z: 3 } }
  );
  assert!(ChatCommand::parse_words(["respawn", "set", "Alice", "1", "2"]).is_err());
}

#[tokio::test]
async fn respawn_set_without_bonfire_is_not_found() {
  let h = Harness::new().await;
  let alice = player("Alice");
  let ctx = h.commands(vec![alice.clone()]);

  let err = ctx.execute("abyss", parse("respawn set Alice 5 64 0")).await.unwrap_err();
  assert!(matches!(err, Error::NoBonfireAt(ref at) if *at == loc(5)));
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert_eq!(h.bindings.get(alice.player_id).await.unwrap(), None);
}

#[tokio::test]
async fn respawn_set_resolves_location_in_issuer_world() {
  let h = Harness::new().await;
  let b = h.place(5).await;
  let alice = player("Alice");
  let ctx = h.commands(vec![alice.clone()]);

  // Same coordinates, different world.
  let err = ctx.execute("overworld", parse("respawn set Alice 5 64 0")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let replies = ctx.execute("abyss", parse("respawn set Alice 5 64 0")).await.unwrap();
  assert_eq!(replies[0].message, "Respawn set for player Alice.");
  let record = h.store.respawn_of(alice.player_id).await.unwrap().unwrap();
  assert_eq!(record.binding.bonfire_id, b);
}

#[tokio::test]
async fn ambiguous_remove_mutates_nothing() {
  let h = Harness::new().await;
  let b = h.place(1).await;
  let steve_a = player("Steve");
  let steve_b = player("Steve");
  h.bindings.set(steve_a.player_id, b).await.unwrap();
  h.bindings.set(steve_b.player_id, b).await.unwrap();
  let ctx = h.commands(vec![steve_a.clone(), steve_b.clone()]);

  let err = ctx.execute("abyss", parse("respawn remove Steve")).await.unwrap_err();
  assert!(matches!(err, Error::AmbiguousPlayer { count: 2, .. }));
  assert_eq!(err.kind(), ErrorKind::Ambiguous);
  assert_eq!(h.store.bindings_for(b).await.unwrap().len(), 2);
}

#[tokio::test]
async fn respawn_get_reports_every_matching_player() {
  let h = Harness::new().await;
  let b = h.place(1).await;
  let steve_a = player("Steve");
  let steve_b = player("Steve");
  h.bindings.set(steve_a.player_id, b).await.unwrap();
  let ctx = h.commands(vec![steve_a, steve_b]);

  let replies = ctx.execute("abyss", parse("respawn get Steve")).await.unwrap();
  assert_eq!(replies.len(), 3);
  assert!(replies[0].message.starts_with("Multiple players found"));
  let bodies: Vec<&str> = replies[1..].iter().map(|r| r.message.as_str()).collect();
  assert!(bodies.contains(&"Bonfire for player Steve is at abyss (1, 64, 0)."));
  assert!(bodies.contains(&"Player Steve does not have a bonfire respawn set."));
}

#[tokio::test]
async fn unknown_player_is_not_found() {
  let h = Harness::new().await;
  let ctx = h.commands(vec![player("Alice")]);

  let err = ctx.execute("abyss", parse("respawn get Bob")).await.unwrap_err();
  assert!(matches!(err, Error::PlayerNotFound(ref name) if name == "Bob"));
}

#[tokio::test]
async fn respawn_remove_without_binding_is_not_found() {
  let h = Harness::new().await;
  let ctx = h.commands(vec![player("Alice")]);

  let err = ctx.execute("abyss", parse("respawn remove Alice")).await.unwrap_err();
  assert!(matches!(err, Error::NoRespawnSet(_)));
  assert_eq!(crate::commands::error_reply(&err).message, "Player does not have a respawn set.");
}

#[tokio::test]
async fn bonfire_check_reports_registration() {
  let h = Harness::new().await;
  h.place(1).await;
  // Placed in the world but never registered.
  h.world.place(loc(2), BonfireId::new_v4());
  let ctx = h.commands(Vec::new());

  let registered = ctx.execute("abyss", parse("bonfire check 1 64 0")).await.unwrap();
  assert_eq!(registered[0].level, ReplyLevel::Success);

  let unregistered = ctx.execute("abyss", parse("bonfire check 2 64 0")).await.unwrap();
  assert_eq!(unregistered[0].level, ReplyLevel::Error);

  let err = ctx.execute("abyss", parse("bonfire check 3 64 0")).await.unwrap_err();
  assert!(matches!(err, Error::NoBonfireAt(_)));
}
