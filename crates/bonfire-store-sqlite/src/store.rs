//! [`SqliteStore`] — the SQLite implementation of [`BonfireStore`].

use std::path::Path;

use bonfire_core::{
  bonfire::{Bonfire, BonfireId, BonfireLocation},
  player::{PlayerBinding, PlayerId, RespawnRecord},
  store::{BindOutcome, BonfireStore, DeletedBonfire, RegisterOutcome},
};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use crate::{
  Result,
  encode::{
    BONFIRE_COLUMNS, RawBinding, RawBonfire, RawRespawn, decode_uuid,
    encode_bonfire_id, encode_player_id, encode_ts,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A bonfire store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// What `register_bonfire` found inside its transaction.
enum RawRegister {
  Registered,
  AlreadyExists,
  LocationTaken(String),
}

/// What `bind_player` found inside its transaction.
enum RawBind {
  Bound { binding: RawBinding, previous: Option<String> },
  NoSuchBonfire,
  Full { capacity: u32 },
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("bonfire schema ready");
    Ok(())
  }

  /// Run a `SELECT` over bonfire rows and decode them.
  async fn query_bonfires(
    &self,
    sql: String,
    now: Option<i64>,
  ) -> Result<Vec<Bonfire>> {
    let raws: Vec<RawBonfire> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match now {
          Some(now) => stmt
            .query_map(rusqlite::params![now], |row| RawBonfire::from_row(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map([], |row| RawBonfire::from_row(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBonfire::into_bonfire).collect()
  }
}

/// Restart the expiry clock of `bonfire_id` if nobody is bound to it any more.
fn reset_clock_if_orphaned(
  conn: &rusqlite::Connection,
  bonfire_id: &str,
  now: i64,
) -> rusqlite::Result<bool> {
  let changed = conn.execute(
    "UPDATE bonfires SET state_changed_at = ?2
     WHERE bonfire_id = ?1
       AND NOT EXISTS (SELECT 1 FROM player_bindings WHERE bonfire_id = ?1)",
    rusqlite::params![bonfire_id, now],
  )?;
  Ok(changed > 0)
}

// ─── BonfireStore impl ───────────────────────────────────────────────────────

impl BonfireStore for SqliteStore {
  type Error = crate::Error;

  // ── Bonfires ──────────────────────────────────────────────────────────────

  async fn register_bonfire(&self, bonfire: Bonfire) -> Result<RegisterOutcome> {
    let raw = RawBonfire::from_bonfire(&bonfire);
    let row = raw.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let id_taken = tx
          .query_row(
            "SELECT 1 FROM bonfires WHERE bonfire_id = ?1",
            rusqlite::params![row.bonfire_id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if id_taken {
          return Ok(RawRegister::AlreadyExists);
        }

        let occupant: Option<String> = tx
          .query_row(
            "SELECT bonfire_id FROM bonfires
             WHERE world = ?1 AND x = ?2 AND y = ?3 AND z = ?4",
            rusqlite::params![row.world, row.x, row.y, row.z],
            |r| r.get(0),
          )
          .optional()?;
        if let Some(other) = occupant {
          return Ok(RawRegister::LocationTaken(other));
        }

        tx.execute(
          "INSERT INTO bonfires (
             bonfire_id, world, x, y, z, state_changed_at, time_until_destroy
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            row.bonfire_id,
            row.world,
            row.x,
            row.y,
            row.z,
            row.state_changed_at,
            row.time_until_destroy,
          ],
        )?;
        tx.commit()?;
        Ok(RawRegister::Registered)
      })
      .await?;

    Ok(match outcome {
      RawRegister::Registered => RegisterOutcome::Registered(raw.into_bonfire()?),
      RawRegister::AlreadyExists => RegisterOutcome::AlreadyExists,
      RawRegister::LocationTaken(other) => {
        RegisterOutcome::LocationTaken(BonfireId(decode_uuid(&other)?))
      }
    })
  }

  async fn get_bonfire(&self, id: BonfireId) -> Result<Option<Bonfire>> {
    let id_str = encode_bonfire_id(id);

    let raw: Option<RawBonfire> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {BONFIRE_COLUMNS} FROM bonfires b WHERE b.bonfire_id = ?1"),
              rusqlite::params![id_str],
              |row| RawBonfire::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawBonfire::into_bonfire).transpose()
  }

  async fn bonfire_at(&self, location: &BonfireLocation) -> Result<Option<Bonfire>> {
    let BonfireLocation { world, x, y, z } = location.clone();

    let raw: Option<RawBonfire> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {BONFIRE_COLUMNS} FROM bonfires b
                 WHERE b.world = ?1 AND b.x = ?2 AND b.y = ?3 AND b.z = ?4"
              ),
              rusqlite::params![world, x, y, z],
              |row| RawBonfire::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawBonfire::into_bonfire).transpose()
  }

  async fn list_bonfires(&self) -> Result<Vec<(Bonfire, usize)>> {
    let raws: Vec<(RawBonfire, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {BONFIRE_COLUMNS}, COUNT(p.player_id)
           FROM bonfires b
           LEFT JOIN player_bindings p ON p.bonfire_id = b.bonfire_id
           GROUP BY b.bonfire_id
           ORDER BY b.world, b.x, b.y, b.z"
        ))?;
        let rows = stmt
          .query_map([], |row| Ok((RawBonfire::from_row(row, 0)?, row.get(7)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, players)| {
        Ok((raw.into_bonfire()?, usize::try_from(players).unwrap_or(0)))
      })
      .collect()
  }

  async fn orphaned_bonfires(&self) -> Result<Vec<Bonfire>> {
    self
      .query_bonfires(
        format!(
          "SELECT {BONFIRE_COLUMNS}
           FROM bonfires b
           LEFT JOIN player_bindings p ON p.bonfire_id = b.bonfire_id
           WHERE p.player_id IS NULL"
        ),
        None,
      )
      .await
  }

  async fn expired_orphans(&self, now: DateTime<Utc>) -> Result<Vec<Bonfire>> {
    self
      .query_bonfires(
        format!(
          "SELECT {BONFIRE_COLUMNS}
           FROM bonfires b
           LEFT JOIN player_bindings p ON p.bonfire_id = b.bonfire_id
           WHERE p.player_id IS NULL
             AND b.state_changed_at + b.time_until_destroy * 1000 <= ?1"
        ),
        Some(encode_ts(now)),
      )
      .await
  }

  async fn delete_bonfire(&self, id: BonfireId) -> Result<Option<DeletedBonfire>> {
    let id_str = encode_bonfire_id(id);

    let deleted: Option<(RawBonfire, usize)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw = tx
          .query_row(
            &format!("SELECT {BONFIRE_COLUMNS} FROM bonfires b WHERE b.bonfire_id = ?1"),
            rusqlite::params![id_str],
            |row| RawBonfire::from_row(row, 0),
          )
          .optional()?;
        let Some(raw) = raw else {
          return Ok(None);
        };

        // Dependent bindings go first so no foreign key ever dangles.
        let released = tx.execute(
          "DELETE FROM player_bindings WHERE bonfire_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "DELETE FROM bonfires WHERE bonfire_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(Some((raw, released)))
      })
      .await?;

    deleted
      .map(|(raw, released_bindings)| {
        Ok(DeletedBonfire { bonfire: raw.into_bonfire()?, released_bindings })
      })
      .transpose()
  }

  async fn delete_if_expired(
    &self,
    id: BonfireId,
    now: DateTime<Utc>,
  ) -> Result<Option<Bonfire>> {
    let id_str = encode_bonfire_id(id);
    let now_ms = encode_ts(now);

    let raw: Option<RawBonfire> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw = tx
          .query_row(
            &format!(
              "SELECT {BONFIRE_COLUMNS} FROM bonfires b
               WHERE b.bonfire_id = ?1
                 AND b.state_changed_at + b.time_until_destroy * 1000 <= ?2
                 AND NOT EXISTS (
                   SELECT 1 FROM player_bindings p WHERE p.bonfire_id = b.bonfire_id
                 )"
            ),
            rusqlite::params![id_str, now_ms],
            |row| RawBonfire::from_row(row, 0),
          )
          .optional()?;
        if let Some(row) = &raw {
          tx.execute(
            "DELETE FROM bonfires WHERE bonfire_id = ?1",
            rusqlite::params![id_str],
          )?;
          tx.execute(
            "INSERT OR REPLACE INTO world_removals (
               bonfire_id, world, x, y, z, state_changed_at, time_until_destroy, queued_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
              row.bonfire_id,
              row.world,
              row.x,
              row.y,
              row.z,
              row.state_changed_at,
              row.time_until_destroy,
              now_ms,
            ],
          )?;
          tx.commit()?;
        }
        Ok(raw)
      })
      .await?;

    raw.map(RawBonfire::into_bonfire).transpose()
  }

  async fn pending_world_removals(&self) -> Result<Vec<Bonfire>> {
    self
      .query_bonfires(
        format!(
          "SELECT {BONFIRE_COLUMNS} FROM world_removals b
           ORDER BY b.queued_at, b.bonfire_id"
        ),
        None,
      )
      .await
  }

  async fn complete_world_removal(&self, id: BonfireId) -> Result<bool> {
    let id_str = encode_bonfire_id(id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM world_removals WHERE bonfire_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }

  // ── Bindings ──────────────────────────────────────────────────────────────

  async fn respawn_of(&self, player: PlayerId) -> Result<Option<RespawnRecord>> {
    let player_str = encode_player_id(player);

    let raw: Option<RawRespawn> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT p.player_id, p.bonfire_id, p.bound_at, {BONFIRE_COLUMNS}
                 FROM player_bindings p
                 LEFT JOIN bonfires b ON b.bonfire_id = p.bonfire_id
                 WHERE p.player_id = ?1"
              ),
              rusqlite::params![player_str],
              RawRespawn::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRespawn::into_record).transpose()
  }

  async fn bind_player(
    &self,
    player: PlayerId,
    bonfire: BonfireId,
    now: DateTime<Utc>,
    capacity: Option<u32>,
  ) -> Result<BindOutcome> {
    let player_str = encode_player_id(player);
    let bonfire_str = encode_bonfire_id(bonfire);
    let now_ms = encode_ts(now);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists = tx
          .query_row(
            "SELECT 1 FROM bonfires WHERE bonfire_id = ?1",
            rusqlite::params![bonfire_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(RawBind::NoSuchBonfire);
        }

        if let Some(capacity) = capacity {
          let others: i64 = tx.query_row(
            "SELECT COUNT(*) FROM player_bindings
             WHERE bonfire_id = ?1 AND player_id != ?2",
            rusqlite::params![bonfire_str, player_str],
            |r| r.get(0),
          )?;
          if others >= i64::from(capacity) {
            return Ok(RawBind::Full { capacity });
          }
        }

        let previous: Option<String> = tx
          .query_row(
            "SELECT bonfire_id FROM player_bindings WHERE player_id = ?1",
            rusqlite::params![player_str],
            |r| r.get(0),
          )
          .optional()?;

        tx.execute(
          "INSERT INTO player_bindings (player_id, bonfire_id, bound_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (player_id) DO UPDATE
             SET bonfire_id = excluded.bonfire_id,
                 bound_at   = excluded.bound_at",
          rusqlite::params![player_str, bonfire_str, now_ms],
        )?;

        let previous = previous.filter(|prev| *prev != bonfire_str);
        if let Some(prev) = &previous {
          reset_clock_if_orphaned(&tx, prev, now_ms)?;
        }
        tx.commit()?;

        Ok(RawBind::Bound {
          binding: RawBinding { player_id: player_str, bonfire_id: bonfire_str, bound_at: now_ms },
          previous,
        })
      })
      .await?;

    Ok(match outcome {
      RawBind::Bound { binding, previous } => BindOutcome::Bound {
        binding:  binding.into_binding()?,
        previous: previous
          .as_deref()
          .map(decode_uuid)
          .transpose()?
          .map(BonfireId),
      },
      RawBind::NoSuchBonfire => BindOutcome::NoSuchBonfire,
      RawBind::Full { capacity } => BindOutcome::Full { capacity },
    })
  }

  async fn unbind_player(
    &self,
    player: PlayerId,
    now: DateTime<Utc>,
  ) -> Result<Option<PlayerBinding>> {
    let player_str = encode_player_id(player);
    let now_ms = encode_ts(now);

    let raw: Option<RawBinding> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let raw = tx
          .query_row(
            "SELECT player_id, bonfire_id, bound_at FROM player_bindings
             WHERE player_id = ?1",
            rusqlite::params![player_str],
            RawBinding::from_row,
          )
          .optional()?;
        let Some(raw) = raw else {
          return Ok(None);
        };

        tx.execute(
          "DELETE FROM player_bindings WHERE player_id = ?1",
          rusqlite::params![player_str],
        )?;
        reset_clock_if_orphaned(&tx, &raw.bonfire_id, now_ms)?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawBinding::into_binding).transpose()
  }

  async fn bindings_for(&self, bonfire: BonfireId) -> Result<Vec<PlayerBinding>> {
    let bonfire_str = encode_bonfire_id(bonfire);

    let raws: Vec<RawBinding> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT player_id, bonfire_id, bound_at FROM player_bindings
           WHERE bonfire_id = ?1
           ORDER BY bound_at, player_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![bonfire_str], RawBinding::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBinding::into_binding).collect()
  }
}
