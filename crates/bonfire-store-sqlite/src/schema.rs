//! SQL schema for the bonfire SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per physical bonfire object in the world.
CREATE TABLE IF NOT EXISTS bonfires (
    bonfire_id         TEXT PRIMARY KEY,
    world              TEXT    NOT NULL,
    x                  INTEGER NOT NULL,
    y                  INTEGER NOT NULL,
    z                  INTEGER NOT NULL,
    state_changed_at   INTEGER NOT NULL,   -- unix millis
    time_until_destroy INTEGER NOT NULL,   -- seconds
    UNIQUE (world, x, y, z),
    CHECK  (time_until_destroy >= 0)
);

-- At most one respawn binding per player.
CREATE TABLE IF NOT EXISTS player_bindings (
    player_id  TEXT PRIMARY KEY,
    bonfire_id TEXT    NOT NULL REFERENCES bonfires(bonfire_id) ON DELETE CASCADE,
    bound_at   INTEGER NOT NULL           -- unix millis
);

CREATE INDEX IF NOT EXISTS player_bindings_bonfire_idx ON player_bindings(bonfire_id);

-- Expired bonfires whose row is gone but whose world object may still stand.
-- Written in the same transaction as the row delete; cleared once the world
-- confirms the object is gone.
CREATE TABLE IF NOT EXISTS world_removals (
    bonfire_id         TEXT PRIMARY KEY,
    world              TEXT    NOT NULL,
    x                  INTEGER NOT NULL,
    y                  INTEGER NOT NULL,
    z                  INTEGER NOT NULL,
    state_changed_at   INTEGER NOT NULL,
    time_until_destroy INTEGER NOT NULL,
    queued_at          INTEGER NOT NULL    -- unix millis
);

PRAGMA user_version = 2;
";
