//! Core types and trait definitions for the bonfire respawn store.
//!
//! This crate is deliberately free of database and runtime dependencies.
//! Storage backends implement [`store::BonfireStore`]; the host game server
//! implements the collaborator traits in [`world`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod bonfire;
pub mod clock;
pub mod error;
pub mod player;
pub mod store;
pub mod world;

pub use error::{Error, Result};
