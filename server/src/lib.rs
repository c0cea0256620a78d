//! Supertonic Server - HTTP synthesis service around the Supertonic engine.
//!
//! The [`api`] module holds the router, request schema and handlers; the
//! binary in `main.rs` only loads the engine and binds the listener.

pub mod api;
