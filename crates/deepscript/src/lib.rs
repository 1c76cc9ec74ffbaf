//! HTTP surface and configuration for the deepscript service.
//!
//! The binary in `main.rs` wires these together with the local dialogue
//! runner, the remote script writer and the SQLite history store.

pub mod api;
pub mod config;
