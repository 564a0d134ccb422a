//! # stash_core
//!
//! Core credential and access-control logic for Stash.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod store;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
