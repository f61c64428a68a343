//! bidstage - live song-request sessions with a host wallet ledger.
//!
//! The `bidstaged` binary is a thin shell over these modules; they are
//! exposed as a library so benches can drive the broadcaster directly.

pub mod admin;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod http;
pub mod ledger;
pub mod metrics;
pub mod network;
pub mod state;
pub mod telemetry;
