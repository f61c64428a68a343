//! Integration test common infrastructure.
//!
//! Provides utilities for spawning test daemons, seeding their database and
//! driving them over WebSocket the way real clients do.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::{ServerOptions, TestServer};
