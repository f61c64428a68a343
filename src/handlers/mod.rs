//! Command handlers.
//!
//! Each wire action maps to one [`Handler`]. The [`Registry`] owns the
//! mapping and applies the auth gate before a handler runs.

mod connection;
mod core;
mod ledger;
mod queue;
mod rooms;
mod session;

pub use core::{ConnectionState, Context, Handler, Registry};
