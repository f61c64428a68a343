//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, DatabaseConfig)
//! - [`listen`]: WebSocket listener configuration
//! - [`limits`]: Mailbox, queue and rate limits
//! - [`auth`]: Static credential table backing the auth collaborator
//! - [`countries`]: Per-country pricing, bonus and reserve tables
//! - [`validation`]: Startup checks that collect every problem at once

mod auth;
mod countries;
mod limits;
mod listen;
mod types;
pub mod validation;

pub use auth::{AuthConfig, TokenBlock};
pub use countries::{BonusRow, CountryCacheConfig, CountryTable, ModoEntry, MontoEntry};
pub use limits::LimitsConfig;
pub use listen::ListenConfig;
pub use types::{Config, ConfigError, DatabaseConfig, LogFormat, ServerConfig};
