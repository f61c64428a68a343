//! Operator subcommands.
//!
//! The wire protocol has no way to mint money or register patrons; both are
//! done offline against the same database the daemon uses:
//!
//! ```text
//! bidstaged deposit <config> <host> <country> <real> <bonus> [description]
//! bidstaged patron  <config> <patron-id> <display-name>
//! ```

use crate::config::Config;
use crate::db::Database;
use crate::ledger::{CountryCache, LedgerService, StaticCountryConfig};
use anyhow::{Context as _, bail};
use bidstage_proto::Initiator;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A parsed operator subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// Credit a host wallet.
    Deposit {
        config: String,
        host_id: String,
        country: String,
        real: i64,
        bonus: i64,
        description: String,
    },
    /// Create or rename a patron.
    Patron {
        config: String,
        patron_id: String,
        display_name: String,
    },
}

impl AdminCommand {
    /// Parse `args` (without the program name). `Ok(None)` means "run the daemon".
    pub fn parse(args: &[String]) -> anyhow::Result<Option<Self>> {
        match args.first().map(String::as_str) {
            Some("deposit") => {
                let [_, config, host_id, country, real, bonus, rest @ ..] = args else {
                    bail!("usage: bidstaged deposit <config> <host> <country> <real> <bonus> [description]");
                };
                Ok(Some(Self::Deposit {
                    config: config.clone(),
                    host_id: host_id.clone(),
                    country: country.clone(),
                    real: real.parse().context("real amount")?,
                    bonus: bonus.parse().context("bonus amount")?,
                    description: rest
                        .first()
                        .cloned()
                        .unwrap_or_else(|| "admin deposit".to_string()),
                }))
            }
            Some("patron") => {
                let [_, config, patron_id, display_name] = args else {
                    bail!("usage: bidstaged patron <config> <patron-id> <display-name>");
                };
                Ok(Some(Self::Patron {
                    config: config.clone(),
                    patron_id: patron_id.clone(),
                    display_name: display_name.clone(),
                }))
            }
            _ => Ok(None),
        }
    }

    fn config_path(&self) -> &str {
        match self {
            Self::Deposit { config, .. } | Self::Patron { config, .. } => config,
        }
    }

    /// Execute against the configured database.
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load(self.config_path())
            .with_context(|| format!("loading {}", self.config_path()))?;
        let db = Database::new(config.database_path()).await?;

        match self {
            Self::Deposit {
                host_id,
                country,
                real,
                bonus,
                description,
                ..
            } => {
                let countries = Arc::new(CountryCache::new(
                    Arc::new(StaticCountryConfig::new(config.countries.clone())),
                    Duration::from_secs(config.country_cache.ttl_secs),
                ));
                let ledger = LedgerService::new(db, countries);
                let entry = ledger
                    .deposit(&host_id, &country, real, bonus, Initiator::Admin, &description)
                    .await?;
                info!(
                    host = %host_id,
                    entry = entry.id,
                    real_balance = entry.real_balance,
                    bonus_balance = entry.bonus_balance,
                    "Deposit recorded"
                );
            }
            Self::Patron {
                patron_id,
                display_name,
                ..
            } => {
                let patron = db.patrons().upsert(&patron_id, &display_name).await?;
                info!(patron = %patron.id, name = %patron.display_name, "Patron saved");
            }
        }
        Ok(())
    }
}
