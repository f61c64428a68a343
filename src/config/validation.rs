//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
    #[error("duplicate country code: {0}")]
    DuplicateCountry(String),
    #[error("country {country}: monto {monto} must be positive")]
    NonPositiveMonto { country: String, monto: String },
    #[error("country {0}: minimo_bloqueado and costo_extra_generosa must not be negative")]
    NegativeFee(String),
    #[error("country {country}: tabla_bonos references unknown monto {monto}")]
    UnknownMonto { country: String, monto: String },
    #[error("country {country}: tabla_bonos references unknown modo {modo}")]
    UnknownModo { country: String, modo: String },
    #[error("auth token for host {0} is declared more than once")]
    DuplicateToken(String),
    #[error("limits.{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    // Database path validation
    if let Some(ref db) = config.database
        && db.path != ":memory:"
    {
        let db_path = Path::new(&db.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(db.path.clone()));
        }
    }

    let mut codes = HashSet::new();
    for country in &config.countries {
        if !codes.insert(country.code.as_str()) {
            errors.push(ValidationError::DuplicateCountry(country.code.clone()));
        }
        if country.minimo_bloqueado < 0 || country.costo_extra_generosa < 0 {
            errors.push(ValidationError::NegativeFee(country.code.clone()));
        }
        for monto in &country.montos {
            if monto.value <= 0 {
                errors.push(ValidationError::NonPositiveMonto {
                    country: country.code.clone(),
                    monto: monto.id.clone(),
                });
            }
        }
        for row in &country.tabla_bonos {
            if country.monto(&row.monto).is_none() {
                errors.push(ValidationError::UnknownMonto {
                    country: country.code.clone(),
                    monto: row.monto.clone(),
                });
            }
            if !country.has_modo(&row.modo) {
                errors.push(ValidationError::UnknownModo {
                    country: country.code.clone(),
                    modo: row.modo.clone(),
                });
            }
        }
    }

    let mut tokens = HashSet::new();
    for block in &config.auth.tokens {
        if !tokens.insert(block.token.as_str()) {
            errors.push(ValidationError::DuplicateToken(block.host_id.clone()));
        }
    }

    if config.limits.session_mailbox_capacity == 0 {
        errors.push(ValidationError::ZeroLimit("session_mailbox_capacity"));
    }
    if config.limits.outbound_queue_capacity == 0 {
        errors.push(ValidationError::ZeroLimit("outbound_queue_capacity"));
    }
    if config.limits.commands_per_second == 0 {
        errors.push(ValidationError::ZeroLimit("commands_per_second"));
    }
    if config.limits.ledger_page_size == 0 {
        errors.push(ValidationError::ZeroLimit("ledger_page_size"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
