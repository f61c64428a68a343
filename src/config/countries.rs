//! Per-country pricing, bonus and reserve tables.
//!
//! ```toml
//! [[countries]]
//! code = "CO"
//! minimo_bloqueado = 20000
//! costo_extra_generosa = 2000
//! montos = [{ id = "m10", value = 10000 }, { id = "m50", value = 50000 }]
//! modos = [{ id = "normal" }, { id = "generous" }]
//! tabla_bonos = [
//!     { monto = "m10", modo = "normal", songs = 1, connections = 0 },
//!     { monto = "m10", modo = "generous", songs = 2, connections = 1 },
//! ]
//! ```

use serde::Deserialize;

/// Pricing tables for one country.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CountryTable {
    /// ISO country code (e.g. "CO").
    pub code: String,
    /// Balance every host in this country must keep untouched.
    pub minimo_bloqueado: i64,
    /// Fee added to the cost of a `generous` recharge.
    #[serde(default)]
    pub costo_extra_generosa: i64,
    /// Named recharge amounts.
    #[serde(default)]
    pub montos: Vec<MontoEntry>,
    /// Known bonus modes.
    #[serde(default)]
    pub modos: Vec<ModoEntry>,
    /// Bonus payout per (monto, modo).
    #[serde(default)]
    pub tabla_bonos: Vec<BonusRow>,
}

/// A catalog amount.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MontoEntry {
    /// Catalog id.
    pub id: String,
    /// Fixed value in minor units.
    pub value: i64,
}

/// A bonus mode.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ModoEntry {
    /// Mode id (`generous` adds the extra fee).
    pub id: String,
}

/// Bonus payout for one (monto, modo) pair.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BonusRow {
    /// Catalog amount id.
    pub monto: String,
    /// Mode id.
    pub modo: String,
    /// Bonus songs granted to the patron.
    #[serde(default)]
    pub songs: u32,
    /// Bonus connections granted to the patron.
    #[serde(default)]
    pub connections: u32,
}

impl CountryTable {
    /// Resolve a catalog amount id to its value.
    pub fn monto(&self, id: &str) -> Option<i64> {
        self.montos.iter().find(|m| m.id == id).map(|m| m.value)
    }

    /// Whether `id` is a declared mode.
    pub fn has_modo(&self, id: &str) -> bool {
        self.modos.iter().any(|m| m.id == id)
    }

    /// Bonus payout for a (monto, modo) pair.
    pub fn bonus(&self, monto: &str, modo: &str) -> Option<&BonusRow> {
        self.tabla_bonos
            .iter()
            .find(|row| row.monto == monto && row.modo == modo)
    }
}

/// Cache behaviour for country table reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CountryCacheConfig {
    /// Seconds a fetched table stays fresh (default: 300).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CountryCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    300
}
