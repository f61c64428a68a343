//! Country pricing tables.
//!
//! The tables are owned by an external collaborator. `CountryCache` wraps any
//! provider and keeps each table for a fixed TTL; an expired entry is simply
//! fetched again.

use crate::config::CountryTable;
use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Source of per-country pricing tables.
#[async_trait]
pub trait CountryConfigProvider: Send + Sync {
    /// Fetch the table for `code`. Unknown codes are `InvalidParameter`.
    async fn get(&self, code: &str) -> ServiceResult<Arc<CountryTable>>;
}

/// Tables loaded from the `[[countries]]` config blocks.
pub struct StaticCountryConfig {
    tables: HashMap<String, Arc<CountryTable>>,
}

impl StaticCountryConfig {
    pub fn new(tables: impl IntoIterator<Item = CountryTable>) -> Self {
        Self {
            tables: tables
                .into_iter()
                .map(|t| (t.code.clone(), Arc::new(t)))
                .collect(),
        }
    }
}

#[async_trait]
impl CountryConfigProvider for StaticCountryConfig {
    async fn get(&self, code: &str) -> ServiceResult<Arc<CountryTable>> {
        self.tables
            .get(code)
            .cloned()
            .ok_or_else(|| ServiceError::InvalidParameter(format!("unknown country {code}")))
    }
}

/// TTL cache in front of another provider.
pub struct CountryCache {
    inner: Arc<dyn CountryConfigProvider>,
    ttl: Duration,
    entries: DashMap<String, (Instant, Arc<CountryTable>)>,
}

impl CountryCache {
    pub fn new(inner: Arc<dyn CountryConfigProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: DashMap::new(),
        }
    }
}

#[async_trait]
impl CountryConfigProvider for CountryCache {
    async fn get(&self, code: &str) -> ServiceResult<Arc<CountryTable>> {
        if let Some(entry) = self.entries.get(code)
            && entry.0.elapsed() < self.ttl
        {
            return Ok(Arc::clone(&entry.1));
        }

        debug!(country = %code, "Country table cache miss");
        let table = self.inner.get(code).await?;
        self.entries
            .insert(code.to_string(), (Instant::now(), Arc::clone(&table)));
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        inner: StaticCountryConfig,
        hits: AtomicUsize,
    }

    #[async_trait]
    impl CountryConfigProvider for Counting {
        async fn get(&self, code: &str) -> ServiceResult<Arc<CountryTable>> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            self.inner.get(code).await
        }
    }

    fn table(code: &str) -> CountryTable {
        CountryTable {
            code: code.to_string(),
            minimo_bloqueado: 0,
            costo_extra_generosa: 0,
            montos: Vec::new(),
            modos: Vec::new(),
            tabla_bonos: Vec::new(),
        }
    }

    #[tokio::test]
    async fn unknown_country_is_invalid_parameter() {
        let provider = StaticCountryConfig::new(vec![table("CO")]);
        assert!(provider.get("CO").await.is_ok());
        assert!(matches!(
            provider.get("AR").await,
            Err(ServiceError::InvalidParameter(_))
        ));
    }

    #[tokio::test]
    async fn cache_serves_fresh_entries_and_refetches_expired() {
        let counting = Arc::new(Counting {
            inner: StaticCountryConfig::new(vec![table("CO")]),
            hits: AtomicUsize::new(0),
        });

        let cache = CountryCache::new(counting.clone(), Duration::from_secs(300));
        cache.get("CO").await.unwrap();
        cache.get("CO").await.unwrap();
        assert_eq!(counting.hits.load(Ordering::SeqCst), 1);

        let expiring = CountryCache::new(counting.clone(), Duration::ZERO);
        expiring.get("CO").await.unwrap();
        expiring.get("CO").await.unwrap();
        assert_eq!(counting.hits.load(Ordering::SeqCst), 3);
    }
}
