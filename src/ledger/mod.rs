//! Balance transfer ledger.
//!
//! Every wallet change happens here, inside one SQLite transaction that
//! reads the wallet, updates it under an optimistic guard, credits the
//! counterparty and appends the ledger entry. Transfers on the same host are
//! serialized by a per-host async mutex. Transactions begin `IMMEDIATE`, so
//! writers for different hosts queue on SQLite's write lock instead of
//! failing with `SQLITE_BUSY`.

mod country;
mod drawdown;

pub use country::{CountryCache, CountryConfigProvider, StaticCountryConfig};
pub use drawdown::{Drawdown, plan_drawdown};

use crate::db::{Database, DbError, LedgerRepository, NewLedgerEntry, PatronRepository, WalletRepository};
use crate::error::{ServiceError, ServiceResult};
use bidstage_proto::{Initiator, LedgerEntryView, LedgerKind, TransferReceipt, WalletView};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Mode id that adds `costo_extra_generosa` to the cost.
pub const GENEROUS_MODE: &str = "generous";

/// Atomic transfers between host wallets and patrons.
pub struct LedgerService {
    db: Database,
    countries: Arc<dyn CountryConfigProvider>,
    host_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LedgerService {
    pub fn new(db: Database, countries: Arc<dyn CountryConfigProvider>) -> Self {
        Self {
            db,
            countries,
            host_locks: DashMap::new(),
        }
    }

    fn host_lock(&self, host_id: &str) -> Arc<Mutex<()>> {
        self.host_locks
            .entry(host_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Recharge a patron from a host wallet.
    ///
    /// `monto` and `modo` are catalog ids from the host's country table.
    pub async fn transfer(
        &self,
        host_id: &str,
        patron_id: &str,
        monto: &str,
        modo: &str,
    ) -> ServiceResult<TransferReceipt> {
        let result = self.transfer_inner(host_id, patron_id, monto, modo).await;
        let outcome = match &result {
            Ok(_) => "committed",
            Err(e) => e.error_code(),
        };
        crate::metrics::record_transfer(outcome);

        match &result {
            Ok(receipt) => info!(
                host = %host_id,
                patron = %patron_id,
                cost = receipt.cost,
                kind = receipt.entry.kind.as_str(),
                "Transfer committed"
            ),
            Err(ServiceError::StorageFailure(detail)) => {
                warn!(host = %host_id, patron = %patron_id, error = %detail, "Transfer rolled back")
            }
            Err(e) => debug!(host = %host_id, patron = %patron_id, error = %e, "Transfer refused"),
        }

        result
    }

    async fn transfer_inner(
        &self,
        host_id: &str,
        patron_id: &str,
        monto: &str,
        modo: &str,
    ) -> ServiceResult<TransferReceipt> {
        let lock = self.host_lock(host_id);
        let _guard = lock.lock().await;

        let mut tx = self.db.begin_write().await?;

        let wallet = WalletRepository::fetch(&mut *tx, host_id).await?;
        let table = self.countries.get(&wallet.country).await?;

        let amount = table
            .monto(monto)
            .ok_or_else(|| ServiceError::InvalidParameter(format!("unknown monto {monto}")))?;
        let bonus = table.bonus(monto, modo).ok_or_else(|| {
            ServiceError::InvalidParameter(format!("no bonus row for monto {monto} and modo {modo}"))
        })?;

        let cost = if modo == GENEROUS_MODE {
            amount + table.costo_extra_generosa
        } else {
            amount
        };

        let plan = plan_drawdown(
            wallet.real_balance,
            wallet.bonus_balance,
            table.minimo_bloqueado,
            cost,
        )?;

        let updated = WalletRepository::apply(&mut *tx, &wallet, plan.real_after, plan.bonus_after).await?;
        let patron =
            PatronRepository::credit(&mut *tx, patron_id, cost, bonus.songs, bonus.connections).await?;

        let description = format!("recharge {monto}/{modo} to {}", patron.display_name);
        let entry = LedgerRepository::append(
            &mut *tx,
            &NewLedgerEntry {
                host_id,
                kind: plan.kind,
                real_delta: plan.real_delta(),
                bonus_delta: plan.bonus_delta(),
                real_balance: updated.real_balance,
                bonus_balance: updated.bonus_balance,
                counterparty_id: Some(patron_id),
                description: &description,
                initiator: Initiator::User,
            },
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        Ok(TransferReceipt {
            wallet: updated.to_view(),
            cost,
            songs: bonus.songs,
            connections: bonus.connections,
            counterparty: patron.display_name,
            entry,
        })
    }

    /// Credit a host wallet out of band, creating it if missing.
    pub async fn deposit(
        &self,
        host_id: &str,
        country: &str,
        real: i64,
        bonus: i64,
        initiator: Initiator,
        description: &str,
    ) -> ServiceResult<LedgerEntryView> {
        if real < 0 || bonus < 0 || (real == 0 && bonus == 0) {
            return Err(ServiceError::InvalidParameter(
                "deposit amounts must be non-negative and not both zero".to_string(),
            ));
        }
        self.countries.get(country).await?;

        let lock = self.host_lock(host_id);
        let _guard = lock.lock().await;

        let mut tx = self.db.begin_write().await?;

        let wallet = WalletRepository::ensure(&mut *tx, host_id, country).await?;
        if wallet.country != country {
            return Err(ServiceError::InvalidParameter(format!(
                "host {host_id} holds a {} wallet, not {country}",
                wallet.country
            )));
        }
        let (Some(real_after), Some(bonus_after)) = (
            wallet.real_balance.checked_add(real),
            wallet.bonus_balance.checked_add(bonus),
        ) else {
            return Err(ServiceError::InvalidParameter(
                "deposit would overflow the wallet balance".to_string(),
            ));
        };
        let updated = WalletRepository::apply(&mut *tx, &wallet, real_after, bonus_after).await?;

        let entry = LedgerRepository::append(
            &mut *tx,
            &NewLedgerEntry {
                host_id,
                kind: LedgerKind::Deposit,
                real_delta: real,
                bonus_delta: bonus,
                real_balance: updated.real_balance,
                bonus_balance: updated.bonus_balance,
                counterparty_id: None,
                description,
                initiator,
            },
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(host = %host_id, real, bonus, initiator = initiator.as_str(), "Deposit committed");
        Ok(entry)
    }

    /// Current balances for a host.
    pub async fn wallet(&self, host_id: &str) -> ServiceResult<WalletView> {
        self.db
            .wallets()
            .find(host_id)
            .await?
            .map(|w| w.to_view())
            .ok_or_else(|| ServiceError::NotFound(format!("wallet for host {host_id}")))
    }

    /// Newest-first ledger entries for a host.
    pub async fn entries(&self, host_id: &str, limit: u32) -> ServiceResult<Vec<LedgerEntryView>> {
        Ok(self.db.ledger().list(host_id, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BonusRow, CountryTable, ModoEntry, MontoEntry};

    fn colombia() -> CountryTable {
        CountryTable {
            code: "CO".to_string(),
            minimo_bloqueado: 20_000,
            costo_extra_generosa: 2_000,
            montos: vec![
                MontoEntry { id: "m15".into(), value: 15_000 },
                MontoEntry { id: "m90".into(), value: 90_000 },
            ],
            modos: vec![ModoEntry { id: "normal".into() }, ModoEntry { id: "generous".into() }],
            tabla_bonos: vec![
                BonusRow { monto: "m15".into(), modo: "normal".into(), songs: 1, connections: 0 },
                BonusRow { monto: "m15".into(), modo: "generous".into(), songs: 3, connections: 1 },
                BonusRow { monto: "m90".into(), modo: "normal".into(), songs: 8, connections: 2 },
            ],
        }
    }

    async fn service() -> (LedgerService, Database) {
        let db = Database::new(":memory:").await.unwrap();
        let countries = Arc::new(StaticCountryConfig::new(vec![colombia()]));
        db.patrons().upsert("p1", "Ana").await.unwrap();
        (LedgerService::new(db.clone(), countries), db)
    }

    #[tokio::test]
    async fn mixed_transfer_updates_both_sides() {
        let (ledger, db) = service().await;
        ledger.deposit("h1", "CO", 50_000, 0, Initiator::Admin, "seed").await.unwrap();
        ledger.deposit("h1", "CO", 0, 10_000, Initiator::System, "promo").await.unwrap();

        // Reserve is 20k: 60k - 20k = 40k available.
        let receipt = ledger.transfer("h1", "p1", "m15", "normal").await.unwrap();
        assert_eq!(receipt.cost, 15_000);
        assert_eq!(receipt.wallet.bonus_balance, 0);
        assert_eq!(receipt.wallet.real_balance, 45_000);
        assert_eq!(receipt.entry.kind, LedgerKind::RechargeMixed);
        assert_eq!(receipt.entry.bonus_delta, -10_000);
        assert_eq!(receipt.entry.real_delta, -5_000);
        assert_eq!(receipt.counterparty, "Ana");
        assert_eq!(receipt.songs, 1);

        let patron = db.patrons().find("p1").await.unwrap().unwrap();
        assert_eq!(patron.balance, 15_000);
        assert_eq!(patron.songs, 1);
    }

    #[tokio::test]
    async fn generous_mode_adds_fee() {
        let (ledger, _db) = service().await;
        ledger.deposit("h1", "CO", 100_000, 0, Initiator::Admin, "seed").await.unwrap();

        let receipt = ledger.transfer("h1", "p1", "m15", "generous").await.unwrap();
        assert_eq!(receipt.cost, 17_000);
        assert_eq!(receipt.connections, 1);
        assert_eq!(receipt.wallet.real_balance, 83_000);
    }

    #[tokio::test]
    async fn reserve_violation_leaves_wallet_unchanged() {
        let (ledger, _db) = service().await;
        ledger.deposit("h1", "CO", 100_000, 0, Initiator::Admin, "seed").await.unwrap();

        let err = ledger.transfer("h1", "p1", "m90", "normal").await.unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientFunds { available: 80_000, required: 90_000 }));

        let wallet = ledger.wallet("h1").await.unwrap();
        assert_eq!((wallet.real_balance, wallet.bonus_balance), (100_000, 0));
        assert_eq!(ledger.entries("h1", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_catalog_ids_are_invalid() {
        let (ledger, _db) = service().await;
        ledger.deposit("h1", "CO", 100_000, 0, Initiator::Admin, "seed").await.unwrap();

        assert!(matches!(
            ledger.transfer("h1", "p1", "m42", "normal").await,
            Err(ServiceError::InvalidParameter(_))
        ));
        assert!(matches!(
            ledger.transfer("h1", "p1", "m90", "generous").await,
            Err(ServiceError::InvalidParameter(_))
        ));
    }

    #[tokio::test]
    async fn missing_patron_rolls_back_wallet() {
        let (ledger, _db) = service().await;
        ledger.deposit("h1", "CO", 100_000, 0, Initiator::Admin, "seed").await.unwrap();

        let err = ledger.transfer("h1", "ghost", "m15", "normal").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let wallet = ledger.wallet("h1").await.unwrap();
        assert_eq!(wallet.real_balance, 100_000);
        assert_eq!(ledger.entries("h1", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_host_is_not_found() {
        let (ledger, _db) = service().await;
        assert!(matches!(
            ledger.transfer("nobody", "p1", "m15", "normal").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(ledger.wallet("nobody").await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn ledger_sums_reconcile_with_wallet() {
        let (ledger, db) = service().await;
        ledger.deposit("h1", "CO", 70_000, 0, Initiator::Admin, "seed").await.unwrap();
        ledger.deposit("h1", "CO", 0, 5_000, Initiator::System, "promo").await.unwrap();

        for _ in 0..4 {
            let _ = ledger.transfer("h1", "p1", "m15", "normal").await;
        }

        let wallet = ledger.wallet("h1").await.unwrap();
        let (real, bonus) = db.ledger().sum_deltas("h1").await.unwrap();
        assert_eq!(real, wallet.real_balance);
        assert_eq!(bonus, wallet.bonus_balance);
        assert!(wallet.real_balance + wallet.bonus_balance >= 20_000);

        let entries = ledger.entries("h1", 100).await.unwrap();
        assert!(entries.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[tokio::test]
    async fn concurrent_transfers_on_one_host_serialize() {
        let (ledger, _db) = service().await;
        let ledger = Arc::new(ledger);
        // 20k reserve + room for exactly three 15k recharges.
        ledger.deposit("h1", "CO", 65_000, 0, Initiator::Admin, "seed").await.unwrap();

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move { ledger.transfer("h1", "p1", "m15", "normal").await })
            })
            .collect();

        let mut committed = 0;
        let mut refused = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => committed += 1,
                Err(ServiceError::InsufficientFunds { .. }) => refused += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(committed, 3);
        assert_eq!(refused, 3);
        assert_eq!(ledger.wallet("h1").await.unwrap().real_balance, 20_000);
    }

    #[tokio::test]
    async fn deposit_validates_amounts_and_country() {
        let (ledger, _db) = service().await;
        assert!(matches!(
            ledger.deposit("h1", "CO", 0, 0, Initiator::Admin, "").await,
            Err(ServiceError::InvalidParameter(_))
        ));
        assert!(matches!(
            ledger.deposit("h1", "CO", -5, 10, Initiator::Admin, "").await,
            Err(ServiceError::InvalidParameter(_))
        ));
        assert!(matches!(
            ledger.deposit("h1", "XX", 10, 0, Initiator::Admin, "").await,
            Err(ServiceError::InvalidParameter(_))
        ));
    }

    #[tokio::test]
    async fn deposit_rejects_country_mismatch() {
        let db = Database::new(":memory:").await.unwrap();
        let mut argentina = colombia();
        argentina.code = "AR".to_string();
        let countries = Arc::new(StaticCountryConfig::new(vec![colombia(), argentina]));
        let ledger = LedgerService::new(db, countries);

        ledger.deposit("h1", "CO", 50_000, 0, Initiator::Admin, "seed").await.unwrap();
        assert!(matches!(
            ledger.deposit("h1", "AR", 10_000, 0, Initiator::Admin, "wrong wallet").await,
            Err(ServiceError::InvalidParameter(_))
        ));

        let wallet = ledger.wallet("h1").await.unwrap();
        assert_eq!(wallet.real_balance, 50_000);
        assert_eq!(ledger.entries("h1", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deposit_overflow_is_invalid() {
        let (ledger, _db) = service().await;
        ledger.deposit("h1", "CO", i64::MAX, 0, Initiator::Admin, "seed").await.unwrap();

        assert!(matches!(
            ledger.deposit("h1", "CO", 1, 0, Initiator::Admin, "too much").await,
            Err(ServiceError::InvalidParameter(_))
        ));
        assert!(matches!(
            ledger.deposit("h2", "CO", i64::MAX, i64::MAX, Initiator::Admin, "both").await,
            Ok(_)
        ));

        let wallet = ledger.wallet("h1").await.unwrap();
        assert_eq!(wallet.real_balance, i64::MAX);
        assert_eq!(ledger.entries("h1", 10).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_transfers_across_hosts_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        db.patrons().upsert("p1", "Ana").await.unwrap();
        let countries = Arc::new(StaticCountryConfig::new(vec![colombia()]));
        let ledger = Arc::new(LedgerService::new(db.clone(), countries));

        let hosts: Vec<String> = (0..8).map(|i| format!("h{i}")).collect();
        for host in &hosts {
            ledger
                .deposit(host, "CO", 100_000, 5_000, Initiator::Admin, "seed")
                .await
                .unwrap();
        }

        // Five 15k recharges per host stay well above the 20k reserve.
        let handles: Vec<_> = (0..40)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                let host = hosts[i % hosts.len()].clone();
                tokio::spawn(async move { ledger.transfer(&host, "p1", "m15", "normal").await })
            })
            .collect();
        for handle in handles {
            if let Err(e) = handle.await.unwrap() {
                panic!("transfer failed: {e}");
            }
        }

        for host in &hosts {
            let wallet = ledger.wallet(host).await.unwrap();
            assert_eq!((wallet.real_balance, wallet.bonus_balance), (30_000, 0));
            let (real, bonus) = db.ledger().sum_deltas(host).await.unwrap();
            assert_eq!((real, bonus), (wallet.real_balance, wallet.bonus_balance));
            assert_eq!(ledger.entries(host, 100).await.unwrap().len(), 6);
        }

        let patron = db.patrons().find("p1").await.unwrap().unwrap();
        assert_eq!(patron.balance, 40 * 15_000);
        assert_eq!(patron.songs, 40);
    }
}
