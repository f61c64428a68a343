//! Wallet repository.
//!
//! Reads go through the pool. Writes take a connection borrowed from an open
//! transaction so the ledger service controls the commit boundary.

use crate::db::DbError;
use bidstage_proto::WalletView;
use sqlx::{SqliteConnection, SqlitePool};

/// A host wallet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletRecord {
    pub host_id: String,
    pub country: String,
    pub real_balance: i64,
    pub bonus_balance: i64,
    pub updated_at: i64,
}

impl WalletRecord {
    /// Total funds across both balances.
    pub fn total(&self) -> i64 {
        self.real_balance + self.bonus_balance
    }

    pub fn to_view(&self) -> WalletView {
        WalletView {
            host_id: self.host_id.clone(),
            real_balance: self.real_balance,
            bonus_balance: self.bonus_balance,
        }
    }
}

type WalletRow = (String, String, i64, i64, i64);

fn from_row((host_id, country, real_balance, bonus_balance, updated_at): WalletRow) -> WalletRecord {
    WalletRecord {
        host_id,
        country,
        real_balance,
        bonus_balance,
        updated_at,
    }
}

/// Repository for wallet operations.
pub struct WalletRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> WalletRepository<'a> {
    /// Create a new wallet repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a wallet by host id.
    pub async fn find(&self, host_id: &str) -> Result<Option<WalletRecord>, DbError> {
        let row = sqlx::query_as::<_, WalletRow>(
            r#"
            SELECT host_id, country, real_balance, bonus_balance, updated_at
            FROM wallets
            WHERE host_id = ?
            "#,
        )
        .bind(host_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(from_row))
    }

    /// Read a wallet inside a transaction.
    pub async fn fetch(conn: &mut SqliteConnection, host_id: &str) -> Result<WalletRecord, DbError> {
        let row = sqlx::query_as::<_, WalletRow>(
            r#"
            SELECT host_id, country, real_balance, bonus_balance, updated_at
            FROM wallets
            WHERE host_id = ?
            "#,
        )
        .bind(host_id)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(from_row)
            .ok_or_else(|| DbError::WalletNotFound(host_id.to_string()))
    }

    /// Create an empty wallet if none exists. Returns the current row.
    pub async fn ensure(
        conn: &mut SqliteConnection,
        host_id: &str,
        country: &str,
    ) -> Result<WalletRecord, DbError> {
        let now = chrono::Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO wallets (host_id, country, real_balance, bonus_balance, updated_at)
            VALUES (?, ?, 0, 0, ?)
            ON CONFLICT(host_id) DO NOTHING
            "#,
        )
        .bind(host_id)
        .bind(country)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Self::fetch(conn, host_id).await
    }

    /// Replace both balances, guarded on the values previously read.
    ///
    /// Fails with `Conflict` when another writer changed the row since `seen`
    /// was fetched.
    pub async fn apply(
        conn: &mut SqliteConnection,
        seen: &WalletRecord,
        real_balance: i64,
        bonus_balance: i64,
    ) -> Result<WalletRecord, DbError> {
        let now = chrono::Utc::now().timestamp_millis();

        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET real_balance = ?, bonus_balance = ?, updated_at = ?
            WHERE host_id = ? AND real_balance = ? AND bonus_balance = ?
            "#,
        )
        .bind(real_balance)
        .bind(bonus_balance)
        .bind(now)
        .bind(&seen.host_id)
        .bind(seen.real_balance)
        .bind(seen.bonus_balance)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() != 1 {
            return Err(DbError::Conflict(seen.host_id.clone()));
        }

        Ok(WalletRecord {
            host_id: seen.host_id.clone(),
            country: seen.country.clone(),
            real_balance,
            bonus_balance,
            updated_at: now,
        })
    }
}
