//! Append-only ledger repository.
//!
//! No update or delete method exists; the schema's triggers reject both.

use crate::db::DbError;
use bidstage_proto::{Initiator, LedgerEntryView, LedgerKind};
use sqlx::{SqliteConnection, SqlitePool};

/// Fields of a ledger entry about to be appended.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry<'a> {
    pub host_id: &'a str,
    pub kind: LedgerKind,
    pub real_delta: i64,
    pub bonus_delta: i64,
    pub real_balance: i64,
    pub bonus_balance: i64,
    pub counterparty_id: Option<&'a str>,
    pub description: &'a str,
    pub initiator: Initiator,
}

type EntryRow = (
    i64,
    String,
    String,
    i64,
    i64,
    i64,
    i64,
    Option<String>,
    String,
    String,
    i64,
);

fn from_row(row: EntryRow) -> Result<LedgerEntryView, DbError> {
    let (
        id,
        host_id,
        kind,
        real_delta,
        bonus_delta,
        real_balance,
        bonus_balance,
        counterparty_id,
        description,
        initiator,
        created_at,
    ) = row;

    let kind = LedgerKind::parse(&kind)
        .ok_or_else(|| DbError::Corrupt(format!("ledger entry {id}: kind {kind}")))?;
    let initiator = Initiator::parse(&initiator)
        .ok_or_else(|| DbError::Corrupt(format!("ledger entry {id}: initiator {initiator}")))?;

    Ok(LedgerEntryView {
        id,
        host_id,
        kind,
        real_delta,
        bonus_delta,
        real_balance,
        bonus_balance,
        counterparty_id,
        description,
        initiator,
        created_at,
    })
}

/// Repository for ledger reads and appends.
pub struct LedgerRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LedgerRepository<'a> {
    /// Create a new ledger repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append an entry inside the caller's transaction.
    pub async fn append(
        conn: &mut SqliteConnection,
        entry: &NewLedgerEntry<'_>,
    ) -> Result<LedgerEntryView, DbError> {
        let now = chrono::Utc::now().timestamp_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO ledger_entries
                (host_id, kind, real_delta, bonus_delta, real_balance, bonus_balance,
                 counterparty_id, description, initiator, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.host_id)
        .bind(entry.kind.as_str())
        .bind(entry.real_delta)
        .bind(entry.bonus_delta)
        .bind(entry.real_balance)
        .bind(entry.bonus_balance)
        .bind(entry.counterparty_id)
        .bind(entry.description)
        .bind(entry.initiator.as_str())
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(LedgerEntryView {
            id: result.last_insert_rowid(),
            host_id: entry.host_id.to_string(),
            kind: entry.kind,
            real_delta: entry.real_delta,
            bonus_delta: entry.bonus_delta,
            real_balance: entry.real_balance,
            bonus_balance: entry.bonus_balance,
            counterparty_id: entry.counterparty_id.map(String::from),
            description: entry.description.to_string(),
            initiator: entry.initiator,
            created_at: now,
        })
    }

    /// Most recent entries for a host, newest first.
    pub async fn list(&self, host_id: &str, limit: u32) -> Result<Vec<LedgerEntryView>, DbError> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, host_id, kind, real_delta, bonus_delta, real_balance, bonus_balance,
                   counterparty_id, description, initiator, created_at
            FROM ledger_entries
            WHERE host_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(host_id)
        .bind(i64::from(limit))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(from_row).collect()
    }

    /// Sum of deltas recorded for a host, as (real, bonus).
    pub async fn sum_deltas(&self, host_id: &str) -> Result<(i64, i64), DbError> {
        let (real, bonus) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COALESCE(SUM(real_delta), 0), COALESCE(SUM(bonus_delta), 0)
            FROM ledger_entries
            WHERE host_id = ?
            "#,
        )
        .bind(host_id)
        .fetch_one(self.pool)
        .await?;

        Ok((real, bonus))
    }
}
