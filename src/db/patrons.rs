//! Patron repository.

use crate::db::DbError;
use sqlx::{SqliteConnection, SqlitePool};

/// A patron row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatronRecord {
    pub id: String,
    pub display_name: String,
    pub balance: i64,
    pub songs: i64,
    pub connections: i64,
    pub updated_at: i64,
}

type PatronRow = (String, String, i64, i64, i64, i64);

fn from_row((id, display_name, balance, songs, connections, updated_at): PatronRow) -> PatronRecord {
    PatronRecord {
        id,
        display_name,
        balance,
        songs,
        connections,
        updated_at,
    }
}

/// Repository for patron operations.
pub struct PatronRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PatronRepository<'a> {
    /// Create a new patron repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a patron, or rename it if it already exists.
    pub async fn upsert(&self, id: &str, display_name: &str) -> Result<PatronRecord, DbError> {
        let now = chrono::Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO patrons (id, display_name, balance, songs, connections, updated_at)
            VALUES (?, ?, 0, 0, 0, ?)
            ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name, updated_at = excluded.updated_at
            "#,
        )
        .bind(id)
        .bind(display_name)
        .bind(now)
        .execute(self.pool)
        .await?;

        self.find(id)
            .await?
            .ok_or_else(|| DbError::PatronNotFound(id.to_string()))
    }

    /// Find a patron by id.
    pub async fn find(&self, id: &str) -> Result<Option<PatronRecord>, DbError> {
        let row = sqlx::query_as::<_, PatronRow>(
            r#"
            SELECT id, display_name, balance, songs, connections, updated_at
            FROM patrons
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(from_row))
    }

    /// Credit a patron inside the caller's transaction.
    pub async fn credit(
        conn: &mut SqliteConnection,
        id: &str,
        amount: i64,
        songs: u32,
        connections: u32,
    ) -> Result<PatronRecord, DbError> {
        let now = chrono::Utc::now().timestamp_millis();

        let row = sqlx::query_as::<_, PatronRow>(
            r#"
            UPDATE patrons
            SET balance = balance + ?, songs = songs + ?, connections = connections + ?, updated_at = ?
            WHERE id = ?
            RETURNING id, display_name, balance, songs, connections, updated_at
            "#,
        )
        .bind(amount)
        .bind(i64::from(songs))
        .bind(i64::from(connections))
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(from_row)
            .ok_or_else(|| DbError::PatronNotFound(id.to_string()))
    }
}
