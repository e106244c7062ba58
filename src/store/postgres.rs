//! `PostgreSQL` balance store
//!
//! Balances live in `users_revenue`; batch claims in `revenue_batches`.
//! Each upsert is one statement: a data-modifying CTE claims
//! `(batch_id, user_id)` with `ON CONFLICT DO NOTHING`, and the outer
//! `INSERT … ON CONFLICT (user_id) DO UPDATE` adds the delta only for a
//! fresh claim. Postgres row locking makes concurrent reconcilers safe
//! without any read-then-write round trip.

use crate::config::StoreConfig;
use crate::core::traits::BalanceStore;
use crate::types::{Balance, BatchId, PersistenceError, UpsertOutcome};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const CREATE_USERS_REVENUE: &str = r"
    CREATE TABLE IF NOT EXISTS users_revenue (
        user_id TEXT PRIMARY KEY,
        revenue BIGINT NOT NULL
    )
";

const CREATE_REVENUE_BATCHES: &str = r"
    CREATE TABLE IF NOT EXISTS revenue_batches (
        batch_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (batch_id, user_id)
    )
";

const APPLY_DELTA: &str = r"
    WITH claim AS (
        INSERT INTO revenue_batches (batch_id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (batch_id, user_id) DO NOTHING
        RETURNING user_id
    )
    INSERT INTO users_revenue (user_id, revenue)
    SELECT user_id, $3::BIGINT FROM claim
    ON CONFLICT (user_id) DO UPDATE
    SET revenue = users_revenue.revenue + EXCLUDED.revenue
    RETURNING revenue
";

const SELECT_BALANCE: &str = "SELECT revenue FROM users_revenue WHERE user_id = $1";

/// Balance store on a `PostgreSQL` connection pool
#[derive(Debug, Clone)]
pub struct PostgresBalanceStore {
    pool: PgPool,
}

impl PostgresBalanceStore {
    /// Create a store on an existing pool
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool and make sure both tables exist
    pub async fn connect(config: &StoreConfig) -> Result<Self, PersistenceError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;

        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create `users_revenue` and `revenue_batches` if missing
    pub async fn ensure_schema(&self) -> Result<(), PersistenceError> {
        for statement in [CREATE_USERS_REVENUE, CREATE_REVENUE_BATCHES] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| PersistenceError::Schema {
                    message: e.to_string(),
                })?;
        }
        tracing::debug!("Balance schema ready");
        Ok(())
    }
}

#[async_trait]
impl BalanceStore for PostgresBalanceStore {
    async fn apply_delta(
        &self,
        batch: &BatchId,
        user_id: &str,
        delta: i64,
    ) -> Result<UpsertOutcome, PersistenceError> {
        let revenue: Option<i64> = sqlx::query_scalar(APPLY_DELTA)
            .bind(batch.as_str())
            .bind(user_id)
            .bind(delta)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match revenue {
            Some(revenue) => UpsertOutcome::Applied { revenue },
            None => UpsertOutcome::AlreadyApplied,
        })
    }

    async fn get_balance(&self, user_id: &str) -> Result<Option<Balance>, PersistenceError> {
        let revenue: Option<i64> = sqlx::query_scalar(SELECT_BALANCE)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(revenue.map(|revenue| Balance::new(user_id, revenue)))
    }
}
