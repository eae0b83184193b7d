use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Gift, NewGift},
    error::{AppError, Result},
    repository::GiftRepository,
};

/// Attempts before an aggregation is declared in conflict. The
/// contribution itself is already durable at that point.
const MAX_APPLY_ATTEMPTS: u32 = 5;

#[derive(FromRow)]
struct GiftRow {
    id: String,
    wedding_id: String,
    name: String,
    target_amount: f64,
    total_contributed: f64,
    is_fully_funded: bool,
    image_ref: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteGiftRepository {
    pool: SqlitePool,
}

impl SqliteGiftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_gift(row: GiftRow) -> Result<Gift> {
        Ok(Gift {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            wedding_id: Uuid::parse_str(&row.wedding_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            name: row.name,
            target_amount: row.target_amount,
            total_contributed: row.total_contributed,
            is_fully_funded: row.is_fully_funded,
            image_ref: row.image_ref,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    /// Single-statement increment: the addition and the fully-funded
    /// recomputation happen in one UPDATE, so interleaved contributions to
    /// the same gift cannot lose each other's amounts.
    async fn try_apply(&self, wedding_id: Uuid, gift_id: Uuid, amount: f64) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE gifts
            SET total_contributed = total_contributed + ?1,
                is_fully_funded = CASE
                    WHEN target_amount > 0 THEN total_contributed + ?1 >= target_amount
                    ELSE 0
                END,
                updated_at = ?2
            WHERE id = ?3 AND wedding_id = ?4
            "#,
        )
        .bind(amount)
        .bind(Utc::now().naive_utc())
        .bind(gift_id.to_string())
        .bind(wedding_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Gift not found: {}", gift_id)));
        }

        Ok(())
    }
}

fn is_transient(message: &str) -> bool {
    message.contains("locked") || message.contains("busy")
}

fn backoff_with_jitter(attempt: u32) -> Duration {
    let base_ms = 10u64 * 2u64.pow(attempt);
    let jitter_ms = rand::thread_rng().gen_range(0..10);
    Duration::from_millis(base_ms + jitter_ms)
}

#[async_trait]
impl GiftRepository for SqliteGiftRepository {
    async fn create(&self, gift: NewGift) -> Result<Gift> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO gifts (
                id, wedding_id, name, target_amount,
                total_contributed, is_fully_funded, image_ref,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, 0, 0, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(gift.wedding_id.to_string())
        .bind(&gift.name)
        .bind(gift.target_amount)
        .bind(&gift.image_ref)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find(gift.wedding_id, id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created gift".to_string())
        })
    }

    async fn find(&self, wedding_id: Uuid, gift_id: Uuid) -> Result<Option<Gift>> {
        let row = sqlx::query_as::<_, GiftRow>(
            r#"
            SELECT id, wedding_id, name, target_amount,
                   total_contributed, is_fully_funded, image_ref,
                   created_at, updated_at
            FROM gifts
            WHERE id = ? AND wedding_id = ?
            "#,
        )
        .bind(gift_id.to_string())
        .bind(wedding_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_gift(r)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, wedding_id: Uuid) -> Result<Vec<Gift>> {
        let rows = sqlx::query_as::<_, GiftRow>(
            r#"
            SELECT id, wedding_id, name, target_amount,
                   total_contributed, is_fully_funded, image_ref,
                   created_at, updated_at
            FROM gifts
            WHERE wedding_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(wedding_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_gift).collect()
    }

    async fn apply_contribution(
        &self,
        wedding_id: Uuid,
        gift_id: Uuid,
        amount: f64,
    ) -> Result<Gift> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_apply(wedding_id, gift_id, amount).await {
                Ok(()) => break,
                Err(AppError::Database(msg)) if is_transient(&msg) => {
                    if attempt >= MAX_APPLY_ATTEMPTS {
                        return Err(AppError::AggregationConflict(format!(
                            "Gift {} not updated after {} attempts: {}",
                            gift_id, attempt, msg
                        )));
                    }
                    let backoff = backoff_with_jitter(attempt);
                    tracing::warn!(
                        %gift_id,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "Transient storage contention while aggregating, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }

        self.find(wedding_id, gift_id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated gift".to_string())
        })
    }

    async fn recompute_totals(&self, wedding_id: Uuid, gift_id: Uuid) -> Result<Gift> {
        let result = sqlx::query(
            r#"
            UPDATE gifts
            SET total_contributed = (
                    SELECT COALESCE(SUM(amount), 0.0)
                    FROM contributions
                    WHERE wedding_id = ?1 AND gift_id = ?2
                ),
                is_fully_funded = CASE
                    WHEN target_amount > 0 THEN (
                        SELECT COALESCE(SUM(amount), 0.0)
                        FROM contributions
                        WHERE wedding_id = ?1 AND gift_id = ?2
                    ) >= target_amount
                    ELSE 0
                END,
                updated_at = ?3
            WHERE id = ?2 AND wedding_id = ?1
            "#,
        )
        .bind(wedding_id.to_string())
        .bind(gift_id.to_string())
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Gift not found: {}", gift_id)));
        }

        self.find(wedding_id, gift_id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve reconciled gift".to_string())
        })
    }
}
