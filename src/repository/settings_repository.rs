use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{PaymentSettings, PayoutRail},
    error::{AppError, Result},
    repository::PaymentSettingsRepository,
};

#[derive(FromRow)]
struct SettingsRow {
    wedding_id: String,
    stripe_account_id: Option<String>,
    swish_handle: Option<String>,
    updated_at: NaiveDateTime,
}

pub struct SqlitePaymentSettingsRepository {
    pool: SqlitePool,
}

impl SqlitePaymentSettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_settings(row: SettingsRow) -> Result<PaymentSettings> {
        let mut rails = Vec::new();
        if let Some(account_id) = row.stripe_account_id {
            rails.push(PayoutRail::Card { account_id });
        }
        if let Some(handle) = row.swish_handle {
            rails.push(PayoutRail::Swish { handle });
        }

        Ok(PaymentSettings {
            wedding_id: Uuid::parse_str(&row.wedding_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            rails,
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl PaymentSettingsRepository for SqlitePaymentSettingsRepository {
    async fn find(&self, wedding_id: Uuid) -> Result<Option<PaymentSettings>> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            SELECT wedding_id, stripe_account_id, swish_handle, updated_at
            FROM payment_settings
            WHERE wedding_id = ?
            "#,
        )
        .bind(wedding_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_settings(r)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, settings: &PaymentSettings) -> Result<()> {
        let stripe_account_id = settings.card_account().map(str::to_string);
        let swish_handle = settings.swish_handle().map(str::to_string);

        sqlx::query(
            r#"
            INSERT INTO payment_settings (wedding_id, stripe_account_id, swish_handle, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(wedding_id) DO UPDATE SET
                stripe_account_id = ?2,
                swish_handle = ?3,
                updated_at = ?4
            "#,
        )
        .bind(settings.wedding_id.to_string())
        .bind(stripe_account_id)
        .bind(swish_handle)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
