use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Contribution, ContributionRail, NewContribution},
    error::{AppError, Result},
    repository::ContributionRepository,
};

#[derive(FromRow)]
struct ContributionRow {
    id: String,
    wedding_id: String,
    gift_id: String,
    amount: f64,
    rail: String,
    donor_name: Option<String>,
    message: Option<String>,
    donor_contact: Option<String>,
    checkout_session_id: Option<String>,
    created_at: NaiveDateTime,
}

pub struct SqliteContributionRepository {
    pool: SqlitePool,
}

impl SqliteContributionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_contribution(row: ContributionRow) -> Result<Contribution> {
        Ok(Contribution {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            wedding_id: Uuid::parse_str(&row.wedding_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            gift_id: Uuid::parse_str(&row.gift_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            amount: row.amount,
            rail: Self::parse_rail(&row.rail)?,
            donor_name: row.donor_name,
            message: row.message,
            donor_contact: row.donor_contact,
            checkout_session_id: row.checkout_session_id,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    fn parse_rail(s: &str) -> Result<ContributionRail> {
        match s {
            "card" => Ok(ContributionRail::Card),
            "swish" => Ok(ContributionRail::Swish),
            _ => Err(AppError::Database(format!("Invalid contribution rail: {}", s))),
        }
    }
}

#[async_trait]
impl ContributionRepository for SqliteContributionRepository {
    async fn record(&self, new: NewContribution) -> Result<Contribution> {
        let contribution = Contribution {
            id: new.id.unwrap_or_else(Uuid::new_v4),
            wedding_id: new.wedding_id,
            gift_id: new.gift_id,
            amount: new.amount,
            rail: new.rail,
            donor_name: new.donor_name,
            message: new.message,
            donor_contact: new.donor_contact,
            checkout_session_id: new.checkout_session_id,
            created_at: new.created_at.unwrap_or_else(Utc::now),
        };

        sqlx::query(
            r#"
            INSERT INTO contributions (
                id, wedding_id, gift_id, amount, rail,
                donor_name, message, donor_contact,
                checkout_session_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(contribution.id.to_string())
        .bind(contribution.wedding_id.to_string())
        .bind(contribution.gift_id.to_string())
        .bind(contribution.amount)
        .bind(contribution.rail.as_str())
        .bind(&contribution.donor_name)
        .bind(&contribution.message)
        .bind(&contribution.donor_contact)
        .bind(&contribution.checkout_session_id)
        .bind(contribution.created_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(contribution)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contribution>> {
        let row = sqlx::query_as::<_, ContributionRow>(
            r#"
            SELECT id, wedding_id, gift_id, amount, rail,
                   donor_name, message, donor_contact,
                   checkout_session_id, created_at
            FROM contributions
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_contribution(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Contribution>> {
        let row = sqlx::query_as::<_, ContributionRow>(
            r#"
            SELECT id, wedding_id, gift_id, amount, rail,
                   donor_name, message, donor_contact,
                   checkout_session_id, created_at
            FROM contributions
            WHERE checkout_session_id = ?
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_contribution(r)?)),
            None => Ok(None),
        }
    }

    async fn list_by_gift(&self, wedding_id: Uuid, gift_id: Uuid) -> Result<Vec<Contribution>> {
        let rows = sqlx::query_as::<_, ContributionRow>(
            r#"
            SELECT id, wedding_id, gift_id, amount, rail,
                   donor_name, message, donor_contact,
                   checkout_session_id, created_at
            FROM contributions
            WHERE wedding_id = ? AND gift_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(wedding_id.to_string())
        .bind(gift_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_contribution).collect()
    }

    async fn sum_for_gift(&self, wedding_id: Uuid, gift_id: Uuid) -> Result<f64> {
        let (sum,): (f64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount), 0.0)
            FROM contributions
            WHERE wedding_id = ? AND gift_id = ?
            "#,
        )
        .bind(wedding_id.to_string())
        .bind(gift_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(sum)
    }
}
