use crate::database::connection::{is_unique_violation, DbPool};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ContributionError {
    #[error("Contribution with ID {id} not found")]
    NotFound { id: Uuid },
    #[error("A contribution with reference {reference} has already been recorded")]
    DuplicateReference { reference: String },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Mpesa,
    Cash,
    Bank,
}

impl PaymentMethod {
    /// M-Pesa payments are traced by their transaction code.
    pub fn requires_reference(self) -> bool {
        self == PaymentMethod::Mpesa
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contribution {
    pub id: Uuid,
    pub member_id: Uuid,
    pub chama_id: Uuid,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub contributed_at: DateTime<Utc>,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateContribution {
    pub member_id: Uuid,
    pub chama_id: Uuid,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub contributed_at: DateTime<Utc>,
    pub recorded_by: Uuid,
}

impl Contribution {
    pub async fn create(
        pool: &DbPool,
        contribution: CreateContribution,
    ) -> Result<Self, ContributionError> {
        let now = Utc::now();
        let reference = contribution.reference.map(|r| r.trim().to_uppercase());

        let created = sqlx::query_as::<_, Contribution>(
            "INSERT INTO contributions (id, member_id, chama_id, amount, payment_method, reference, notes, contributed_at, recorded_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(contribution.member_id)
        .bind(contribution.chama_id)
        .bind(contribution.amount)
        .bind(contribution.payment_method)
        .bind(&reference)
        .bind(contribution.notes)
        .bind(contribution.contributed_at)
        .bind(contribution.recorded_by)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| match reference {
            Some(ref r) if is_unique_violation(&e) => ContributionError::DuplicateReference {
                reference: r.clone(),
            },
            _ => ContributionError::Database(e),
        })?;

        Ok(created)
    }

    pub async fn find_by_id(pool: &DbPool, id: Uuid) -> Result<Option<Self>, ContributionError> {
        let contribution =
            sqlx::query_as::<_, Contribution>("SELECT * FROM contributions WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;

        Ok(contribution)
    }

    pub async fn find_by_member(
        pool: &DbPool,
        member_id: Uuid,
    ) -> Result<Vec<Self>, ContributionError> {
        let contributions = sqlx::query_as::<_, Contribution>(
            "SELECT * FROM contributions WHERE member_id = $1 ORDER BY contributed_at DESC",
        )
        .bind(member_id)
        .fetch_all(pool)
        .await?;

        Ok(contributions)
    }

    pub async fn find_by_chama(
        pool: &DbPool,
        chama_id: Uuid,
    ) -> Result<Vec<Self>, ContributionError> {
        let contributions = sqlx::query_as::<_, Contribution>(
            "SELECT * FROM contributions WHERE chama_id = $1 ORDER BY contributed_at DESC",
        )
        .bind(chama_id)
        .fetch_all(pool)
        .await?;

        Ok(contributions)
    }

    pub async fn total_for_member(
        pool: &DbPool,
        member_id: Uuid,
        chama_id: Uuid,
    ) -> Result<Decimal, ContributionError> {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM contributions WHERE member_id = $1 AND chama_id = $2",
        )
        .bind(member_id)
        .bind(chama_id)
        .fetch_one(pool)
        .await?;

        Ok(total)
    }

    pub async fn delete(pool: &DbPool, id: Uuid) -> Result<(), ContributionError> {
        let result = sqlx::query("DELETE FROM contributions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ContributionError::NotFound { id });
        }

        Ok(())
    }
}
