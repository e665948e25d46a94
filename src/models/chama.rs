use crate::database::connection::{is_unique_violation, DbPool};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ChamaError {
    #[error("Chama with ID {id} not found")]
    NotFound { id: Uuid },
    #[error("A chama named {name} already exists")]
    NameTaken { name: String },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "contribution_frequency", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContributionFrequency {
    Weekly,
    Monthly,
}

impl FromStr for ContributionFrequency {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(ContributionFrequency::Weekly),
            "monthly" => Ok(ContributionFrequency::Monthly),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Chama {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub contribution_amount: Decimal,
    pub contribution_frequency: ContributionFrequency,
    /// Flat interest charged on loans, in percent.
    pub loan_interest_rate: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateChama {
    pub name: String,
    pub description: Option<String>,
    pub contribution_amount: Decimal,
    pub contribution_frequency: ContributionFrequency,
    pub loan_interest_rate: Decimal,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChamaOverview {
    #[serde(flatten)]
    pub chama: Chama,
    pub member_count: i64,
    pub total_contributions: Decimal,
}

impl Chama {
    /// Inserts the chama and, if its creator does not belong to a chama yet,
    /// makes them a member of it. Both writes commit together.
    pub async fn create(pool: &DbPool, chama: CreateChama) -> Result<Self, ChamaError> {
        let now = Utc::now();
        let name = chama.name.trim().to_string();

        let mut tx = pool.begin().await?;

        let created = sqlx::query_as::<_, Chama>(
            "INSERT INTO chamas (id, name, description, contribution_amount, contribution_frequency, loan_interest_rate, created_by, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(chama.description)
        .bind(chama.contribution_amount)
        .bind(chama.contribution_frequency)
        .bind(chama.loan_interest_rate)
        .bind(chama.created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ChamaError::NameTaken { name: name.clone() }
            } else {
                ChamaError::Database(e)
            }
        })?;

        sqlx::query(
            "UPDATE users SET chama_id = $2, updated_at = $3 WHERE id = $1 AND chama_id IS NULL",
        )
        .bind(created.created_by)
        .bind(created.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    pub async fn find_by_id(pool: &DbPool, id: Uuid) -> Result<Option<Self>, ChamaError> {
        let chama = sqlx::query_as::<_, Chama>("SELECT * FROM chamas WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(chama)
    }

    pub async fn find_all(pool: &DbPool) -> Result<Vec<Self>, ChamaError> {
        let chamas = sqlx::query_as::<_, Chama>("SELECT * FROM chamas ORDER BY name ASC")
            .fetch_all(pool)
            .await?;

        Ok(chamas)
    }

    pub async fn overview(pool: &DbPool, id: Uuid) -> Result<ChamaOverview, ChamaError> {
        let chama = Self::find_by_id(pool, id)
            .await?
            .ok_or(ChamaError::NotFound { id })?;

        let member_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE chama_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;

        let total_contributions: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM contributions WHERE chama_id = $1",
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(ChamaOverview {
            chama,
            member_count,
            total_contributions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;

    #[test]
    fn frequency_parses() {
        assert_eq!("Weekly".parse::<ContributionFrequency>(), Ok(ContributionFrequency::Weekly));
        assert!("daily".parse::<ContributionFrequency>().is_err());
    }

    #[actix_web::test]
    async fn create_reports_failure_instead_of_half_writing() {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();

        let result = Chama::create(
            &pool,
            CreateChama {
                name: "Umoja Women Group".to_string(),
                description: None,
                contribution_amount: Decimal::from(1000),
                contribution_frequency: ContributionFrequency::Monthly,
                loan_interest_rate: Decimal::TEN,
                created_by: Uuid::new_v4(),
            },
        )
        .await;

        assert!(matches!(result, Err(ChamaError::Database(_))));
    }
}
