use crate::database::connection::{is_unique_violation, DbPool};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, Type};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("User with ID {id} not found")]
    NotFound { id: Uuid },
    #[error("A user with email {email} already exists")]
    EmailTaken { email: String },
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Treasurer,
    Member,
}

impl UserRole {
    /// Admins and treasurers run the chama's books.
    pub fn is_officer(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Treasurer)
    }

    /// Landing page the SPA should route this role to after login.
    pub fn home_path(self) -> &'static str {
        if self.is_officer() { "/admin" } else { "/member" }
    }
}

impl FromStr for UserRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "treasurer" => Ok(UserRole::Treasurer),
            "member" => Ok(UserRole::Member),
            _ => Err(()),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Admin => "admin",
            UserRole::Treasurer => "treasurer",
            UserRole::Member => "member",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

impl UserStatus {
    pub fn is_active(self) -> bool {
        self == UserStatus::Active
    }
}

impl FromStr for UserStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "suspended" => Ok(UserStatus::Suspended),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub user_role: UserRole,
    pub status: UserStatus,
    pub chama_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Advisory lock key serialising self-registration.
const REGISTRATION_LOCK: i64 = 0x4348_414d_4150;

/// Role handed to a self-registered account.
pub fn bootstrap_role(existing_users: i64) -> UserRole {
    if existing_users == 0 {
        UserRole::Admin
    } else {
        UserRole::Member
    }
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub fullname: String,
    pub email: String,
    pub phone: Option<String>,
    /// Plain-text password; hashed before it is stored.
    pub password: String,
    pub user_role: UserRole,
    pub chama_id: Option<Uuid>,
}

impl User {
    pub async fn create(pool: &DbPool, user: CreateUser) -> Result<Self, UserError> {
        let hashed_password = hash(user.password.as_bytes(), DEFAULT_COST)?;
        Self::insert(pool, &user, hashed_password).await
    }

    /// Self-registration. `user.user_role` is ignored: the first account in
    /// an empty database becomes admin, every later one a member. The count
    /// and the insert share a transaction behind an advisory lock so two
    /// concurrent sign-ups cannot both become admin.
    pub async fn register(pool: &DbPool, mut user: CreateUser) -> Result<Self, UserError> {
        let hashed_password = hash(user.password.as_bytes(), DEFAULT_COST)?;

        let mut tx = pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(REGISTRATION_LOCK)
            .execute(&mut *tx)
            .await?;

        user.user_role = bootstrap_role(Self::count(&mut *tx).await?);
        let created = Self::insert(&mut *tx, &user, hashed_password).await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn insert<'e, E>(executor: E, user: &CreateUser, hashed_password: String) -> Result<Self, UserError>
    where
        E: PgExecutor<'e>,
    {
        let now = Utc::now();
        let email = user.email.trim().to_lowercase();

        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, fullname, email, phone, password_hash, user_role, status, chama_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user.fullname.trim())
        .bind(&email)
        .bind(&user.phone)
        .bind(hashed_password)
        .bind(user.user_role)
        .bind(UserStatus::Active)
        .bind(user.chama_id)
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                UserError::EmailTaken { email: email.clone() }
            } else {
                UserError::Database(e)
            }
        })
    }

    pub async fn find_by_id(pool: &DbPool, id: Uuid) -> Result<Option<Self>, UserError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<Self>, UserError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email.trim())
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn find_all(pool: &DbPool) -> Result<Vec<Self>, UserError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;

        Ok(users)
    }

    pub async fn find_by_chama(pool: &DbPool, chama_id: Uuid) -> Result<Vec<Self>, UserError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE chama_id = $1 ORDER BY fullname ASC",
        )
        .bind(chama_id)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn count<'e, E>(executor: E) -> Result<i64, UserError>
    where
        E: PgExecutor<'e>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    pub async fn update_status(
        pool: &DbPool,
        id: Uuid,
        status: UserStatus,
    ) -> Result<Self, UserError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await?
        .ok_or(UserError::NotFound { id })
    }

    pub async fn assign_chama(pool: &DbPool, id: Uuid, chama_id: Uuid) -> Result<Self, UserError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET chama_id = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(chama_id)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await?
        .ok_or(UserError::NotFound { id })
    }

    pub fn verify_password(&self, password: &str) -> Result<bool, bcrypt::BcryptError> {
        verify(password, &self.password_hash)
    }

    pub async fn authenticate(
        pool: &DbPool,
        email: &str,
        password: &str,
    ) -> Result<Option<Self>, UserError> {
        if let Some(user) = Self::find_by_email(pool, email).await? {
            if user.verify_password(password).unwrap_or(false) {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_password(password: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            fullname: "Wanjiku Kamau".to_string(),
            email: "wanjiku@example.com".to_string(),
            phone: Some("+254712345678".to_string()),
            password_hash: hash(password, 4).unwrap(),
            user_role: UserRole::Member,
            status: UserStatus::Active,
            chama_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!("Admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert_eq!(" treasurer ".parse::<UserRole>(), Ok(UserRole::Treasurer));
        assert_eq!("member".parse::<UserRole>(), Ok(UserRole::Member));
        assert!("chairperson".parse::<UserRole>().is_err());
    }

    #[test]
    fn officers_land_on_admin_dashboard() {
        assert_eq!(UserRole::Admin.home_path(), "/admin");
        assert_eq!(UserRole::Treasurer.home_path(), "/admin");
        assert_eq!(UserRole::Member.home_path(), "/member");
        assert!(!UserRole::Member.is_officer());
    }

    #[test]
    fn only_the_first_account_is_admin() {
        assert_eq!(bootstrap_role(0), UserRole::Admin);
        assert_eq!(bootstrap_role(1), UserRole::Member);
        assert_eq!(bootstrap_role(250), UserRole::Member);
    }

    #[test]
    fn statuses_parse() {
        assert_eq!("SUSPENDED".parse::<UserStatus>(), Ok(UserStatus::Suspended));
        assert!("banned".parse::<UserStatus>().is_err());
        assert!(UserStatus::Active.is_active());
        assert!(!UserStatus::Inactive.is_active());
    }

    #[test]
    fn password_verification() {
        let user = user_with_password("correct horse");
        assert!(user.verify_password("correct horse").unwrap());
        assert!(!user.verify_password("battery staple").unwrap());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = user_with_password("secret-pass");
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["user_role"], "member");
        assert_eq!(json["status"], "active");
    }
}
