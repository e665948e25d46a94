use crate::models::user::{User, UserRole, UserStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub phone: Option<String>,
    pub user_role: UserRole,
    pub status: UserStatus,
    pub chama_id: Option<Uuid>,
    pub home_path: &'static str,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            fullname: user.fullname,
            email: user.email,
            phone: user.phone,
            home_path: user.user_role.home_path(),
            user_role: user.user_role,
            status: user.status,
            chama_id: user.chama_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub exp: i64, // expiration time
    pub iat: i64, // issued at
}

impl Claims {
    pub fn new(user_id: Uuid, email: String, role: UserRole, ttl_hours: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id,
            email,
            role,
            exp: now + ttl_hours * 60 * 60,
            iat: now,
        }
    }
}
