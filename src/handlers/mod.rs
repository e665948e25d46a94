pub mod auth;
pub mod chamas;
pub mod contributions;
pub mod health;
pub mod loans;
pub mod meetings;
pub mod reports;
pub mod users;

use crate::{middleware::auth::AuthenticatedUser, utils::helpers::error_response};
use actix_web::{http::StatusCode, HttpResponse};
use tracing::warn;
use uuid::Uuid;

pub(crate) fn forbidden(user: &AuthenticatedUser, action: &str) -> HttpResponse {
    warn!("User {} ({}) denied: {}", user.user_id, user.user_role, action);
    error_response(
        StatusCode::FORBIDDEN,
        "You don't have permission to perform this action",
    )
}

/// The caller's chama, or a 400 telling them to join one first.
pub(crate) fn require_chama(user: &AuthenticatedUser) -> Result<Uuid, HttpResponse> {
    user.chama_id.ok_or_else(|| {
        error_response(
            StatusCode::BAD_REQUEST,
            "You are not a member of any chama yet",
        )
    })
}
