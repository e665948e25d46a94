use crate::{
    database::connection::DbPool,
    handlers::{forbidden, require_chama},
    middleware::auth::AuthenticatedUser,
    models::{
        auth::UserInfo,
        chama::Chama,
        user::{CreateUser, User, UserError},
    },
    requests::{register::MemberRegistrationRequest, user::UserStatusRequest},
    services::email::{mailbox, welcome_template, EmailService},
    utils::helpers::{error_response, ApiResponse},
};
use actix_web::{http::StatusCode, web, HttpResponse, Result};
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

const TEMP_PASSWORD_LEN: usize = 10;

#[derive(Debug, Serialize)]
pub struct RegisteredMember {
    pub user: UserInfo,
    /// Handed to the member by the admin when no email could be sent.
    pub temporary_password: String,
    /// The welcome email was handed to the mailer. Delivery happens later.
    pub email_queued: bool,
}

fn temporary_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

pub async fn me(pool: web::Data<DbPool>, user: AuthenticatedUser) -> Result<HttpResponse> {
    match User::find_by_id(&pool, user.user_id).await {
        Ok(Some(found)) => Ok(HttpResponse::Ok().json(ApiResponse::success(UserInfo::from(found)))),
        Ok(None) => Ok(error_response(StatusCode::NOT_FOUND, "User not found")),
        Err(e) => {
            error!("Failed to fetch user {}: {}", user.user_id, e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch user",
            ))
        }
    }
}

pub async fn index(pool: web::Data<DbPool>, user: AuthenticatedUser) -> Result<HttpResponse> {
    if !user.is_officer() {
        return Ok(forbidden(&user, "list users"));
    }

    let users = match user.chama_id {
        Some(chama_id) => User::find_by_chama(&pool, chama_id).await,
        None if user.is_admin() => User::find_all(&pool).await,
        None => Ok(Vec::new()),
    };

    match users {
        Ok(users) => Ok(HttpResponse::Ok().json(ApiResponse::success(users))),
        Err(e) => {
            error!("Failed to fetch users: {}", e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch users",
            ))
        }
    }
}

pub async fn register_member(
    pool: web::Data<DbPool>,
    email_service: Option<web::Data<EmailService>>,
    request: web::Json<MemberRegistrationRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    if !user.is_admin() {
        return Ok(forbidden(&user, "register member"));
    }
    let chama_id = match require_chama(&user) {
        Ok(id) => id,
        Err(resp) => return Ok(resp),
    };

    let (valid, user_role) = match request.validate() {
        Ok(v) => v,
        Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, e.to_string())),
    };

    let password = temporary_password();
    let create_user = CreateUser {
        fullname: valid.fullname,
        email: valid.email,
        phone: valid.phone,
        password: password.clone(),
        user_role,
        chama_id: Some(chama_id),
    };

    let member = match User::create(&pool, create_user).await {
        Ok(member) => member,
        Err(UserError::EmailTaken { .. }) => {
            return Ok(error_response(
                StatusCode::CONFLICT,
                "An account with this email already exists",
            ));
        }
        Err(e) => {
            error!("Failed to register member: {}", e);
            return Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to register member",
            ));
        }
    };
    info!(
        "Admin {} registered {} into chama {}",
        user.user_id, member.id, chama_id
    );

    let email_queued = match email_service {
        Some(_) if mailbox(Some(&member.fullname), &member.email).is_err() => {
            warn!("Cannot address welcome email to {}", member.email);
            false
        }
        Some(service) => {
            let chama_name = match Chama::find_by_id(&pool, chama_id).await {
                Ok(Some(chama)) => chama.name,
                _ => "your chama".to_string(),
            };
            let template =
                welcome_template(&member.fullname, &chama_name, &password, &service.login_url());
            EmailService::send_in_background(
                service,
                member.email.clone(),
                member.fullname.clone(),
                template,
            );
            true
        }
        None => false,
    };

    let response = RegisteredMember {
        user: UserInfo::from(member),
        temporary_password: password,
        email_queued,
    };
    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        response,
        "Member registered".to_string(),
    )))
}

pub async fn update_status(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    request: web::Json<UserStatusRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let target_user_id = path.into_inner();
    info!("Updating status for user: {}", target_user_id);

    if !user.is_admin() {
        return Ok(forbidden(&user, "update user status"));
    }

    if target_user_id == user.user_id {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            "You cannot change your own account status",
        ));
    }

    let status = match request.parsed() {
        Some(status) => status,
        None => {
            return Ok(error_response(
                StatusCode::BAD_REQUEST,
                "Status must be one of active, inactive or suspended",
            ));
        }
    };

    match User::find_by_id(&pool, target_user_id).await {
        Ok(Some(target)) => {
            if user.chama_id.is_some() && target.chama_id != user.chama_id {
                warn!(
                    "Admin {} tried to change user {} outside their chama",
                    user.user_id, target_user_id
                );
                return Ok(error_response(
                    StatusCode::NOT_FOUND,
                    format!("User {} not found", target_user_id),
                ));
            }
        }
        Ok(None) => {
            return Ok(error_response(
                StatusCode::NOT_FOUND,
                format!("User {} not found", target_user_id),
            ));
        }
        Err(e) => {
            error!("Failed to load user {}: {}", target_user_id, e);
            return Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update user status",
            ));
        }
    }

    match User::update_status(&pool, target_user_id, status).await {
        Ok(updated_user) => {
            info!(
                "User {} status set to {:?} by {}",
                target_user_id, updated_user.status, user.user_id
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(updated_user)))
        }
        Err(UserError::NotFound { id }) => Ok(error_response(
            StatusCode::NOT_FOUND,
            format!("User {} not found", id),
        )),
        Err(e) => {
            error!("Failed to update user status: {}", e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update user status",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_passwords_are_alphanumeric_and_distinct() {
        let a = temporary_password();
        let b = temporary_password();
        assert_eq!(a.len(), TEMP_PASSWORD_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn registration_reports_queued_email() {
        let now = chrono::Utc::now();
        let member = User {
            id: Uuid::new_v4(),
            fullname: "Kamau, John".to_string(),
            email: "kamau@example.com".to_string(),
            phone: None,
            password_hash: String::new(),
            user_role: crate::models::user::UserRole::Member,
            status: crate::models::user::UserStatus::Active,
            chama_id: Some(Uuid::new_v4()),
            created_at: now,
            updated_at: now,
        };
        assert!(mailbox(Some(&member.fullname), &member.email).is_ok());

        let json = serde_json::to_value(RegisteredMember {
            user: UserInfo::from(member),
            temporary_password: "Ab3dE6gH9k".to_string(),
            email_queued: true,
        })
        .unwrap();
        assert_eq!(json["email_queued"], true);
        assert!(json.get("email_sent").is_none());
        assert_eq!(json["user"]["fullname"], "Kamau, John");
    }
}
