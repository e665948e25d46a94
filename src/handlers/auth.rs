use crate::{
    database::connection::DbPool,
    models::{
        auth::{AuthResponse, LoginRequest, UserInfo},
        user::{CreateUser, User, UserError, UserRole},
    },
    requests::register::RegisterRequest,
    services::auth::AuthService,
    utils::helpers::{error_response, ApiResponse},
};
use actix_web::{http::StatusCode, web, HttpResponse, Result};
use tracing::{error, info, warn};

pub async fn register(
    pool: web::Data<DbPool>,
    auth_service: web::Data<AuthService>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let valid = match request.validate() {
        Ok(valid) => valid,
        Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, e.to_string())),
    };

    let create_user = CreateUser {
        fullname: valid.fullname,
        email: valid.email,
        phone: valid.phone,
        password: request.password.clone(),
        user_role: UserRole::Member,
        chama_id: None,
    };

    let user = match User::register(&pool, create_user).await {
        Ok(user) => user,
        Err(UserError::EmailTaken { email }) => {
            warn!("Registration with existing email: {}", email);
            return Ok(error_response(
                StatusCode::CONFLICT,
                "An account with this email already exists",
            ));
        }
        Err(e) => {
            error!("Failed to create user: {}", e);
            return Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create user",
            ));
        }
    };
    info!("Registered user {} as {}", user.id, user.user_role);

    let token = auth_service.generate_token(&user).map_err(|e| {
        error!("Failed to generate token: {}", e);
        actix_web::error::ErrorInternalServerError("Failed to generate token")
    })?;

    let response = AuthResponse {
        token,
        user: UserInfo::from(user),
    };

    Ok(HttpResponse::Created().json(ApiResponse::success(response)))
}

pub async fn login(
    pool: web::Data<DbPool>,
    auth_service: web::Data<AuthService>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let user = match auth_service
        .authenticate_user(&pool, &request.email, &request.password)
        .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!("Invalid credentials for user: {}", request.email);
            return Ok(error_response(StatusCode::UNAUTHORIZED, "Invalid credentials"));
        }
        Err(e) => {
            error!("Authentication error: {}", e);
            return Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication error",
            ));
        }
    };

    if !user.status.is_active() {
        warn!("Login attempt by {:?} user {}", user.status, user.id);
        return Ok(error_response(
            StatusCode::FORBIDDEN,
            "Your account is not active. Contact your chama admin",
        ));
    }

    let token = auth_service.generate_token(&user).map_err(|e| {
        error!("Failed to generate token: {}", e);
        actix_web::error::ErrorInternalServerError("Failed to generate token")
    })?;

    info!("User {} logged in", user.id);
    let response = AuthResponse {
        token,
        user: UserInfo::from(user),
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}
