use crate::{
    database::connection::DbPool,
    handlers::{forbidden, require_chama},
    middleware::auth::AuthenticatedUser,
    models::{
        contribution::{Contribution, ContributionError, CreateContribution},
        user::User,
    },
    requests::contribution::ContributionRequest,
    utils::helpers::{error_response, ApiResponse},
};
use actix_web::{http::StatusCode, web, HttpResponse, Result};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub async fn create(
    pool: web::Data<DbPool>,
    request: web::Json<ContributionRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let chama_id = match require_chama(&user) {
        Ok(id) => id,
        Err(resp) => return Ok(resp),
    };

    let member_id = request.member_id.unwrap_or(user.user_id);
    if member_id != user.user_id {
        if !user.is_officer() {
            return Ok(forbidden(&user, "record contribution for another member"));
        }
        match User::find_by_id(&pool, member_id).await {
            Ok(Some(member)) if member.chama_id == Some(chama_id) => {}
            Ok(_) => {
                return Ok(error_response(
                    StatusCode::BAD_REQUEST,
                    "Member does not belong to your chama",
                ));
            }
            Err(e) => {
                error!("Failed to load member {}: {}", member_id, e);
                return Ok(error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to create contribution",
                ));
            }
        }
    }

    let valid = match request.validate(Utc::now()) {
        Ok(valid) => valid,
        Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, e.to_string())),
    };

    info!(
        "Recording contribution of {} for member {} by {}",
        valid.amount, member_id, user.user_id
    );

    let create_contribution = CreateContribution {
        member_id,
        chama_id,
        amount: valid.amount,
        payment_method: valid.payment_method,
        reference: valid.reference,
        notes: valid.notes,
        contributed_at: valid.contributed_at,
        recorded_by: user.user_id,
    };

    match Contribution::create(&pool, create_contribution).await {
        Ok(contribution) => {
            info!(
                "Successfully created contribution with ID: {}",
                contribution.id
            );
            Ok(HttpResponse::Created().json(ApiResponse::success(contribution)))
        }
        Err(ContributionError::DuplicateReference { reference }) => {
            warn!("Duplicate contribution reference {}", reference);
            Ok(error_response(
                StatusCode::CONFLICT,
                format!("Reference {} has already been recorded", reference),
            ))
        }
        Err(e) => {
            error!("Database error creating contribution: {}", e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create contribution",
            ))
        }
    }
}

/// Officers see the whole chama's ledger; members only their own entries.
pub async fn index(pool: web::Data<DbPool>, user: AuthenticatedUser) -> Result<HttpResponse> {
    let contributions = match (user.is_officer(), user.chama_id) {
        (true, Some(chama_id)) => Contribution::find_by_chama(&pool, chama_id).await,
        _ => Contribution::find_by_member(&pool, user.user_id).await,
    };

    match contributions {
        Ok(contributions) => Ok(HttpResponse::Ok().json(ApiResponse::success(contributions))),
        Err(e) => {
            error!("Database error getting contributions: {}", e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve contributions",
            ))
        }
    }
}

pub async fn mine(pool: web::Data<DbPool>, user: AuthenticatedUser) -> Result<HttpResponse> {
    info!("Getting all contributions for user: {}", user.user_id);

    match Contribution::find_by_member(&pool, user.user_id).await {
        Ok(contributions) => Ok(HttpResponse::Ok().json(ApiResponse::success(contributions))),
        Err(e) => {
            error!("Database error getting user contributions: {}", e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve contributions",
            ))
        }
    }
}

pub async fn delete(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let contribution_id = path.into_inner();
    info!(
        "Deleting contribution {} for user: {}",
        contribution_id, user.user_id
    );

    if !user.is_officer() {
        return Ok(forbidden(&user, "delete contribution"));
    }

    match Contribution::find_by_id(&pool, contribution_id).await {
        Ok(Some(existing)) if Some(existing.chama_id) == user.chama_id => {}
        Ok(_) => {
            return Ok(error_response(
                StatusCode::NOT_FOUND,
                "Contribution not found",
            ));
        }
        Err(e) => {
            error!("Error checking contribution ownership: {}", e);
            return Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to verify contribution",
            ));
        }
    }

    match Contribution::delete(&pool, contribution_id).await {
        Ok(()) => {
            info!("Successfully deleted contribution: {}", contribution_id);
            Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
                contribution_id,
                "Contribution deleted".to_string(),
            )))
        }
        Err(ContributionError::NotFound { id }) => Ok(error_response(
            StatusCode::NOT_FOUND,
            format!("Contribution {} not found", id),
        )),
        Err(e) => {
            error!("Database error deleting contribution: {}", e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete contribution",
            ))
        }
    }
}
