use crate::{
    database::connection::DbPool,
    handlers::{forbidden, require_chama},
    middleware::auth::AuthenticatedUser,
    models::meeting::{CreateMeeting, Meeting, MeetingError},
    requests::meeting::{MeetingQuery, MeetingRequest, MeetingStatusRequest},
    requests::clean_optional,
    utils::helpers::{error_response, ApiResponse},
};
use actix_web::{http::StatusCode, web, HttpResponse, Result};
use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

pub async fn index(
    pool: web::Data<DbPool>,
    query: web::Query<MeetingQuery>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let chama_id = match require_chama(&user) {
        Ok(id) => id,
        Err(resp) => return Ok(resp),
    };

    match Meeting::find_by_chama(&pool, chama_id, query.upcoming).await {
        Ok(meetings) => Ok(HttpResponse::Ok().json(ApiResponse::success(meetings))),
        Err(e) => {
            error!("Failed to fetch meetings for chama {}: {}", chama_id, e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve meetings",
            ))
        }
    }
}

pub async fn create(
    pool: web::Data<DbPool>,
    request: web::Json<MeetingRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    if !user.is_officer() {
        return Ok(forbidden(&user, "schedule meeting"));
    }
    let chama_id = match require_chama(&user) {
        Ok(id) => id,
        Err(resp) => return Ok(resp),
    };

    if let Err(e) = request.validate(Utc::now()) {
        return Ok(error_response(StatusCode::BAD_REQUEST, e.to_string()));
    }

    let create_meeting = CreateMeeting {
        chama_id,
        title: request.title.trim().to_string(),
        agenda: request.agenda(),
        venue: request.venue(),
        scheduled_at: request.scheduled_at,
        created_by: user.user_id,
    };

    match Meeting::create(&pool, create_meeting).await {
        Ok(meeting) => {
            info!(
                "Meeting {} scheduled for {} by {}",
                meeting.id, meeting.scheduled_at, user.user_id
            );
            Ok(HttpResponse::Created().json(ApiResponse::success(meeting)))
        }
        Err(e) => {
            error!("Failed to schedule meeting: {}", e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to schedule meeting",
            ))
        }
    }
}

pub async fn update_status(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    request: web::Json<MeetingStatusRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let meeting_id = path.into_inner();

    if !user.is_officer() {
        return Ok(forbidden(&user, "update meeting"));
    }

    match Meeting::find_by_id(&pool, meeting_id).await {
        Ok(Some(meeting)) if Some(meeting.chama_id) == user.chama_id => {}
        Ok(_) => return Ok(error_response(StatusCode::NOT_FOUND, "Meeting not found")),
        Err(e) => {
            error!("Failed to load meeting {}: {}", meeting_id, e);
            return Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update meeting",
            ));
        }
    }

    let minutes = clean_optional(&request.minutes);
    match Meeting::update_status(&pool, meeting_id, request.status, minutes).await {
        Ok(meeting) => {
            info!("Meeting {} is now {:?}", meeting_id, meeting.status);
            Ok(HttpResponse::Ok().json(ApiResponse::success(meeting)))
        }
        Err(MeetingError::NotFound { .. }) => {
            Ok(error_response(StatusCode::NOT_FOUND, "Meeting not found"))
        }
        Err(e @ MeetingError::AlreadyClosed { .. }) => {
            Ok(error_response(StatusCode::CONFLICT, e.to_string()))
        }
        Err(e @ MeetingError::InvalidStatus) => {
            Ok(error_response(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e) => {
            error!("Failed to update meeting {}: {}", meeting_id, e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update meeting",
            ))
        }
    }
}
