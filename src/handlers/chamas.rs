use crate::{
    database::connection::DbPool,
    handlers::forbidden,
    middleware::auth::AuthenticatedUser,
    models::{
        chama::{Chama, ChamaError},
        user::User,
    },
    requests::chama::CreateChamaRequest,
    utils::helpers::{error_response, ApiResponse},
};
use actix_web::{http::StatusCode, web, HttpResponse, Result};
use tracing::{error, info};
use uuid::Uuid;

pub async fn index(pool: web::Data<DbPool>, _user: AuthenticatedUser) -> Result<HttpResponse> {
    match Chama::find_all(&pool).await {
        Ok(chamas) => Ok(HttpResponse::Ok().json(ApiResponse::success(chamas))),
        Err(e) => {
            error!("Failed to fetch chamas: {}", e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve chamas",
            ))
        }
    }
}

pub async fn create(
    pool: web::Data<DbPool>,
    request: web::Json<CreateChamaRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    if !user.is_admin() {
        return Ok(forbidden(&user, "create chama"));
    }

    let create_chama = match request.into_inner().into_create(user.user_id) {
        Ok(c) => c,
        Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, e.to_string())),
    };

    let chama = match Chama::create(&pool, create_chama).await {
        Ok(chama) => chama,
        Err(ChamaError::NameTaken { name }) => {
            return Ok(error_response(
                StatusCode::CONFLICT,
                format!("A chama named {} already exists", name),
            ));
        }
        Err(e) => {
            error!("Failed to create chama: {}", e);
            return Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create chama",
            ));
        }
    };
    info!("Admin {} created chama {}", user.user_id, chama.id);

    Ok(HttpResponse::Created().json(ApiResponse::success(chama)))
}

pub async fn my_chama(pool: web::Data<DbPool>, user: AuthenticatedUser) -> Result<HttpResponse> {
    let chama_id = match user.chama_id {
        Some(id) => id,
        None => {
            return Ok(error_response(
                StatusCode::NOT_FOUND,
                "You are not a member of any chama yet",
            ));
        }
    };

    match Chama::overview(&pool, chama_id).await {
        Ok(overview) => Ok(HttpResponse::Ok().json(ApiResponse::success(overview))),
        Err(ChamaError::NotFound { .. }) => {
            Ok(error_response(StatusCode::NOT_FOUND, "Chama not found"))
        }
        Err(e) => {
            error!("Failed to load chama {}: {}", chama_id, e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve chama",
            ))
        }
    }
}

pub async fn join(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let chama_id = path.into_inner();

    if user.chama_id.is_some() {
        return Ok(error_response(
            StatusCode::CONFLICT,
            "You already belong to a chama",
        ));
    }

    match Chama::find_by_id(&pool, chama_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(error_response(StatusCode::NOT_FOUND, "Chama not found")),
        Err(e) => {
            error!("Failed to load chama {}: {}", chama_id, e);
            return Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to join chama",
            ));
        }
    }

    match User::assign_chama(&pool, user.user_id, chama_id).await {
        Ok(updated) => {
            info!("User {} joined chama {}", user.user_id, chama_id);
            Ok(HttpResponse::Ok().json(ApiResponse::success(updated)))
        }
        Err(e) => {
            error!("Failed to join chama {}: {}", chama_id, e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to join chama",
            ))
        }
    }
}
