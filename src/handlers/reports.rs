use crate::{
    database::connection::DbPool,
    handlers::{forbidden, require_chama},
    middleware::auth::AuthenticatedUser,
    models::{contribution::Contribution, loan::Loan, user::User},
    services::reports::{ChamaSummary, MemberStatement},
    utils::helpers::{error_response, ApiResponse},
};
use actix_web::{http::StatusCode, web, HttpResponse, Result};
use tracing::{error, info};

fn report_failed(what: &str, e: impl std::fmt::Display) -> HttpResponse {
    error!("Failed to load {} for report: {}", what, e);
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to build report",
    )
}

pub async fn summary(pool: web::Data<DbPool>, user: AuthenticatedUser) -> Result<HttpResponse> {
    if !user.is_officer() {
        return Ok(forbidden(&user, "view chama summary"));
    }
    let chama_id = match require_chama(&user) {
        Ok(id) => id,
        Err(resp) => return Ok(resp),
    };
    info!("Building summary for chama {}", chama_id);

    let contributions = match Contribution::find_by_chama(&pool, chama_id).await {
        Ok(c) => c,
        Err(e) => return Ok(report_failed("contributions", e)),
    };
    let loans = match Loan::find_by_chama(&pool, chama_id).await {
        Ok(l) => l,
        Err(e) => return Ok(report_failed("loans", e)),
    };
    let members = match User::find_by_chama(&pool, chama_id).await {
        Ok(m) => m,
        Err(e) => return Ok(report_failed("members", e)),
    };

    let summary = ChamaSummary::build(&contributions, &loans, &members);
    Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
}

pub async fn me(pool: web::Data<DbPool>, user: AuthenticatedUser) -> Result<HttpResponse> {
    let member = match User::find_by_id(&pool, user.user_id).await {
        Ok(Some(member)) => member,
        Ok(None) => return Ok(error_response(StatusCode::NOT_FOUND, "User not found")),
        Err(e) => return Ok(report_failed("member", e)),
    };
    let contributions = match Contribution::find_by_member(&pool, user.user_id).await {
        Ok(c) => c,
        Err(e) => return Ok(report_failed("contributions", e)),
    };
    let loans = match Loan::find_by_member(&pool, user.user_id).await {
        Ok(l) => l,
        Err(e) => return Ok(report_failed("loans", e)),
    };

    // Only contributions to the current chama count towards the loan limit.
    let contributions: Vec<Contribution> = contributions
        .into_iter()
        .filter(|c| Some(c.chama_id) == member.chama_id)
        .collect();

    let statement = MemberStatement::build(&member, &contributions, &loans);
    Ok(HttpResponse::Ok().json(ApiResponse::success(statement)))
}
