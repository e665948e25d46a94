use crate::{
    database::connection::DbPool,
    handlers::{forbidden, require_chama},
    middleware::auth::AuthenticatedUser,
    models::{
        chama::Chama,
        contribution::Contribution,
        loan::{check_eligibility, CreateLoan, Loan, LoanError, LoanView, ReviewDecision},
        user::User,
    },
    requests::loan::{LoanApplicationRequest, LoanReviewRequest, RepaymentRequest},
    services::email::{loan_decision_template, EmailService},
    utils::helpers::{error_response, ApiResponse},
};
use actix_web::{http::StatusCode, web, HttpResponse, Result};
use tracing::{error, info, warn};
use uuid::Uuid;

fn loan_error_response(e: LoanError, action: &str) -> HttpResponse {
    match e {
        LoanError::NotFound { id } => {
            error_response(StatusCode::NOT_FOUND, format!("Loan {} not found", id))
        }
        LoanError::ActiveLoanExists | LoanError::InvalidTransition { .. } => {
            error_response(StatusCode::CONFLICT, e.to_string())
        }
        LoanError::ExceedsLimit { .. }
        | LoanError::Overpayment { .. }
        | LoanError::NonPositiveAmount => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        LoanError::Database(db) => {
            error!("Database error while trying to {}: {}", action, db);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {}", action),
            )
        }
    }
}

/// Loads a loan the caller may act on: their own, or any in their chama for officers.
async fn load_visible_loan(
    pool: &DbPool,
    id: Uuid,
    user: &AuthenticatedUser,
) -> std::result::Result<Loan, HttpResponse> {
    match Loan::find_by_id(pool, id).await {
        Ok(Some(loan))
            if loan.member_id == user.user_id
                || (user.is_officer() && Some(loan.chama_id) == user.chama_id) =>
        {
            Ok(loan)
        }
        Ok(_) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Loan {} not found", id),
        )),
        Err(e) => Err(loan_error_response(e, "load loan")),
    }
}

pub async fn apply(
    pool: web::Data<DbPool>,
    request: web::Json<LoanApplicationRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let chama_id = match require_chama(&user) {
        Ok(id) => id,
        Err(resp) => return Ok(resp),
    };

    if let Err(e) = request.validate() {
        return Ok(error_response(StatusCode::BAD_REQUEST, e.to_string()));
    }

    let chama = match Chama::find_by_id(&pool, chama_id).await {
        Ok(Some(chama)) => chama,
        Ok(None) => return Ok(error_response(StatusCode::NOT_FOUND, "Chama not found")),
        Err(e) => {
            error!("Failed to load chama {}: {}", chama_id, e);
            return Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to apply for loan",
            ));
        }
    };

    let total_contributions = match Contribution::total_for_member(&pool, user.user_id, chama_id).await {
        Ok(total) => total,
        Err(e) => {
            error!("Failed to total contributions for {}: {}", user.user_id, e);
            return Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to apply for loan",
            ));
        }
    };

    let has_active_loan = match Loan::find_active_for_member(&pool, user.user_id).await {
        Ok(active) => active.is_some(),
        Err(e) => return Ok(loan_error_response(e, "apply for loan")),
    };

    if let Err(e) = check_eligibility(request.amount, total_contributions, has_active_loan) {
        warn!("Loan application by {} refused: {}", user.user_id, e);
        return Ok(loan_error_response(e, "apply for loan"));
    }

    let create_loan = CreateLoan {
        member_id: user.user_id,
        chama_id,
        amount: request.amount,
        interest_rate: chama.loan_interest_rate,
        term_months: request.term_months,
        purpose: request.purpose.clone(),
    };

    match Loan::create(&pool, create_loan).await {
        Ok(loan) => {
            info!("Member {} applied for loan {}", user.user_id, loan.id);
            Ok(HttpResponse::Created().json(ApiResponse::success(LoanView::from(loan))))
        }
        Err(e) => Ok(loan_error_response(e, "apply for loan")),
    }
}

pub async fn index(pool: web::Data<DbPool>, user: AuthenticatedUser) -> Result<HttpResponse> {
    let loans = match (user.is_officer(), user.chama_id) {
        (true, Some(chama_id)) => Loan::find_by_chama(&pool, chama_id).await,
        _ => Loan::find_by_member(&pool, user.user_id).await,
    };

    match loans {
        Ok(loans) => {
            let views: Vec<LoanView> = loans.into_iter().map(LoanView::from).collect();
            Ok(HttpResponse::Ok().json(ApiResponse::success(views)))
        }
        Err(e) => Ok(loan_error_response(e, "retrieve loans")),
    }
}

pub async fn show(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    match load_visible_loan(&pool, path.into_inner(), &user).await {
        Ok(loan) => Ok(HttpResponse::Ok().json(ApiResponse::success(LoanView::from(loan)))),
        Err(resp) => Ok(resp),
    }
}

async fn review(
    pool: web::Data<DbPool>,
    email_service: Option<web::Data<EmailService>>,
    loan_id: Uuid,
    body: web::Bytes,
    user: AuthenticatedUser,
    decision: ReviewDecision,
) -> Result<HttpResponse> {
    if !user.is_admin() {
        return Ok(forbidden(&user, "review loan"));
    }

    let loan = match load_visible_loan(&pool, loan_id, &user).await {
        Ok(loan) => loan,
        Err(resp) => return Ok(resp),
    };

    if loan.member_id == user.user_id {
        return Ok(error_response(
            StatusCode::FORBIDDEN,
            "You cannot review your own loan application",
        ));
    }

    let note = match LoanReviewRequest::from_body(&body) {
        Ok(review) => review.note(),
        Err(e) => return Ok(error_response(StatusCode::BAD_REQUEST, e.to_string())),
    };
    let reviewed = match Loan::review(&pool, loan_id, decision, user.user_id, note).await {
        Ok(loan) => loan,
        Err(e) => return Ok(loan_error_response(e, "review loan")),
    };
    info!(
        "Loan {} marked {} by {}",
        reviewed.id, reviewed.status, user.user_id
    );

    if let Some(service) = email_service {
        match User::find_by_id(&pool, reviewed.member_id).await {
            Ok(Some(member)) => {
                let template = loan_decision_template(&member.fullname, &reviewed);
                EmailService::send_in_background(service, member.email, member.fullname, template);
            }
            Ok(None) => {}
            Err(e) => error!("Failed to load member for loan notification: {}", e),
        }
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(LoanView::from(reviewed))))
}

pub async fn approve(
    pool: web::Data<DbPool>,
    email_service: Option<web::Data<EmailService>>,
    path: web::Path<Uuid>,
    body: web::Bytes,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    review(
        pool,
        email_service,
        path.into_inner(),
        body,
        user,
        ReviewDecision::Approve,
    )
    .await
}

pub async fn reject(
    pool: web::Data<DbPool>,
    email_service: Option<web::Data<EmailService>>,
    path: web::Path<Uuid>,
    body: web::Bytes,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    review(
        pool,
        email_service,
        path.into_inner(),
        body,
        user,
        ReviewDecision::Reject,
    )
    .await
}

pub async fn repay(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    request: web::Json<RepaymentRequest>,
    user: AuthenticatedUser,
) -> Result<HttpResponse> {
    let loan_id = path.into_inner();

    if !user.is_officer() {
        return Ok(forbidden(&user, "record loan repayment"));
    }

    if let Err(e) = request.validate() {
        return Ok(error_response(StatusCode::BAD_REQUEST, e.to_string()));
    }

    if let Err(resp) = load_visible_loan(&pool, loan_id, &user).await {
        return Ok(resp);
    }

    match Loan::record_repayment(&pool, loan_id, request.amount).await {
        Ok(loan) => {
            info!(
                "Repayment of {} recorded on loan {} by {}",
                request.amount, loan_id, user.user_id
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(LoanView::from(loan))))
        }
        Err(e) => Ok(loan_error_response(e, "record repayment")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::loan::LoanStatus;
    use rust_decimal::Decimal;

    #[test]
    fn loan_errors_map_to_statuses() {
        let id = Uuid::new_v4();
        assert_eq!(
            loan_error_response(LoanError::NotFound { id }, "x").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            loan_error_response(LoanError::ActiveLoanExists, "x").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            loan_error_response(
                LoanError::InvalidTransition {
                    from: LoanStatus::Rejected,
                    to: LoanStatus::Approved
                },
                "x"
            )
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            loan_error_response(LoanError::ExceedsLimit { limit: Decimal::TEN }, "x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            loan_error_response(LoanError::Database(sqlx::Error::RowNotFound), "x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
