use crate::{
    database::connection::{ping, DbPool},
    utils::helpers::{error_response, ApiResponse},
};
use actix_web::{http::StatusCode, web, HttpResponse};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

pub async fn health(pool: web::Data<DbPool>) -> HttpResponse {
    match ping(&pool).await {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success(HealthStatus {
            status: "ok",
            database: "up",
            version: env!("CARGO_PKG_VERSION"),
        })),
        Err(e) => {
            error!("Health check failed to reach database: {}", e);
            error_response(StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;

    #[actix_web::test]
    async fn unreachable_database_reports_degraded() {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .route("/api/health", web::get().to(health)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Database unavailable");
    }
}
