pub mod config;
pub mod database;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod requests;
pub mod routes;
pub mod services;
pub mod utils;

use actix_web::web;

use crate::{database::connection::DbPool, services::auth::AuthService, services::email::EmailService};

/// Shared state handed to every worker.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub auth: web::Data<AuthService>,
    pub email: Option<web::Data<EmailService>>,
}

pub fn configure_app(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(state.pool.clone()))
            .app_data(state.auth.clone())
            .app_data(utils::helpers::json_config());

        if let Some(email) = state.email {
            cfg.app_data(email);
        }

        cfg.service(web::scope("/api").configure(routes::api::scoped_config));
    }
}
