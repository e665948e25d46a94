use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use chamaplus::{
    config::settings::Settings,
    configure_app,
    database::connection::{create_pool, run_migrations},
    services::{auth::AuthService, email::EmailService},
    AppState,
};
use tracing::{info, warn};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let settings = Settings::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(settings.log_level())
        .with_target(false)
        .init();

    let pool = create_pool(&settings.database)
        .await
        .context("failed to connect to the database")?;
    run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;

    let auth = web::Data::new(AuthService::new(&settings.jwt)?);

    let email = match settings.smtp.clone() {
        Some(smtp) => match EmailService::new(smtp) {
            Ok(service) => Some(web::Data::new(service)),
            Err(e) => {
                warn!("Email notifications disabled: {}", e);
                None
            }
        },
        None => {
            info!("SMTP not configured; email notifications disabled");
            None
        }
    };

    let state = AppState { pool, auth, email };
    let allowed_origins = settings.cors.allowed_origins.clone();

    let mut server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .max_age(3600);
        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .configure(configure_app(state.clone()))
    });

    if let Some(workers) = settings.server.workers {
        server = server.workers(workers);
    }

    let (host, port) = settings.bind_address();
    info!("Starting ChamaPlus API on {}:{}", host, port);

    server
        .bind((host.as_str(), port))
        .with_context(|| format!("failed to bind {}:{}", host, port))?
        .run()
        .await?;

    Ok(())
}
