use actix_web::{web, HttpResponse};

use crate::handlers;

pub fn scoped_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health::health)))
        .service(
            web::scope("/auth")
                .service(web::resource("/register").route(web::post().to(handlers::auth::register)))
                .service(web::resource("/login").route(web::post().to(handlers::auth::login))),
        )
        .service(
            web::scope("/users")
                .service(
                    web::resource("")
                        .route(web::get().to(handlers::users::index))
                        .route(web::head().to(HttpResponse::MethodNotAllowed)),
                )
                .service(web::resource("/me").route(web::get().to(handlers::users::me)))
                .service(
                    web::resource("/register")
                        .route(web::post().to(handlers::users::register_member)),
                )
                .service(
                    web::resource("/{id}/status")
                        .route(web::patch().to(handlers::users::update_status))
                        .route(web::put().to(handlers::users::update_status)),
                ),
        )
        .service(
            web::scope("/chamas")
                .service(
                    web::resource("")
                        .route(web::get().to(handlers::chamas::index))
                        .route(web::post().to(handlers::chamas::create)),
                )
                .service(web::resource("/my-chama").route(web::get().to(handlers::chamas::my_chama)))
                .service(web::resource("/{id}/join").route(web::post().to(handlers::chamas::join))),
        )
        .service(
            web::scope("/contributions")
                .service(
                    web::resource("")
                        .route(web::get().to(handlers::contributions::index))
                        .route(web::post().to(handlers::contributions::create)),
                )
                .service(web::resource("/me").route(web::get().to(handlers::contributions::mine)))
                .service(
                    web::resource("/{id}").route(web::delete().to(handlers::contributions::delete)),
                ),
        )
        .service(
            web::scope("/loans")
                .service(
                    web::resource("")
                        .route(web::get().to(handlers::loans::index))
                        .route(web::post().to(handlers::loans::apply)),
                )
                .service(web::resource("/{id}").route(web::get().to(handlers::loans::show)))
                .service(web::resource("/{id}/approve").route(web::post().to(handlers::loans::approve)))
                .service(web::resource("/{id}/reject").route(web::post().to(handlers::loans::reject)))
                .service(
                    web::resource("/{id}/repayments").route(web::post().to(handlers::loans::repay)),
                ),
        )
        .service(
            web::scope("/meetings")
                .service(
                    web::resource("")
                        .route(web::get().to(handlers::meetings::index))
                        .route(web::post().to(handlers::meetings::create)),
                )
                .service(
                    web::resource("/{id}/status")
                        .route(web::patch().to(handlers::meetings::update_status)),
                ),
        )
        .service(
            web::scope("/reports")
                .service(web::resource("/summary").route(web::get().to(handlers::reports::summary)))
                .service(web::resource("/me").route(web::get().to(handlers::reports::me))),
        );
}
