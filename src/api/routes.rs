// API route configuration

use crate::api::{handlers, middleware};
use actix_web::middleware::from_fn;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check (no auth required)
        .route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::health_check))
        // API v1 routes (all require authentication)
        .service(
            web::scope("/api/v1")
                .wrap(from_fn(middleware::require_bearer))
                .route(
                    "/products/import",
                    web::post().to(handlers::trigger_import),
                )
                .route(
                    "/products/{product_id}",
                    web::get().to(handlers::product_details),
                ),
        );
}
