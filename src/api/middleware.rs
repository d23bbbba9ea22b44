// Middleware: request logging, compression, CORS, bearer auth.

use crate::api::models::ApiResponse;
use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::{Compress, Logger, Next};
use actix_web::{web, Error, HttpResponse};

pub fn setup_middleware() -> (Logger, Compress) {
    let logger = Logger::default();
    let compress = Compress::default();
    (logger, compress)
}

// CORS configuration
use actix_cors::Cors;
use actix_web::http::header;

pub fn setup_cors(allowed_origins: &str) -> Cors {
    let origins: Vec<&str> = allowed_origins.split(',').collect();

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .max_age(3600);

    for origin in origins {
        cors = cors.allowed_origin(origin.trim());
    }

    cors
}

/// Shared bearer secret checked by [`require_bearer`].
#[derive(Clone)]
pub struct ApiSecret(pub String);

/// Scope-level auth: validates `Authorization: Bearer <API_SECRET>`. Mounted
/// on /api/v1 only, so /health stays open for probes.
pub async fn require_bearer(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let secret = req
        .app_data::<web::Data<ApiSecret>>()
        .map(|s| s.get_ref().0.clone());
    let provided = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match (secret, provided) {
        (Some(secret), Some(token)) if token == secret => next
            .call(req)
            .await
            .map(ServiceResponse::map_into_boxed_body),
        _ => {
            let response = HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error("invalid or missing authentication token"));
            Ok(req.into_response(response).map_into_boxed_body())
        }
    }
}
