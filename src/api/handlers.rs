// HTTP request handlers for API endpoints

use crate::api::models::*;
use crate::api::server::AppState;
use crate::catalog::store::StoreError;
use crate::importer::run::ImportError;
use actix_web::{web, HttpResponse, Result};
use std::time::SystemTime;

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    // Quick database connectivity check
    let db_status = match sqlx::query_scalar::<_, bool>("SELECT true")
        .fetch_one(&state.db.pool)
        .await
    {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let uptime = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let response = ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        database: db_status.to_string(),
        uptime_seconds: uptime,
    });

    Ok(HttpResponse::Ok().json(response))
}

/// Run the feed import now. Synchronous: the response carries the full
/// per-run summary, or the phase error that aborted it.
pub async fn trigger_import(state: web::Data<AppState>) -> Result<HttpResponse> {
    tracing::info!(path = %state.feed_path.display(), "import trigger requested");

    match state.importer.run(&state.feed_path).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(ApiResponse::success(summary))),
        Err(ImportError::AlreadyRunning) => Ok(HttpResponse::Conflict()
            .json(ApiResponse::<()>::error("an import run is already in progress"))),
        Err(err) => {
            tracing::error!(error = %err, "import run failed");
            Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(err.to_string())))
        }
    }
}

/// Product details joined with manufacturer information.
pub async fn product_details(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let product_id = path.into_inner();

    match state.store.product_details(&product_id).await {
        Ok(details) => Ok(HttpResponse::Ok().json(ApiResponse::success(details))),
        Err(StoreError::NotFound(_)) => Ok(HttpResponse::NotFound().json(
            ApiResponse::<()>::error(format!("product {product_id} not found")),
        )),
        Err(err) => {
            tracing::error!(product_id = %product_id, error = %err, "details lookup failed");
            Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(err.to_string())))
        }
    }
}
