//! HTTP handlers and route configuration.

mod demo;
mod health;

use actix_web::{HttpRequest, web};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.service(
        web::resource("/no-rate-limiter")
            .wrap(state.unlimited_admission())
            .route(web::get().to(demo::no_rate_limiter)),
    )
    .service(
        web::resource("/redis-rate-limiter")
            .wrap(state.limited_admission())
            .route(web::get().to(demo::redis_rate_limiter)),
    )
    .service(web::scope("/api").route("/health", web::get().to(health::health_check)));
}

/// Fallback for unmatched paths.
pub async fn not_found(req: HttpRequest) -> AppResult<&'static str> {
    Err(AppError::NotFound(format!("No route for {}", req.path())))
}
