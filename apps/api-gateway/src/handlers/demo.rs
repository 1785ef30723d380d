//! The two demo routes. Both only run once admission has let them through.

use actix_web::HttpResponse;
use gateway_shared::ApiResponse;
use gateway_shared::dto::RouteResponse;

/// GET /no-rate-limiter
pub async fn no_rate_limiter() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(RouteResponse::now("no-rate-limiter")))
}

/// GET /redis-rate-limiter
pub async fn redis_rate_limiter() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(RouteResponse::now("redis-rate-limiter")))
}
