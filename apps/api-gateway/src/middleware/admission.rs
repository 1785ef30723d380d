//! Admission middleware - puts a rate limiter in front of a route.
//!
//! One limiter call per request, then either the wrapped service runs or the
//! caller gets a 429 without the service ever seeing the request.

use actix_web::{
    Error, HttpResponse, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{self, HeaderName, HeaderValue},
};
use gateway_shared::ErrorResponse;
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use gateway_core::ports::{RateLimitError, RateLimiter};
use gateway_core::{Decision, InvalidKeyPolicy, RateLimitKey};

use super::error::AppError;
use super::key::{KeyExtractor, KeyStrategy};

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RETRY_AFTER_MS_HEADER: &str = "x-ratelimit-retry-after-ms";

/// Admission middleware factory.
#[derive(Clone)]
pub struct AdmissionMiddleware {
    limiter: Arc<dyn RateLimiter>,
    extract: KeyExtractor,
    invalid_key_policy: InvalidKeyPolicy,
}

impl AdmissionMiddleware {
    /// Keys requests by client address and falls back to the global key.
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            limiter,
            extract: KeyStrategy::RemoteAddr.extractor(),
            invalid_key_policy: InvalidKeyPolicy::default(),
        }
    }

    pub fn with_key_strategy(mut self, strategy: &KeyStrategy) -> Self {
        self.extract = strategy.extractor();
        self
    }

    pub fn with_key_extractor<F>(mut self, extract: F) -> Self
    where
        F: Fn(&ServiceRequest) -> Option<String> + Send + Sync + 'static,
    {
        self.extract = Arc::new(extract);
        self
    }

    pub fn with_invalid_key_policy(mut self, policy: InvalidKeyPolicy) -> Self {
        self.invalid_key_policy = policy;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdmissionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AdmissionMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdmissionMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            extract: self.extract.clone(),
            invalid_key_policy: self.invalid_key_policy,
        }))
    }
}

pub struct AdmissionMiddlewareService<S> {
    service: Rc<S>,
    limiter: Arc<dyn RateLimiter>,
    extract: KeyExtractor,
    invalid_key_policy: InvalidKeyPolicy,
}

impl<S, B> Service<ServiceRequest> for AdmissionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limiter = self.limiter.clone();
        let invalid_key_policy = self.invalid_key_policy;
        let key = (self.extract)(&req);

        Box::pin(async move {
            let decision = match admit(limiter.as_ref(), key, invalid_key_policy).await {
                Ok(decision) => decision,
                Err(err) => {
                    let response = AppError::from(err).error_response();
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };

            if !decision.allowed {
                let response = too_many_requests(&decision);
                return Ok(req.into_response(response).map_into_right_body());
            }

            let mut res = service.call(req).await?;
            if !decision.is_unlimited() {
                let headers = res.headers_mut();
                headers.insert(
                    HeaderName::from_static(LIMIT_HEADER),
                    HeaderValue::from(decision.limit),
                );
                headers.insert(
                    HeaderName::from_static(REMAINING_HEADER),
                    HeaderValue::from(decision.remaining),
                );
            }

            Ok(res.map_into_left_body())
        })
    }
}

/// Run the limiter, applying the invalid-key policy when no usable key exists.
async fn admit(
    limiter: &dyn RateLimiter,
    key: Option<String>,
    invalid_key_policy: InvalidKeyPolicy,
) -> Result<Decision, RateLimitError> {
    let result = match key {
        Some(key) => limiter.check_and_consume(&key).await,
        None => Err(RateLimitError::InvalidKey("no key found in request".to_string())),
    };

    match (result, invalid_key_policy) {
        (Err(RateLimitError::InvalidKey(reason)), InvalidKeyPolicy::Fallback) => {
            tracing::debug!(reason = %reason, "Unusable rate limit key, using global key");
            Ok(limiter.consume(&RateLimitKey::global()).await)
        }
        (result, _) => result,
    }
}

fn too_many_requests(decision: &Decision) -> HttpResponse {
    let retry_after_ms = decision.retry_after_millis();

    HttpResponse::TooManyRequests()
        .insert_header((
            header::RETRY_AFTER,
            decision.retry_after_secs_ceil().to_string(),
        ))
        .insert_header((RETRY_AFTER_MS_HEADER, retry_after_ms.to_string()))
        .insert_header((LIMIT_HEADER, decision.limit.to_string()))
        .insert_header((REMAINING_HEADER, "0"))
        .json(ErrorResponse::too_many_requests(retry_after_ms))
}
