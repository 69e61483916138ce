//! Per-client rate limiting for the credential endpoints.

use std::future::{Ready, ready};
use std::rc::Rc;

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    web,
};
use futures::future::LocalBoxFuture;

use quill_core::ports::RateLimitResult;
use quill_shared::ErrorResponse;

use crate::state::AppState;

/// Wraps a resource so each client address gets its own request budget.
///
/// The limiter comes from [`AppState`] at request time. When the limiter
/// itself fails the request is let through.
pub struct RateLimit {
    scope: &'static str,
}

impl RateLimit {
    /// `scope` separates budgets, so `/login` and `/register` count independently.
    pub fn new(scope: &'static str) -> Self {
        Self { scope }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitService {
            service: Rc::new(service),
            scope: self.scope,
        }))
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    scope: &'static str,
}

fn too_many_requests(result: &RateLimitResult) -> HttpResponse {
    let retry_after = result.reset_after.as_secs().max(1);
    let error = ErrorResponse::new(429, "Too Many Requests").with_detail(format!(
        "Rate limit exceeded. Try again in {retry_after} seconds."
    ));

    HttpResponse::TooManyRequests()
        .insert_header(("X-RateLimit-Remaining", "0"))
        .insert_header(("Retry-After", retry_after.to_string()))
        .json(error)
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limiter = req
            .app_data::<web::Data<AppState>>()
            .map(|state| state.limiter.clone());
        let key = format!(
            "{}:{}",
            self.scope,
            req.connection_info().realip_remote_addr().unwrap_or("unknown")
        );

        Box::pin(async move {
            let outcome = match limiter {
                Some(limiter) => Some(limiter.check(&key).await),
                None => None,
            };

            match outcome {
                Some(Ok(result)) if !result.allowed => {
                    tracing::warn!(key = %key, "Rate limit exceeded");
                    let (http_req, _payload) = req.into_parts();
                    let response = too_many_requests(&result);
                    return Ok(ServiceResponse::new(http_req, response).map_into_right_body());
                }
                Some(Err(e)) => tracing::error!(error = %e, "Rate limiter error, failing open"),
                None => tracing::error!("AppState not found in app data, skipping rate limit"),
                Some(Ok(_)) => {}
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
