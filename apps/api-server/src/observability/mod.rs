//! Observability - request IDs and the per-request tracing span.

mod request_id;

use actix_web::{
    Error, HttpMessage,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
};
use tracing::Span;
use tracing_actix_web::{DefaultRootSpanBuilder, RootSpanBuilder};

pub use request_id::{RequestId, request_id};

/// Root span that carries the request ID, so every log line of a request
/// can be correlated with the `X-Request-ID` the client sees.
///
/// The request ID middleware has to wrap outside `TracingLogger`.
pub struct QuillRootSpan;

impl RootSpanBuilder for QuillRootSpan {
    fn on_request_start(request: &ServiceRequest) -> Span {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default();
        tracing_actix_web::root_span!(request, request_id = %request_id)
    }

    fn on_request_end<B: MessageBody>(span: Span, outcome: &Result<ServiceResponse<B>, Error>) {
        DefaultRootSpanBuilder::on_request_end(span, outcome);
    }
}
