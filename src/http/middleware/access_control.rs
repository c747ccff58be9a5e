//! Access control middleware.
//! Rejects requests while the application is stopped or disabled, and
//! requests from origins outside the allow-list.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::application::{WebApplication, WebHooks};
use crate::http::request::RequestIdExt;
use crate::observability::metrics;

pub async fn access_control_middleware<W: WebHooks>(
    State(app): State<Arc<WebApplication<W>>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // 1. Disabled or not running: 503
    match app.is_disabled() {
        Ok(false) => {}
        Ok(true) => {
            metrics::record_request_rejected("disabled");
            return (StatusCode::SERVICE_UNAVAILABLE, "Application is disabled").into_response();
        }
        Err(_) => {
            metrics::record_request_rejected("not_running");
            return (StatusCode::SERVICE_UNAVAILABLE, "Application is not running").into_response();
        }
    }

    // 2. Origin allow-list: 403
    match app.is_origin_allowed(&req) {
        Ok(true) => next.run(req).await,
        Ok(false) => {
            tracing::warn!(
                request_id = %req.request_id(),
                origin = ?app.request_origin(&req).ok().flatten(),
                "Origin not allowed"
            );
            metrics::record_request_rejected("forbidden_origin");
            (StatusCode::FORBIDDEN, "Origin not allowed").into_response()
        }
        // Stopped between the two checks
        Err(_) => {
            metrics::record_request_rejected("not_running");
            (StatusCode::SERVICE_UNAVAILABLE, "Application is not running").into_response()
        }
    }
}
