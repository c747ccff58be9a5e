use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::config::schema::ADMIN_SECTION;
use crate::http::application::{WebApplication, WebHooks};

pub async fn admin_auth_middleware<W: WebHooks>(
    State(app): State<Arc<WebApplication<W>>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let api_key = app
        .core()
        .context()
        .and_then(|ctx| ctx.section(Some(ADMIN_SECTION)).get("apiKey").map(str::to_string))
        .filter(|key| !key.is_empty())
        .ok_or(StatusCode::NOT_FOUND)?;

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == api_key);

    if authorized {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}
