//! Admin API.
//!
//! Read-only status endpoints protected by a bearer token taken from the
//! `admin.apiKey` setting. Without a key the endpoints answer 404.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::application::{WebApplication, WebHooks};

pub fn setup_admin_router<W: WebHooks>(app: Arc<WebApplication<W>>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status::<W>))
        .route("/admin/modules", get(get_modules::<W>))
        .layer(middleware::from_fn_with_state(app.clone(), admin_auth_middleware::<W>))
        .with_state(app)
}
