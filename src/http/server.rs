//! HTTP host.
//!
//! # Responsibilities
//! - Play the container: fire context-initialized before serving and
//!   context-destroyed after draining
//! - Mount the application routes under its context path
//! - Wire up middleware (request ID, tracing, timeout, access control)
//! - Mount the admin API

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::http::application::{WebApplication, WebHooks};
use crate::http::middleware::access_control_middleware;

/// HTTP server hosting one web application.
pub struct HttpServer<W> {
    app: Arc<WebApplication<W>>,
    router: Router,
    context_path: Option<String>,
}

impl<W: WebHooks> HttpServer<W> {
    /// Host `app`, serving `routes` under `context_path`.
    pub fn new(app: Arc<WebApplication<W>>, routes: Router, config: &ServerConfig, context_path: Option<&str>) -> Self {
        let context_path = context_path.map(str::to_string);
        let mount = mount_point(context_path.as_deref());
        let router = Self::build_router(app.clone(), routes, config, mount.as_deref());
        Self {
            app,
            router,
            context_path,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        app: Arc<WebApplication<W>>,
        routes: Router,
        config: &ServerConfig,
        mount: Option<&str>,
    ) -> Router {
        let guarded = routes.layer(middleware::from_fn_with_state(
            app.clone(),
            access_control_middleware::<W>,
        ));

        let mounted = match mount {
            Some(path) => Router::new().nest(path, guarded),
            None => guarded,
        };

        mounted
            .merge(setup_admin_router(app))
            .layer(TimeoutLayer::new(config.request_timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn app(&self) -> &Arc<WebApplication<W>> {
        &self.app
    }

    /// Start the application, serve until `shutdown` fires, then stop it.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), AppError> {
        let addr = listener.local_addr()?;

        self.app.context_initialized(self.context_path.as_deref())?;
        tracing::info!(
            address = %addr,
            app = %self.app.name(),
            context_path = self.context_path.as_deref().unwrap_or("/"),
            "HTTP server starting"
        );

        let service = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let served = axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        let report = self.app.context_destroyed()?;
        for failure in &report.failures {
            tracing::warn!(module = %failure.module, error = %failure.error, "Module did not stop cleanly");
        }

        served?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Where to nest the application routes; `None` for the root.
fn mount_point(context_path: Option<&str>) -> Option<String> {
    let path = context_path?.trim_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(format!("/{path}"))
    }
}
