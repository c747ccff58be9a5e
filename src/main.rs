//! Web application host.
//!
//! Runs one web application behind the toolkit's HTTP host:
//!
//! ```text
//!   Client ──▶ request-id / trace / timeout ──▶ access control ──▶ routes
//!                                               (503 disabled,      │
//!                                                403 origin)        ▼
//!                                                              SmtpModule
//!
//!   start:  context_initialized → settings → modules init → Running
//!   SIGINT/SIGTERM: drain → context_destroyed → modules stop (reverse)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use webapp_toolkit::config::{load_settings, ApplicationSettings, ConfigError, ServerConfig};
use webapp_toolkit::error::AppError;
use webapp_toolkit::lifecycle::signals::wait_for_shutdown;
use webapp_toolkit::module::{MailMessage, Module, ModuleRegistry, SmtpModule};
use webapp_toolkit::observability::{logging, metrics};
use webapp_toolkit::{HttpServer, InstanceSlot, Shutdown, WebApplication, WebHooks};

#[derive(Parser)]
#[command(name = "webapp-toolkit")]
#[command(about = "Host a web application with lifecycle, modules and origin filtering", long_about = None)]
struct Cli {
    /// Settings file (TOML)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Bind address; overrides `server.bindAddress`
    #[arg(short, long)]
    bind: Option<String>,

    /// Context path the application is mounted at
    #[arg(short, long, default_value = "/")]
    context_path: String,

    /// Application name when mounted at the root path
    #[arg(long, default_value = "ROOT")]
    root_name: String,

    /// Prometheus exporter address
    #[arg(long)]
    metrics_address: Option<SocketAddr>,
}

/// The hosted application.
struct HostApp {
    root_name: String,
    settings_path: Option<PathBuf>,
    smtp: Arc<SmtpModule>,
}

impl WebHooks for HostApp {
    fn root_name(&self) -> String {
        self.root_name.clone()
    }

    fn load_settings(&self) -> Result<ApplicationSettings, ConfigError> {
        match &self.settings_path {
            Some(path) => load_settings(path),
            None => Ok(ApplicationSettings::new()),
        }
    }

    fn before_start(&self, registry: &mut ModuleRegistry) -> Result<(), AppError> {
        registry.register(self.smtp.clone())
    }
}

#[derive(Clone)]
struct RouteState {
    app: Arc<WebApplication<HostApp>>,
    smtp: Arc<SmtpModule>,
}

#[derive(Serialize)]
struct Index {
    name: String,
    mail_enabled: bool,
}

#[derive(Deserialize)]
struct MailRequest {
    from: Option<String>,
    to: Vec<String>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
}

async fn index(State(state): State<RouteState>) -> Json<Index> {
    Json(Index {
        name: state.app.name(),
        mail_enabled: state.smtp.is_active(),
    })
}

async fn send_mail(State(state): State<RouteState>, Json(req): Json<MailRequest>) -> impl IntoResponse {
    let message = MailMessage {
        sender: req.from,
        recipients: req.to,
        subject: req.subject,
        body: req.body,
    };

    let smtp = state.smtp.clone();
    match tokio::task::spawn_blocking(move || smtp.send_message(&message)).await {
        Ok(Ok(())) => StatusCode::ACCEPTED.into_response(),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Mail not sent");
            e.into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Mail task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging(logging::DEFAULT_FILTER);

    tracing::info!("webapp-toolkit v{} starting", env!("CARGO_PKG_VERSION"));

    // Host settings are read once; application settings are re-read on every start
    let file_settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => ApplicationSettings::new(),
    };
    let mut server_config = ServerConfig::from_settings(&file_settings);
    if let Some(bind) = cli.bind {
        server_config.bind_address = bind;
    }

    if let Some(addr) = cli.metrics_address {
        metrics::init_metrics(addr);
    }

    let smtp = Arc::new(SmtpModule::new());
    let app = Arc::new(WebApplication::new(
        HostApp {
            root_name: cli.root_name,
            settings_path: cli.settings,
            smtp: smtp.clone(),
        },
        InstanceSlot::new(),
    ));

    let routes = Router::new()
        .route("/", get(index))
        .route("/mail", post(send_mail))
        .with_state(RouteState {
            app: app.clone(),
            smtp,
        });

    let listener = TcpListener::bind(&server_config.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(app, routes, &server_config, Some(cli.context_path.as_str()));
    let server_shutdown = shutdown.subscribe();

    let signal_task = tokio::spawn(async move {
        wait_for_shutdown().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;
    signal_task.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
