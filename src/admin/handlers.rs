use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::application::{WebApplication, WebHooks};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub name: String,
    pub state: String,
    pub disabled: bool,
    pub allowed_origins: String,
}

#[derive(Debug, Serialize)]
pub struct ModuleStatus {
    pub name: String,
    pub active: bool,
}

pub async fn get_status<W: WebHooks>(State(app): State<Arc<WebApplication<W>>>) -> Json<SystemStatus> {
    let policy = app.access_policy().ok();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        name: app.name(),
        state: app.state().to_string(),
        disabled: policy.as_ref().is_some_and(|p| p.disabled),
        allowed_origins: policy.map(|p| p.allowed_origins.to_string()).unwrap_or_default(),
    })
}

pub async fn get_modules<W: WebHooks>(State(app): State<Arc<WebApplication<W>>>) -> Json<Vec<ModuleStatus>> {
    let modules = app
        .core()
        .module_status()
        .into_iter()
        .map(|(name, active)| ModuleStatus { name, active })
        .collect();
    Json(modules)
}
