//! Web application host toolkit.
//!
//! An application core with a guarded start/stop lifecycle, pluggable
//! modules, origin allow-listing and an enable/disable switch, hosted by an
//! axum server that drives the lifecycle.

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod module;
pub mod observability;
pub mod security;

pub use config::{ApplicationSettings, Settings};
pub use error::{AppError, ModuleError};
pub use http::{HttpServer, WebApplication, WebHooks};
pub use lifecycle::{Application, ApplicationContext, InstanceSlot, LifecycleHooks, Shutdown};
pub use module::{MailMessage, Module, SmtpModule};
