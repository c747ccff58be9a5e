//! Pluggable application modules.
//!
//! # Data Flow
//! ```text
//! register (application stopped)
//!     → registry.rs keeps registration order
//! application start:
//!     → default_settings() merged into the module's section
//!     → on_init(ctx) in registration order
//! application stop:
//!     → on_stop() in reverse order, failures collected
//! ```
//!
//! # Design Decisions
//! - Modules are shared (`Arc<dyn Module>`) so callers keep a typed handle
//!   to the module they registered
//! - Hooks take `&self`; modules own their mutable state
//! - A module only holds a weak reference to its application

pub mod mail;
pub mod registry;
pub mod smtp;

use crate::config::Settings;
use crate::error::ModuleError;
use crate::lifecycle::ApplicationContext;

pub use mail::MailMessage;
pub use registry::{ModuleFailure, ModuleRegistry};
pub use smtp::{LettreTransport, MailTransport, SmtpModule, SmtpSecurity, SmtpSettings};

/// A unit with its own init/stop lifecycle, dependent on its application.
pub trait Module: Send + Sync {
    /// Unique name. Also the settings section the module reads.
    fn name(&self) -> &str;

    /// Defaults for the module's settings section.
    fn default_settings(&self) -> Settings {
        Settings::new()
    }

    /// Called in registration order while the application starts.
    fn on_init(&self, ctx: &ApplicationContext) -> Result<(), ModuleError>;

    /// Called in reverse registration order while the application stops.
    fn on_stop(&self) -> Result<(), ModuleError>;

    /// True when the module is initialized and its application is running.
    fn is_active(&self) -> bool;
}
