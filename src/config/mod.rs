//! Settings management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse into sections of string properties)
//!     → validation.rs (semantic checks)
//!     → ApplicationSettings (loaded overrides)
//!
//! On application start:
//!     hook defaults + module defaults
//!     → overlaid with loaded overrides
//!     → resolved ApplicationSettings, frozen in the ApplicationContext
//! ```
//!
//! # Design Decisions
//! - Values are strings; consumers parse what they need
//! - Every key has a default, so an empty file is a valid file
//! - Validation separates syntactic (toml) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, parse_settings, ConfigError};
pub use schema::{ApplicationSettings, ServerConfig, Settings};
pub use validation::ValidationError;
