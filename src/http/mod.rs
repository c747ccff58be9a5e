//! HTTP hosting subsystem.
//!
//! # Data Flow
//! ```text
//! HttpServer::run
//!     → application.rs (context_initialized → start)
//!     → serve:
//!         request-id + trace + timeout layers
//!         → middleware/access_control.rs (503 disabled, 403 origin)
//!         → application routes (nested under the context path)
//!     → graceful shutdown
//!     → application.rs (context_destroyed → stop)
//! ```

pub mod application;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use application::{AccessPolicy, WebApplication, WebHooks};
pub use request::{origin_ip, RequestIdExt, X_REQUEST_ID};
pub use server::HttpServer;
