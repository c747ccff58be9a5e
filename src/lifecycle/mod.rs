//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Start (application.rs):
//!     Stopped → Starting → before_start hook → resolve settings (startup.rs)
//!     → claim instance slot (context.rs) → init modules → Running → after_start hook
//!
//! Stop (application.rs):
//!     Running → Stopping → stop modules in reverse → release slot → Stopped
//!
//! Host process (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger → server drains → context destroyed
//! ```
//!
//! # Design Decisions
//! - State transitions are atomic compare-and-exchange
//! - The running instance lives in an explicit `InstanceSlot`, not a global
//! - Module shutdown failures are collected, never short-circuit

pub mod application;
pub mod context;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use application::{Application, LifecycleHooks, ShutdownReport};
pub use context::{ApplicationContext, InstanceSlot, WeakContext};
pub use shutdown::Shutdown;
pub use state::{LifecycleState, StateCell};
