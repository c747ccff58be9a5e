//! Application lifecycle core.
//!
//! # Responsibilities
//! - Guard start/stop with the shared state machine
//! - Resolve settings and initialize modules on start
//! - Stop modules in reverse order on stop, collecting failures
//! - Hold the instance slot while running

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwapOption;
use uuid::Uuid;

use crate::config::{ApplicationSettings, ConfigError};
use crate::error::AppError;
use crate::lifecycle::context::{ApplicationContext, InstanceSlot};
use crate::lifecycle::startup::resolve_settings;
use crate::lifecycle::state::{LifecycleState, StateCell};
use crate::module::{Module, ModuleFailure, ModuleRegistry};
use crate::observability::metrics;

/// Capabilities a concrete application plugs into the core.
///
/// The core calls these in this order on start: `before_start`,
/// `default_settings`, `load_settings`, (modules init), `after_start`.
/// On stop: `before_stop`, (modules stop), `after_stop`.
pub trait LifecycleHooks: Send + Sync {
    /// Human-readable application name.
    fn name(&self) -> String;

    /// Reset internal state and register modules. Runs on every start.
    fn before_start(&self, _registry: &mut ModuleRegistry) -> Result<(), AppError> {
        Ok(())
    }

    fn default_settings(&self) -> ApplicationSettings {
        ApplicationSettings::new()
    }

    /// Settings overriding the defaults, e.g. from a file.
    fn load_settings(&self) -> Result<ApplicationSettings, ConfigError> {
        Ok(ApplicationSettings::new())
    }

    /// Runs once the application is running.
    fn after_start(&self, _ctx: &ApplicationContext) -> Result<(), AppError> {
        Ok(())
    }

    fn before_stop(&self, _ctx: &ApplicationContext) {}

    fn after_stop(&self) {}
}

/// Outcome of a stop: modules that failed to stop cleanly.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub failures: Vec<ModuleFailure>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// An application: hooks plus modules driven through the lifecycle.
pub struct Application<H> {
    id: Uuid,
    hooks: H,
    state: Arc<StateCell>,
    slot: InstanceSlot,
    registry: Mutex<ModuleRegistry>,
    context: ArcSwapOption<ApplicationContext>,
}

impl<H: LifecycleHooks> Application<H> {
    /// Create a stopped application that runs in the given slot.
    pub fn new(hooks: H, slot: InstanceSlot) -> Self {
        Self {
            id: Uuid::new_v4(),
            hooks,
            state: Arc::new(StateCell::new()),
            slot,
            registry: Mutex::new(ModuleRegistry::new()),
            context: ArcSwapOption::empty(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn slot(&self) -> &InstanceSlot {
        &self.slot
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state.is(LifecycleState::Running)
    }

    /// Context of the current run, while starting or running.
    pub fn context(&self) -> Option<ApplicationContext> {
        self.context.load_full().map(|ctx| (*ctx).clone())
    }

    /// Register a module. Only allowed while stopped.
    pub fn register_module(&self, module: Arc<dyn Module>) -> Result<(), AppError> {
        let mut registry = self.lock_registry();
        if !self.state.is(LifecycleState::Stopped) {
            return Err(AppError::RegistrationClosed);
        }
        registry.register(module)
    }

    /// Names of the registered modules with their activity.
    pub fn module_status(&self) -> Vec<(String, bool)> {
        self.lock_registry()
            .iter()
            .map(|m| (m.name().to_string(), m.is_active()))
            .collect()
    }

    /// Start the application.
    pub fn start(&self) -> Result<(), AppError> {
        self.start_with(|_| {})
    }

    /// Start the application, running `prepare` once this call has won the
    /// transition to `Starting` and before any hook runs.
    pub fn start_with(&self, prepare: impl FnOnce(&H)) -> Result<(), AppError> {
        self.state
            .transition(LifecycleState::Stopped, LifecycleState::Starting)
            .map_err(|_| AppError::AlreadyRunning)?;

        let mut guard = StartGuard {
            app: self,
            armed: true,
        };
        prepare(&self.hooks);
        let ctx = self.start_modules()?;

        self.state.set(LifecycleState::Running);
        guard.armed = false;

        if let Err(e) = self.hooks.after_start(&ctx) {
            tracing::error!(app = ctx.name(), error = %e, "Start hook failed, stopping");
            self.state.set(LifecycleState::Stopping);
            self.shutdown_sequence();
            return Err(e);
        }

        metrics::record_lifecycle_event("start");
        tracing::info!(app = ctx.name(), id = %self.id, "Application started");
        Ok(())
    }

    /// Stop the application.
    pub fn stop(&self) -> Result<ShutdownReport, AppError> {
        self.state
            .transition(LifecycleState::Running, LifecycleState::Stopping)
            .map_err(|_| AppError::NotRunning)?;

        let report = self.shutdown_sequence();
        metrics::record_lifecycle_event("stop");
        tracing::info!(
            id = %self.id,
            failed_modules = report.failures.len(),
            "Application stopped"
        );
        Ok(report)
    }

    /// Everything between `Starting` and `Running`. On error nothing is
    /// left initialized and the slot is free again.
    fn start_modules(&self) -> Result<ApplicationContext, AppError> {
        let mut registry = self.lock_registry();
        self.hooks.before_start(&mut registry)?;

        let loaded = self.hooks.load_settings()?;
        let settings = resolve_settings(self.hooks.default_settings(), &registry, &loaded);
        let ctx = ApplicationContext::new(self.id, self.hooks.name(), settings, self.state.clone());

        self.slot.claim(&ctx)?;
        if let Err(e) = registry.init_all(&ctx) {
            self.slot.release(self.id);
            return Err(e);
        }

        self.context.store(Some(Arc::new(ctx.clone())));
        Ok(ctx)
    }

    /// Stop modules and release everything. Expects state `Stopping`.
    fn shutdown_sequence(&self) -> ShutdownReport {
        let ctx = self.context.swap(None);
        if let Some(ctx) = ctx.as_deref() {
            self.hooks.before_stop(ctx);
        }

        let failures = self.lock_registry().stop_all();
        self.hooks.after_stop();

        self.slot.release(self.id);
        self.state.set(LifecycleState::Stopped);
        ShutdownReport { failures }
    }

    // A module that panicked mid-start poisons the lock; the registry itself
    // is still consistent.
    fn lock_registry(&self) -> MutexGuard<'_, ModuleRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns an unfinished start to `Stopped`, also when a hook or module
/// panics.
struct StartGuard<'a, H: LifecycleHooks> {
    app: &'a Application<H>,
    armed: bool,
}

impl<H: LifecycleHooks> Drop for StartGuard<'_, H> {
    fn drop(&mut self) {
        if self.armed {
            self.app.context.store(None);
            self.app.slot.release(self.app.id);
            self.app.state.set(LifecycleState::Stopped);
        }
    }
}
