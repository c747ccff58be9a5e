//! Ordered module registry.

use std::sync::Arc;

use crate::error::{AppError, ModuleError};
use crate::lifecycle::ApplicationContext;
use crate::module::Module;

/// A module that failed to stop.
#[derive(Debug)]
pub struct ModuleFailure {
    pub module: String,
    pub error: ModuleError,
}

/// Modules of one application, in registration order.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module.
    ///
    /// Registering the same instance again is a no-op, so applications can
    /// register from a hook that runs on every start.
    pub fn register(&mut self, module: Arc<dyn Module>) -> Result<(), AppError> {
        if let Some(existing) = self.modules.iter().find(|m| m.name() == module.name()) {
            if std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(&module)) {
                return Ok(());
            }
            return Err(AppError::DuplicateModule(module.name().to_string()));
        }

        tracing::debug!(module = module.name(), "Module registered");
        self.modules.push(module);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|m| m.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Module>> {
        self.modules.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Initialize all modules in registration order.
    ///
    /// On the first failure the modules already initialized are stopped in
    /// reverse order and the failure is returned.
    pub fn init_all(&self, ctx: &ApplicationContext) -> Result<(), AppError> {
        for (index, module) in self.modules.iter().enumerate() {
            if let Err(error) = module.on_init(ctx) {
                tracing::error!(module = module.name(), error = %error, "Module initialization failed");
                let failures = stop_in_reverse(&self.modules[..index]);
                for failure in &failures {
                    tracing::warn!(module = %failure.module, error = %failure.error, "Rollback stop failed");
                }
                return Err(AppError::ModuleInit {
                    module: module.name().to_string(),
                    source: error,
                });
            }
            tracing::info!(module = module.name(), "Module initialized");
        }
        Ok(())
    }

    /// Stop all modules in reverse registration order.
    ///
    /// Every module is stopped even if earlier ones fail; failures are
    /// returned in the order they happened.
    pub fn stop_all(&self) -> Vec<ModuleFailure> {
        stop_in_reverse(&self.modules)
    }
}

fn stop_in_reverse(modules: &[Arc<dyn Module>]) -> Vec<ModuleFailure> {
    let mut failures = Vec::new();
    for module in modules.iter().rev() {
        match module.on_stop() {
            Ok(()) => tracing::info!(module = module.name(), "Module stopped"),
            Err(error) => {
                tracing::warn!(module = module.name(), error = %error, "Module failed to stop");
                failures.push(ModuleFailure {
                    module: module.name().to_string(),
                    error,
                });
            }
        }
    }
    failures
}
