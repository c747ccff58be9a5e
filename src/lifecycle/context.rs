//! Application context handle and the running-instance slot.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use uuid::Uuid;

use crate::config::{ApplicationSettings, Settings};
use crate::error::AppError;
use crate::lifecycle::state::{LifecycleState, StateCell};

#[derive(Debug)]
struct ContextInner {
    id: Uuid,
    name: String,
    settings: ApplicationSettings,
    state: Arc<StateCell>,
}

/// Per-run view of an application, handed to modules on init.
///
/// The settings are the resolved settings of this run and never change.
/// `is_running` follows the owning application's live state.
#[derive(Debug, Clone)]
pub struct ApplicationContext {
    inner: Arc<ContextInner>,
}

impl ApplicationContext {
    pub(crate) fn new(id: Uuid, name: String, settings: ApplicationSettings, state: Arc<StateCell>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id,
                name,
                settings,
                state,
            }),
        }
    }

    /// Identifier of the owning application instance.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn settings(&self) -> &ApplicationSettings {
        &self.inner.settings
    }

    /// Returns a section of the resolved settings; a missing section reads as empty.
    pub fn section(&self, name: Option<&str>) -> Settings {
        self.inner.settings.get_section(name).cloned().unwrap_or_default()
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.is(LifecycleState::Running)
    }

    /// Non-owning reference for modules to keep after init.
    pub fn downgrade(&self) -> WeakContext {
        WeakContext {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &ApplicationContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Non-owning back-reference from a module to its application.
#[derive(Debug, Clone, Default)]
pub struct WeakContext {
    inner: Weak<ContextInner>,
}

impl WeakContext {
    pub fn upgrade(&self) -> Option<ApplicationContext> {
        self.inner.upgrade().map(|inner| ApplicationContext { inner })
    }

    /// True while the referenced application run is still alive and running.
    pub fn is_running(&self) -> bool {
        self.upgrade().is_some_and(|ctx| ctx.is_running())
    }
}

/// Holds the context of the one application allowed to run at a time.
///
/// Applications that must exclude each other share a slot (clone it);
/// tests use a fresh slot each so they stay isolated.
#[derive(Debug, Clone, Default)]
pub struct InstanceSlot {
    running: Arc<Mutex<Option<ApplicationContext>>>,
}

impl InstanceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The context of the currently running application, if any.
    pub fn running(&self) -> Option<ApplicationContext> {
        self.lock().clone()
    }

    pub fn is_occupied(&self) -> bool {
        self.lock().is_some()
    }

    pub(crate) fn claim(&self, ctx: &ApplicationContext) -> Result<(), AppError> {
        let mut running = self.lock();
        match running.as_ref() {
            Some(current) if current.id() != ctx.id() => Err(AppError::InstanceConflict),
            _ => {
                *running = Some(ctx.clone());
                Ok(())
            }
        }
    }

    /// Clear the slot if it is held by application `id`.
    pub(crate) fn release(&self, id: Uuid) {
        let mut running = self.lock();
        if running.as_ref().is_some_and(|ctx| ctx.id() == id) {
            *running = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ApplicationContext>> {
        self.running.lock().expect("instance slot mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(state: Arc<StateCell>) -> ApplicationContext {
        ApplicationContext::new(Uuid::new_v4(), "test".into(), ApplicationSettings::new(), state)
    }

    #[test]
    fn test_slot_claim_and_release() {
        let slot = InstanceSlot::new();
        let a = context(Arc::new(StateCell::new()));
        let b = context(Arc::new(StateCell::new()));

        slot.claim(&a).unwrap();
        assert!(matches!(slot.claim(&b), Err(AppError::InstanceConflict)));

        // Releasing with a foreign id leaves the slot alone
        slot.release(b.id());
        assert!(slot.running().unwrap().ptr_eq(&a));

        slot.release(a.id());
        assert!(slot.running().is_none());
        slot.claim(&b).unwrap();
    }

    #[test]
    fn test_weak_context_follows_state_and_lifetime() {
        let state = Arc::new(StateCell::new());
        let ctx = context(state.clone());
        let weak = ctx.downgrade();

        assert!(!weak.is_running());
        state.set(LifecycleState::Running);
        assert!(weak.is_running());

        drop(ctx);
        assert!(weak.upgrade().is_none());
        assert!(!weak.is_running());
    }

    #[test]
    fn test_missing_section_reads_empty() {
        let ctx = context(Arc::new(StateCell::new()));
        assert!(ctx.section(Some("smtp")).is_empty());
    }
}
