//! Startup settings resolution.
//!
//! # Responsibilities
//! - Collect defaults from the application hooks and from every module
//! - Overlay the loaded settings on top of them
//!
//! # Design Decisions
//! - Module defaults land in the section named after the module
//! - Hook defaults win over module defaults for the same key
//! - Loaded settings always win

use crate::config::ApplicationSettings;
use crate::module::ModuleRegistry;

/// Compute the settings an application runs with.
pub fn resolve_settings(
    hook_defaults: ApplicationSettings,
    registry: &ModuleRegistry,
    loaded: &ApplicationSettings,
) -> ApplicationSettings {
    let mut defaults = ApplicationSettings::new();
    for module in registry.iter() {
        let module_defaults = module.default_settings();
        if !module_defaults.is_empty() {
            defaults.section_mut(Some(module.name())).merge(&module_defaults);
        }
    }
    defaults.merge(&hook_defaults);
    defaults.merged_with(loaded)
}
