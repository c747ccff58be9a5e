//! Web application layer.
//!
//! # Responsibilities
//! - Derive the application name from the context path
//! - Resolve `appDisable` / `allowedOrigins` on every start
//! - Answer per-request access queries
//! - Bind start/stop to the host's context callbacks

use std::net::IpAddr;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use axum::http::Request;

use crate::config::schema::{
    DEFAULT_ALLOWED_ORIGINS, DEFAULT_APP_DISABLED, DEFAULT_TRUSTED_PROXIES, KEY_ALLOWED_ORIGINS, KEY_APP_DISABLE,
    KEY_TRUSTED_PROXIES,
};
use crate::config::{ApplicationSettings, ConfigError};
use crate::error::AppError;
use crate::http::request::origin_ip;
use crate::lifecycle::{Application, ApplicationContext, InstanceSlot, LifecycleHooks, LifecycleState, ShutdownReport};
use crate::module::{Module, ModuleRegistry};
use crate::security::{parse_trusted_proxies, AllowedOrigins};

/// Hooks a concrete web application implements.
pub trait WebHooks: Send + Sync + 'static {
    /// Name used when the application is mounted at the root path.
    fn root_name(&self) -> String;

    /// Extra defaults. Keys set here win over the built-in web defaults.
    fn default_settings(&self) -> ApplicationSettings {
        ApplicationSettings::new()
    }

    fn load_settings(&self) -> Result<ApplicationSettings, ConfigError> {
        Ok(ApplicationSettings::new())
    }

    /// Runs at the beginning of every start; the place to register modules.
    fn before_start(&self, _registry: &mut ModuleRegistry) -> Result<(), AppError> {
        Ok(())
    }

    /// Runs once modules are initialized and the access policy is in place.
    /// An error stops the application again.
    fn after_start(&self, _ctx: &ApplicationContext) -> Result<(), AppError> {
        Ok(())
    }

    fn before_stop(&self, _ctx: &ApplicationContext) {}

    fn after_stop(&self) {}

    fn on_context_initialized(&self, _ctx: &ApplicationContext) {}

    fn on_context_destroyed(&self, _report: &ShutdownReport) {}
}

/// Access settings resolved at start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    pub disabled: bool,
    pub allowed_origins: AllowedOrigins,
    /// Peers whose forwarding headers name the origin.
    pub trusted_proxies: Vec<IpAddr>,
}

/// The lifecycle hooks of a web application: web state plus user hooks.
pub struct WebLayer<W> {
    user: W,
    context_path: ArcSwapOption<String>,
    policy: ArcSwap<AccessPolicy>,
}

impl<W: WebHooks> WebLayer<W> {
    fn new(user: W) -> Self {
        Self {
            user,
            context_path: ArcSwapOption::empty(),
            policy: ArcSwap::from_pointee(AccessPolicy::default()),
        }
    }

    pub fn user(&self) -> &W {
        &self.user
    }
}

impl<W: WebHooks> LifecycleHooks for WebLayer<W> {
    fn name(&self) -> String {
        let path = self.context_path.load_full();
        application_name(path.as_deref().map(String::as_str), || self.user.root_name())
    }

    fn before_start(&self, registry: &mut ModuleRegistry) -> Result<(), AppError> {
        self.policy.store(Arc::new(AccessPolicy::default()));
        self.user.before_start(registry)
    }

    fn default_settings(&self) -> ApplicationSettings {
        let mut defaults = self.user.default_settings();
        let root = defaults.root_mut();
        root.set_default(KEY_APP_DISABLE, DEFAULT_APP_DISABLED.to_string());
        root.set_default(KEY_ALLOWED_ORIGINS, DEFAULT_ALLOWED_ORIGINS);
        root.set_default(KEY_TRUSTED_PROXIES, DEFAULT_TRUSTED_PROXIES);
        defaults
    }

    fn load_settings(&self) -> Result<ApplicationSettings, ConfigError> {
        self.user.load_settings()
    }

    fn after_start(&self, ctx: &ApplicationContext) -> Result<(), AppError> {
        let root = ctx.settings().root();
        let policy = AccessPolicy {
            disabled: root.get_bool(KEY_APP_DISABLE, DEFAULT_APP_DISABLED),
            allowed_origins: AllowedOrigins::parse(root.get_property(KEY_ALLOWED_ORIGINS, DEFAULT_ALLOWED_ORIGINS)),
            trusted_proxies: parse_trusted_proxies(root.get_property(KEY_TRUSTED_PROXIES, DEFAULT_TRUSTED_PROXIES)),
        };

        tracing::info!(
            app = ctx.name(),
            disabled = policy.disabled,
            allowed_origins = %policy.allowed_origins,
            trusted_proxies = policy.trusted_proxies.len(),
            "Access policy resolved"
        );
        self.policy.store(Arc::new(policy));
        self.user.after_start(ctx)
    }

    fn before_stop(&self, ctx: &ApplicationContext) {
        self.user.before_stop(ctx);
    }

    fn after_stop(&self) {
        self.user.after_stop();
    }
}

/// Name for a context path: the root name for `None`, `""` and `"/"`,
/// otherwise the path without its leading `/`.
pub fn application_name(context_path: Option<&str>, root_name: impl FnOnce() -> String) -> String {
    match context_path {
        None | Some("") | Some("/") => root_name(),
        Some(path) => path.strip_prefix('/').unwrap_or(path).to_string(),
    }
}

/// A web application hosted by [`crate::http::HttpServer`].
pub struct WebApplication<W> {
    core: Application<WebLayer<W>>,
}

impl<W: WebHooks> WebApplication<W> {
    pub fn new(hooks: W, slot: InstanceSlot) -> Self {
        Self {
            core: Application::new(WebLayer::new(hooks), slot),
        }
    }

    pub fn core(&self) -> &Application<WebLayer<W>> {
        &self.core
    }

    pub fn hooks(&self) -> &W {
        self.core.hooks().user()
    }

    pub fn name(&self) -> String {
        self.core.hooks().name()
    }

    pub fn context_path(&self) -> Option<String> {
        self.core.hooks().context_path.load_full().map(|p| (*p).clone())
    }

    pub fn state(&self) -> LifecycleState {
        self.core.state()
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    pub fn register_module(&self, module: Arc<dyn Module>) -> Result<(), AppError> {
        self.core.register_module(module)
    }

    pub fn start(&self) -> Result<(), AppError> {
        self.core.start()
    }

    pub fn stop(&self) -> Result<ShutdownReport, AppError> {
        self.core.stop()
    }

    /// Access policy of the current run.
    pub fn access_policy(&self) -> Result<Arc<AccessPolicy>, AppError> {
        self.ensure_running()?;
        Ok(self.core.hooks().policy.load_full())
    }

    pub fn is_disabled(&self) -> Result<bool, AppError> {
        Ok(self.access_policy()?.disabled)
    }

    /// True if the request's origin IP is allowed.
    pub fn is_origin_allowed<B>(&self, req: &Request<B>) -> Result<bool, AppError> {
        let policy = self.access_policy()?;
        if policy.allowed_origins.is_any() {
            return Ok(true);
        }
        Ok(policy
            .allowed_origins
            .allows(origin_ip(req, &policy.trusted_proxies).as_deref()))
    }

    /// Origin IP of a request under the current policy.
    pub fn request_origin<B>(&self, req: &Request<B>) -> Result<Option<String>, AppError> {
        let policy = self.access_policy()?;
        Ok(origin_ip(req, &policy.trusted_proxies))
    }

    /// Same check for an already-extracted origin.
    pub fn is_ip_allowed(&self, origin: &str) -> Result<bool, AppError> {
        Ok(self.access_policy()?.allowed_origins.allows(Some(origin)))
    }

    /// Host callback: the application is being mounted at `context_path`.
    ///
    /// The path is only recorded by the call that wins the start, so a
    /// rejected call never renames a running application.
    pub fn context_initialized(&self, context_path: Option<&str>) -> Result<(), AppError> {
        self.core.start_with(|layer| {
            layer
                .context_path
                .store(context_path.map(|p| Arc::new(p.to_string())));
        })?;
        if let Some(ctx) = self.core.context() {
            self.hooks().on_context_initialized(&ctx);
        }
        Ok(())
    }

    /// Host callback: the application is being unmounted.
    pub fn context_destroyed(&self) -> Result<ShutdownReport, AppError> {
        let report = self.core.stop()?;
        self.hooks().on_context_destroyed(&report);
        Ok(report)
    }

    fn ensure_running(&self) -> Result<(), AppError> {
        if self.core.is_running() {
            Ok(())
        } else {
            Err(AppError::NotRunning)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    struct Plain;

    impl WebHooks for Plain {
        fn root_name(&self) -> String {
            "ROOT".to_string()
        }
    }

    struct Configured(&'static [(&'static str, &'static str)]);

    impl WebHooks for Configured {
        fn root_name(&self) -> String {
            "configured".to_string()
        }

        fn load_settings(&self) -> Result<ApplicationSettings, ConfigError> {
            let mut settings = ApplicationSettings::new();
            for (k, v) in self.0 {
                settings.root_mut().set_property(*k, *v);
            }
            Ok(settings)
        }
    }

    fn request_from(ip: &str) -> Request<Body> {
        let peer: std::net::SocketAddr = format!("{ip}:50000").parse().unwrap();
        Request::builder()
            .extension(axum::extract::ConnectInfo(peer))
            .body(Body::default())
            .unwrap()
    }

    #[test]
    fn test_application_name() {
        let root = || "ROOT".to_string();
        assert_eq!(application_name(None, root), "ROOT");
        assert_eq!(application_name(Some(""), root), "ROOT");
        assert_eq!(application_name(Some("/"), root), "ROOT");
        assert_eq!(application_name(Some("/shop"), root), "shop");
    }

    #[test]
    fn test_queries_require_running() {
        let app = WebApplication::new(Plain, InstanceSlot::new());
        assert!(matches!(app.is_disabled(), Err(AppError::NotRunning)));
        assert!(matches!(
            app.is_origin_allowed(&request_from("1.2.3.4")),
            Err(AppError::NotRunning)
        ));
    }

    #[test]
    fn test_defaults_allow_everything() {
        let app = WebApplication::new(Plain, InstanceSlot::new());
        app.context_initialized(Some("/")).unwrap();

        assert_eq!(app.name(), "ROOT");
        assert!(!app.is_disabled().unwrap());
        assert!(app.is_origin_allowed(&request_from("203.0.113.7")).unwrap());
        assert!(app.is_origin_allowed(&Request::new(Body::default())).unwrap());
    }

    #[test]
    fn test_origin_list() {
        let app = WebApplication::new(
            Configured(&[(KEY_ALLOWED_ORIGINS, "1.2.3.4, 5.6.7.8")]),
            InstanceSlot::new(),
        );
        app.start().unwrap();

        assert!(app.is_origin_allowed(&request_from("1.2.3.4")).unwrap());
        assert!(app.is_origin_allowed(&request_from("5.6.7.8")).unwrap());
        assert!(!app.is_origin_allowed(&request_from("9.9.9.9")).unwrap());
        assert!(!app.is_origin_allowed(&Request::new(Body::default())).unwrap());
        assert!(app.is_ip_allowed("5.6.7.8").unwrap());
    }

    #[test]
    fn test_disabled_flag() {
        let app = WebApplication::new(Configured(&[(KEY_APP_DISABLE, "True")]), InstanceSlot::new());
        app.start().unwrap();
        assert!(app.is_disabled().unwrap());
    }

    #[test]
    fn test_context_callbacks_rely_on_guards() {
        let app = WebApplication::new(Plain, InstanceSlot::new());
        assert!(matches!(app.context_destroyed(), Err(AppError::NotRunning)));

        app.context_initialized(Some("/shop")).unwrap();
        assert_eq!(app.name(), "shop");
        assert!(matches!(
            app.context_initialized(Some("/other")),
            Err(AppError::AlreadyRunning)
        ));
        assert_eq!(app.context_path().as_deref(), Some("/shop"));

        app.context_destroyed().unwrap();
        assert!(!app.is_running());
    }

    fn forwarded(peer: &str, claimed: &str) -> Request<Body> {
        let mut req = request_from(peer);
        req.headers_mut().insert("x-forwarded-for", claimed.parse().unwrap());
        req
    }

    #[test]
    fn test_forwarded_origin_needs_trusted_proxy() {
        let app = WebApplication::new(
            Configured(&[(KEY_ALLOWED_ORIGINS, "1.2.3.4"), (KEY_TRUSTED_PROXIES, "10.0.0.1")]),
            InstanceSlot::new(),
        );
        app.start().unwrap();

        assert!(app.is_origin_allowed(&forwarded("10.0.0.1", "1.2.3.4")).unwrap());
        assert!(!app.is_origin_allowed(&forwarded("9.9.9.9", "1.2.3.4")).unwrap());
        assert_eq!(
            app.request_origin(&forwarded("9.9.9.9", "1.2.3.4")).unwrap().as_deref(),
            Some("9.9.9.9")
        );
    }

    #[derive(Default)]
    struct Observed {
        fail_after_start: bool,
        seen_origins: std::sync::Mutex<Option<String>>,
        events: std::sync::Mutex<Vec<&'static str>>,
    }

    impl WebHooks for Observed {
        fn root_name(&self) -> String {
            "observed".to_string()
        }

        fn load_settings(&self) -> Result<ApplicationSettings, ConfigError> {
            let mut settings = ApplicationSettings::new();
            settings.root_mut().set_property(KEY_ALLOWED_ORIGINS, "7.7.7.7");
            Ok(settings)
        }

        fn after_start(&self, ctx: &ApplicationContext) -> Result<(), AppError> {
            *self.seen_origins.lock().unwrap() = ctx.settings().root().get(KEY_ALLOWED_ORIGINS).map(str::to_string);
            self.events.lock().unwrap().push("after_start");
            if self.fail_after_start {
                return Err(AppError::NotRunning);
            }
            Ok(())
        }

        fn before_stop(&self, _ctx: &ApplicationContext) {
            self.events.lock().unwrap().push("before_stop");
        }

        fn after_stop(&self) {
            self.events.lock().unwrap().push("after_stop");
        }
    }

    #[test]
    fn test_user_hooks_follow_lifecycle() {
        let app = WebApplication::new(Observed::default(), InstanceSlot::new());
        app.start().unwrap();

        let hooks = app.hooks();
        assert_eq!(hooks.seen_origins.lock().unwrap().as_deref(), Some("7.7.7.7"));
        // Policy is already in place when the user hook runs
        assert!(app.is_ip_allowed("7.7.7.7").unwrap());

        app.stop().unwrap();
        assert_eq!(
            *hooks.events.lock().unwrap(),
            vec!["after_start", "before_stop", "after_stop"]
        );
    }

    #[test]
    fn test_user_after_start_failure_rolls_back() {
        let slot = InstanceSlot::new();
        let app = WebApplication::new(
            Observed {
                fail_after_start: true,
                ..Observed::default()
            },
            slot.clone(),
        );

        assert!(app.start().is_err());
        assert!(!app.is_running());
        assert!(slot.running().is_none());
        assert_eq!(
            *app.hooks().events.lock().unwrap(),
            vec!["after_start", "before_stop", "after_stop"]
        );
    }

    #[test]
    fn test_concurrent_context_initialized_keeps_winner_path() {
        let app = WebApplication::new(Plain, InstanceSlot::new());
        let barrier = std::sync::Barrier::new(8);

        let winners: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let app = &app;
                    let barrier = &barrier;
                    scope.spawn(move || {
                        let path = format!("/app{i}");
                        barrier.wait();
                        app.context_initialized(Some(path.as_str())).ok().map(|_| path)
                    })
                })
                .collect();
            handles.into_iter().filter_map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(winners.len(), 1);
        assert_eq!(app.context_path().as_deref(), Some(winners[0].as_str()));
        assert_eq!(app.name(), winners[0].trim_start_matches('/'));
    }
}
