//! SMTP mail module.
//!
//! Reads the `smtp` settings section on init and sends plain-text mail
//! through a [`MailTransport`]. By default the transport is a lettre
//! `SmtpTransport` built from the settings; tests inject their own.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::Settings;
use crate::error::ModuleError;
use crate::lifecycle::{ApplicationContext, LifecycleState, StateCell, WeakContext};
use crate::module::{MailMessage, Module};
use crate::observability::metrics;

pub const SMTP_MODULE_NAME: &str = "smtp";

const KEY_SERVER: &str = "server";
const KEY_PORT: &str = "port";
const KEY_SENDER: &str = "sender";
const KEY_AUTH_ENABLED: &str = "authEnabled";
const KEY_USERNAME: &str = "username";
const KEY_PASSWORD: &str = "password";
const KEY_SECURITY: &str = "security";

/// Connection security for the SMTP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpSecurity {
    #[default]
    None,
    StartTls,
    Tls,
}

impl FromStr for SmtpSecurity {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(SmtpSecurity::None),
            "starttls" => Ok(SmtpSecurity::StartTls),
            "tls" | "ssl" => Ok(SmtpSecurity::Tls),
            _ => Err(ModuleError::Settings {
                key: format!("{SMTP_MODULE_NAME}.{KEY_SECURITY}"),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SmtpSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SmtpSecurity::None => "none",
            SmtpSecurity::StartTls => "starttls",
            SmtpSecurity::Tls => "tls",
        };
        f.write_str(s)
    }
}

/// Parsed `smtp` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub sender: String,
    pub auth_enabled: bool,
    pub username: String,
    pub password: String,
    pub security: SmtpSecurity,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: 25,
            sender: "no-reply@localhost".to_string(),
            auth_enabled: false,
            username: String::new(),
            password: String::new(),
            security: SmtpSecurity::None,
        }
    }
}

impl SmtpSettings {
    /// Defaults in settings form, contributed to the `smtp` section.
    pub fn defaults() -> Settings {
        let d = Self::default();
        let mut settings = Settings::new();
        settings.set_property(KEY_SERVER, d.server);
        settings.set_property(KEY_PORT, d.port.to_string());
        settings.set_property(KEY_SENDER, d.sender);
        settings.set_property(KEY_AUTH_ENABLED, d.auth_enabled.to_string());
        settings.set_property(KEY_USERNAME, d.username);
        settings.set_property(KEY_PASSWORD, d.password);
        settings.set_property(KEY_SECURITY, d.security.to_string());
        settings
    }

    pub fn from_settings(section: &Settings) -> Result<Self, ModuleError> {
        let d = Self::default();
        let port = match section.get(KEY_PORT) {
            Some(raw) => raw.trim().parse().map_err(|_| ModuleError::Settings {
                key: format!("{SMTP_MODULE_NAME}.{KEY_PORT}"),
                value: raw.to_string(),
            })?,
            None => d.port,
        };

        Ok(Self {
            server: section.get_property(KEY_SERVER, &d.server).to_string(),
            port,
            sender: section.get_property(KEY_SENDER, &d.sender).to_string(),
            auth_enabled: section.get_bool(KEY_AUTH_ENABLED, d.auth_enabled),
            username: section.get_property(KEY_USERNAME, "").to_string(),
            password: section.get_property(KEY_PASSWORD, "").to_string(),
            security: section.get_property(KEY_SECURITY, "none").parse()?,
        })
    }
}

/// Delivers built messages.
pub trait MailTransport: Send + Sync {
    fn send(&self, message: &Message) -> Result<(), ModuleError>;
}

/// Blocking SMTP delivery via lettre.
pub struct LettreTransport {
    inner: SmtpTransport,
}

impl LettreTransport {
    pub fn from_settings(settings: &SmtpSettings) -> Result<Self, ModuleError> {
        let builder = match settings.security {
            SmtpSecurity::None => SmtpTransport::builder_dangerous(settings.server.as_str()),
            SmtpSecurity::StartTls => SmtpTransport::starttls_relay(&settings.server)
                .map_err(|e| ModuleError::Transport(e.to_string()))?,
            SmtpSecurity::Tls => {
                SmtpTransport::relay(&settings.server).map_err(|e| ModuleError::Transport(e.to_string()))?
            }
        };

        let mut builder = builder.port(settings.port);
        if settings.auth_enabled {
            builder = builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ));
        }

        Ok(Self {
            inner: builder.build(),
        })
    }
}

impl MailTransport for LettreTransport {
    fn send(&self, message: &Message) -> Result<(), ModuleError> {
        self.inner
            .send(message)
            .map(|_| ())
            .map_err(|e| ModuleError::Transport(e.to_string()))
    }
}

struct Active {
    app: WeakContext,
    settings: SmtpSettings,
    transport: Arc<dyn MailTransport>,
}

/// Module that sends mail on behalf of its application.
pub struct SmtpModule {
    state: StateCell,
    active: Mutex<Option<Active>>,
    injected: Option<Arc<dyn MailTransport>>,
}

impl SmtpModule {
    /// Module that builds a lettre transport from its settings on init.
    pub fn new() -> Self {
        Self {
            state: StateCell::new(),
            active: Mutex::new(None),
            injected: None,
        }
    }

    /// Module that sends through the given transport instead.
    pub fn with_transport(transport: Arc<dyn MailTransport>) -> Self {
        Self {
            injected: Some(transport),
            ..Self::new()
        }
    }

    /// Settings in effect, while initialized.
    pub fn settings(&self) -> Option<SmtpSettings> {
        self.lock().as_ref().map(|a| a.settings.clone())
    }

    /// Send a message.
    ///
    /// Fails with an invalid-argument error for a message without
    /// recipients, whatever the module state, and with an inactive error
    /// unless the module is initialized and its application is running.
    pub fn send_message(&self, message: &MailMessage) -> Result<(), ModuleError> {
        if message.is_empty() {
            return Err(ModuleError::InvalidArgument("message has no recipients".into()));
        }

        let (transport, sender) = {
            let active = self.lock();
            match active.as_ref() {
                Some(a) if self.state.is(LifecycleState::Running) && a.app.is_running() => {
                    (a.transport.clone(), a.settings.sender.clone())
                }
                _ => return Err(ModuleError::Inactive(SMTP_MODULE_NAME.to_string())),
            }
        };

        let wire = message.to_lettre(&sender)?;
        transport.send(&wire)?;

        metrics::record_mail_sent();
        tracing::debug!(recipients = message.recipients.len(), "Mail sent");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Option<Active>> {
        self.active.lock().expect("smtp module mutex poisoned")
    }
}

impl Default for SmtpModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for SmtpModule {
    fn name(&self) -> &str {
        SMTP_MODULE_NAME
    }

    fn default_settings(&self) -> Settings {
        SmtpSettings::defaults()
    }

    fn on_init(&self, ctx: &ApplicationContext) -> Result<(), ModuleError> {
        self.state
            .transition(LifecycleState::Stopped, LifecycleState::Starting)
            .map_err(|_| ModuleError::AlreadyInitialized(SMTP_MODULE_NAME.to_string()))?;

        let result = SmtpSettings::from_settings(&ctx.section(Some(SMTP_MODULE_NAME))).and_then(|settings| {
            let transport: Arc<dyn MailTransport> = match &self.injected {
                Some(t) => t.clone(),
                None => Arc::new(LettreTransport::from_settings(&settings)?),
            };
            Ok((settings, transport))
        });

        match result {
            Ok((settings, transport)) => {
                tracing::info!(
                    server = %settings.server,
                    port = settings.port,
                    security = %settings.security,
                    "SMTP module ready"
                );
                *self.lock() = Some(Active {
                    app: ctx.downgrade(),
                    settings,
                    transport,
                });
                self.state.set(LifecycleState::Running);
                Ok(())
            }
            Err(e) => {
                self.state.set(LifecycleState::Stopped);
                Err(e)
            }
        }
    }

    fn on_stop(&self) -> Result<(), ModuleError> {
        if self
            .state
            .transition(LifecycleState::Running, LifecycleState::Stopping)
            .is_err()
        {
            return Ok(());
        }
        self.lock().take();
        self.state.set(LifecycleState::Stopped);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.state.is(LifecycleState::Running) && self.lock().as_ref().is_some_and(|a| a.app.is_running())
    }
}
