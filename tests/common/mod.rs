//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use webapp_toolkit::config::{ApplicationSettings, ConfigError, ServerConfig};
use webapp_toolkit::error::{AppError, ModuleError};
use webapp_toolkit::module::{MailTransport, Module, ModuleRegistry};
use webapp_toolkit::{HttpServer, Shutdown, WebApplication, WebHooks};

/// Transport that records recipients instead of talking SMTP.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Vec<String>>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<Vec<String>> {
        self.sent.lock().unwrap().clone()
    }
}

impl MailTransport for RecordingTransport {
    fn send(&self, message: &lettre::Message) -> Result<(), ModuleError> {
        let recipients = message.envelope().to().iter().map(ToString::to_string).collect();
        self.sent.lock().unwrap().push(recipients);
        Ok(())
    }
}

/// Web application hooks driven entirely by test data.
#[derive(Default)]
pub struct TestApp {
    pub root: Vec<(&'static str, &'static str)>,
    pub sections: Vec<(&'static str, &'static str, &'static str)>,
    pub modules: Vec<Arc<dyn Module>>,
}

impl TestApp {
    pub fn with_root(root: &[(&'static str, &'static str)]) -> Self {
        Self {
            root: root.to_vec(),
            ..Self::default()
        }
    }
}

impl WebHooks for TestApp {
    fn root_name(&self) -> String {
        "ROOT".to_string()
    }

    fn load_settings(&self) -> Result<ApplicationSettings, ConfigError> {
        let mut settings = ApplicationSettings::new();
        for (key, value) in &self.root {
            settings.root_mut().set_property(*key, *value);
        }
        for (section, key, value) in &self.sections {
            settings.section_mut(Some(*section)).set_property(*key, *value);
        }
        Ok(settings)
    }

    fn before_start(&self, registry: &mut ModuleRegistry) -> Result<(), AppError> {
        for module in &self.modules {
            registry.register(module.clone())?;
        }
        Ok(())
    }
}

/// A running HTTP host bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), AppError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the host to stop the application.
    pub async fn stop(self) -> Result<(), AppError> {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked")
    }
}

/// Host `app` with `routes` mounted at `context_path`.
pub async fn start_server<W: WebHooks>(
    app: Arc<WebApplication<W>>,
    routes: Router,
    context_path: Option<&str>,
) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(app.clone(), routes, &ServerConfig::default(), context_path);
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, rx).await });

    // Wait until the application has been started by the host
    for _ in 0..100 {
        if app.is_running() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
