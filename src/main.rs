//! # topolive
//!
//! Headless topology dashboard client: loads settings, connects to the
//! analyzer and runs the session until Ctrl-C, logging notifications and
//! navigation.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::{broadcast, mpsc};
use topolive_client::{HttpApi, WsTransport};
use topolive_core::routes::Route;
use topolive_core::Navigator;
use topolive_session::{ClientEvent, RuntimeConfig, SessionRuntime};
use topolive_settings::TopoliveSettings;
use topolive_telemetry::TelemetryConfig;
use tracing::Level;

/// Topology dashboard session client.
#[derive(Parser, Debug)]
#[command(name = "topolive", about = "Topology dashboard session client")]
struct Cli {
    /// Analyzer base URL (overrides settings).
    #[arg(long)]
    url: Option<String>,

    /// Settings file (defaults to `~/.topolive/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error.
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn load_settings(&self) -> Result<TopoliveSettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(topolive_settings::settings_path);
        let mut settings = topolive_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        if let Some(url) = &self.url {
            settings.server.url.clone_from(url);
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.json_logs {
            settings.logging.json = true;
        }
        Ok(settings)
    }
}

/// Navigator for a client without a router: record the destination in logs.
struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!(%route, path = route.path(), "route changed");
    }
}

fn log_event(event: ClientEvent) {
    match event {
        ClientEvent::Notified { kind, message, .. } => {
            tracing::info!(?kind, %message, "notification");
        }
        ClientEvent::HighlightCompleted(id) => {
            tracing::debug!(correlation_id = %id, "highlight completed");
        }
        ClientEvent::WidgetUpdated(widget) => tracing::trace!(%widget, "widget updated"),
        ClientEvent::Frame(frame) => {
            tracing::trace!(namespace = %frame.namespace, kind = %frame.kind, "frame");
        }
        ClientEvent::Navigated(_) => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;

    let log_level: Level = settings
        .logging
        .level
        .parse()
        .with_context(|| format!("Invalid log level: {}", settings.logging.level))?;
    let _telemetry = topolive_telemetry::init_telemetry(TelemetryConfig {
        log_level,
        json: settings.logging.json,
        ..TelemetryConfig::default()
    });

    let ws_url = settings.server.ws_url()?;
    tracing::info!(url = %settings.server.base_url(), %ws_url, "starting topolive");

    let (transport_tx, transport_rx) = mpsc::unbounded_channel();
    let api = Arc::new(HttpApi::new(
        settings.server.base_url(),
        settings.server.request_timeout(),
    ));
    let transport = Arc::new(WsTransport::new(ws_url, transport_tx));
    let (handle, runtime) = SessionRuntime::spawn(
        RuntimeConfig::from_settings(&settings),
        api,
        transport,
        Arc::new(LogNavigator),
        transport_rx,
    );

    let mut events = handle.subscribe();
    handle.start()?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => log_event(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for ctrl+c")?;
                break;
            }
        }
    }

    tracing::info!(session = ?handle.snapshot(), "shutting down");
    drop(handle);
    runtime.abort();
    Ok(())
}
