//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a partial JSON file only needs the keys it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use topolive_core::fields::{FieldRules, PrunePolicy};
use topolive_core::machine::{
    MachineConfig, DEFAULT_HISTORY_QUERY, DEFAULT_POLL_INTERVAL, DEFAULT_RECONNECT_DELAY,
};
use topolive_core::notifications::NotificationLimits;

use crate::errors::{Result, SettingsError};

/// Root settings type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopoliveSettings {
    pub server: ServerSettings,
    pub session: SessionSettings,
    pub notifications: NotificationSettings,
    pub fields: FieldRules,
    pub logging: LoggingSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Base URL of the analyzer, e.g. `http://localhost:8082`.
    pub url: String,
    pub ws_path: String,
    pub request_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8082".to_string(),
            ws_path: "/ws".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl ServerSettings {
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Websocket endpoint derived from the HTTP base URL.
    pub fn ws_url(&self) -> Result<String> {
        let base = self.base_url();
        let rest = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(SettingsError::InvalidValue(format!(
                "server url must start with http:// or https://, got {base}"
            )));
        };
        Ok(format!("{rest}{}", self.ws_path))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    pub reconnect_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub history_query: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            history_query: DEFAULT_HISTORY_QUERY.to_string(),
        }
    }
}

impl SessionSettings {
    pub fn machine_config(&self) -> MachineConfig {
        MachineConfig {
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            history_query: self.history_query.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub max_entries: usize,
    /// How long a notification stays queued before it is dropped.
    pub max_age_ms: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        let limits = NotificationLimits::default();
        Self {
            max_entries: limits.max_entries,
            max_age_ms: limits.max_age.as_millis() as u64,
        }
    }
}

impl NotificationSettings {
    pub fn limits(&self) -> NotificationLimits {
        NotificationLimits {
            max_entries: self.max_entries,
            max_age: Duration::from_millis(self.max_age_ms),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl TopoliveSettings {
    /// Replace zero intervals with their defaults.
    ///
    /// Called automatically during loading. A zero interval would spin the
    /// poller or reconnect loop, so it is corrected with a warning instead of
    /// rejected.
    pub fn validate(&mut self) {
        fn non_zero(val: &mut u64, default: u64, name: &str) {
            if *val == 0 {
                tracing::warn!("{name} must be positive, using {default}");
                *val = default;
            }
        }

        let defaults = SessionSettings::default();
        non_zero(
            &mut self.session.reconnect_delay_ms,
            defaults.reconnect_delay_ms,
            "reconnect_delay_ms",
        );
        non_zero(
            &mut self.session.poll_interval_ms,
            defaults.poll_interval_ms,
            "poll_interval_ms",
        );
        non_zero(
            &mut self.notifications.max_age_ms,
            NotificationSettings::default().max_age_ms,
            "max_age_ms",
        );
        non_zero(
            &mut self.server.request_timeout_ms,
            ServerSettings::default().request_timeout_ms,
            "request_timeout_ms",
        );
        if self.fields.prune == PrunePolicy::AfterMissing(0) {
            tracing::warn!("fields.prune.afterMissing must be positive, using 1");
            self.fields.prune = PrunePolicy::AfterMissing(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = TopoliveSettings::default();
        assert_eq!(settings.server.url, "http://localhost:8082");
        assert_eq!(settings.session.reconnect_delay_ms, 1000);
        assert_eq!(settings.session.poll_interval_ms, 5000);
        assert_eq!(settings.session.history_query, "G.At('-1m').V().Limit(1)");
        assert_eq!(settings.notifications.max_entries, 32);
        assert_eq!(settings.fields.prune, PrunePolicy::Retain);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn ws_url_from_http() {
        let server = ServerSettings {
            url: "http://analyzer:8082/".into(),
            ..ServerSettings::default()
        };
        assert_eq!(server.ws_url().unwrap(), "ws://analyzer:8082/ws");

        let tls = ServerSettings {
            url: "https://analyzer".into(),
            ws_path: "/ws/subscriber".into(),
            ..ServerSettings::default()
        };
        assert_eq!(tls.ws_url().unwrap(), "wss://analyzer/ws/subscriber");
    }

    #[test]
    fn ws_url_rejects_unknown_scheme() {
        let server = ServerSettings {
            url: "ftp://analyzer".into(),
            ..ServerSettings::default()
        };
        assert!(matches!(server.ws_url(), Err(SettingsError::InvalidValue(_))));
    }

    #[test]
    fn validate_replaces_zero_intervals() {
        let mut settings = TopoliveSettings::default();
        settings.session.poll_interval_ms = 0;
        settings.session.reconnect_delay_ms = 0;
        settings.validate();
        assert_eq!(settings.session.poll_interval_ms, 5000);
        assert_eq!(settings.session.reconnect_delay_ms, 1000);
    }

    #[test]
    fn validate_clamps_zero_prune_limit() {
        let mut settings: TopoliveSettings =
            serde_json::from_str(r#"{"fields": {"prune": {"afterMissing": 0}}}"#).unwrap();
        settings.validate();
        assert_eq!(settings.fields.prune, PrunePolicy::AfterMissing(1));
    }

    #[test]
    fn machine_config_conversion() {
        let session = SessionSettings {
            reconnect_delay_ms: 250,
            poll_interval_ms: 750,
            history_query: "G.V().Limit(1)".into(),
        };
        let config = session.machine_config();
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.poll_interval, Duration::from_millis(750));
        assert_eq!(config.history_query, "G.V().Limit(1)");
    }

    #[test]
    fn partial_json_uses_defaults() {
        let settings: TopoliveSettings =
            serde_json::from_str(r#"{"session": {"pollIntervalMs": 2000}}"#).unwrap();
        assert_eq!(settings.session.poll_interval_ms, 2000);
        assert_eq!(settings.session.reconnect_delay_ms, 1000);
        assert_eq!(settings.server, ServerSettings::default());
    }
}
