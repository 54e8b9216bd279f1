//! Session state machine.
//!
//! [`SessionMachine::handle`] is synchronous and side-effect free: it mutates
//! the [`Session`] and returns the [`Effect`]s the runtime must carry out, in
//! order. Anything asynchronous (probes, timers, connects) comes back later as
//! another [`Input`] tagged with the epoch it was launched in, and results from
//! an older epoch are dropped.

use std::time::Duration;

use crate::collab::ServiceInfo;
use crate::errors::ApiError;
use crate::notifications::NotificationKind;
use crate::routes::Route;
use crate::session::Session;

pub const MSG_CONNECTED: &str = "Connected";
pub const MSG_DISCONNECTED: &str = "Disconnected";
pub const MSG_AUTH_FAILED: &str = "Authentication failed";

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);
pub const DEFAULT_HISTORY_QUERY: &str = "G.At('-1m').V().Limit(1)";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineConfig {
    pub reconnect_delay: Duration,
    pub poll_interval: Duration,
    /// Query whose success tells us the backend keeps history.
    pub history_query: String,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            history_query: DEFAULT_HISTORY_QUERY.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    /// Application boot.
    Start,
    TransportConnected,
    TransportDisconnected,
    TransportError,
    Login,
    Logout,
    /// A 401 was observed somewhere.
    Unauthorized,
    PollTick {
        epoch: u64,
    },
    ReconnectDue {
        epoch: u64,
    },
    ApiProbeSucceeded {
        epoch: u64,
        info: ServiceInfo,
    },
    ApiProbeFailed {
        epoch: u64,
        error: ApiError,
    },
    HistoryProbeFinished {
        epoch: u64,
        outcome: Result<(), ApiError>,
    },
}

impl Input {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::TransportConnected => "transport_connected",
            Self::TransportDisconnected => "transport_disconnected",
            Self::TransportError => "transport_error",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Unauthorized => "unauthorized",
            Self::PollTick { .. } => "poll_tick",
            Self::ReconnectDue { .. } => "reconnect_due",
            Self::ApiProbeSucceeded { .. } => "api_probe_succeeded",
            Self::ApiProbeFailed { .. } => "api_probe_failed",
            Self::HistoryProbeFinished { .. } => "history_probe_finished",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Notify {
        kind: NotificationKind,
        message: String,
    },
    Navigate(Route),
    Connect,
    ScheduleReconnect {
        delay: Duration,
        epoch: u64,
    },
    StartPolling {
        interval: Duration,
        epoch: u64,
    },
    StopPolling,
    ProbeApi {
        epoch: u64,
    },
    ProbeHistory {
        epoch: u64,
        query: String,
    },
}

impl Effect {
    fn notify(kind: NotificationKind, message: &str) -> Self {
        Self::Notify {
            kind,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionMachine {
    session: Session,
    config: MachineConfig,
}

impl SessionMachine {
    pub fn new(config: MachineConfig) -> Self {
        Self {
            session: Session::new(),
            config,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        let mut effects = Vec::new();

        match input {
            Input::Start => {
                effects.push(Effect::ProbeApi {
                    epoch: self.session.epoch(),
                });
            }
            Input::TransportConnected => {
                self.session.mark_connected();
                effects.push(Effect::notify(NotificationKind::Success, MSG_CONNECTED));
            }
            Input::TransportDisconnected => {
                self.session.mark_disconnected();
                effects.push(Effect::notify(NotificationKind::Error, MSG_DISCONNECTED));
                if self.session.is_authenticated() {
                    self.schedule_reconnect(&mut effects);
                }
            }
            Input::TransportError => {
                // The disconnect notification belongs to TransportDisconnected.
                if self.session.is_connected() {
                    self.session.mark_disconnected();
                }
                self.schedule_reconnect(&mut effects);
            }
            Input::Login => self.login(&mut effects),
            Input::Logout => self.logout(&mut effects),
            Input::Unauthorized => self.unauthorized(&mut effects),
            Input::PollTick { epoch } => {
                if self.session.is_current(epoch) && self.session.polling_active() {
                    effects.push(Effect::ProbeApi { epoch });
                } else {
                    tracing::trace!(epoch, "stale poll tick ignored");
                }
            }
            Input::ReconnectDue { epoch } => {
                if !self.session.is_current(epoch) {
                    tracing::debug!(epoch, current = self.session.epoch(), "stale reconnect ignored");
                } else {
                    self.session.set_reconnect_pending(false);
                    if self.session.authenticated() != Some(false) && !self.session.is_connected() {
                        effects.push(Effect::Connect);
                    }
                }
            }
            Input::ApiProbeSucceeded { epoch, info } => {
                if self.session.is_current(epoch) {
                    self.apply_service_info(&info, &mut effects);
                } else {
                    tracing::debug!(epoch, current = self.session.epoch(), "stale api probe ignored");
                }
            }
            Input::ApiProbeFailed { epoch, error } => {
                if error.is_unauthorized() {
                    self.unauthorized(&mut effects);
                } else {
                    tracing::debug!(epoch, error = %error, kind = error.error_kind(), "api probe failed");
                }
            }
            Input::HistoryProbeFinished { epoch, outcome } => {
                if matches!(&outcome, Err(e) if e.is_unauthorized()) {
                    self.unauthorized(&mut effects);
                }
                if self.session.is_current(epoch) && self.session.is_authenticated() {
                    let supported = outcome.is_ok();
                    tracing::info!(supported, "history capability determined");
                    self.session.set_history_capable(supported);
                }
            }
        }

        effects
    }

    fn login(&mut self, effects: &mut Vec<Effect>) {
        if !self.session.authenticate() {
            return;
        }
        let epoch = self.session.epoch();
        tracing::info!(epoch, "session authenticated");

        effects.push(Effect::ProbeApi { epoch });
        effects.push(Effect::Navigate(Route::HOME));
        effects.push(Effect::Connect);
        if !self.session.polling_active() {
            self.session.set_polling(true);
            effects.push(Effect::StartPolling {
                interval: self.config.poll_interval,
                epoch,
            });
        }
        effects.push(Effect::ProbeHistory {
            epoch,
            query: self.config.history_query.clone(),
        });
    }

    fn logout(&mut self, effects: &mut Vec<Effect>) {
        if !self.session.deauthenticate() {
            return;
        }
        tracing::info!(epoch = self.session.epoch(), "session logged out");

        if self.session.polling_active() {
            self.session.set_polling(false);
            effects.push(Effect::StopPolling);
        }
        effects.push(Effect::Navigate(Route::Login));
    }

    fn unauthorized(&mut self, effects: &mut Vec<Effect>) {
        tracing::warn!("unauthorized response, forcing logout");
        effects.push(Effect::notify(NotificationKind::Error, MSG_AUTH_FAILED));
        self.logout(effects);
    }

    fn schedule_reconnect(&mut self, effects: &mut Vec<Effect>) {
        if self.session.reconnect_pending() {
            tracing::debug!("reconnect already scheduled");
            return;
        }
        self.session.set_reconnect_pending(true);
        effects.push(Effect::ScheduleReconnect {
            delay: self.config.reconnect_delay,
            epoch: self.session.epoch(),
        });
    }

    fn apply_service_info(&mut self, info: &ServiceInfo, effects: &mut Vec<Effect>) {
        if !self.session.is_authenticated() {
            self.login(effects);
        }
        if self.session.set_service_name(&info.service) {
            tracing::info!(service = ?self.session.service_name(), "service name updated");
        }
        if self.session.set_service_version(&info.version) {
            tracing::info!(version = %info.version, "service version updated");
        }
    }
}
