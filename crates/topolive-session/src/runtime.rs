//! Session runtime actor.
//!
//! One task owns the [`SessionMachine`] and every piece of mutable client
//! state. It selects over handle commands, completions of the work it spawned
//! (timers, probes) and transport events, handles each to completion, then
//! executes the resulting [`Effect`]s. Spawned work reports back as an
//! [`Input`] tagged with the epoch it was launched in.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use topolive_core::fields::FieldRules;
use topolive_core::frame::Frame;
use topolive_core::ids::{CorrelationId, NotificationId};
use topolive_core::notifications::{NotificationKind, NotificationLimits, NotificationRegistry};
use topolive_core::routes::Route;
use topolive_core::view::ViewState;
use topolive_core::{
    CapabilityApi, Effect, Input, MachineConfig, Navigator, SessionMachine, SessionSnapshot,
    Transport, TransportEvent,
};
use topolive_settings::TopoliveSettings;

use crate::handle::SessionHandle;
use crate::widgets::WidgetRegistry;

const EVENT_CAPACITY: usize = 256;
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
const MIN_TIMER_PERIOD: Duration = Duration::from_millis(10);

#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    pub machine: MachineConfig,
    pub notifications: NotificationLimits,
    pub fields: FieldRules,
}

impl RuntimeConfig {
    pub fn from_settings(settings: &TopoliveSettings) -> Self {
        Self {
            machine: settings.session.machine_config(),
            notifications: settings.notifications.limits(),
            fields: settings.fields.clone(),
        }
    }

    fn sweep_interval(&self) -> Duration {
        self.notifications
            .max_age
            .min(MAX_SWEEP_INTERVAL)
            .max(MIN_TIMER_PERIOD)
    }
}

/// Broadcast to every subscriber of a [`SessionHandle`].
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    Navigated(Route),
    Notified {
        id: NotificationId,
        kind: NotificationKind,
        message: String,
    },
    HighlightCompleted(CorrelationId),
    WidgetUpdated(String),
    /// Any frame not consumed by the runtime itself.
    Frame(Frame),
}

/// State reachable from [`SessionHandle`] calls.
pub struct RuntimeState {
    pub view: ViewState,
    pub notifications: NotificationRegistry,
    pub widgets: WidgetRegistry,
    pub transport: Arc<dyn Transport>,
}

pub(crate) type StateFn = Box<dyn FnOnce(&mut RuntimeState) + Send>;

pub(crate) enum Command {
    Input(Input),
    Call(StateFn),
}

/// Current time as a std instant that follows tokio's (pausable) clock.
pub(crate) fn now() -> std::time::Instant {
    Instant::now().into_std()
}

pub struct SessionRuntime {
    machine: SessionMachine,
    state: RuntimeState,
    api: Arc<dyn CapabilityApi>,
    navigator: Arc<dyn Navigator>,
    commands: mpsc::UnboundedReceiver<Command>,
    internal_tx: mpsc::UnboundedSender<Input>,
    internal_rx: mpsc::UnboundedReceiver<Input>,
    transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    events_tx: broadcast::Sender<ClientEvent>,
    poller: Option<JoinHandle<()>>,
    sweep_every: Duration,
}

impl SessionRuntime {
    pub fn new(
        config: RuntimeConfig,
        api: Arc<dyn CapabilityApi>,
        transport: Arc<dyn Transport>,
        navigator: Arc<dyn Navigator>,
        transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> (Self, SessionHandle) {
        let machine = SessionMachine::new(config.machine.clone());
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(machine.session().snapshot());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let handle = SessionHandle::new(command_tx, snapshot_rx, events_tx.clone());
        let runtime = Self {
            machine,
            state: RuntimeState {
                view: ViewState::new(),
                notifications: NotificationRegistry::new(config.notifications.clone()),
                widgets: WidgetRegistry::new(config.fields.clone()),
                transport,
            },
            api,
            navigator,
            commands,
            internal_tx,
            internal_rx,
            transport_events,
            snapshot_tx,
            events_tx,
            poller: None,
            sweep_every: config.sweep_interval(),
        };
        (runtime, handle)
    }

    /// Build the runtime and run it on a new task.
    pub fn spawn(
        config: RuntimeConfig,
        api: Arc<dyn CapabilityApi>,
        transport: Arc<dyn Transport>,
        navigator: Arc<dyn Navigator>,
        transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (runtime, handle) = Self::new(config, api, transport, navigator, transport_events);
        (handle, tokio::spawn(runtime.run()))
    }

    /// Run until every [`SessionHandle`] has been dropped.
    pub async fn run(mut self) {
        let mut sweep = interval_at(Instant::now() + self.sweep_every, self.sweep_every);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Input(input)) => self.dispatch(input),
                    Some(Command::Call(f)) => f(&mut self.state),
                    None => break,
                },
                Some(input) = self.internal_rx.recv() => self.dispatch(input),
                Some(event) = self.transport_events.recv() => self.on_transport(event),
                _ = sweep.tick() => {
                    let expired = self.state.notifications.expire(now());
                    if expired > 0 {
                        tracing::trace!(expired, "notifications expired");
                    }
                }
            }
        }

        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        tracing::debug!("session runtime stopped");
    }

    fn dispatch(&mut self, input: Input) {
        let name = input.name();
        let effects = self.machine.handle(input);
        tracing::debug!(
            input = name,
            effects = effects.len(),
            epoch = self.machine.session().epoch(),
            "input handled"
        );
        for effect in effects {
            self.execute(effect);
        }
        let _ = self.snapshot_tx.send_replace(self.machine.session().snapshot());
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Notify { kind, message } => self.notify(kind, message),
            Effect::Navigate(route) => {
                tracing::info!(%route, "navigate");
                self.navigator.navigate(route);
                let _ = self.events_tx.send(ClientEvent::Navigated(route));
            }
            Effect::Connect => self.state.transport.connect(),
            Effect::ScheduleReconnect { delay, epoch } => {
                let tx = self.internal_tx.clone();
                let _ = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Input::ReconnectDue { epoch });
                });
            }
            Effect::StartPolling { interval, epoch } => {
                if let Some(previous) = self.poller.take() {
                    previous.abort();
                }
                let interval = interval.max(MIN_TIMER_PERIOD);
                let tx = self.internal_tx.clone();
                self.poller = Some(tokio::spawn(async move {
                    let mut ticks = interval_at(Instant::now() + interval, interval);
                    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        let _ = ticks.tick().await;
                        if tx.send(Input::PollTick { epoch }).is_err() {
                            break;
                        }
                    }
                }));
            }
            Effect::StopPolling => {
                if let Some(poller) = self.poller.take() {
                    poller.abort();
                }
            }
            Effect::ProbeApi { epoch } => {
                let api = Arc::clone(&self.api);
                let tx = self.internal_tx.clone();
                let _ = tokio::spawn(async move {
                    let input = match api.service_info().await {
                        Ok(info) => Input::ApiProbeSucceeded { epoch, info },
                        Err(error) => Input::ApiProbeFailed { epoch, error },
                    };
                    let _ = tx.send(input);
                });
            }
            Effect::ProbeHistory { epoch, query } => {
                let api = Arc::clone(&self.api);
                let tx = self.internal_tx.clone();
                let _ = tokio::spawn(async move {
                    let outcome = api.topology_query(&query).await.map(|_| ());
                    let _ = tx.send(Input::HistoryProbeFinished { epoch, outcome });
                });
            }
        }
    }

    fn notify(&mut self, kind: NotificationKind, message: String) {
        let Some(id) = self.state.notifications.add(kind, message.clone(), now()) else {
            return;
        };
        tracing::info!(%id, ?kind, %message, "notification");
        let _ = self.events_tx.send(ClientEvent::Notified { id, kind, message });
    }

    fn on_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.dispatch(Input::TransportConnected),
            TransportEvent::Disconnected => self.dispatch(Input::TransportDisconnected),
            TransportEvent::Error(reason) => {
                tracing::warn!(%reason, "transport error");
                self.dispatch(Input::TransportError);
            }
            TransportEvent::Message(value) => self.on_frame(value),
        }
    }

    fn on_frame(&mut self, value: serde_json::Value) {
        let Some(frame) = Frame::parse(&value) else {
            tracing::debug!("dropping frame without envelope");
            return;
        };

        if let Some(id) = frame.uuid.clone() {
            if self.state.view.is_highlight_pending(&id) {
                tracing::debug!(correlation_id = %id, "highlight completed");
                self.state.view.end_highlight(id.clone());
                let _ = self.events_tx.send(ClientEvent::HighlightCompleted(id));
                return;
            }
        }

        if let Some((widget, metric)) = frame.metric_update() {
            let widget = widget.to_string();
            self.state.widgets.observe(&widget, metric.clone());
            let _ = self.events_tx.send(ClientEvent::WidgetUpdated(widget));
            return;
        }

        let _ = self.events_tx.send(ClientEvent::Frame(frame));
    }
}
