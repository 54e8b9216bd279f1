use tokio::sync::{broadcast, mpsc, oneshot, watch};
use topolive_core::frame::Frame;
use topolive_core::ids::{CorrelationId, NotificationId};
use topolive_core::notifications::Notification;
use topolive_core::operations::OperationState;
use topolive_core::view::{ViewSnapshot, ViewState};
use topolive_core::{Input, SessionSnapshot};

use crate::errors::{Result, SessionError};
use crate::runtime::{ClientEvent, Command, RuntimeState};
use crate::widgets::WidgetView;

/// Cloneable front door to a running [`SessionRuntime`](crate::SessionRuntime).
///
/// Machine inputs are fire-and-forget; state queries round-trip through the
/// runtime task and fail with [`SessionError::RuntimeClosed`] once it exits.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
    events: broadcast::Sender<ClientEvent>,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        snapshot: watch::Receiver<SessionSnapshot>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            commands,
            snapshot,
            events,
        }
    }

    fn input(&self, input: Input) -> Result<()> {
        self.commands
            .send(Command::Input(input))
            .map_err(|_| SessionError::RuntimeClosed)
    }

    /// Run `f` on the runtime task and wait for its result.
    pub async fn call<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut RuntimeState) -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Call(Box::new(move |state: &mut RuntimeState| {
                let _ = tx.send(f(state));
            })))
            .map_err(|_| SessionError::RuntimeClosed)?;
        rx.await.map_err(|_| SessionError::RuntimeClosed)
    }

    // ── Session lifecycle ──────────────────────────────────────────────

    /// Boot: probe `/api` once.
    pub fn start(&self) -> Result<()> {
        self.input(Input::Start)
    }

    pub fn login(&self) -> Result<()> {
        self.input(Input::Login)
    }

    pub fn logout(&self) -> Result<()> {
        self.input(Input::Logout)
    }

    /// Report a 401 seen outside the session's own probes.
    pub fn report_unauthorized(&self) -> Result<()> {
        self.input(Input::Unauthorized)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    // ── View ───────────────────────────────────────────────────────────

    pub async fn view(&self) -> Result<ViewSnapshot> {
        self.call(|state| state.view.snapshot()).await
    }

    /// Apply a view transition, e.g. `handle.update_view(|v| v.select_node("n1"))`.
    pub async fn update_view<F>(&self, f: F) -> Result<ViewSnapshot>
    where
        F: FnOnce(&mut ViewState) + Send + 'static,
    {
        self.call(move |state| {
            f(&mut state.view);
            state.view.snapshot()
        })
        .await
    }

    /// Send a highlight request for `expr` and track it until a frame with the
    /// same correlation id arrives. On send failure nothing stays tracked.
    pub async fn request_highlight(&self, expr: impl Into<String>) -> Result<CorrelationId> {
        let expr = expr.into();
        self.call(move |state| {
            let id = CorrelationId::new();
            state.view.begin_highlight(id.clone());
            let frame = Frame::highlight_request(id.clone(), &expr);
            match state.transport.send(frame.to_value()) {
                Ok(()) => {
                    tracing::debug!(correlation_id = %id, %expr, "highlight requested");
                    Ok(id)
                }
                Err(e) => {
                    state.view.discard_highlight(&id);
                    Err(SessionError::from(e))
                }
            }
        })
        .await?
    }

    pub async fn highlight_status(&self, id: CorrelationId) -> Result<OperationState> {
        self.call(move |state| state.view.highlight_status(&id)).await
    }

    /// Drop the record for a finished or abandoned highlight request.
    pub async fn discard_highlight(&self, id: CorrelationId) -> Result<()> {
        self.call(move |state| state.view.discard_highlight(&id)).await
    }

    // ── Widgets ────────────────────────────────────────────────────────

    pub async fn widget(&self, name: impl Into<String>) -> Result<Option<WidgetView>> {
        let name = name.into();
        self.call(move |state| state.widgets.view(&name)).await
    }

    pub async fn toggle_field(
        &self,
        widget: impl Into<String>,
        field: impl Into<String>,
    ) -> Result<bool> {
        let (widget, field) = (widget.into(), field.into());
        self.call(move |state| state.widgets.toggle(&widget, &field)).await
    }

    // ── Notifications ──────────────────────────────────────────────────

    pub async fn notifications(&self) -> Result<Vec<Notification>> {
        self.call(|state| state.notifications.iter().cloned().collect())
            .await
    }

    pub async fn dismiss(&self, id: NotificationId) -> Result<bool> {
        self.call(move |state| state.notifications.remove(id)).await
    }
}
