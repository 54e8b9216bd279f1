//! Async session runtime for a topology dashboard client.
//!
//! [`SessionRuntime`] drives the pure [`topolive_core::SessionMachine`]:
//! it executes effects (probes, reconnect timer, polling, navigation,
//! notifications), feeds metric frames to per-widget field engines, and
//! tracks highlight requests. Callers talk to it through a [`SessionHandle`].

pub mod errors;
pub mod handle;
pub mod runtime;
pub mod widgets;

pub use errors::{Result, SessionError};
pub use handle::SessionHandle;
pub use runtime::{ClientEvent, RuntimeConfig, RuntimeState, SessionRuntime};
pub use widgets::{WidgetRegistry, WidgetView};
