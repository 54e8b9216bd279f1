//! Traits for the collaborators the session drives but does not own:
//! the duplex transport, the backend HTTP endpoints and the router.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ApiError, TransportError};
use crate::routes::Route;

/// Identity reported by `GET /api`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "Version")]
    pub version: String,
}

/// Events raised by a [`Transport`] implementation.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Error(String),
    Message(Value),
}

/// Duplex channel to the analyzer. Events are reported on the channel handed
/// to the implementation at construction, never returned from these calls.
pub trait Transport: Send + Sync {
    /// Start a connection attempt. Must not block and must not start a second
    /// attempt while one is in flight or the channel is open.
    fn connect(&self);

    fn send(&self, frame: Value) -> Result<(), TransportError>;
}

#[async_trait]
pub trait CapabilityApi: Send + Sync {
    async fn service_info(&self) -> Result<ServiceInfo, ApiError>;

    /// Run a topology query. Only success or failure matters to the session.
    async fn topology_query(&self, query: &str) -> Result<Value, ApiError>;
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}
