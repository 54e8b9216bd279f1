//! In-memory collaborators for driving a session without a backend.
//!
//! Every mock records what it was asked to do so tests can assert on call
//! counts and payloads afterwards.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use topolive_core::routes::Route;
use topolive_core::{ApiError, CapabilityApi, Navigator, ServiceInfo, Transport, TransportError};

/// Scripted [`CapabilityApi`].
pub struct MockApi {
    service: Mutex<Result<ServiceInfo, ApiError>>,
    topology: Mutex<Result<Value, ApiError>>,
    delay: Mutex<Duration>,
    service_calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl MockApi {
    pub fn new(service: &str, version: &str) -> Self {
        Self {
            service: Mutex::new(Ok(ServiceInfo {
                service: service.to_string(),
                version: version.to_string(),
            })),
            topology: Mutex::new(Ok(Value::Array(Vec::new()))),
            delay: Mutex::new(Duration::ZERO),
            service_calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn set_service_result(&self, result: Result<ServiceInfo, ApiError>) {
        *self.service.lock() = result;
    }

    pub fn set_topology_result(&self, result: Result<Value, ApiError>) {
        *self.topology.lock() = result;
    }

    /// Make every call wait this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn service_calls(&self) -> usize {
        self.service_calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    async fn pause(&self) {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CapabilityApi for MockApi {
    async fn service_info(&self) -> Result<ServiceInfo, ApiError> {
        let _ = self.service_calls.fetch_add(1, Ordering::SeqCst);
        // Snapshot the scripted answer at call time, not at reply time.
        let result = self.service.lock().clone();
        self.pause().await;
        result
    }

    async fn topology_query(&self, query: &str) -> Result<Value, ApiError> {
        self.queries.lock().push(query.to_string());
        let result = self.topology.lock().clone();
        self.pause().await;
        result
    }
}

/// [`Transport`] that records connects and sent frames. Events are injected
/// by the test on the runtime's transport channel.
pub struct MockTransport {
    connects: AtomicUsize,
    sent: Mutex<Vec<Value>>,
    accepting: AtomicBool,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            connects: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            accepting: AtomicBool::new(true),
        }
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().clone()
    }

    /// When false, `send` fails with [`TransportError::NotConnected`].
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }
}

impl Transport for MockTransport {
    fn connect(&self) {
        let _ = self.connects.fetch_add(1, Ordering::SeqCst);
    }

    fn send(&self, frame: Value) -> Result<(), TransportError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().push(frame);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().clone()
    }

    pub fn last(&self) -> Option<Route> {
        self.routes.lock().last().copied()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().push(route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn mock_api_counts_and_scripts() {
        let api = MockApi::new("analyzer", "1.0");
        assert_eq!(api.service_info().await.unwrap().service, "analyzer");
        api.set_service_result(Err(ApiError::Unauthorized));
        assert_matches!(api.service_info().await, Err(ApiError::Unauthorized));
        assert_eq!(api.service_calls(), 2);

        api.set_topology_result(Err(ApiError::from_status(500, String::new())));
        assert!(api.topology_query("G.V()").await.is_err());
        assert_eq!(api.queries(), vec!["G.V()".to_string()]);
    }

    #[test]
    fn mock_transport_records() {
        let transport = MockTransport::new();
        transport.connect();
        transport.send(serde_json::json!({"a": 1})).unwrap();
        transport.set_accepting(false);
        assert_eq!(
            transport.send(serde_json::json!({})),
            Err(TransportError::NotConnected)
        );
        assert_eq!(transport.connects(), 1);
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn navigator_records_routes() {
        let nav = RecordingNavigator::new();
        nav.navigate(Route::Login);
        nav.navigate(Route::Topology);
        assert_eq!(nav.routes(), vec![Route::Login, Route::Topology]);
        assert_eq!(nav.last(), Some(Route::Topology));
    }
}
