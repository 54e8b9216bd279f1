use serde::Serialize;

/// Connection and authentication state of one dashboard session.
///
/// Fields are only changed through the named transitions below; observers get
/// a [`SessionSnapshot`].
#[derive(Debug, Default)]
pub struct Session {
    connected: Option<bool>,
    authenticated: Option<bool>,
    service_name: Option<String>,
    service_version: Option<String>,
    history_capable: Option<bool>,
    polling_active: bool,
    reconnect_pending: bool,
    epoch: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub connected: Option<bool>,
    pub authenticated: Option<bool>,
    pub service_name: Option<String>,
    pub service_version: Option<String>,
    pub history_capable: Option<bool>,
    pub polling_active: bool,
    pub reconnect_pending: bool,
    pub epoch: u64,
}

/// Upper-cases the first character, leaving the rest alone.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(&self) -> Option<bool> {
        self.connected
    }

    pub fn authenticated(&self) -> Option<bool> {
        self.authenticated
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated == Some(true)
    }

    pub fn is_connected(&self) -> bool {
        self.connected == Some(true)
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    pub fn service_version(&self) -> Option<&str> {
        self.service_version.as_deref()
    }

    pub fn history_capable(&self) -> Option<bool> {
        self.history_capable
    }

    pub fn polling_active(&self) -> bool {
        self.polling_active
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True when a result launched at `epoch` may still be applied.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    pub fn mark_connected(&mut self) {
        self.connected = Some(true);
    }

    /// Returns whether the session was connected before.
    pub fn mark_disconnected(&mut self) -> bool {
        let was = self.is_connected();
        self.connected = Some(false);
        was
    }

    /// Enter the authenticated state. Returns false (and changes nothing)
    /// when already authenticated.
    pub fn authenticate(&mut self) -> bool {
        if self.is_authenticated() {
            return false;
        }
        self.authenticated = Some(true);
        self.history_capable = None;
        // A timer from the previous epoch will arrive stale and never clear it.
        self.reconnect_pending = false;
        self.epoch += 1;
        true
    }

    /// Leave the authenticated state. Returns false when already logged out.
    pub fn deauthenticate(&mut self) -> bool {
        if self.authenticated == Some(false) {
            return false;
        }
        self.authenticated = Some(false);
        self.reconnect_pending = false;
        self.epoch += 1;
        true
    }

    /// Store the capitalised service name. Returns whether it changed.
    pub fn set_service_name(&mut self, raw: &str) -> bool {
        let name = capitalize(raw);
        if self.service_name.as_deref() == Some(name.as_str()) {
            return false;
        }
        self.service_name = Some(name);
        true
    }

    pub fn set_service_version(&mut self, version: &str) -> bool {
        if self.service_version.as_deref() == Some(version) {
            return false;
        }
        self.service_version = Some(version.to_string());
        true
    }

    pub fn set_history_capable(&mut self, supported: bool) {
        self.history_capable = Some(supported);
    }

    pub fn set_polling(&mut self, active: bool) {
        self.polling_active = active;
    }

    pub fn set_reconnect_pending(&mut self, pending: bool) {
        self.reconnect_pending = pending;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connected: self.connected,
            authenticated: self.authenticated,
            service_name: self.service_name.clone(),
            service_version: self.service_version.clone(),
            history_capable: self.history_capable,
            polling_active: self.polling_active,
            reconnect_pending: self.reconnect_pending,
            epoch: self.epoch,
        }
    }
}
