use std::time::Duration;

/// Tuning knobs for a gateway link
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Period between heartbeat requests
    pub heartbeat_interval: Duration,
    /// How long to wait for a heartbeat ack before counting it missed
    pub heartbeat_ack_timeout: Duration,
    /// Consecutive missed acks tolerated before the link is declared dead
    pub missed_ack_budget: u32,
    /// Period between dirty-set flushes driven by the client handle
    pub flush_interval: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(2),
            heartbeat_ack_timeout: Duration::from_secs(4),
            missed_ack_budget: 3,
            flush_interval: Duration::from_millis(33),
        }
    }
}

/// Connection material resolved out-of-band by the session-provisioning
/// layer. The broker channel refuses to connect until both the gateway
/// address and the session key are present.
#[derive(Debug, Clone, Default)]
pub struct SessionInfo {
    pub gateway_address: Option<String>,
    pub broker_address: Option<String>,
    pub session_key: Option<String>,
    /// Free-form client metadata sent with the authentication request
    pub client_name: String,
}

impl SessionInfo {
    /// A session is joinable once the gateway address and session key have
    /// been resolved.
    pub fn is_joinable(&self) -> bool {
        self.gateway_address.is_some() && self.session_key.is_some()
    }
}
