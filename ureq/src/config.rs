use std::time::Duration;

/// Settings for the underlying `ureq` agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Upper bound for a whole call, including redirects. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Sent as `User-Agent` unless the request sets its own.
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            user_agent: Some(concat!("traverson-ureq/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}
