//! Basic-auth credentials scoped by hostname.
//!
//! # Design
//! A credential either applies to every target (wildcard) or to a single
//! host, optionally pinned to a scheme and a port. Scopes are parsed when the credential is
//! built so a bad hostname fails at configuration time instead of halfway
//! through a traversal. Which credential to send is decided per request by
//! [`AuthCredentials::select`]; applying it on the wire is the transport's job.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

use crate::error::{Result, TraversonError};

/// Where a credential may be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScope {
    Any,
    Host {
        /// Set only when the hostname was given as `scheme://host`.
        scheme: Option<String>,
        host: String,
        port: Option<u16>,
    },
}

impl AuthScope {
    /// Parses `host`, `host:port` or `scheme://host[:port]`.
    pub fn parse(hostname: &str) -> Result<Self> {
        let trimmed = hostname.trim();
        let has_scheme = trimmed.contains("://");
        let candidate = if has_scheme {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };
        let invalid = || {
            TraversonError::InvalidConfiguration(format!("auth hostname `{hostname}` is invalid"))
        };

        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let url = Url::parse(&candidate).map_err(|_| invalid())?;
        let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(invalid)?;
        if url.path() != "/" || url.query().is_some() || !url.username().is_empty() {
            return Err(invalid());
        }

        Ok(AuthScope::Host {
            scheme: has_scheme.then(|| url.scheme().to_string()),
            host: host.to_ascii_lowercase(),
            port: url.port(),
        })
    }

    fn matches(&self, target: &Url) -> bool {
        match self {
            AuthScope::Any => true,
            AuthScope::Host { scheme, host, port } => {
                let scheme_matches = scheme.as_deref().map_or(true, |s| s == target.scheme());
                let host_matches = target
                    .host_str()
                    .is_some_and(|h| h.eq_ignore_ascii_case(host));
                let port_matches = port.is_none() || *port == target.port_or_known_default();
                scheme_matches && host_matches && port_matches
            }
        }
    }

    fn specificity(&self) -> u8 {
        match self {
            AuthScope::Any => 0,
            AuthScope::Host { scheme, port, .. } => {
                1 + u8::from(scheme.is_some()) + 2 * u8::from(port.is_some())
            }
        }
    }
}

/// A username/password pair with its scope.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthCredential {
    username: String,
    password: String,
    scope: AuthScope,
    preemptive: bool,
}

impl AuthCredential {
    /// A credential for any host, sent only when challenged.
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            scope: AuthScope::Any,
            preemptive: false,
        }
    }

    /// Restricts the credential to `hostname`, e.g. `"api.example.com"` or
    /// `"localhost:8089"`.
    pub fn for_host(mut self, hostname: &str) -> Result<Self> {
        self.scope = AuthScope::parse(hostname)?;
        Ok(self)
    }

    /// Send the credential with the first request instead of waiting for a
    /// 401 challenge. Only honoured for host-scoped credentials.
    pub fn preemptive(mut self) -> Self {
        self.preemptive = true;
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn scope(&self) -> &AuthScope {
        &self.scope
    }

    pub fn is_preemptive(&self) -> bool {
        self.preemptive && self.scope != AuthScope::Any
    }

    pub fn applies_to(&self, target: &Url) -> bool {
        self.scope.matches(target)
    }

    /// Value for the `Authorization` header.
    pub fn basic_authorization(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

// Keeps passwords out of logs.
impl std::fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthCredential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("scope", &self.scope)
            .field("preemptive", &self.preemptive)
            .finish()
    }
}

/// All credentials configured on a traversal, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthCredentials {
    credentials: Vec<AuthCredential>,
}

impl AuthCredentials {
    pub fn push(&mut self, credential: AuthCredential) {
        self.credentials.push(credential);
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuthCredential> {
        self.credentials.iter()
    }

    /// The credential to use for `target`: the most specific applicable
    /// scope, and among equally specific scopes the one added last.
    pub fn select(&self, target: &Url) -> Option<&AuthCredential> {
        // max_by_key returns the last of several equal maxima.
        self.credentials
            .iter()
            .filter(|c| c.applies_to(target))
            .max_by_key(|c| c.scope.specificity())
    }
}
