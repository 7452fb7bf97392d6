//! Client configuration and the builder that validates it.

use std::time::Duration;

use desmoche_intent::IntentConfig;
use desmoche_protocol::TagField;
use desmoche_session::CardFormat;
use rand::Rng;
use url::Url;

use crate::ClientError;

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

/// Which URL path the server expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    /// `/game/<session>/<player>`
    #[default]
    Game,
    /// `/ws/<session>/<player>`, used by older server builds.
    Legacy,
}

impl Route {
    fn prefix(self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Legacy => "ws",
        }
    }
}

// ---------------------------------------------------------------------------
// ReconnectPolicy
// ---------------------------------------------------------------------------

/// How the connection retries after it drops.
///
/// The n-th retry waits `n × base_delay`, plus up to `jitter` of random
/// extra delay. After `max_attempts` failed retries in a row the connection
/// gives up for good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Default: 1 second.
    pub base_delay: Duration,
    /// Default: 5.
    pub max_attempts: u32,
    /// Upper bound of random delay added to each retry. Default: zero.
    pub jitter: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
            jitter: Duration::ZERO,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (starting at 1).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.saturating_mul(attempt);
        if self.jitter.is_zero() {
            return base;
        }
        let max_us = u64::try_from(self.jitter.as_micros()).unwrap_or(u64::MAX);
        let extra = rand::rng().random_range(0..=max_us);
        base.saturating_add(Duration::from_micros(extra))
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Everything a [`GameClient`](crate::GameClient) needs to join a session.
///
/// Build one with [`ClientConfig::builder`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host[:port]` of the game server. Default: `localhost:8080`.
    pub host: String,
    /// Use `wss://` instead of `ws://`.
    pub secure: bool,
    pub route: Route,
    pub session_id: String,
    /// The local player's name.
    pub identity: String,
    /// Wire form for outbound card descriptors.
    pub card_format: CardFormat,
    /// Key outbound commands are tagged under.
    pub tag_field: TagField,
    /// `None` disables reconnection.
    pub reconnect: Option<ReconnectPolicy>,
    pub intent: IntentConfig,
}

impl ClientConfig {
    /// Starts a builder for joining `session_id` as `identity`.
    pub fn builder(
        session_id: impl Into<String>,
        identity: impl Into<String>,
    ) -> ClientConfigBuilder {
        ClientConfigBuilder::new(session_id, identity)
    }

    /// The WebSocket URL to dial. Session id and player name are
    /// percent-encoded as path segments.
    ///
    /// ```rust
    /// use desmoche::ClientConfig;
    ///
    /// let config = ClientConfig::builder("42", "Alice").build().unwrap();
    /// let url = config.endpoint().unwrap();
    /// assert_eq!(url.as_str(), "ws://localhost:8080/game/42/Alice");
    /// ```
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] if `host` isn't a bare `host[:port]`.
    pub fn endpoint(&self) -> Result<Url, ClientError> {
        let scheme = if self.secure { "wss" } else { "ws" };
        let invalid_host =
            |reason: String| ClientError::Config(format!("host `{}`: {reason}", self.host));

        let mut url = Url::parse(&format!("{scheme}://{}", self.host))
            .map_err(|e| invalid_host(e.to_string()))?;
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(invalid_host("must be host[:port]".into()));
        }
        url.path_segments_mut()
            .map_err(|()| invalid_host("cannot carry a path".into()))?
            .clear()
            .extend([self.route.prefix(), self.session_id.as_str(), self.identity.as_str()]);
        Ok(url)
    }
}

/// Builder for [`ClientConfig`].
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Creates a builder with default settings.
    pub fn new(session_id: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                host: "localhost:8080".to_string(),
                secure: false,
                route: Route::default(),
                session_id: session_id.into(),
                identity: identity.into(),
                card_format: CardFormat::default(),
                tag_field: TagField::default(),
                reconnect: Some(ReconnectPolicy::default()),
                intent: IntentConfig::default(),
            },
        }
    }

    /// Sets the server's `host[:port]`.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.config.secure = secure;
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.config.route = route;
        self
    }

    pub fn card_format(mut self, format: CardFormat) -> Self {
        self.config.card_format = format;
        self
    }

    pub fn tag_field(mut self, field: TagField) -> Self {
        self.config.tag_field = field;
        self
    }

    /// Sets the reconnect policy. `None` disables reconnection.
    pub fn reconnect(mut self, policy: Option<ReconnectPolicy>) -> Self {
        self.config.reconnect = policy;
        self
    }

    pub fn intent(mut self, intent: IntentConfig) -> Self {
        self.config.intent = intent;
        self
    }

    /// Validates and returns the config.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] if the session id, identity, or host
    /// is empty, or the host contains a path or scheme.
    pub fn build(mut self) -> Result<ClientConfig, ClientError> {
        let c = &mut self.config;
        c.session_id = c.session_id.trim().to_string();
        c.identity = c.identity.trim().to_string();
        c.host = c.host.trim().to_string();

        if c.session_id.is_empty() {
            return Err(ClientError::Config("session id is empty".into()));
        }
        if c.identity.is_empty() {
            return Err(ClientError::Config("player name is empty".into()));
        }
        if c.reconnect.as_ref().is_some_and(|p| p.max_attempts == 0) {
            tracing::warn!("reconnect max_attempts is 0, disabling reconnection");
            c.reconnect = None;
        }
        if let Some(policy) = &mut c.reconnect {
            if policy.base_delay.is_zero() {
                tracing::warn!("reconnect base_delay is 0, using default");
                policy.base_delay = ReconnectPolicy::default().base_delay;
            }
        }
        c.intent = c.intent.clone().validated();
        self.config.endpoint()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_routes_and_scheme() {
        let config = ClientConfig::builder("42", "Alice")
            .host("cards.example.com")
            .secure(true)
            .route(Route::Legacy)
            .build()
            .unwrap();
        assert_eq!(
            config.endpoint().unwrap().as_str(),
            "wss://cards.example.com/ws/42/Alice"
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let config = ClientConfig::builder("table 1", "Zoë/2").build().unwrap();
        assert_eq!(
            config.endpoint().unwrap().as_str(),
            "ws://localhost:8080/game/table%201/Zo%C3%AB%2F2"
        );
    }

    #[test]
    fn test_build_rejects_empty_names() {
        assert!(matches!(
            ClientConfig::builder("", "Alice").build(),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::builder("42", "   ").build(),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::builder("42", "Alice").host("ws://x/y").build(),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_build_rejects_host_with_path_or_query() {
        for host in ["", "cards.example.com/lobby", "cards.example.com?x=1", "bad host"] {
            assert!(
                matches!(
                    ClientConfig::builder("42", "Alice").host(host).build(),
                    Err(ClientError::Config(_))
                ),
                "host {host:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_endpoint_rechecks_mutated_host() {
        let mut config = ClientConfig::builder("42", "Alice").build().unwrap();
        config.host = "example.com/x".into();
        assert!(matches!(config.endpoint(), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_zero_attempts_disables_reconnect() {
        let config = ClientConfig::builder("42", "Alice")
            .reconnect(Some(ReconnectPolicy {
                max_attempts: 0,
                ..ReconnectPolicy::default()
            }))
            .build()
            .unwrap();
        assert_eq!(config.reconnect, None);
    }

    #[test]
    fn test_delay_grows_linearly_with_attempt() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(250),
            ..ReconnectPolicy::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for(4), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_secs(1),
            max_attempts: 3,
            jitter: Duration::from_millis(100),
        };
        for _ in 0..50 {
            let delay = policy.delay_for(2);
            assert!(delay >= Duration::from_secs(2));
            assert!(delay <= Duration::from_millis(2_100));
        }
    }
}
