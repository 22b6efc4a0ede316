use connect_wallet_core::PollPolicy;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_APP_NAME: &str = "connect-wallet";
pub const DEFAULT_TX_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_TX_POLL_MAX_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_PROXY_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeProfile {
    #[default]
    Development,
    Production,
}

impl RuntimeProfile {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::Invalid {
                key: "CONNECT_WALLET_RUNTIME_PROFILE",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectAdapterConfig {
    pub app_name: String,
    pub runtime_profile: RuntimeProfile,
    pub tx_poll_interval_ms: u64,
    pub tx_poll_max_attempts: Option<u32>,
    pub tx_poll_backoff: f64,
    pub tx_poll_max_interval_ms: u64,
    /// JSON-RPC endpoint standing in for an injected wallet on native hosts.
    pub wallet_proxy_url: Option<String>,
    pub wallet_proxy_timeout_ms: u64,
    /// Marker flags the proxied wallet claims, e.g. `isMetaMask`.
    pub wallet_proxy_flags: Vec<String>,
}

impl Default for ConnectAdapterConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_owned(),
            runtime_profile: RuntimeProfile::Development,
            tx_poll_interval_ms: DEFAULT_TX_POLL_INTERVAL_MS,
            tx_poll_max_attempts: None,
            tx_poll_backoff: 1.0,
            tx_poll_max_interval_ms: DEFAULT_TX_POLL_MAX_INTERVAL_MS,
            wallet_proxy_url: None,
            wallet_proxy_timeout_ms: DEFAULT_PROXY_TIMEOUT_MS,
            wallet_proxy_flags: vec!["isMetaMask".to_owned()],
        }
    }
}

impl ConnectAdapterConfig {
    /// Reads `CONNECT_WALLET_*` variables over the defaults. An invalid value is logged and
    /// the whole environment is ignored.
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring connect-wallet environment configuration");
            Self::default()
        })
    }

    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`try_from_env`](Self::try_from_env) over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = lookup("CONNECT_WALLET_APP_NAME") {
            config.app_name = v;
        }
        if let Some(v) = lookup("CONNECT_WALLET_RUNTIME_PROFILE") {
            config.runtime_profile = RuntimeProfile::parse(&v)?;
        }
        if let Some(v) = lookup("CONNECT_WALLET_TX_POLL_INTERVAL_MS") {
            config.tx_poll_interval_ms = parse_number("CONNECT_WALLET_TX_POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("CONNECT_WALLET_TX_POLL_MAX_ATTEMPTS") {
            config.tx_poll_max_attempts =
                Some(parse_number("CONNECT_WALLET_TX_POLL_MAX_ATTEMPTS", &v)?);
        }
        if let Some(v) = lookup("CONNECT_WALLET_TX_POLL_BACKOFF") {
            config.tx_poll_backoff = parse_number("CONNECT_WALLET_TX_POLL_BACKOFF", &v)?;
        }
        if let Some(v) = lookup("CONNECT_WALLET_PROXY_URL") {
            config.wallet_proxy_url = Some(v).filter(|url| !url.trim().is_empty());
        }
        if let Some(v) = lookup("CONNECT_WALLET_PROXY_TIMEOUT_MS") {
            config.wallet_proxy_timeout_ms = parse_number("CONNECT_WALLET_PROXY_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("CONNECT_WALLET_PROXY_FLAGS") {
            config.wallet_proxy_flags = v
                .split(',')
                .map(str::trim)
                .filter(|flag| !flag.is_empty())
                .map(str::to_owned)
                .collect();
        }
        Ok(config)
    }

    /// Production refuses the deterministic in-memory wallet.
    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }

    pub fn poll_policy(&self) -> PollPolicy {
        let mut policy = PollPolicy {
            interval_ms: self.tx_poll_interval_ms,
            ..PollPolicy::default()
        }
        .with_backoff(self.tx_poll_backoff, self.tx_poll_max_interval_ms);
        if let Some(max) = self.tx_poll_max_attempts {
            policy = policy.with_max_attempts(max);
        }
        policy
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_owned(),
    })
}
