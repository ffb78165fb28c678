//! Gateway configuration with validation.
//!
//! Loaded from TOML; every section falls back to its defaults.

use super::fork_schedule::{ForkSchedule, ForkScheduleError};
use super::types::{Epoch, FAR_FUTURE_EPOCH};
use super::version::ForkVersion;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Public HTTP server
    pub http: HttpConfig,
    /// Admin server (health and metrics)
    pub admin: AdminConfig,
    /// Internal RPC gateway the requests are forwarded to
    pub upstream: UpstreamConfig,
    /// Chain parameters and fork schedule
    pub chain: ChainConfig,
    /// CORS configuration
    pub cors: CorsConfig,
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.enabled && self.admin.enabled && self.http.port == self.admin.port {
            return Err(ConfigError::DuplicatePorts);
        }

        if self.http.max_body_size == 0 {
            return Err(ConfigError::Invalid("max_body_size cannot be 0".into()));
        }

        if self.chain.slots_per_historical_root == 0 {
            return Err(ConfigError::Invalid(
                "slots_per_historical_root cannot be 0".into(),
            ));
        }

        reqwest::Url::parse(&self.upstream.url)
            .map_err(|e| ConfigError::InvalidUpstream(format!("{}: {}", self.upstream.url, e)))?;

        self.chain.fork_schedule()?;

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Get Admin server bind address
    pub fn admin_addr(&self) -> SocketAddr {
        SocketAddr::new(self.admin.host, self.admin.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 3501)
    pub port: u16,
    /// Enable HTTP server
    pub enabled: bool,
    /// Largest request body accepted, in bytes (SSZ blocks included)
    pub max_body_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 3501,
            enabled: true,
            max_body_size: 16 * 1024 * 1024,
        }
    }
}

/// Admin server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Bind address (localhost only by default)
    pub host: IpAddr,
    /// Port (default: 8080)
    pub port: u16,
    /// Enable admin server
    pub enabled: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            enabled: true,
        }
    }
}

/// Upstream (internal RPC gateway) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL, e.g. `http://127.0.0.1:3500`
    pub url: String,
    /// Connection establishment timeout. Requests themselves never time out.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3500".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Chain parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Slots per epoch (default: 32)
    pub slots_per_epoch: u64,
    /// Length of the state root history kept in a state (default: 8192)
    pub slots_per_historical_root: u64,
    /// Fork activation epochs
    pub fork_schedule: ForkScheduleConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            slots_per_epoch: 32,
            slots_per_historical_root: 8192,
            fork_schedule: ForkScheduleConfig::default(),
        }
    }
}

impl ChainConfig {
    /// Build the process-wide fork schedule.
    pub fn fork_schedule(&self) -> Result<ForkSchedule, ConfigError> {
        let fs = &self.fork_schedule;
        ForkSchedule::new(
            self.slots_per_epoch,
            vec![
                (0, ForkVersion::Phase0),
                (fs.altair_epoch, ForkVersion::Altair),
                (fs.bellatrix_epoch, ForkVersion::Bellatrix),
                (fs.capella_epoch, ForkVersion::Capella),
                (fs.deneb_epoch, ForkVersion::Deneb),
            ],
        )
        .map_err(ConfigError::from)
    }
}

/// Fork activation epochs. Phase0 is always epoch 0; omitted forks are
/// never activated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkScheduleConfig {
    pub altair_epoch: Epoch,
    pub bellatrix_epoch: Epoch,
    pub capella_epoch: Epoch,
    pub deneb_epoch: Epoch,
}

impl Default for ForkScheduleConfig {
    fn default() -> Self {
        Self {
            altair_epoch: FAR_FUTURE_EPOCH,
            bellatrix_epoch: FAR_FUTURE_EPOCH,
            capella_epoch: FAR_FUTURE_EPOCH,
            deneb_epoch: FAR_FUTURE_EPOCH,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Expose headers
    pub expose_headers: Vec<String>,
    /// Max age for preflight cache
    pub max_age: u64,
    /// Allow credentials
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec![
                "Content-Type".to_string(),
                "Accept".to_string(),
                "Eth-Consensus-Version".to_string(),
            ],
            expose_headers: vec![
                "Eth-Consensus-Version".to_string(),
                "Content-Disposition".to_string(),
            ],
            max_age: 86400, // 24 hours
            allow_credentials: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("could not read {path}: {error}")]
    Io { path: String, error: String },
    /// TOML syntax or type error
    #[error("could not parse config: {0}")]
    Parse(String),
    /// HTTP and admin servers on the same port
    #[error("duplicate ports configured")]
    DuplicatePorts,
    /// Upstream URL is not a valid URL
    #[error("invalid upstream url: {0}")]
    InvalidUpstream(String),
    /// Fork schedule rejected
    #[error("invalid fork schedule: {0}")]
    ForkSchedule(#[from] ForkScheduleError),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() != 0 {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        } else {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be checked before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map_err(|_| "invalid minutes")?
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or("minutes out of range")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http.port, 3501);
        assert_eq!(config.admin.port, 8080);
        assert_eq!(config.chain.slots_per_epoch, 32);
        assert_eq!(config.chain.slots_per_historical_root, 8192);
    }

    #[test]
    fn test_duplicate_ports() {
        let mut config = GatewayConfig::default();
        config.admin.port = config.http.port;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicatePorts)
        ));
    }

    #[test]
    fn test_parse_toml() {
        let config = GatewayConfig::parse(
            r#"
            [http]
            port = 5052

            [upstream]
            url = "http://10.0.0.2:3500"
            connect_timeout = "500ms"

            [chain]
            slots_per_epoch = 8

            [chain.fork_schedule]
            altair_epoch = 1
            bellatrix_epoch = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.http.port, 5052);
        assert_eq!(config.upstream.connect_timeout, Duration::from_millis(500));
        assert!(config.validate().is_ok());

        let schedule = config.chain.fork_schedule().unwrap();
        assert_eq!(schedule.version_for_slot(8), ForkVersion::Altair);
        assert_eq!(schedule.version_for_slot(16), ForkVersion::Bellatrix);
        assert_eq!(schedule.version_for_slot(u64::MAX), ForkVersion::Bellatrix);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(&path, "[admin]\nenabled = false\n").unwrap();
        let config = GatewayConfig::load(&path).unwrap();
        assert!(!config.admin.enabled);

        let missing = GatewayConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            GatewayConfig::parse("[http]\nport = \"nope\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_chain_values() {
        let mut config = GatewayConfig::default();
        config.chain.slots_per_epoch = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ForkSchedule(ForkScheduleError::ZeroSlotsPerEpoch))
        ));

        let mut config = GatewayConfig::default();
        config.chain.slots_per_historical_root = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = GatewayConfig::default();
        config.chain.fork_schedule.altair_epoch = 10;
        config.chain.fork_schedule.bellatrix_epoch = 5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ForkSchedule(ForkScheduleError::NotMonotonic { .. }))
        ));
    }

    #[test]
    fn test_invalid_upstream_url() {
        let mut config = GatewayConfig::default();
        config.upstream.url = "not a url".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUpstream(_))
        ));
    }

    #[test]
    fn test_duration_notation() {
        use humantime_serde::parse_duration;
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_minutes_overflow_rejected() {
        use humantime_serde::parse_duration;
        let too_many = format!("{}m", u64::MAX / 60 + 1);
        assert_eq!(parse_duration(&too_many), Err("minutes out of range"));

        let toml = format!("[upstream]\nconnect_timeout = \"{}\"\n", too_many);
        assert!(matches!(
            GatewayConfig::parse(&toml),
            Err(ConfigError::Parse(_))
        ));
    }
}
