//! GradeSim Configuration
//!
//! Configuration structures for the gradebook consistency simulator. Every
//! section is optional; a file containing nothing at all yields the classroom
//! defaults (60 s replication lag, 5 s batch interval, port 3000).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `server.port`
pub const PORT_ENV: &str = "PORT";

/// Main GradeSim configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradeSimConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Timing of the simulated consistency models
    #[serde(default)]
    pub consistency: ConsistencyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Demo data configuration
    #[serde(default)]
    pub demo: DemoConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Listening port (overridden by `PORT`)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory of static assets served at `/`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Enable permissive CORS
    #[serde(default)]
    pub cors_enabled: bool,
}

/// Timing constants for the weak and eventual models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyConfig {
    /// Delay before a weak write reaches the replica, in milliseconds
    #[serde(default = "default_replication_delay_ms")]
    pub replication_delay_ms: u64,

    /// Period of the eventual batch recomputation, in milliseconds
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Demo data configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Seed the store with student MHS001
    #[serde(default = "default_true")]
    pub seed: bool,
}

/// Named timing presets matching the two classroom variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Preset {
    /// 15 s replication lag, 5 s batch
    Quick,
    /// 60 s replication lag, 5 s batch
    Classroom,
}

impl Preset {
    /// (replication_delay_ms, batch_interval_ms) for this preset
    pub fn timings(self) -> (u64, u64) {
        match self {
            Preset::Quick => (15_000, 5_000),
            Preset::Classroom => (60_000, 5_000),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_replication_delay_ms() -> u64 {
    60_000
}

fn default_batch_interval_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            static_dir: default_static_dir(),
            cors_enabled: false,
        }
    }
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            replication_delay_ms: default_replication_delay_ms(),
            batch_interval_ms: default_batch_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self { seed: true }
    }
}

impl ConsistencyConfig {
    /// Get replication delay as Duration
    pub fn replication_delay(&self) -> Duration {
        Duration::from_millis(self.replication_delay_ms)
    }

    /// Get batch interval as Duration
    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }
}

impl GradeSimConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: GradeSimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file does not exist
    /// and `required` is false. Applies the `PORT` override afterwards.
    pub fn load(path: &Path, required: bool) -> crate::Result<Self> {
        let mut config = if path.exists() || required {
            Self::from_file(path)?
        } else {
            tracing::debug!("No config file at {:?}, using defaults", path);
            Self::default()
        };
        config.apply_port_override(std::env::var(PORT_ENV).ok().as_deref())?;
        Ok(config)
    }

    /// Override `server.port` from a raw `PORT` value
    pub fn apply_port_override(&mut self, raw: Option<&str>) -> crate::Result<()> {
        if let Some(raw) = raw {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(());
            }
            self.server.port = raw.parse().map_err(|_| {
                crate::Error::Config(format!("{} must be a port number, got {:?}", PORT_ENV, raw))
            })?;
        }
        Ok(())
    }

    /// Apply a timing preset
    pub fn apply_preset(&mut self, preset: Preset) {
        let (delay, interval) = preset.timings();
        self.consistency.replication_delay_ms = delay;
        self.consistency.batch_interval_ms = interval;
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.server.bind_address.is_empty() {
            return Err(crate::Error::Config("server.bind_address cannot be empty".into()));
        }

        if self.consistency.replication_delay_ms == 0 {
            return Err(crate::Error::Config(
                "consistency.replication_delay_ms must be greater than 0".into(),
            ));
        }

        if self.consistency.batch_interval_ms == 0 {
            return Err(crate::Error::Config(
                "consistency.batch_interval_ms must be greater than 0".into(),
            ));
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => {}
            other => {
                return Err(crate::Error::Config(format!(
                    "logging.format must be pretty, compact or json, got {:?}",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Socket address the HTTP server binds to
    pub fn listen_address(&self) -> crate::Result<SocketAddr> {
        format!("{}:{}", self.server.bind_address, self.server.port)
            .parse()
            .map_err(|e| crate::Error::Config(format!("invalid listen address: {}", e)))
    }
}

/// Render a duration the short way the UI labels use it: `500ms`, `15s`, `1m`, `1m30s`.
pub fn format_short(d: Duration) -> String {
    let ms = d.as_millis();
    if ms % 1000 != 0 {
        return format!("{}ms", ms);
    }
    let secs = ms / 1000;
    match (secs / 60, secs % 60) {
        (0, s) => format!("{}s", s),
        (m, 0) => format!("{}m", m),
        (m, s) => format!("{}m{}s", m, s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
bind_address = "127.0.0.1"
port = 8081
static_dir = "web"

[consistency]
replication_delay_ms = 15000
batch_interval_ms = 60000

[logging]
level = "debug"
format = "json"

[demo]
seed = false
"#;

        let config = GradeSimConfig::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.static_dir, PathBuf::from("web"));
        assert_eq!(config.consistency.replication_delay(), Duration::from_secs(15));
        assert_eq!(config.consistency.batch_interval(), Duration::from_secs(60));
        assert!(!config.demo.seed);
        assert_eq!(config.listen_address().unwrap().port(), 8081);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = GradeSimConfig::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.consistency.replication_delay_ms, 60_000);
        assert_eq!(config.consistency.batch_interval_ms, 5_000);
        assert!(config.demo.seed);
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let err = GradeSimConfig::from_str("[consistency]\nreplication_delay_ms = 0\n");
        assert!(matches!(err, Err(crate::Error::Config(_))));

        let err = GradeSimConfig::from_str("[consistency]\nbatch_interval_ms = 0\n");
        assert!(matches!(err, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let err = GradeSimConfig::from_str("[logging]\nformat = \"xml\"\n");
        assert!(matches!(err, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_port_override() {
        let mut config = GradeSimConfig::default();
        config.apply_port_override(Some("8080")).unwrap();
        assert_eq!(config.server.port, 8080);

        config.apply_port_override(None).unwrap();
        assert_eq!(config.server.port, 8080);

        assert!(config.apply_port_override(Some("not-a-port")).is_err());
    }

    #[test]
    fn test_presets() {
        let mut config = GradeSimConfig::default();
        config.apply_preset(Preset::Quick);
        assert_eq!(config.consistency.replication_delay_ms, 15_000);
        assert_eq!(config.consistency.batch_interval_ms, 5_000);
    }

    #[test]
    fn test_load_missing_required_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(GradeSimConfig::load(&path, true).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gradesim.toml");
        std::fs::write(&path, "[consistency]\nbatch_interval_ms = 1000\n").unwrap();
        let config = GradeSimConfig::from_file(&path).unwrap();
        assert_eq!(config.consistency.batch_interval_ms, 1000);
    }

    #[test]
    fn test_format_short() {
        assert_eq!(format_short(Duration::from_secs(15)), "15s");
        assert_eq!(format_short(Duration::from_secs(60)), "1m");
        assert_eq!(format_short(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_short(Duration::from_millis(500)), "500ms");
    }
}
