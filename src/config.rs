//! qrtrace runtime configuration handling

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default VirusTotal endpoint for URL submissions
pub const DEFAULT_URLS_ENDPOINT: &str = "https://www.virustotal.com/api/v3/urls";
/// Default VirusTotal endpoint for analysis retrieval
pub const DEFAULT_ANALYSES_ENDPOINT: &str = "https://www.virustotal.com/api/v3/analyses";
/// Default base of the human-facing report page
pub const DEFAULT_REPORT_BASE_URL: &str = "https://www.virustotal.com/gui/url/";

/// Top-level configuration structure persisted to disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QrTraceConfig {
    /// Reputation service access
    pub reputation: ReputationOptions,
    /// WebDriver / browser settings used for evidence screenshots
    pub browser: BrowserOptions,
    /// Where generated artifacts are written
    pub output: OutputOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl QrTraceConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No qrtrace.toml / qrtrace.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["qrtrace.toml", "qrtrace.yaml", "qrtrace.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("qrtrace");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Apply environment variable overrides after file/default loading.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    /// Apply overrides using an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.reputation.apply_overrides(&lookup);
        self.browser.apply_overrides(&lookup);
        self.output.apply_overrides(&lookup);
        self.logging.apply_overrides(&lookup);
    }

    /// API key for the reputation service, or a configuration error.
    pub fn require_api_key(&self) -> Result<&str> {
        self.reputation
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::MissingConfig("problem in finding API key (VT_API_KEY)".into()))
    }

    /// Path to the WebDriver executable, or a configuration error.
    pub fn require_driver_path(&self) -> Result<&Path> {
        self.browser
            .driver_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| {
                Error::MissingConfig("problem in finding Driver Path (CHROME_DRIVER_PATH)".into())
            })
    }
}

/// Reputation service endpoints and credentials
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationOptions {
    /// API key sent as `x-apikey`
    pub api_key: Option<String>,
    /// Submission endpoint (`POST url=<target>`)
    pub urls_endpoint: String,
    /// Analysis endpoint; the submission id is appended as a path segment
    pub analyses_endpoint: String,
    /// Report page base; the analysed URL identifier is appended verbatim
    pub report_base_url: String,
    /// Per-request timeout. `None` keeps the transport default.
    pub timeout_secs: Option<u64>,
}

impl Default for ReputationOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            urls_endpoint: DEFAULT_URLS_ENDPOINT.to_string(),
            analyses_endpoint: DEFAULT_ANALYSES_ENDPOINT.to_string(),
            report_base_url: DEFAULT_REPORT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

impl fmt::Debug for ReputationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReputationOptions")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("urls_endpoint", &self.urls_endpoint)
            .field("analyses_endpoint", &self.analyses_endpoint)
            .field("report_base_url", &self.report_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ReputationOptions {
    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: &F) {
        if let Some(key) = lookup("VT_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(timeout) = lookup("QRTRACE_VT_TIMEOUT") {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.timeout_secs = Some(secs.max(1));
            }
        }
    }

    /// Request timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Browser automation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// Path to the chromedriver executable
    pub driver_path: Option<PathBuf>,
    /// Local port the driver listens on
    pub port: u16,
    /// Run Chrome without a visible window
    pub headless: bool,
    /// Fixed wait after navigation before the screenshot is taken
    pub settle_delay_secs: u64,
    /// How long to wait for the spawned driver to report ready
    pub startup_timeout_secs: u64,
    /// Maximize the browser window after the session starts
    pub maximize: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            driver_path: None,
            port: 9515,
            headless: false,
            settle_delay_secs: 5,
            startup_timeout_secs: 10,
            maximize: true,
        }
    }
}

impl BrowserOptions {
    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: &F) {
        if let Some(path) = lookup("CHROME_DRIVER_PATH") {
            self.driver_path = Some(PathBuf::from(path));
        }
        if let Some(port) = lookup("QRTRACE_DRIVER_PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                self.port = parsed;
            }
        }
        if let Some(headless) = lookup("QRTRACE_HEADLESS") {
            if let Some(flag) = parse_flag(&headless) {
                self.headless = flag;
            }
        }
        if let Some(delay) = lookup("QRTRACE_SETTLE_DELAY") {
            if let Ok(secs) = delay.parse::<u64>() {
                self.settle_delay_secs = secs;
            }
        }
    }

    /// Settle delay as a [`Duration`].
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    /// Base URL of the local WebDriver endpoint.
    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

/// Output directory layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Screenshot directory
    pub images_dir: PathBuf,
    /// Report document directory
    pub docs_dir: PathBuf,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("generated_images"),
            docs_dir: PathBuf::from("generated_docs"),
        }
    }
}

impl OutputOptions {
    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: &F) {
        if let Some(dir) = lookup("QRTRACE_IMAGES_DIR") {
            self.images_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("QRTRACE_DOCS_DIR") {
            self.docs_dir = PathBuf::from(dir);
        }
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `QRTRACE_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in stdout logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: &F) {
        if let Some(level) = lookup("QRTRACE_LOG_LEVEL") {
            self.level = level;
        }
        if let Some(file) = lookup("QRTRACE_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Some(color) = lookup("QRTRACE_LOG_COLOR") {
            if let Some(flag) = parse_flag(&color) {
                self.color = flag;
            }
        }
        if let Some(rotation) = lookup("QRTRACE_LOG_ROTATION") {
            if let Ok(parsed) = rotation.parse::<LogRotation>() {
                self.rotation = Some(parsed);
            }
        }
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl FromStr for LogRotation {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            other => Err(format!(
                "Unsupported log rotation '{other}', expected 'hourly' or 'daily'"
            )),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
