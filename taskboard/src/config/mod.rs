//! Configuration system for the `taskboard` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskboard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::channel::ws::WsChannelOptions;
use crate::history::DEFAULT_HISTORY_CAPACITY;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A server URL is malformed or uses an unsupported scheme.
    #[error("invalid server url {url}: {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// What is wrong with it.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerFileConfig,
    session: SessionFileConfig,
    network: NetworkFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    url: Option<String>,
    ws_url: Option<String>,
}

/// `[session]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    client_id: Option<String>,
    undo_log_path: Option<PathBuf>,
    history_capacity: Option<usize>,
}

/// `[network]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct NetworkFileConfig {
    connect_timeout_secs: Option<u64>,
    channel_capacity: Option<usize>,
    max_frame_size: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Default persistence API location.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:4000";

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the persistence HTTP API.
    pub server_url: String,
    /// WebSocket URL of the broadcast relay.
    pub ws_url: String,
    /// Session identifier embedded in origin tags.
    pub client_id: String,
    /// Where the undo log is kept between sessions.
    pub undo_log_path: PathBuf,
    /// Actions retained per project and stack.
    pub history_capacity: usize,
    /// Timeout for the WebSocket handshake.
    pub connect_timeout: Duration,
    /// Capacity of the inbound event queue.
    pub channel_capacity: usize,
    /// Largest channel frame accepted or sent.
    pub max_frame_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            ws_url: "ws://127.0.0.1:4000/ws".to_string(),
            client_id: new_client_id(),
            undo_log_path: default_undo_log_path(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            connect_timeout: Duration::from_secs(10),
            channel_capacity: 256,
            max_frame_size: taskboard_proto::codec::DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. Otherwise the default path is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// or a server URL is invalid.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. Without an explicit WebSocket URL it
    /// is derived from the server URL.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let server_url = cli
            .server_url
            .clone()
            .or_else(|| file.server.url.clone())
            .unwrap_or(defaults.server_url);
        let ws_url = match cli.ws_url.clone().or_else(|| file.server.ws_url.clone()) {
            Some(url) => url,
            None => derive_ws_url(&server_url)?,
        };

        Ok(Self {
            server_url,
            ws_url,
            client_id: cli
                .client_id
                .clone()
                .or_else(|| file.session.client_id.clone())
                .unwrap_or(defaults.client_id),
            undo_log_path: cli
                .undo_log
                .clone()
                .or_else(|| file.session.undo_log_path.clone())
                .unwrap_or(defaults.undo_log_path),
            history_capacity: cli
                .history_capacity
                .or(file.session.history_capacity)
                .unwrap_or(defaults.history_capacity),
            connect_timeout: file
                .network
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            channel_capacity: file
                .network
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
            max_frame_size: file
                .network
                .max_frame_size
                .unwrap_or(defaults.max_frame_size),
        })
    }

    /// Connection settings for the WebSocket broadcast channel.
    #[must_use]
    pub fn ws_options(&self) -> WsChannelOptions {
        WsChannelOptions {
            connect_timeout: self.connect_timeout,
            buffer: self.channel_capacity,
            max_frame_size: self.max_frame_size,
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Collaborative task board with undo and redo")]
pub struct CliArgs {
    /// Base URL of the task board server.
    #[arg(long, env = "TASKBOARD_SERVER")]
    pub server_url: Option<String>,

    /// WebSocket URL of the broadcast relay (default: derived from the server URL).
    #[arg(long, env = "TASKBOARD_WS_URL")]
    pub ws_url: Option<String>,

    /// Session identifier (default: a fresh UUID per run).
    #[arg(long)]
    pub client_id: Option<String>,

    /// Path of the undo log file.
    #[arg(long)]
    pub undo_log: Option<PathBuf>,

    /// Actions kept per project for undo and redo.
    #[arg(long)]
    pub history_capacity: Option<usize>,

    /// Project to open on start.
    #[arg(short, long)]
    pub project: Option<String>,

    /// Path to config file (default: `~/.config/taskboard/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKBOARD_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskboard.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn new_client_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

fn default_undo_log_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("taskboard")
        .join("undo-log.json")
}

/// Maps `http(s)://host:port/...` to `ws(s)://host:port/ws`.
fn derive_ws_url(server_url: &str) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidUrl {
        url: server_url.to_string(),
        reason: reason.to_string(),
    };
    let mut url = Url::parse(server_url).map_err(|e| invalid(&e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(invalid("expected an http, https, ws or wss url")),
    };
    url.set_scheme(scheme)
        .map_err(|()| invalid("cannot switch to a websocket scheme"))?;
    url.set_path("/ws");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskboard").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
