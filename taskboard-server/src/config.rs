//! Server configuration: where to listen, where the board database lives,
//! and how much of the event log to keep.
//!
//! Each source yields a [`ConfigLayer`] of optional values. Layers are
//! stacked CLI (including environment variables) over the TOML file over
//! compiled defaults. A relative `storage.db_path` in the file is taken
//! relative to the file's own directory, so a config file and its database
//! can move together.
//!
//! ```toml
//! [listen]
//! addr = "127.0.0.1:4000"
//! max_frame_size = 65536
//!
//! [storage]
//! db_path = "board.db"
//! max_event_log = 10000
//!
//! [log]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use taskboard_proto::codec::DEFAULT_MAX_FRAME_SIZE;

use crate::store::DEFAULT_MAX_EVENT_LOG;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4000";

/// Errors that can occur when loading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read {path}: {source}")]
    ReadFile {
        /// File that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("invalid config file {path}: {source}")]
    ParseToml {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser error with location.
        source: toml::de::Error,
    },

    /// A size limit was set to zero.
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

/// On-disk file layout.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    listen: ListenSection,
    storage: StorageSection,
    log: LogSection,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ListenSection {
    addr: Option<String>,
    max_frame_size: Option<usize>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StorageSection {
    db_path: Option<PathBuf>,
    max_event_log: Option<usize>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LogSection {
    level: Option<String>,
}

/// CLI arguments for the server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Taskboard persistence service and broadcast relay")]
pub struct ServerCliArgs {
    /// Address to listen on.
    #[arg(short, long, env = "TASKBOARD_ADDR")]
    pub bind: Option<String>,

    /// SQLite database file holding projects, tasks and the event log.
    #[arg(long, env = "TASKBOARD_DB")]
    pub db_path: Option<PathBuf>,

    /// Config file (default: `<config dir>/taskboard-server/config.toml`).
    #[arg(short, long, env = "TASKBOARD_SERVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Largest accepted channel frame in bytes.
    #[arg(long)]
    pub max_frame_size: Option<usize>,

    /// Task events kept before the oldest are evicted.
    #[arg(long)]
    pub max_event_log: Option<usize>,

    /// Log filter (trace, debug, info, warn, error).
    #[arg(long, env = "TASKBOARD_SERVER_LOG")]
    pub log_level: Option<String>,
}

/// One source of settings. Unset fields fall through to the layer below.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    /// Listen address.
    pub bind_addr: Option<String>,
    /// Database file.
    pub db_path: Option<PathBuf>,
    /// Frame size limit.
    pub max_frame_size: Option<usize>,
    /// Event log cap.
    pub max_event_log: Option<usize>,
    /// Log filter.
    pub log_level: Option<String>,
}

impl ConfigLayer {
    /// Fills every unset field of `self` from `lower`.
    #[must_use]
    pub fn over(self, lower: Self) -> Self {
        Self {
            bind_addr: self.bind_addr.or(lower.bind_addr),
            db_path: self.db_path.or(lower.db_path),
            max_frame_size: self.max_frame_size.or(lower.max_frame_size),
            max_event_log: self.max_event_log.or(lower.max_event_log),
            log_level: self.log_level.or(lower.log_level),
        }
    }
}

impl From<&ServerCliArgs> for ConfigLayer {
    fn from(cli: &ServerCliArgs) -> Self {
        Self {
            bind_addr: cli.bind.clone(),
            db_path: cli.db_path.clone(),
            max_frame_size: cli.max_frame_size,
            max_event_log: cli.max_event_log,
            log_level: cli.log_level.clone(),
        }
    }
}

impl ConfigFile {
    /// Flattens the sections. `base` anchors a relative database path.
    fn into_layer(self, base: Option<&Path>) -> ConfigLayer {
        let db_path = self.storage.db_path.map(|p| match base {
            Some(dir) if p.is_relative() => dir.join(p),
            _ => p,
        });
        ConfigLayer {
            bind_addr: self.listen.addr,
            db_path,
            max_frame_size: self.listen.max_frame_size,
            max_event_log: self.storage.max_event_log,
            log_level: self.log.level,
        }
    }
}

/// Fully resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on (e.g., `0.0.0.0:4000`).
    pub bind_addr: String,
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Largest accepted channel frame in bytes.
    pub max_frame_size: usize,
    /// Task events kept before eviction.
    pub max_event_log: usize,
    /// Log filter string.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            db_path: default_db_path(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_event_log: DEFAULT_MAX_EVENT_LOG,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads the config file named by `--config` (or the default location)
    /// and stacks the CLI on top of it.
    ///
    /// A missing file at the default location counts as empty. A missing
    /// file named explicitly is an error.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the file cannot be read or parsed, or a limit is 0.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => read_layer(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => read_layer(&path)?,
                _ => ConfigLayer::default(),
            },
        };
        Self::from_layer(ConfigLayer::from(cli).over(file))
    }

    /// Applies compiled defaults to whatever `layer` leaves unset.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroLimit`] if either size limit is 0.
    pub fn from_layer(layer: ConfigLayer) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            bind_addr: layer.bind_addr.unwrap_or(defaults.bind_addr),
            db_path: layer.db_path.unwrap_or(defaults.db_path),
            max_frame_size: layer.max_frame_size.unwrap_or(defaults.max_frame_size),
            max_event_log: layer.max_event_log.unwrap_or(defaults.max_event_log),
            log_level: layer.log_level.unwrap_or(defaults.log_level),
        };
        if config.max_frame_size == 0 {
            return Err(ConfigError::ZeroLimit("max_frame_size"));
        }
        if config.max_event_log == 0 {
            return Err(ConfigError::ZeroLimit("max_event_log"));
        }
        Ok(config)
    }
}

fn read_layer(path: &Path) -> Result<ConfigLayer, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.into_layer(path.parent()))
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("taskboard-server").join("config.toml"))
}

/// `<data dir>/taskboard/board.db`, or `board.db` in the working directory
/// when the platform has no data dir.
fn default_db_path() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from("board.db"),
        |d| d.join("taskboard").join("board.db"),
    )
}
