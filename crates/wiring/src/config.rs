//! # Configuration Sources
//!
//! An application reads one YAML or JSON file. The framework takes its own section out of
//! it ([`LogConfig`]) and decodes every additional model registered with
//! [`App::config`](crate::App::config) from the same document; those models are then
//! registered as ready values, so factories can ask for `Arc<MyConfig>` like any other
//! dependency.
//!
//! ```yaml
//! env: prod
//! level: 3
//! log: /var/log/app.log
//! pid: /run/app.pid
//! http:
//!   addr: 0.0.0.0:8080
//! ```

use figment::providers::{Format, Json, Yaml};
use figment::Figment;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file [{}] not found", .0.display())]
    Missing(PathBuf),
    #[error("[{}] is not a supported file format", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("decode config file [{}]: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },
    #[error("config [{0}] requested but no config file was set")]
    NoConfigFile(&'static str),
    #[error("create pid file [{}]: {source}", path.display())]
    Pid {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("open log file [{}]: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Level numbers used in config files.
pub const LEVEL_ERROR: u32 = 1;
pub const LEVEL_WARN: u32 = 2;
pub const LEVEL_INFO: u32 = 3;
pub const LEVEL_DEBUG: u32 = 4;

/// The framework's own section of the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub env: String,
    #[serde(default, rename = "pid")]
    pub pid_file: Option<PathBuf>,
    /// 0-1 error, 2 warn, 3 info, 4 debug, 5 and above trace.
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default, rename = "log")]
    pub log_file: Option<PathBuf>,
}

fn default_level() -> u32 {
    LEVEL_INFO
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            env: String::new(),
            pid_file: None,
            level: LEVEL_INFO,
            log_file: None,
        }
    }
}

impl LogConfig {
    /// Settings for one-shot commands: debug level on stdout.
    pub fn interactive() -> Self {
        Self {
            level: LEVEL_DEBUG,
            ..Self::default()
        }
    }

    pub fn directive(&self) -> &'static str {
        match self.level {
            0 | LEVEL_ERROR => "error",
            LEVEL_WARN => "warn",
            LEVEL_INFO => "info",
            LEVEL_DEBUG => "debug",
            _ => "trace",
        }
    }
}

/// Deployment environment name (`env` in the config file), registered as a value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Env(pub String);

/// An opened config file.
pub struct Sources {
    path: PathBuf,
    figment: Figment,
}

impl Sources {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(ConfigError::Missing(path));
        }
        let figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yml" | "yaml") => Figment::from(Yaml::file(&path)),
            Some("json") => Figment::from(Json::file(&path)),
            _ => return Err(ConfigError::UnsupportedFormat(path)),
        };
        Ok(Self { path, figment })
    }

    /// Decodes the whole document into `T`, ignoring keys `T` does not know.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        self.figment
            .extract()
            .map_err(|source| ConfigError::Decode {
                path: self.path.clone(),
                source: Box::new(source),
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Writes the current process id to `path`.
pub fn write_pid(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, std::process::id().to_string()).map_err(|source| ConfigError::Pid {
        path: path.to_path_buf(),
        source,
    })
}
