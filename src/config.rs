use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default listen backlog.
pub const DEFAULT_BACKLOG: u32 = 10;

/// Default cap on accepted connections watched at once (one below the
/// classic `FD_SETSIZE`, leaving room for the listener).
pub const DEFAULT_MAX_CONNECTIONS: usize = 1023;

/// Server configuration.
///
/// A configuration file is either a YAML mapping:
///
/// ```yaml
/// backlog: 32
/// html_file: /srv/www/index.html
/// max_connections: 256
/// ```
///
/// or a single integer, which is taken as the backlog length.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub backlog: u32,
    pub html_file: Option<PathBuf>,
    pub max_connections: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backlog: DEFAULT_BACKLOG,
            html_file: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    Backlog(i64),
    Full(Config),
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: serde_yaml::Error },
    InvalidBacklog(i64),
    InvalidMaxConnections,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "can not open config file {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "wrong config file {}: {}", path.display(), source)
            }
            ConfigError::InvalidBacklog(n) => write!(f, "backlog must be positive, got {}", n),
            ConfigError::InvalidMaxConnections => write!(f, "max_connections must be positive"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parses configuration text. Error paths are left empty.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;

        let config = match file {
            ConfigFile::Backlog(n) => {
                let backlog = u32::try_from(n)
                    .ok()
                    .filter(|b| *b > 0)
                    .ok_or(ConfigError::InvalidBacklog(n))?;
                Config {
                    backlog,
                    ..Config::default()
                }
            }
            ConfigFile::Full(config) => config,
        };

        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backlog == 0 {
            return Err(ConfigError::InvalidBacklog(0));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections);
        }
        Ok(())
    }
}

/// Where configuration comes from: an optional file plus a content file
/// given on the command line, which wins over `html_file` in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: Option<PathBuf>,
    pub html_file: Option<PathBuf>,
}

impl ConfigSource {
    pub fn load(&self) -> Result<Config, ConfigError> {
        let mut config = Config::load(self.path.as_deref())?;
        if let Some(html) = &self.html_file {
            config.html_file = Some(html.clone());
        }
        Ok(config)
    }

    /// Configuration to start with when the file can not be read.
    pub fn fallback(&self) -> Config {
        Config {
            html_file: self.html_file.clone(),
            ..Config::default()
        }
    }
}
