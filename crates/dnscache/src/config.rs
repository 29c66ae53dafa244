use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0:?}: {1}")]
    FileRead(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file {0:?}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("configuration validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: IpAddr,
    pub port: u16,
}

impl Endpoint {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Addresses of the local listener and the upstream resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub cache_server: Endpoint,
    pub forwarder: Endpoint,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cache_server: Endpoint {
                host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 53,
            },
            forwarder: Endpoint {
                host: IpAddr::V4(Ipv4Addr::new(8, 26, 56, 26)),
                port: 53,
            },
        }
    }
}

impl Config {
    /// Reads the config at `path`, writing the defaults there first if the file doesn't exist.
    ///
    /// A malformed file is an error rather than a reason to fall back to the defaults.
    pub async fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let config = Config::default();
                if let Err(e) = config.save(path).await {
                    tracing::warn!("Failed to store the default config: {}", e);
                } else {
                    tracing::info!(?path, "Created a config file with default settings");
                }
                return Ok(config);
            }
            Err(e) => return Err(ConfigError::FileRead(path.to_path_buf(), e)),
        };

        Config::from_toml(&contents, path)
    }

    /// `origin` only names the source in errors.
    pub fn from_toml(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(origin.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_server.port == 0 {
            return Err(ConfigError::Validation("cache server port cannot be 0".to_string()));
        }
        if self.forwarder.port == 0 {
            return Err(ConfigError::Validation("forwarder port cannot be 0".to_string()));
        }
        Ok(())
    }

    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context as _;

        let encoded = toml::to_string_pretty(self).context("failed to serialize the config")?;
        tokio::fs::write(path, encoded)
            .await
            .with_context(|| format!("failed to write config file {:?}", path))
    }
}
