//! sefaz.toml configuration parser.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SefazConfig {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub probe: ProbeConfig,
    pub cache: CacheConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("registry.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Hard timeout for a full status probe.
    pub timeout: String,
    /// Timeout for the cheap reachability check done during resolution.
    pub reachability_timeout: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: "10s".to_string(),
            reachability_timeout: "5s".to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        parse_duration(&self.timeout).unwrap_or(Duration::from_secs(10))
    }

    pub fn reachability_timeout(&self) -> Duration {
        parse_duration(&self.reachability_timeout).unwrap_or(Duration::from_secs(5))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a resolved endpoint is trusted before it is re-checked.
    pub ttl: String,
    /// Consecutive transport failures before a cached endpoint is dropped.
    pub failure_threshold: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: "10m".to_string(),
            failure_threshold: 2,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        parse_duration(&self.ttl).unwrap_or(Duration::from_secs(600))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub fallback: bool,
    pub auto_heal: bool,
    pub mock_on_failure: bool,
    pub use_cache: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            fallback: true,
            auto_heal: true,
            mock_on_failure: false,
            use_cache: true,
        }
    }
}

impl SefazConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: SefazConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (field, value) in [
            ("probe.timeout", &self.probe.timeout),
            ("probe.reachability_timeout", &self.probe.reachability_timeout),
            ("cache.ttl", &self.cache.ttl),
        ] {
            if parse_duration(value).is_none() {
                anyhow::bail!("invalid duration for {field}: {value:?}");
            }
        }
        if self.cache.failure_threshold == 0 {
            anyhow::bail!("cache.failure_threshold must be at least 1");
        }
        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
