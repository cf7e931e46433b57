//! Configuration management for ScanLens Server

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::clustering::ClusteringConfig;
use crate::jobs::JobSettings;
use crate::tiler::MAX_CHUNK_HEIGHT;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub tiler: TilerConfig,
    pub clustering: ClusteringConfig,
    pub jobs: JobConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Endpoint of the external OCR detection service
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TilerConfig {
    /// Images taller than this are split into strips before OCR
    pub max_chunk_height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub start_index: u64,
    pub error_threshold: u32,
    pub delay_ms: u64,
    pub page_timeout_secs: u64,
}

impl JobConfig {
    pub fn settings(&self) -> JobSettings {
        JobSettings {
            start_index: self.start_index,
            error_threshold: self.error_threshold,
            delay: Duration::from_millis(self.delay_ms),
            page_timeout: Duration::from_secs(self.page_timeout_secs),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: String, value: String },
}

impl Default for Config {
    fn default() -> Self {
        let clustering = ClusteringConfig::default();
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3033,
            },
            engine: EngineConfig {
                url: "http://127.0.0.1:3034/detect".to_string(),
                timeout_secs: 60,
            },
            fetch: FetchConfig { timeout_secs: 30 },
            cache: CacheConfig {
                path: PathBuf::from("./ocr-cache.json"),
            },
            tiler: TilerConfig {
                max_chunk_height: MAX_CHUNK_HEIGHT,
            },
            clustering,
            jobs: JobConfig {
                start_index: 0,
                error_threshold: 3,
                delay_ms: 500,
                page_timeout_secs: 60,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let vars = Vars { lookup: &lookup };
        let cluster = &defaults.clustering;

        Ok(Config {
            server: ServerConfig {
                host: vars.string("SERVER_HOST", &defaults.server.host),
                port: vars.parse("SERVER_PORT", defaults.server.port)?,
            },
            engine: EngineConfig {
                url: vars.string("OCR_ENGINE_URL", &defaults.engine.url),
                timeout_secs: vars
                    .parse("OCR_ENGINE_TIMEOUT_SECS", defaults.engine.timeout_secs)?,
            },
            fetch: FetchConfig {
                timeout_secs: vars.parse("FETCH_TIMEOUT_SECS", defaults.fetch.timeout_secs)?,
            },
            cache: CacheConfig {
                path: vars
                    .lookup("CACHE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.cache.path.clone()),
            },
            tiler: TilerConfig {
                max_chunk_height: vars
                    .parse("TILE_MAX_HEIGHT", defaults.tiler.max_chunk_height)?,
            },
            clustering: ClusteringConfig {
                enabled: vars.flag("CLUSTER_ENABLED", cluster.enabled)?,
                dist_k: vars.parse("CLUSTER_DIST_K", cluster.dist_k)?,
                font_ratio: vars.parse("CLUSTER_FONT_RATIO", cluster.font_ratio)?,
                font_ratio_for_mixed: vars
                    .parse("CLUSTER_FONT_RATIO_MIXED", cluster.font_ratio_for_mixed)?,
                overlap_min: vars.parse("CLUSTER_OVERLAP_MIN", cluster.overlap_min)?,
                mixed_min_overlap_ratio: vars
                    .parse("CLUSTER_MIXED_MIN_OVERLAP", cluster.mixed_min_overlap_ratio)?,
                min_line_ratio: vars.parse("CLUSTER_MIN_LINE_RATIO", cluster.min_line_ratio)?,
                add_space_on_merge: vars.flag("CLUSTER_ADD_SPACE", cluster.add_space_on_merge)?,
                window_max_height: vars
                    .parse("CLUSTER_WINDOW_MAX_HEIGHT", cluster.window_max_height)?,
            },
            jobs: JobConfig {
                start_index: vars.parse("JOB_START_INDEX", defaults.jobs.start_index)?,
                error_threshold: vars.parse("JOB_ERROR_THRESHOLD", defaults.jobs.error_threshold)?,
                delay_ms: vars.parse("JOB_DELAY_MS", defaults.jobs.delay_ms)?,
                page_timeout_secs: vars
                    .parse("JOB_PAGE_TIMEOUT_SECS", defaults.jobs.page_timeout_secs)?,
            },
        })
    }
}

struct Vars<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn lookup(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.lookup(name).unwrap_or_else(|| default.to_string())
    }

    fn parse<T: FromStr>(&self, name: &str, default: T) -> Result<T, ConfigError> {
        match self.lookup(name) {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: name.to_string(),
                value,
            }),
            None => Ok(default),
        }
    }

    fn flag(&self, name: &str, default: bool) -> Result<bool, ConfigError> {
        match self.lookup(name) {
            Some(value) => match value.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    name: name.to_string(),
                    value,
                }),
            },
            None => Ok(default),
        }
    }
}
