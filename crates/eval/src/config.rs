use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use courtlistener::client::{DEFAULT_BASE_URL, TOKEN_ENV};
use courtlistener::{ClientConfig, RetryPolicy};
use ingest::ChunkerConfig;

pub const BASE_URL_ENV: &str = "COURTLISTENER_BASE_URL";
pub const CACHE_DIR_ENV: &str = "CITECHECK_CACHE_DIR";
pub const MAX_WORKERS_ENV: &str = "CITECHECK_MAX_WORKERS";

pub const DEFAULT_MODEL: &str = "gpt-5-mini";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    pub courtlistener: CourtListenerConfig,
    pub retry: RetryConfig,
    pub concurrency: ConcurrencyConfig,
    pub chunking: ChunkingConfig,
    pub cache: CacheConfig,
    pub models: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtListenerConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub rate_limit_delay_ms: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Documents evaluated in parallel
    pub max_workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub extraction: String,
    pub evaluation: String,
    pub elements: String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            courtlistener: CourtListenerConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                api_token: None,
                rate_limit_delay_ms: 500,
                connect_timeout_secs: 60,
                request_timeout_secs: 120,
            },
            retry: RetryConfig {
                max_retries: 3,
                base_delay_ms: 1000,
                max_delay_ms: 30000,
            },
            concurrency: ConcurrencyConfig { max_workers: 4 },
            chunking: ChunkingConfig {
                chunk_size: 20_000,
                overlap: 500,
            },
            cache: CacheConfig {
                dir: PathBuf::from("data/cache"),
            },
            models: ModelConfig {
                extraction: DEFAULT_MODEL.to_string(),
                evaluation: DEFAULT_MODEL.to_string(),
                elements: DEFAULT_MODEL.to_string(),
            },
        }
    }
}

impl EvalConfig {
    /// Defaults overlaid with values from the process environment.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay settings from a key lookup. Unparseable numbers are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            self.courtlistener.api_token = Some(token);
        }
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.courtlistener.base_url = base_url;
        }
        if let Some(dir) = lookup(CACHE_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            self.cache.dir = PathBuf::from(dir);
        }
        if let Some(workers) = lookup(MAX_WORKERS_ENV).and_then(|w| w.trim().parse().ok()) {
            self.concurrency.max_workers = workers;
        }
        self
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.courtlistener.base_url.clone(),
            api_token: self.courtlistener.api_token.clone(),
            rate_limit_delay: Duration::from_millis(self.courtlistener.rate_limit_delay_ms),
            connect_timeout: Duration::from_secs(self.courtlistener.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.courtlistener.request_timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            self.retry.base_delay_ms,
            self.retry.max_delay_ms,
        )
    }

    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            chunk_size: self.chunking.chunk_size,
            overlap: self.chunking.overlap,
        }
    }
}
