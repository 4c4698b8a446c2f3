use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const CACHE_FILE: &str = "citation_cache.json";

/// On-disk form of one validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    is_valid: bool,
    courtlistener_id: Option<String>,
    case_name: Option<String>,
    opinion_text: Option<String>,
    error: Option<String>,
    timestamp: DateTime<Utc>,
    /// Kept for auditing the cache file by hand.
    raw_text: String,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub citation_key: String,
    pub is_valid: bool,
    pub courtlistener_id: Option<String>,
    pub case_name: Option<String>,
    pub opinion_text: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// What the validator learned about a citation.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub courtlistener_id: Option<String>,
    pub case_name: Option<String>,
    pub opinion_text: Option<String>,
    pub error: Option<String>,
}

impl ValidationOutcome {
    pub fn not_found(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Disk-backed cache of citation validation results.
///
/// Entries live in memory and the whole map is rewritten to a single JSON
/// file on every `set`. Writes are serialized behind `write_lock` and the
/// snapshot is taken inside it, so concurrent writers cannot drop each
/// other's entries.
pub struct CitationCache {
    path: PathBuf,
    entries: DashMap<String, CacheRecord>,
    write_lock: Mutex<()>,
}

impl CitationCache {
    /// Open the cache in `cache_dir`, creating the directory if needed.
    /// A missing or unreadable cache file starts an empty cache.
    pub fn open(cache_dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(cache_dir)?;
        let path = cache_dir.join(CACHE_FILE);
        let entries = Self::load(&path);

        debug!(path = ?path, entries = entries.len(), "Opened citation cache");

        Ok(Self {
            path,
            entries,
            write_lock: Mutex::new(()),
        })
    }

    fn load(path: &Path) -> DashMap<String, CacheRecord> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return DashMap::new(),
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to read citation cache, starting empty");
                return DashMap::new();
            }
        };

        match serde_json::from_str::<HashMap<String, CacheRecord>>(&json) {
            Ok(records) => records.into_iter().collect(),
            Err(e) => {
                warn!(path = ?path, error = %e, "Corrupt citation cache, starting empty");
                DashMap::new()
            }
        }
    }

    /// Fingerprint of a citation: SHA-256 of the lowercased, trimmed text.
    pub fn make_key(raw_text: &str) -> String {
        let normalized = raw_text.trim().to_lowercase();
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, raw_text: &str) -> Option<CacheEntry> {
        let key = Self::make_key(raw_text);
        self.entries.get(&key).map(|record| {
            let record = record.value();
            CacheEntry {
                citation_key: key.clone(),
                is_valid: record.is_valid,
                courtlistener_id: record.courtlistener_id.clone(),
                case_name: record.case_name.clone(),
                opinion_text: record.opinion_text.clone(),
                error: record.error.clone(),
                timestamp: record.timestamp,
            }
        })
    }

    pub async fn set(&self, raw_text: &str, outcome: ValidationOutcome) -> io::Result<()> {
        let key = Self::make_key(raw_text);
        self.entries.insert(
            key,
            CacheRecord {
                is_valid: outcome.is_valid,
                courtlistener_id: outcome.courtlistener_id,
                case_name: outcome.case_name,
                opinion_text: outcome.opinion_text,
                error: outcome.error,
                timestamp: Utc::now(),
                raw_text: raw_text.to_string(),
            },
        );
        self.persist().await
    }

    async fn persist(&self) -> io::Result<()> {
        let _guard = self.write_lock.lock().await;

        let snapshot: BTreeMap<String, CacheRecord> = self
            .entries
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        let json = serde_json::to_string_pretty(&snapshot).map_err(io::Error::other)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
