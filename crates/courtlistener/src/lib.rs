pub mod cache;
pub mod client;
pub mod error;
pub mod metrics;
pub mod rate_limit;
pub mod retry;
pub mod validator;

pub use cache::{CacheEntry, CitationCache, ValidationOutcome};
pub use client::{ClientConfig, CourtListenerClient};
pub use error::LookupError;
pub use metrics::{MetricsSnapshot, ValidationMetrics};
pub use rate_limit::RateGate;
pub use retry::{Classify, FailureClass, RetryPolicy};
pub use validator::{CitationValidator, NOT_FOUND_ERROR};

use async_trait::async_trait;

/// A case the legal database recognised.
#[derive(Debug, Clone)]
pub struct FoundCase {
    pub id: Option<String>,
    pub case_name: Option<String>,
    pub opinion_text: Option<String>,
}

/// Resolves a raw citation to a case in the legal database.
#[async_trait]
pub trait CaseLookup: Send + Sync {
    /// `Ok(None)` when the database has no matching case.
    async fn find_case(&self, raw_text: &str) -> Result<Option<FoundCase>, LookupError>;
}
