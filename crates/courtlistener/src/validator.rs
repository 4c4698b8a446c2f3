use std::sync::Arc;
use tracing::{debug, info, warn};

use extract::{Citation, Validity};

use crate::cache::{CacheEntry, CitationCache, ValidationOutcome};
use crate::error::LookupError;
use crate::metrics::ValidationMetrics;
use crate::CaseLookup;

pub const NOT_FOUND_ERROR: &str = "Citation not found in CourtListener";

/// Checks case citations against the legal database, at most once per
/// citation and at most once per fingerprint across the cache's lifetime.
pub struct CitationValidator {
    lookup: Arc<dyn CaseLookup>,
    cache: Arc<CitationCache>,
    metrics: Arc<ValidationMetrics>,
}

impl CitationValidator {
    pub fn new(lookup: Arc<dyn CaseLookup>, cache: Arc<CitationCache>) -> Self {
        Self {
            lookup,
            cache,
            metrics: ValidationMetrics::new(),
        }
    }

    pub fn metrics(&self) -> Arc<ValidationMetrics> {
        self.metrics.clone()
    }

    pub fn cache(&self) -> &CitationCache {
        &self.cache
    }

    /// Resolve a citation's validity in place. Statutes and citations that
    /// already have a verdict are left untouched.
    pub async fn validate(&self, citation: &mut Citation) -> Result<(), LookupError> {
        if citation.is_statute() || citation.validity.is_resolved() {
            return Ok(());
        }

        if let Some(entry) = self.cache.get(&citation.raw_text) {
            debug!(citation = %citation.raw_text, key = %entry.citation_key, "Cache hit");
            self.metrics.record_cache_hit();
            apply_cached(citation, entry);
            return Ok(());
        }

        self.metrics.record_lookup();
        let found = match self.lookup.find_case(&citation.raw_text).await {
            Ok(found) => found,
            Err(e) => {
                self.metrics.record_failure();
                warn!(citation = %citation.raw_text, error = %e, "Citation lookup failed");
                return Err(e);
            }
        };
        self.metrics.record_result(found.is_some());

        match found {
            Some(case) => {
                citation.validity = Validity::Valid;
                citation.courtlistener_id = case.id;
                if citation.case_name.is_none() {
                    citation.case_name = case.case_name;
                }
                citation.opinion_text = case.opinion_text;

                info!(
                    citation = %citation.raw_text,
                    case_name = citation.case_name.as_deref().unwrap_or(""),
                    "Citation found"
                );

                self.cache
                    .set(
                        &citation.raw_text,
                        ValidationOutcome {
                            is_valid: true,
                            courtlistener_id: citation.courtlistener_id.clone(),
                            case_name: citation.case_name.clone(),
                            opinion_text: citation.opinion_text.clone(),
                            error: None,
                        },
                    )
                    .await?;
            }
            None => {
                citation.validity = Validity::Invalid;
                citation.validation_error = Some(NOT_FOUND_ERROR.to_string());

                info!(citation = %citation.raw_text, "Citation not found");

                self.cache
                    .set(&citation.raw_text, ValidationOutcome::not_found(NOT_FOUND_ERROR))
                    .await?;
            }
        }

        Ok(())
    }

    /// Validate each citation in order, one lookup per uncached citation.
    pub async fn validate_many(&self, citations: &mut [Citation]) -> Result<(), LookupError> {
        for citation in citations.iter_mut() {
            self.validate(citation).await?;
        }
        Ok(())
    }
}

fn apply_cached(citation: &mut Citation, entry: CacheEntry) {
    citation.validity = Validity::from_flag(entry.is_valid);
    citation.courtlistener_id = entry.courtlistener_id;
    citation.opinion_text = entry.opinion_text;
    if entry.case_name.is_some() {
        citation.case_name = entry.case_name;
    }
    if entry.error.is_some() {
        citation.validation_error = entry.error;
    }
}
