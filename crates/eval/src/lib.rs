pub mod batch;
pub mod complaint;
pub mod config;
pub mod elements;
pub mod prompts;
pub mod summary;
pub mod support;

#[cfg(test)]
pub(crate) mod testing;

pub use complaint::{
    CitationEvaluation, ComplaintEvaluation, ComplaintEvaluator, EVALUATION_SUFFIX,
};
pub use config::EvalConfig;
pub use elements::{
    CauseOfAction, ElementFinding, ElementsEvaluationResult, ElementsEvaluator, ELEMENTS_SUFFIX,
};
pub use summary::{ElementsSummary, EvaluationSummary};
pub use support::{
    Confidence, LlmSupportJudge, PropositionSupportResult, SupportEvaluator, SupportJudge,
};

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use courtlistener::{CitationCache, CitationValidator, CourtListenerClient};
use extract::{Extractor, StructuredLlm};

/// Wire up one citation-evaluation run: a single lookup client, rate gate
/// and cache shared by every worker.
pub fn build_complaint_evaluator(
    config: &EvalConfig,
    llm: Arc<dyn StructuredLlm>,
) -> Result<ComplaintEvaluator> {
    let client = CourtListenerClient::new(config.client_config(), config.retry_policy())
        .context("Failed to create CourtListener client")?;
    let cache = CitationCache::open(&config.cache.dir)
        .with_context(|| format!("Failed to open citation cache in {:?}", config.cache.dir))?;

    info!(cache = ?cache.path(), entries = cache.len(), "Citation cache ready");

    let validator = CitationValidator::new(Arc::new(client), Arc::new(cache));
    let extractor = Extractor::new(llm.clone(), config.models.extraction.clone());
    let judge = LlmSupportJudge::new(llm, config.models.evaluation.clone());
    let support = SupportEvaluator::new(Arc::new(judge), config.chunker_config());

    Ok(ComplaintEvaluator::new(
        Arc::new(extractor),
        Arc::new(validator),
        Arc::new(support),
    ))
}
