pub mod llm;
pub mod prompt;
pub mod schema;
pub mod structured;

pub use llm::{parse_structured, LlmError, OpenAiClient, StructuredLlm};
pub use schema::{
    Citation, CitationExtractionResult, CitationType, ExtractedCitation, Validity,
};
pub use structured::StructuredOutput;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns document text into the citations it contains.
#[async_trait]
pub trait CitationExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Vec<ExtractedCitation>, LlmError>;
}

/// Citation extraction backed by a structured-output model.
pub struct Extractor {
    llm: Arc<dyn StructuredLlm>,
    model: String,
}

impl Extractor {
    pub fn new(llm: Arc<dyn StructuredLlm>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CitationExtractor for Extractor {
    /// An unparseable model response means no citations were found.
    async fn extract(&self, text: &str) -> Result<Vec<ExtractedCitation>, LlmError> {
        let prompt = prompt::build_extraction_prompt(text);

        let result: Option<CitationExtractionResult> =
            parse_structured(self.llm.as_ref(), &self.model, &prompt).await?;

        match result {
            Some(result) => {
                debug!(count = result.citations.len(), "Extracted citations");
                Ok(result.citations)
            }
            None => {
                warn!(model = %self.model, "Citation extraction returned no parseable result");
                Ok(Vec::new())
            }
        }
    }
}
