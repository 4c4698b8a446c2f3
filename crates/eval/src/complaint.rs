use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use courtlistener::CitationValidator;
use extract::{Citation, CitationExtractor, CitationType, Validity};
use ingest::Complaint;

use crate::batch::run_directory;
use crate::support::{Confidence, PropositionSupportResult, SupportEvaluator};

pub const EVALUATION_SUFFIX: &str = "_evaluation.json";

/// Evaluation of a single citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationEvaluation {
    pub raw_text: String,
    pub citation_type: CitationType,
    pub proposition: String,

    // Validation, case citations only
    pub is_valid: Option<bool>,
    pub courtlistener_id: Option<String>,
    pub case_name: Option<String>,
    pub validation_error: Option<String>,

    // Proposition support, valid case citations with opinion text only
    pub supports_proposition: Option<bool>,
    pub support_confidence: Option<Confidence>,
    pub support_reasoning: Option<String>,
    pub relevant_excerpt: Option<String>,
}

impl CitationEvaluation {
    fn new(citation: &Citation, support: Option<PropositionSupportResult>) -> Self {
        let mut evaluation = Self {
            raw_text: citation.raw_text.clone(),
            citation_type: citation.citation_type,
            proposition: citation.proposition.clone(),
            is_valid: citation.validity.as_bool(),
            courtlistener_id: citation.courtlistener_id.clone(),
            case_name: citation.case_name.clone(),
            validation_error: citation.validation_error.clone(),
            supports_proposition: None,
            support_confidence: None,
            support_reasoning: None,
            relevant_excerpt: None,
        };

        if let Some(support) = support {
            evaluation.supports_proposition = Some(support.supports_proposition);
            evaluation.support_confidence = Some(support.confidence);
            evaluation.support_reasoning = Some(support.reasoning);
            evaluation.relevant_excerpt = support.relevant_excerpt;
        }

        evaluation
    }
}

/// Full evaluation of one complaint, written to `<stem>_evaluation.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplaintEvaluation {
    pub complaint_file: String,
    pub scenario_id: Option<String>,
    pub category: Option<String>,
    pub model: Option<String>,
    pub total_citations: usize,
    pub case_citations: usize,
    pub statute_citations: usize,
    pub valid_citations: usize,
    pub invalid_citations: usize,
    pub supported_propositions: usize,
    pub unsupported_propositions: usize,
    /// Keyed by raw citation text, repeats get ` (1)`, ` (2)`, ...
    pub citations: IndexMap<String, CitationEvaluation>,
}

impl ComplaintEvaluation {
    fn for_complaint(complaint: &Complaint) -> Self {
        Self {
            complaint_file: complaint.file_name.clone(),
            scenario_id: complaint.metadata.scenario_id.clone(),
            category: complaint.metadata.category.clone(),
            model: complaint.metadata.model.clone(),
            ..Default::default()
        }
    }

    /// Insert under the citation's raw text, suffixing a counter until the
    /// key is unused. Returns the key used.
    fn insert_citation(&mut self, evaluation: CitationEvaluation) -> String {
        let mut key = evaluation.raw_text.clone();
        let mut counter = 1;
        while self.citations.contains_key(&key) {
            key = format!("{} ({})", evaluation.raw_text, counter);
            counter += 1;
        }
        self.citations.insert(key.clone(), evaluation);
        key
    }
}

/// Runs extraction, validation and support evaluation for complaints.
pub struct ComplaintEvaluator {
    extractor: Arc<dyn CitationExtractor>,
    validator: Arc<CitationValidator>,
    support: Arc<SupportEvaluator>,
}

impl ComplaintEvaluator {
    pub fn new(
        extractor: Arc<dyn CitationExtractor>,
        validator: Arc<CitationValidator>,
        support: Arc<SupportEvaluator>,
    ) -> Self {
        Self {
            extractor,
            validator,
            support,
        }
    }

    pub fn validator(&self) -> &CitationValidator {
        &self.validator
    }

    pub async fn evaluate(&self, path: &Path) -> Result<ComplaintEvaluation> {
        let complaint = ingest::load_complaint(path).await?;
        self.evaluate_complaint(&complaint).await
    }

    pub async fn evaluate_complaint(&self, complaint: &Complaint) -> Result<ComplaintEvaluation> {
        let mut evaluation = ComplaintEvaluation::for_complaint(complaint);

        info!(document = %complaint.file_name, "Extracting citations");
        let extracted = self
            .extractor
            .extract(&complaint.text)
            .await
            .context("Citation extraction failed")?;

        evaluation.total_citations = extracted.len();

        for extracted in extracted {
            let mut citation = Citation::from(extracted);
            let mut support = None;

            if citation.is_statute() {
                evaluation.statute_citations += 1;
            } else {
                evaluation.case_citations += 1;
                debug!(document = %complaint.file_name, citation = %citation.raw_text, "Validating");

                self.validator
                    .validate(&mut citation)
                    .await
                    .with_context(|| format!("Failed to validate {}", citation.raw_text))?;

                match citation.validity {
                    Validity::Valid => {
                        evaluation.valid_citations += 1;
                        support = self.evaluate_support(&citation).await?;
                    }
                    Validity::Invalid => evaluation.invalid_citations += 1,
                    Validity::Unknown => {}
                }
            }

            match support.as_ref().map(|s| s.supports_proposition) {
                Some(true) => evaluation.supported_propositions += 1,
                Some(false) => evaluation.unsupported_propositions += 1,
                None => {}
            }

            evaluation.insert_citation(CitationEvaluation::new(&citation, support));
        }

        info!(
            document = %complaint.file_name,
            citations = evaluation.total_citations,
            valid = evaluation.valid_citations,
            invalid = evaluation.invalid_citations,
            "Done"
        );

        Ok(evaluation)
    }

    /// `None` when no opinion text was retrieved for the case.
    async fn evaluate_support(&self, citation: &Citation) -> Result<Option<PropositionSupportResult>> {
        let Some(opinion) = citation.retrieved_opinion() else {
            debug!(citation = %citation.raw_text, "No opinion text, skipping support evaluation");
            return Ok(None);
        };

        let result = self
            .support
            .evaluate(&citation.raw_text, &citation.proposition, opinion)
            .await
            .with_context(|| format!("Failed to evaluate support for {}", citation.raw_text))?;

        Ok(Some(result))
    }

    /// Evaluate every complaint in `dir` that has no `<stem>_evaluation.json`
    /// yet, writing one per success. Failed documents are logged and left out.
    pub async fn evaluate_directory(
        &self,
        dir: &Path,
        max_workers: usize,
    ) -> Result<Vec<ComplaintEvaluation>> {
        run_directory(dir, EVALUATION_SUFFIX, max_workers, |path: PathBuf| async move {
            self.evaluate(&path).await
        })
        .await
    }
}
