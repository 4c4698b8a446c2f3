use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use extract::{parse_structured, LlmError, StructuredLlm};
use ingest::{Chunker, ChunkerConfig};

use crate::prompts::build_support_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Lower is more confident.
    fn rank(self) -> u8 {
        match self {
            Confidence::High => 0,
            Confidence::Medium => 1,
            Confidence::Low => 2,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        f.write_str(label)
    }
}

/// Verdict on whether an opinion supports the proposition it is cited for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PropositionSupportResult {
    /// Whether the case supports the claimed proposition
    pub supports_proposition: bool,
    /// 'high', 'medium', or 'low' confidence in the assessment
    pub confidence: Confidence,
    /// Explanation of why the case does or does not support the proposition
    pub reasoning: String,
    /// Most relevant excerpt from the opinion, if found
    pub relevant_excerpt: Option<String>,
}

impl PropositionSupportResult {
    pub(crate) fn failed(reasoning: &str) -> Self {
        Self {
            supports_proposition: false,
            confidence: Confidence::Low,
            reasoning: reasoning.to_string(),
            relevant_excerpt: None,
        }
    }
}

/// Judges one (citation, proposition, opinion text) triple.
#[async_trait]
pub trait SupportJudge: Send + Sync {
    async fn judge(
        &self,
        citation: &str,
        proposition: &str,
        opinion_text: &str,
    ) -> Result<PropositionSupportResult, LlmError>;
}

pub struct LlmSupportJudge {
    llm: Arc<dyn StructuredLlm>,
    model: String,
}

impl LlmSupportJudge {
    pub fn new(llm: Arc<dyn StructuredLlm>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }
}

#[async_trait]
impl SupportJudge for LlmSupportJudge {
    async fn judge(
        &self,
        citation: &str,
        proposition: &str,
        opinion_text: &str,
    ) -> Result<PropositionSupportResult, LlmError> {
        let prompt = build_support_prompt(citation, proposition, opinion_text);
        let parsed: Option<PropositionSupportResult> =
            parse_structured(self.llm.as_ref(), &self.model, &prompt).await?;

        Ok(parsed.unwrap_or_else(|| {
            warn!(citation, "Support evaluation returned no parseable result");
            PropositionSupportResult::failed("Failed to evaluate proposition support")
        }))
    }
}

/// Proposition support with a chunked fallback for opinions too large
/// for a single request.
pub struct SupportEvaluator {
    judge: Arc<dyn SupportJudge>,
    chunker: Chunker,
}

impl SupportEvaluator {
    pub fn new(judge: Arc<dyn SupportJudge>, chunking: ChunkerConfig) -> Self {
        Self {
            judge,
            chunker: Chunker::new(chunking),
        }
    }

    pub async fn evaluate(
        &self,
        citation: &str,
        proposition: &str,
        opinion_text: &str,
    ) -> Result<PropositionSupportResult, LlmError> {
        match self.judge.judge(citation, proposition, opinion_text).await {
            Err(e) if e.is_context_overflow() => {
                info!(citation, "Opinion too long, chunking");
                self.evaluate_chunks(citation, proposition, opinion_text).await
            }
            other => other,
        }
    }

    async fn evaluate_chunks(
        &self,
        citation: &str,
        proposition: &str,
        opinion_text: &str,
    ) -> Result<PropositionSupportResult, LlmError> {
        let chunks = self.chunker.chunk_text(opinion_text);
        info!(citation, chunks = chunks.len(), "Evaluating chunks");

        let mut best_support: Option<PropositionSupportResult> = None;
        let mut negatives = Vec::new();

        for (i, chunk) in chunks.iter().enumerate() {
            let result = match self.judge.judge(citation, proposition, chunk).await {
                Ok(result) => result,
                Err(e) if e.is_context_overflow() => {
                    warn!(citation, chunk = i + 1, "Chunk still too large, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if !result.supports_proposition {
                negatives.push(result);
                continue;
            }

            let high = result.confidence == Confidence::High;
            if best_support.is_none() || high {
                best_support = Some(result);
            }
            if high {
                info!(citation, chunk = i + 1, "Found supporting evidence");
                break;
            }
        }

        if let Some(mut best) = best_support {
            best.reasoning = format!("[Evaluated in chunks] {}", best.reasoning);
            return Ok(best);
        }

        // min_by_key keeps the earliest of equally confident verdicts
        if let Some(mut best) = negatives.into_iter().min_by_key(|r| r.confidence.rank()) {
            best.reasoning = format!("[Evaluated in {} chunks] {}", chunks.len(), best.reasoning);
            return Ok(best);
        }

        Ok(PropositionSupportResult::failed(
            "Failed to evaluate proposition support (all chunks failed)",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{overflow, verdict, CannedLlm, MockJudge};
    use serde_json::json;

    const CITATION: &str = "Smith v. Jones, 123 F.3d 456";
    const PROPOSITION: &str = "Landlords owe tenants a duty of care";

    fn evaluator(judge: Arc<MockJudge>) -> SupportEvaluator {
        SupportEvaluator::new(
            judge,
            ChunkerConfig {
                chunk_size: 10,
                overlap: 2,
            },
        )
    }

    #[tokio::test]
    async fn test_direct_verdict_is_returned_unchanged() {
        let judge = MockJudge::new(|_| Ok(verdict(true, Confidence::Medium, "on point")));
        let result = evaluator(judge.clone())
            .evaluate(CITATION, PROPOSITION, "a short opinion well past ten chars")
            .await
            .unwrap();

        assert!(result.supports_proposition);
        assert_eq!(result.reasoning, "on point");
        assert_eq!(judge.calls(), 1);
    }

    #[tokio::test]
    async fn test_other_errors_propagate_without_chunking() {
        let judge = MockJudge::new(|_| {
            Err(LlmError::Api {
                status: 500,
                message: "internal error".into(),
            })
        });
        let err = evaluator(judge.clone())
            .evaluate(CITATION, PROPOSITION, &"x".repeat(40))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Api { status: 500, .. }));
        assert_eq!(judge.calls(), 1);
    }

    #[tokio::test]
    async fn test_high_confidence_chunk_stops_evaluation() {
        // chunks: [M x10], [MM H x8], [HH z x8], ...
        let judge = MockJudge::new(|text| {
            if text.chars().count() > 10 {
                Err(overflow())
            } else if text.contains('H') {
                Ok(verdict(true, Confidence::High, "holding"))
            } else if text.contains('M') {
                Ok(verdict(true, Confidence::Medium, "dicta"))
            } else {
                Ok(verdict(false, Confidence::Low, "unrelated"))
            }
        });
        let opinion = format!("{}{}{}", "M".repeat(10), "H".repeat(10), "z".repeat(20));

        let result = evaluator(judge.clone())
            .evaluate(CITATION, PROPOSITION, &opinion)
            .await
            .unwrap();

        assert!(result.supports_proposition);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.reasoning, "[Evaluated in chunks] holding");
        // full opinion, chunk 1, chunk 2
        assert_eq!(judge.calls(), 3);
    }

    #[tokio::test]
    async fn test_first_supporting_chunk_kept_without_high_confidence() {
        let judge = MockJudge::new(|text| {
            if text.chars().count() > 10 {
                Err(overflow())
            } else if text.contains('M') {
                Ok(verdict(true, Confidence::Medium, text))
            } else {
                Ok(verdict(false, Confidence::High, "no"))
            }
        });
        let opinion = format!("{}{}", "a".repeat(14), "M".repeat(12));

        let result = evaluator(judge.clone())
            .evaluate(CITATION, PROPOSITION, &opinion)
            .await
            .unwrap();

        assert!(result.supports_proposition);
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.reasoning, "[Evaluated in chunks] aaaaaaMMMM");
        assert_eq!(judge.calls(), 4);
    }

    #[tokio::test]
    async fn test_most_confident_negative_is_chosen() {
        let judge = MockJudge::new(|text| {
            if text.chars().count() > 10 {
                Err(overflow())
            } else if text.contains('h') {
                Ok(verdict(false, Confidence::High, text))
            } else if text.contains('m') {
                Ok(verdict(false, Confidence::Medium, text))
            } else {
                Ok(verdict(false, Confidence::Low, text))
            }
        });
        // chunks: "llllllllll", "llhhhhhhhh", "hhhhmmmmmm"
        let opinion = format!("{}{}{}", "l".repeat(10), "h".repeat(10), "m".repeat(6));

        let result = evaluator(judge.clone())
            .evaluate(CITATION, PROPOSITION, &opinion)
            .await
            .unwrap();

        assert!(!result.supports_proposition);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.reasoning, "[Evaluated in 3 chunks] llhhhhhhhh");
        assert_eq!(judge.calls(), 4);
    }

    #[tokio::test]
    async fn test_oversized_chunks_are_skipped() {
        let judge = MockJudge::new(|text| {
            if text.chars().count() > 10 || text.contains('X') {
                Err(overflow())
            } else {
                Ok(verdict(false, Confidence::Medium, "silent on the issue"))
            }
        });
        let opinion = format!("{}{}", "X".repeat(16), "q".repeat(10));

        let result = evaluator(judge.clone())
            .evaluate(CITATION, PROPOSITION, &opinion)
            .await
            .unwrap();

        assert_eq!(result.reasoning, "[Evaluated in 3 chunks] silent on the issue");
        assert_eq!(judge.calls(), 4);
    }

    #[tokio::test]
    async fn test_all_chunks_failing_yields_low_negative() {
        let judge = MockJudge::new(|_| Err(overflow()));

        let result = evaluator(judge.clone())
            .evaluate(CITATION, PROPOSITION, &"X".repeat(26))
            .await
            .unwrap();

        assert!(!result.supports_proposition);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(
            result.reasoning,
            "Failed to evaluate proposition support (all chunks failed)"
        );
        assert!(result.relevant_excerpt.is_none());
    }

    #[tokio::test]
    async fn test_llm_judge_parses_and_falls_back() {
        let llm = CannedLlm::new(Some(json!({
            "supports_proposition": true,
            "confidence": "high",
            "reasoning": "The court held defendants owed a duty.",
            "relevant_excerpt": "defendants owed a duty"
        })));
        let judge = LlmSupportJudge::new(llm.clone(), "gpt-5-mini");
        let result = judge.judge(CITATION, PROPOSITION, "opinion").await.unwrap();
        assert!(result.supports_proposition);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(llm.schemas(), vec!["PropositionSupportResult".to_string()]);

        let judge = LlmSupportJudge::new(CannedLlm::new(None), "gpt-5-mini");
        let result = judge.judge(CITATION, PROPOSITION, "opinion").await.unwrap();
        assert_eq!(
            result,
            PropositionSupportResult::failed("Failed to evaluate proposition support")
        );
    }
}
