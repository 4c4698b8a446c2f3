//! In-crate doubles for the external collaborators, with call counters.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use courtlistener::{CaseLookup, FoundCase, LookupError};
use extract::{CitationExtractor, CitationType, ExtractedCitation, LlmError, StructuredLlm};

use crate::support::{Confidence, PropositionSupportResult, SupportJudge};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_complaint(dir: &Path, stem: &str, text: &str, category: Option<&str>) -> PathBuf {
    let path = dir.join(format!("{}.txt", stem));
    std::fs::write(&path, text).unwrap();
    if let Some(category) = category {
        let metadata = serde_json::json!({
            "scenario_id": format!("{}-scenario", stem),
            "category": category,
            "model": "gpt-5-mini",
        });
        std::fs::write(dir.join(format!("{}.json", stem)), metadata.to_string()).unwrap();
    }
    path
}

pub fn case(raw_text: &str, proposition: &str) -> ExtractedCitation {
    ExtractedCitation {
        raw_text: raw_text.to_string(),
        citation_type: CitationType::Case,
        proposition: proposition.to_string(),
    }
}

pub fn statute(raw_text: &str, proposition: &str) -> ExtractedCitation {
    ExtractedCitation {
        raw_text: raw_text.to_string(),
        citation_type: CitationType::Statute,
        proposition: proposition.to_string(),
    }
}

pub fn verdict(supports: bool, confidence: Confidence, reasoning: &str) -> PropositionSupportResult {
    PropositionSupportResult {
        supports_proposition: supports,
        confidence,
        reasoning: reasoning.to_string(),
        relevant_excerpt: None,
    }
}

pub fn overflow() -> LlmError {
    LlmError::Api {
        status: 400,
        message: "This model's maximum context length is 128000 tokens".into(),
    }
}

/// Returns the same citations for every document, except documents
/// containing `FAIL`, which error.
pub struct MockExtractor {
    citations: Vec<ExtractedCitation>,
    calls: AtomicUsize,
}

impl MockExtractor {
    pub fn new(citations: Vec<ExtractedCitation>) -> Arc<Self> {
        Arc::new(Self {
            citations,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CitationExtractor for MockExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<ExtractedCitation>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("FAIL") {
            return Err(LlmError::Api {
                status: 500,
                message: "extraction failed".into(),
            });
        }
        Ok(self.citations.clone())
    }
}

/// Legal database that knows a fixed set of cases.
#[derive(Default)]
pub struct MockLookup {
    cases: HashMap<String, FoundCase>,
    calls: AtomicUsize,
}

impl MockLookup {
    pub fn with_case(mut self, raw_text: &str, id: &str, name: &str, opinion: Option<&str>) -> Self {
        self.cases.insert(
            raw_text.trim().to_lowercase(),
            FoundCase {
                id: Some(id.to_string()),
                case_name: Some(name.to_string()),
                opinion_text: opinion.map(str::to_string),
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaseLookup for MockLookup {
    async fn find_case(&self, raw_text: &str) -> Result<Option<FoundCase>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.cases.get(&raw_text.trim().to_lowercase()).cloned())
    }
}

type Rule = dyn Fn(&str) -> Result<PropositionSupportResult, LlmError> + Send + Sync;

/// Support judge answering from a rule over the opinion text it receives.
pub struct MockJudge {
    rule: Box<Rule>,
    calls: AtomicUsize,
}

impl MockJudge {
    pub fn new<F>(rule: F) -> Arc<Self>
    where
        F: Fn(&str) -> Result<PropositionSupportResult, LlmError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            rule: Box::new(rule),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SupportJudge for MockJudge {
    async fn judge(
        &self,
        _citation: &str,
        _proposition: &str,
        opinion_text: &str,
    ) -> Result<PropositionSupportResult, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.rule)(opinion_text)
    }
}

/// Structured LLM that always answers with the same value.
pub struct CannedLlm {
    response: Option<Value>,
    schemas: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl CannedLlm {
    pub fn new(response: Option<Value>) -> Arc<Self> {
        Arc::new(Self {
            response,
            schemas: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn schemas(&self) -> Vec<String> {
        self.schemas.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl StructuredLlm for CannedLlm {
    async fn complete_json(
        &self,
        _model: &str,
        prompt: &str,
        schema_name: &str,
        _schema: Value,
    ) -> Result<Option<Value>, LlmError> {
        self.schemas.lock().unwrap().push(schema_name.to_string());
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.response.clone())
    }
}
