//! Pleading-elements evaluation: does a complaint allege facts establishing
//! every element of its cause of action?

use anyhow::{anyhow, bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use extract::structured::strict_schema;
use extract::StructuredLlm;
use ingest::FileReader;

use crate::batch::run_directory;
use crate::prompts::build_elements_prompt;

pub const ELEMENTS_SUFFIX: &str = "_evaluation_elements.json";

const REASONING_DESCRIPTION: &str =
    "Brief explanation of how this element is or is not established";

/// One element of a cause of action, as requested from the model.
#[derive(Debug, Clone, Copy)]
pub struct Element {
    pub name: &'static str,
    /// What the model should decide for this element
    pub question: &'static str,
    /// Numbered line in the prompt
    pub summary: &'static str,
}

const QUIET_ENJOYMENT: &[Element] = &[
    Element {
        name: "landlord_tenant_relationship",
        question: "Whether the complaint establishes a landlord-tenant relationship",
        summary: "A landlord-tenant relationship",
    },
    Element {
        name: "act_or_omission_by_landlord",
        question: "Whether the complaint alleges an act or omission by the landlord",
        summary: "An act or omission by the landlord",
    },
    Element {
        name: "substantial_interference",
        question: "Whether the complaint alleges substantial interference with quiet enjoyment",
        summary: "A \"substantial interference\" with the tenant's quiet enjoyment",
    },
    Element {
        name: "causation",
        question: "Whether the complaint establishes causation between landlord's conduct and interference",
        summary: "Causation (the landlord's conduct caused the interference)",
    },
    Element {
        name: "damages",
        question: "Whether the complaint alleges damages suffered by the tenant",
        summary: "Damages",
    },
];

const NEGLIGENCE: &[Element] = &[
    Element {
        name: "duty",
        question: "Whether the complaint establishes defendant owed plaintiff a duty of care",
        summary: "Duty - defendant owed plaintiff a duty of care",
    },
    Element {
        name: "breach",
        question: "Whether the complaint alleges defendant breached that duty",
        summary: "Breach - defendant breached that duty",
    },
    Element {
        name: "causation_but_for",
        question: "Whether the complaint establishes but-for causation (injury would not have occurred but for defendant's conduct)",
        summary: "Causation (but-for) - plaintiff's injury would not have occurred but for defendant's conduct",
    },
    Element {
        name: "causation_proximate",
        question: "Whether the complaint establishes proximate causation (injury was foreseeable result of conduct)",
        summary: "Causation (proximate) - plaintiff's injury was a foreseeable result of defendant's conduct",
    },
    Element {
        name: "damages",
        question: "Whether the complaint alleges actual damages suffered by plaintiff",
        summary: "Damages - plaintiff suffered actual damages",
    },
];

const CUSTODY_MODIFICATION: &[Element] = &[
    Element {
        name: "existing_custody_order",
        question: "Whether the complaint establishes an existing custody or parenting-time judgment/order",
        summary: "An existing custody or parenting-time judgment/order",
    },
    Element {
        name: "specific_modification_sought",
        question: "Whether the complaint specifies the modification being requested",
        summary: "The specific modification being sought",
    },
    Element {
        name: "material_substantial_change",
        question: "Whether the complaint alleges a material and substantial change in circumstances since the prior judgment",
        summary: "A \"material and substantial change in circumstances\" since entry of the prior judgment",
    },
    Element {
        name: "best_interests_of_child",
        question: "Whether the complaint alleges the modification is in the best interests of the child",
        summary: "That the requested modification is necessary in the \"best interests of the child\"",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CauseOfAction {
    QuietEnjoyment,
    Negligence,
    CustodyModification,
}

impl CauseOfAction {
    /// Map a complaint's metadata category to its cause of action.
    pub fn from_category(category: &str) -> Option<Self> {
        match category {
            "landlord_tenant" => Some(Self::QuietEnjoyment),
            "negligence" => Some(Self::Negligence),
            "custody_modification" => Some(Self::CustodyModification),
            _ => None,
        }
    }

    pub fn category(self) -> &'static str {
        match self {
            Self::QuietEnjoyment => "landlord_tenant",
            Self::Negligence => "negligence",
            Self::CustodyModification => "custody_modification",
        }
    }

    pub fn elements(self) -> &'static [Element] {
        match self {
            Self::QuietEnjoyment => QUIET_ENJOYMENT,
            Self::Negligence => NEGLIGENCE,
            Self::CustodyModification => CUSTODY_MODIFICATION,
        }
    }

    pub fn schema_name(self) -> &'static str {
        match self {
            Self::QuietEnjoyment => "QuietEnjoymentElements",
            Self::Negligence => "NegligenceElements",
            Self::CustodyModification => "CustodyModificationElements",
        }
    }

    pub fn prompt(self, complaint_text: &str) -> String {
        let (cause, example) = match self {
            Self::QuietEnjoyment => (
                "complaint for breach of the covenant of quiet enjoyment",
                "describing a lease agreement establishes the landlord-tenant relationship even without using that phrase.",
            ),
            Self::Negligence => (
                "negligence complaint",
                "describing a store owner's responsibility to maintain safe premises establishes duty even without using that word.",
            ),
            Self::CustodyModification => (
                "petition for custody modification",
                "describing how a parent's work schedule has changed may establish material change in circumstances.",
            ),
        };
        let summaries: Vec<&str> = self.elements().iter().map(|e| e.summary).collect();
        build_elements_prompt(cause, &summaries, example, complaint_text)
    }

    /// Strict response schema: one `{satisfied, reasoning}` object per element.
    pub fn response_schema(self) -> Value {
        let mut properties = Map::new();
        for element in self.elements() {
            properties.insert(
                element.name.to_string(),
                json!({
                    "type": "object",
                    "description": element.question,
                    "properties": {
                        "satisfied": { "type": "boolean" },
                        "reasoning": { "type": "string", "description": REASONING_DESCRIPTION }
                    }
                }),
            );
        }

        let mut schema = json!({
            "title": self.schema_name(),
            "type": "object",
            "properties": properties,
        });
        strict_schema(&mut schema);
        schema
    }
}

impl fmt::Display for CauseOfAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementFinding {
    pub satisfied: bool,
    pub reasoning: String,
}

/// Written to `<stem>_evaluation_elements.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementsEvaluationResult {
    pub complaint_file: String,
    pub category: String,
    pub model_used: String,
    pub elements_satisfied: usize,
    pub elements_total: usize,
    pub all_elements_satisfied: bool,
    pub elements: IndexMap<String, ElementFinding>,
}

pub struct ElementsEvaluator {
    llm: Arc<dyn StructuredLlm>,
    model: String,
}

impl ElementsEvaluator {
    pub fn new(llm: Arc<dyn StructuredLlm>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Evaluate one complaint. Its sidecar metadata must exist and name a
    /// known category.
    pub async fn evaluate(&self, path: &Path) -> Result<ElementsEvaluationResult> {
        let text = FileReader::read_file(path).await?;
        let metadata = FileReader::read_metadata(path)
            .await?
            .ok_or_else(|| anyhow!("No metadata file found for {:?}", path))?;

        let category = metadata.category.unwrap_or_else(|| "unknown".to_string());
        let Some(cause) = CauseOfAction::from_category(&category) else {
            bail!("Unknown category: {}", category);
        };

        let elements = self.judge_elements(cause, &text).await?;
        let elements_total = elements.len();
        let elements_satisfied = elements.values().filter(|e| e.satisfied).count();

        Ok(ElementsEvaluationResult {
            complaint_file: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            category,
            model_used: self.model.clone(),
            elements_satisfied,
            elements_total,
            all_elements_satisfied: elements_satisfied == elements_total,
            elements,
        })
    }

    /// Ask the model about every element, in the cause's element order.
    pub async fn judge_elements(
        &self,
        cause: CauseOfAction,
        complaint_text: &str,
    ) -> Result<IndexMap<String, ElementFinding>> {
        let response = self
            .llm
            .complete_json(
                &self.model,
                &cause.prompt(complaint_text),
                cause.schema_name(),
                cause.response_schema(),
            )
            .await?
            .ok_or_else(|| anyhow!("Failed to parse {} elements response", cause))?;

        let mut findings: Map<String, Value> = match response {
            Value::Object(map) => map,
            other => bail!("Expected an object of elements, got {}", other),
        };

        cause
            .elements()
            .iter()
            .map(|element| -> Result<(String, ElementFinding)> {
                let value = findings
                    .remove(element.name)
                    .ok_or_else(|| anyhow!("Response is missing element {}", element.name))?;
                let finding: ElementFinding = serde_json::from_value(value)
                    .with_context(|| format!("Malformed finding for element {}", element.name))?;
                Ok((element.name.to_string(), finding))
            })
            .collect()
    }

    pub async fn evaluate_directory(
        &self,
        dir: &Path,
        max_workers: usize,
    ) -> Result<Vec<ElementsEvaluationResult>> {
        run_directory(dir, ELEMENTS_SUFFIX, max_workers, |path: PathBuf| async move {
            let result = self.evaluate(&path).await?;
            info!(
                document = %result.complaint_file,
                satisfied = result.elements_satisfied,
                total = result.elements_total,
                "Done"
            );
            Ok(result)
        })
        .await
    }
}
