use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CitationType {
    Case,
    Statute,
}

impl std::fmt::Display for CitationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CitationType::Case => f.write_str("case"),
            CitationType::Statute => f.write_str("statute"),
        }
    }
}

/// A citation as returned by the extraction model.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedCitation {
    /// The citation exactly as it appears in the text
    pub raw_text: String,
    /// Either "case" or "statute"
    pub citation_type: CitationType,
    /// The sentence or claim the citation supports
    pub proposition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CitationExtractionResult {
    pub citations: Vec<ExtractedCitation>,
}

/// Outcome of checking a citation against the legal database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    #[default]
    Unknown,
    Valid,
    Invalid,
}

impl Validity {
    pub fn is_resolved(self) -> bool {
        self != Validity::Unknown
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Validity::Unknown => None,
            Validity::Valid => Some(true),
            Validity::Invalid => Some(false),
        }
    }

    pub fn from_flag(is_valid: bool) -> Self {
        if is_valid {
            Validity::Valid
        } else {
            Validity::Invalid
        }
    }
}

/// A legal reference found in a document, enriched in place by validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub raw_text: String,
    pub citation_type: CitationType,
    pub proposition: String,
    pub validity: Validity,
    pub courtlistener_id: Option<String>,
    pub case_name: Option<String>,
    pub validation_error: Option<String>,
    /// Only populated for valid case citations.
    pub opinion_text: Option<String>,
}

impl Citation {
    pub fn new(
        raw_text: impl Into<String>,
        citation_type: CitationType,
        proposition: impl Into<String>,
    ) -> Self {
        Self {
            raw_text: raw_text.into(),
            citation_type,
            proposition: proposition.into(),
            validity: Validity::Unknown,
            courtlistener_id: None,
            case_name: None,
            validation_error: None,
            opinion_text: None,
        }
    }

    pub fn case(raw_text: impl Into<String>) -> Self {
        Self::new(raw_text, CitationType::Case, "")
    }

    pub fn is_statute(&self) -> bool {
        self.citation_type == CitationType::Statute
    }

    /// Opinion text that is present and not blank.
    pub fn retrieved_opinion(&self) -> Option<&str> {
        self.opinion_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

impl From<ExtractedCitation> for Citation {
    fn from(extracted: ExtractedCitation) -> Self {
        Self::new(
            extracted.raw_text,
            extracted.citation_type,
            extracted.proposition,
        )
    }
}
