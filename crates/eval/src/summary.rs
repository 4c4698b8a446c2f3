use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::complaint::ComplaintEvaluation;
use crate::elements::ElementsEvaluationResult;

const RULE: &str = "============================================================";

/// Totals over one batch of citation evaluations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub complaints: usize,
    pub total_citations: usize,
    pub valid_citations: usize,
    pub invalid_citations: usize,
    pub supported_propositions: usize,
    pub unsupported_propositions: usize,
    /// Percentage of checked case citations that do not exist
    pub hallucination_rate: Option<f64>,
}

impl EvaluationSummary {
    pub fn from_results(results: &[ComplaintEvaluation]) -> Self {
        let mut summary = Self {
            complaints: results.len(),
            ..Default::default()
        };

        for result in results {
            summary.total_citations += result.total_citations;
            summary.valid_citations += result.valid_citations;
            summary.invalid_citations += result.invalid_citations;
            summary.supported_propositions += result.supported_propositions;
            summary.unsupported_propositions += result.unsupported_propositions;
        }

        let checked = summary.valid_citations + summary.invalid_citations;
        if checked > 0 {
            summary.hallucination_rate =
                Some(summary.invalid_citations as f64 / checked as f64 * 100.0);
        }

        summary
    }
}

impl fmt::Display for EvaluationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "EVALUATION SUMMARY")?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Complaints evaluated: {}", self.complaints)?;
        writeln!(f, "Total citations: {}", self.total_citations)?;
        writeln!(f, "Valid citations: {}", self.valid_citations)?;
        writeln!(f, "Invalid citations: {}", self.invalid_citations)?;
        writeln!(f, "Supported propositions: {}", self.supported_propositions)?;
        writeln!(f, "Unsupported propositions: {}", self.unsupported_propositions)?;
        if let Some(rate) = self.hallucination_rate {
            writeln!(f, "Citation hallucination rate: {:.1}%", rate)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryElements {
    pub complaints: usize,
    pub all_satisfied: usize,
}

/// Totals over one batch of elements evaluations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementsSummary {
    pub complaints: usize,
    pub all_satisfied: usize,
    pub total_elements: usize,
    pub satisfied_elements: usize,
    pub by_category: BTreeMap<String, CategoryElements>,
}

impl ElementsSummary {
    pub fn from_results(results: &[ElementsEvaluationResult]) -> Self {
        let mut summary = Self {
            complaints: results.len(),
            ..Default::default()
        };

        for result in results {
            summary.total_elements += result.elements_total;
            summary.satisfied_elements += result.elements_satisfied;

            let category = summary.by_category.entry(result.category.clone()).or_default();
            category.complaints += 1;
            if result.all_elements_satisfied {
                summary.all_satisfied += 1;
                category.all_satisfied += 1;
            }
        }

        summary
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

impl fmt::Display for ElementsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "ELEMENTS EVALUATION SUMMARY")?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Complaints evaluated: {}", self.complaints)?;
        writeln!(
            f,
            "Complaints with all elements satisfied: {} ({:.1}%)",
            self.all_satisfied,
            percent(self.all_satisfied, self.complaints)
        )?;
        writeln!(f, "Total elements across all complaints: {}", self.total_elements)?;
        writeln!(
            f,
            "Elements satisfied: {} ({:.1}%)",
            self.satisfied_elements,
            percent(self.satisfied_elements, self.total_elements)
        )?;

        writeln!(f, "\nBy category:")?;
        for (name, category) in &self.by_category {
            writeln!(
                f,
                "  {}: {}/{} complaints with all elements ({:.1}%)",
                name,
                category.all_satisfied,
                category.complaints,
                percent(category.all_satisfied, category.complaints)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn complaint(valid: usize, invalid: usize, supported: usize) -> ComplaintEvaluation {
        ComplaintEvaluation {
            complaint_file: "c.txt".into(),
            total_citations: valid + invalid,
            case_citations: valid + invalid,
            valid_citations: valid,
            invalid_citations: invalid,
            supported_propositions: supported,
            unsupported_propositions: valid - supported,
            ..Default::default()
        }
    }

    fn elements(category: &str, satisfied: usize, total: usize) -> ElementsEvaluationResult {
        ElementsEvaluationResult {
            complaint_file: "c.txt".into(),
            category: category.into(),
            model_used: "gpt-5-mini".into(),
            elements_satisfied: satisfied,
            elements_total: total,
            all_elements_satisfied: satisfied == total,
            elements: IndexMap::new(),
        }
    }

    #[test]
    fn test_hallucination_rate() {
        let summary = EvaluationSummary::from_results(&[complaint(3, 1, 2), complaint(0, 4, 0)]);
        assert_eq!(summary.complaints, 2);
        assert_eq!(summary.valid_citations, 3);
        assert_eq!(summary.invalid_citations, 5);
        assert_eq!(summary.supported_propositions, 2);
        assert_eq!(summary.unsupported_propositions, 1);
        assert!((summary.hallucination_rate.unwrap() - 62.5).abs() < 1e-9);

        let report = summary.to_string();
        assert!(report.contains("Citation hallucination rate: 62.5%"));
    }

    #[test]
    fn test_no_case_citations_has_no_rate() {
        let summary = EvaluationSummary::from_results(&[complaint(0, 0, 0)]);
        assert_eq!(summary.hallucination_rate, None);
        let report = summary.to_string();
        assert!(!report.contains("hallucination rate"));
        assert!(report.contains("Supported propositions: 0"));
        assert!(report.contains("Unsupported propositions: 0"));
    }

    #[test]
    fn test_elements_by_category() {
        let summary = ElementsSummary::from_results(&[
            elements("negligence", 5, 5),
            elements("negligence", 3, 5),
            elements("custody_modification", 4, 4),
        ]);

        assert_eq!(summary.complaints, 3);
        assert_eq!(summary.all_satisfied, 2);
        assert_eq!(summary.total_elements, 14);
        assert_eq!(summary.satisfied_elements, 12);
        assert_eq!(
            summary.by_category["negligence"],
            CategoryElements {
                complaints: 2,
                all_satisfied: 1
            }
        );

        let report = summary.to_string();
        assert!(report.contains("  negligence: 1/2 complaints with all elements (50.0%)"));
        assert!(report.contains("  custody_modification: 1/1 complaints with all elements (100.0%)"));
    }
}
