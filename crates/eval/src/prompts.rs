pub fn build_support_prompt(citation: &str, proposition: &str, opinion_text: &str) -> String {
    format!(
        r#"You are a legal expert evaluating whether a court opinion supports a specific legal proposition.

CASE CITATION: {citation}
PROPOSITION CLAIMED: {proposition}

OPINION TEXT:
{opinion_text}

Your task:
1. Determine if this court opinion actually supports the proposition it's cited for
2. A citation "supports" a proposition if the case establishes, affirms, or provides authority for the legal principle stated
3. Consider whether:
   - The case actually addresses the legal issue mentioned in the proposition
   - The holding or reasoning aligns with what the proposition claims
   - The citation is used accurately (not taken out of context or misrepresenting the holding)

Provide your assessment with:
- supports_proposition: true if the case supports the claimed proposition, false otherwise
- confidence: "high", "medium", or "low" based on how clearly the opinion addresses the proposition
- reasoning: Explain your conclusion in 2-3 sentences
- relevant_excerpt: Quote the most relevant passage from the opinion (if found), limited to ~100 words
"#
    )
}

const ELEMENTS_INSTRUCTIONS: &str = "Elements do NOT need to be explicitly named or called out by the specific legal term. The complaint just needs to allege facts that establish each element.";

/// Prompt asking whether a complaint pleads each element of a cause of action.
///
/// `elements` are the numbered element descriptions, `example` illustrates
/// an element established without naming it.
pub fn build_elements_prompt(
    cause: &str,
    elements: &[&str],
    example: &str,
    complaint_text: &str,
) -> String {
    let numbered: Vec<String> = elements
        .iter()
        .enumerate()
        .map(|(i, element)| format!("{}. {}", i + 1, element))
        .collect();

    format!(
        r#"You are a legal expert evaluating whether a {cause} properly establishes the requisite elements of the cause of action.

The required elements are:
{elements}

IMPORTANT: {ELEMENTS_INSTRUCTIONS} For example, {example}

Evaluate whether each element is adequately pled based on the factual allegations in the complaint. For every element give `satisfied` and a brief `reasoning` explaining how the element is or is not established.

COMPLAINT TEXT:
{complaint_text}
"#,
        elements = numbered.join("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_prompt_fields() {
        let prompt = build_support_prompt(
            "Smith v. Jones, 123 F.3d 456",
            "Landlords owe a duty of care",
            "The court held defendants owed a duty...",
        );
        assert!(prompt.contains("CASE CITATION: Smith v. Jones, 123 F.3d 456"));
        assert!(prompt.contains("PROPOSITION CLAIMED: Landlords owe a duty of care"));
        assert!(prompt.contains("OPINION TEXT:\nThe court held"));
    }

    #[test]
    fn test_elements_prompt_numbers_elements() {
        let prompt = build_elements_prompt(
            "negligence complaint",
            &["Duty", "Breach"],
            "describing a store owner's upkeep establishes duty.",
            "Plaintiff slipped.",
        );
        assert!(prompt.contains("1. Duty\n2. Breach"));
        assert!(prompt.ends_with("Plaintiff slipped.\n"));
    }
}
