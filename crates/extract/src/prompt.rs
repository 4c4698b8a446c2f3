pub fn build_extraction_prompt(complaint_text: &str) -> String {
    format!(
        r#"You are a legal citation extraction system. Your task is to identify all legal citations from the provided complaint text AND the specific proposition or legal claim each citation is used to support.

Extract two types of citations:
1. Case citations (e.g., "Smith v. Jones, 123 F.3d 456 (1st Cir. 2020)")
2. Statutory citations (e.g., "42 U.S.C. § 1983", "M.G.L. c. 93A, § 2", "G.L. c. 231, § 85")

For each citation, extract:
- raw_text: The citation exactly as it appears in the text
- citation_type: Either "case" or "statute"
- proposition: The complete sentence or legal claim that the citation is supporting, taken from the complaint text that precedes or follows the citation

RULES:
- For inline citations like "_See Smith v. Jones,_ 123 F.3d 456", the proposition is the sentence containing or preceding the citation
- Include the full proposition text, not just a summary
- Each citation should appear only once, even if repeated in the document

COMPLAINT TEXT:
{}
"#,
        complaint_text
    )
}
