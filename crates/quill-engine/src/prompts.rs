use quill_core::suggest::WritingFormat;

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED BUILDING BLOCKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Reply contract understood by `quill_core::suggest::parse`
const OUTPUT_FORMAT: &str = r#"Format each suggestion exactly like this:
Type: STYLE/PLOT/CHARACTER/DIALOGUE/STRUCTURE
Original text: [the part to improve]
Improved version: [your improved version]"#;

const SUGGESTION_STEPS: &str = r#"For each suggestion, provide:
1. The specific part that needs improvement
2. A clear explanation of why it should be improved
3. The improved version of that part"#;

// ═══════════════════════════════════════════════════════════════════════════════
// PROMPTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Prompt for the remote provider. `focus` adds an editorial instruction
/// ahead of the reply contract.
pub fn suggestion_prompt(content: &str, format: WritingFormat, focus: Option<&str>) -> String {
    let mut prompt = format!(
        "As a writing assistant, analyze this {} text and suggest improvements:\n\n\"{}\"\n\n{}\n\n",
        format.as_str(),
        content,
        SUGGESTION_STEPS
    );
    if let Some(focus) = focus.map(str::trim).filter(|f| !f.is_empty()) {
        prompt.push_str("Focus: ");
        prompt.push_str(focus);
        prompt.push_str("\n\n");
    }
    prompt.push_str(OUTPUT_FORMAT);
    prompt.push_str("\n\nGive 2-3 specific, actionable suggestions.");
    prompt
}
