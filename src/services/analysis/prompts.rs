/// Main instruction sent with the photograph.
pub fn inspection_prompt(filename: &str, request: &str) -> String {
    format!(
        "You are an expert building inspector analyzing a building inspection image. \
         Image filename: {filename}. Analysis request: {request}. \
         Please provide a detailed analysis including: 1. Structural assessment, \
         2. Safety concerns, 3. Maintenance recommendations, 4. Priority level, \
         5. Estimated confidence level. Assess against Queensland building standards."
    )
}

/// Used when the image bytes could not be loaded.
pub fn text_only_prompt(filename: &str, request: &str) -> String {
    format!(
        "You are an expert building inspector. I need to analyze a building inspection image \
         but the image data is not available. Image filename: {filename}. \
         Analysis request: {request}. Please provide general building inspection guidance and \
         explain that the actual image cannot be analyzed without the image data. \
         Focus on Queensland building standards and typical inspection points."
    )
}

pub fn issues_prompt(analysis_text: &str) -> String {
    format!(
        "Extract a list of specific building issues from this analysis text. \
         Return only the issues as a JSON array of strings. \
         Analysis text: {analysis_text} \
         Format: [\"issue1\", \"issue2\", \"issue3\"]"
    )
}

pub fn recommendations_prompt(issues: &[String], analysis_text: &str) -> String {
    format!(
        "Generate specific maintenance recommendations for these building issues. \
         Return only the recommendations as a JSON array of strings. \
         Issues: {issues:?} Analysis context: {analysis_text} \
         Format: [\"recommendation1\", \"recommendation2\", \"recommendation3\"]"
    )
}

/// Chat turn about a single photograph.
pub fn chat_prompt(filename: &str, question: &str, history: &[(String, String)]) -> String {
    let mut prompt = format!(
        "You are an expert building inspector answering questions about the building \
         inspection image '{filename}'. Answer with reference to Queensland building standards.\n"
    );
    for (user, assistant) in history {
        prompt.push_str(&format!("User: {user}\nInspector: {assistant}\n"));
    }
    prompt.push_str(&format!("User: {question}\nInspector:"));
    prompt
}

pub const FALLBACK_ISSUES: [&str; 3] = [
    "AI analysis unavailable",
    "Manual inspection required",
    "Technical error occurred",
];

pub const FALLBACK_RECOMMENDATIONS: [&str; 3] = [
    "Perform manual inspection",
    "Consult licensed building inspector",
    "Retry AI analysis later",
];

/// Clearly labelled report recorded when the completion service fails.
pub fn fallback_report(filename: &str, error: &str) -> String {
    let error: String = error.chars().take(200).collect();
    format!(
        "# Building Inspection Analysis - {filename}\n\n\
         **Status:** AI analysis unavailable - fallback report generated\n\n\
         **Error:** {error}\n\n\
         ## Manual Inspection Required\n\n\
         Unable to perform automated AI analysis. Please conduct a manual inspection covering:\n\
         1. Structural assessment: cracks, settling, load-bearing elements, foundations\n\
         2. Safety concerns: immediate hazards, electrical and plumbing, fire safety\n\
         3. Maintenance requirements: repairs, preventive maintenance, weatherproofing\n\
         4. Queensland building standards: code compliance, permits, accessibility\n\n\
         **Recommendation:** Have a qualified building inspector review this image according \
         to Queensland Building and Construction Commission standards."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_carry_context() {
        let p = inspection_prompt("roof.jpg", "check flashing");
        assert!(p.contains("roof.jpg"));
        assert!(p.contains("check flashing"));

        let chat = chat_prompt(
            "roof.jpg",
            "Is it urgent?",
            &[("What is that?".into(), "Rust.".into())],
        );
        assert!(chat.contains("User: What is that?\nInspector: Rust.\n"));
        assert!(chat.ends_with("User: Is it urgent?\nInspector:"));
    }

    #[test]
    fn test_fallback_report_truncates_error() {
        let report = fallback_report("a.jpg", &"x".repeat(500));
        assert!(report.contains("fallback report generated"));
        assert!(!report.contains(&"x".repeat(201)));
    }
}
