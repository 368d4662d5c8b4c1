pub mod companion_llm;
pub mod db;
pub mod guidance_llm;
pub mod image_llm;
pub mod insight_llm;
pub mod mood_llm;
pub mod title_llm;

pub use companion_llm::OpenAiCompanionAdapter;
pub use db::DbAdapter;
pub use guidance_llm::OpenAiGuidanceAdapter;
pub use image_llm::ImageApiAdapter;
pub use insight_llm::OpenAiInsightAdapter;
pub use mood_llm::OpenAiMoodAdapter;
pub use title_llm::OpenAiTitleAdapter;

/// Trims a model reply down to the JSON document inside it.
///
/// Models occasionally wrap JSON-mode answers in Markdown code fences or
/// lead-in prose even when told not to; the parsers in this module all go
/// through this helper before deserializing.
pub(crate) fn extract_json_block(text: &str) -> &str {
    let trimmed = text.trim();
    let without_fence = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end_matches("```"))
        .unwrap_or(trimmed);

    let start = without_fence.find(['{', '[']);
    let end = without_fence.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if start <= end => &without_fence[start..=end],
        _ => without_fence.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::extract_json_block;

    #[test]
    fn passes_plain_json_through() {
        assert_eq!(extract_json_block(r#"{"mood": "Okay"}"#), r#"{"mood": "Okay"}"#);
    }

    #[test]
    fn unwraps_code_fences_and_lead_in_prose() {
        let fenced = "```json\n{\"mood\": \"Good\"}\n```";
        assert_eq!(extract_json_block(fenced), "{\"mood\": \"Good\"}");

        let chatty = "Sure! Here is the JSON:\n{\"steps\": [\"breathe\"]}";
        assert_eq!(extract_json_block(chatty), "{\"steps\": [\"breathe\"]}");
    }
}
