//! Creator style analysis from sample texts.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::llm::{ChatCompletion, CompletionError, SamplingConfig};

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("code fence pattern is valid")
});

const STYLE_SYSTEM_PROMPT: &str = "You are an expert in writing-style analysis for content creators. \
You extract the tone, the vibe keywords and the writing style of a creator from their texts. \
Answer with a single JSON object and nothing else.";

const SAMPLE_SEPARATOR: &str = "\n---\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleProfile {
    pub tone: String,
    #[serde(default)]
    pub vibe_keywords: Vec<String>,
    #[serde(default)]
    pub writing_style: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("style analysis answer was not a valid profile: {0}")]
    Unparseable(String),
}

pub fn build_style_user_message(samples: &[String]) -> String {
    let combined = samples
        .iter()
        .map(|sample| sample.trim())
        .filter(|sample| !sample.is_empty())
        .collect::<Vec<_>>()
        .join(SAMPLE_SEPARATOR);
    format!(
        "Analyze these sample texts from the creator:\n\n{combined}\n\n\
Return a JSON object with:\n\
- tone: the dominant tone (e.g. \"Witty\", \"Professional\", \"Casual\", \"Inspirational\")\n\
- vibe_keywords: 3 to 5 keywords describing the vibe (e.g. [\"energetic\", \"relatable\", \"growth\"])\n\
- writing_style: a short description of the style (e.g. \"Short punchy sentences with emojis\")"
    )
}

/// Accepts a bare JSON object, a fenced ```json block, or an object embedded
/// in surrounding prose.
pub fn parse_style_profile(answer: &str) -> Result<StyleProfile, StyleError> {
    let candidate = match CODE_FENCE.captures(answer) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(answer),
        None => answer,
    };
    let candidate = match (candidate.find('{'), candidate.rfind('}')) {
        (Some(start), Some(end)) if start < end => &candidate[start..=end],
        _ => candidate,
    };

    let mut profile: StyleProfile = serde_json::from_str(candidate.trim())
        .map_err(|err| StyleError::Unparseable(err.to_string()))?;
    profile.tone = profile.tone.trim().to_string();
    profile.writing_style = profile.writing_style.trim().to_string();
    profile.vibe_keywords = profile
        .vibe_keywords
        .into_iter()
        .map(|keyword| keyword.trim().to_string())
        .filter(|keyword| !keyword.is_empty())
        .collect();
    if profile.tone.is_empty() {
        return Err(StyleError::Unparseable("tone is empty".to_string()));
    }
    Ok(profile)
}

pub async fn analyze_style(
    client: &dyn ChatCompletion,
    samples: &[String],
    sampling: SamplingConfig,
) -> Result<StyleProfile, StyleError> {
    let answer = client
        .complete(STYLE_SYSTEM_PROMPT, &build_style_user_message(samples), sampling)
        .await?;
    parse_style_profile(&answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let profile = parse_style_profile(
            r#"{"tone":"Witty","vibe_keywords":["creative"," modern ",""],"writing_style":"Emojis"}"#,
        )
        .unwrap();
        assert_eq!(profile.tone, "Witty");
        assert_eq!(profile.vibe_keywords, vec!["creative", "modern"]);
    }

    #[test]
    fn parses_fenced_and_embedded_json() {
        let fenced = "Sure!\n```json\n{\"tone\":\"Casual\",\"vibe_keywords\":[],\"writing_style\":\"Loose\"}\n```";
        assert_eq!(parse_style_profile(fenced).unwrap().tone, "Casual");

        let embedded = "Here you go: {\"tone\":\"Calm\",\"vibe_keywords\":[\"zen\"],\"writing_style\":\"Slow\"} Enjoy.";
        assert_eq!(parse_style_profile(embedded).unwrap().vibe_keywords, vec!["zen"]);
    }

    #[test]
    fn rejects_prose_and_empty_tone() {
        assert!(matches!(
            parse_style_profile("The tone is witty."),
            Err(StyleError::Unparseable(_))
        ));
        assert!(parse_style_profile(
            r#"{"tone":" ","vibe_keywords":[],"writing_style":"x"}"#
        )
        .is_err());
    }

    #[test]
    fn user_message_joins_non_blank_samples() {
        let message = build_style_user_message(&[
            "first post".to_string(),
            "  ".to_string(),
            "second post".to_string(),
        ]);
        assert!(message.contains("first post\n---\nsecond post"));
    }
}
