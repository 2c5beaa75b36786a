use std::collections::BTreeSet;

use crate::llm::{ChatCompletion, CompletionError, SamplingConfig};
use crate::pipeline::types::{Format, Platform};

pub(crate) const CAPTION_SYSTEM_PROMPT: &str = "You are a social media copywriter for content creators. \
You write captions that sound human, stop the scroll and fit the platform they are posted on. \
Reply ONLY with the caption text, ready to paste, without quotes and without any introduction.";

fn platform_guidance(platform: Platform) -> &'static str {
    match platform {
        Platform::Instagram => "Instagram: an engaging first line, a short story, 3 to 5 relevant hashtags at the end.",
        Platform::Tiktok => "TikTok: hook in the first words, punchy and casual, 2 or 3 trending-style hashtags.",
        Platform::Snapchat => "Snapchat: very short, one line, playful.",
        Platform::Facebook => "Facebook: conversational, may end with a question to invite comments, few or no hashtags.",
    }
}

fn format_guidance(format: Format) -> &'static str {
    match format {
        Format::Post => "a feed post",
        Format::Story => "a story (keep it short, it is read in seconds)",
        Format::Reel => "a short vertical video (reel)",
    }
}

pub fn build_caption_user_message(
    user_text: &str,
    format: Format,
    platforms: &BTreeSet<Platform>,
) -> String {
    let names = platforms
        .iter()
        .map(Platform::display_name)
        .collect::<Vec<_>>()
        .join(", ");
    let mut lines = vec![
        format!("Write one caption for {} published on {}.", format_guidance(format), names),
        format!("Content brief: {}", user_text.trim()),
        "Platform guidance:".to_string(),
    ];
    lines.extend(platforms.iter().map(|platform| format!("- {}", platform_guidance(*platform))));
    if platforms.len() > 1 {
        lines.push("The same caption is reused on every platform listed, so balance their conventions.".to_string());
    }
    lines.join("\n")
}

pub async fn caption_for(
    client: &dyn ChatCompletion,
    user_text: &str,
    format: Format,
    platforms: &BTreeSet<Platform>,
    sampling: SamplingConfig,
) -> Result<String, CompletionError> {
    let user_message = build_caption_user_message(user_text, format, platforms);
    client
        .complete(CAPTION_SYSTEM_PROMPT, &user_message, sampling)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::parse_platforms;

    #[test]
    fn message_names_format_and_each_platform() {
        let platforms = parse_platforms("tiktok,instagram").unwrap();
        let message = build_caption_user_message(" new drop ", Format::Reel, &platforms);
        assert!(message.contains("reel"));
        assert!(message.contains("published on Instagram, TikTok."));
        assert!(message.contains("Content brief: new drop"));
        assert!(message.contains("- Instagram:"));
        assert!(message.contains("- TikTok:"));
        assert!(!message.contains("- Facebook:"));
        assert!(message.contains("balance their conventions"));
    }

    #[test]
    fn single_platform_has_no_balancing_note() {
        let platforms = parse_platforms("snapchat").unwrap();
        let message = build_caption_user_message("hi", Format::Story, &platforms);
        assert!(!message.contains("balance"));
    }
}
