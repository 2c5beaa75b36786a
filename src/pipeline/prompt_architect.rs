//! Builds the system/user message pair for master-prompt generation.
//!
//! Everything here is pure string assembly: identical input always renders
//! identical messages, and missing profile fields simply drop their line.

use crate::pipeline::types::{GenerationMode, GenerationRequest, ProfileContext};

const ROLE: &str = "You are an expert AI art director specialized in viral social media content.";

const MISSION: &str = "YOUR MISSION: Turn the user's request into an ULTRA-DETAILED text-to-image PROMPT optimized for image models such as Imagen 3 and Flux.";

const CONSTRAINTS: &[&str] = &[
    "CONSTRAINTS:",
    "- The prompt must be written in ENGLISH.",
    "- Describe the scene, the lighting, the textures and the camera angle.",
    "- Subtly weave in the requested visual style elements.",
    "- Reply ONLY with the prompt itself, without quotes and without any introduction.",
];

/// Cleaned-up view of a creator profile, ready to render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContext {
    visual_style: Vec<String>,
    tone: Vec<String>,
    niche: String,
    sub_niche: String,
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn clean_text(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}

impl PromptContext {
    pub fn from_profile(profile: &ProfileContext) -> Self {
        PromptContext {
            visual_style: clean_list(&profile.visual_style),
            tone: clean_list(&profile.tone),
            niche: clean_text(profile.niche.as_deref()),
            sub_niche: clean_text(profile.sub_niche.as_deref()),
        }
    }

    fn niche_line(&self) -> Option<String> {
        if self.niche.is_empty() {
            return None;
        }
        if self.sub_niche.is_empty() {
            Some(format!("Niche: {}.", self.niche))
        } else {
            Some(format!("Niche: {} ({}).", self.niche, self.sub_niche))
        }
    }

    fn style_line(&self) -> Option<String> {
        if self.visual_style.is_empty() {
            return None;
        }
        Some(format!("Target visual style: {}.", self.visual_style.join(", ")))
    }

    fn tone_line(&self) -> Option<String> {
        if self.tone.is_empty() {
            return None;
        }
        Some(format!("Communication tone: {}.", self.tone.join(", ")))
    }
}

pub fn build_system_prompt(context: &PromptContext) -> String {
    let mut lines: Vec<String> = vec![ROLE.to_string()];
    lines.extend(context.niche_line());
    lines.extend(context.style_line());
    lines.extend(context.tone_line());
    lines.push(MISSION.to_string());
    lines.extend(CONSTRAINTS.iter().map(|line| line.to_string()));
    lines.join("\n")
}

fn hint_line(label: &str, value: Option<&str>) -> Option<String> {
    let value = value.map(str::trim).filter(|value| !value.is_empty())?;
    Some(format!("{label}: {value}"))
}

pub fn build_user_message(request: &GenerationRequest) -> String {
    let mut lines = vec![format!("User Request: {}", request.user_text.trim())];
    lines.extend(hint_line(
        "Image description / elements",
        request.hints.image_description.as_deref(),
    ));
    lines.extend(hint_line("Target style", request.hints.style.as_deref()));
    lines.extend(hint_line("Mood", request.hints.mood.as_deref()));
    if request.mode == GenerationMode::ImageConditioned {
        lines.push(
            "A reference photo is attached to the image request; write the prompt as an edit of that photo and keep its main subject recognizable."
                .to_string(),
        );
    }
    lines.push(String::new());
    lines.push("Generate the optimized image prompt now.".to_string());
    lines.join("\n")
}

/// Renders both messages for one request.
pub fn build_messages(request: &GenerationRequest) -> (String, String) {
    let context = PromptContext::from_profile(&request.profile);
    (build_system_prompt(&context), build_user_message(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{CreativeHints, ReferenceImage};

    fn profile(tone: &[&str], style: &[&str], niche: Option<&str>, sub: Option<&str>) -> ProfileContext {
        ProfileContext {
            tone: tone.iter().map(|v| v.to_string()).collect(),
            visual_style: style.iter().map(|v| v.to_string()).collect(),
            niche: niche.map(str::to_string),
            sub_niche: sub.map(str::to_string),
        }
    }

    #[test]
    fn empty_context_renders_only_fixed_sections() {
        let prompt = build_system_prompt(&PromptContext::default());
        assert!(prompt.starts_with(ROLE));
        assert!(!prompt.contains("Niche"));
        assert!(!prompt.contains("visual style:"));
        assert!(!prompt.contains("tone:"));
        assert!(!prompt.contains("\n\n"));
        assert!(prompt.contains("ENGLISH"));
        assert!(prompt.contains("lighting"));
        assert!(prompt.contains("camera angle"));
        assert!(prompt.contains("without quotes"));
    }

    #[test]
    fn full_context_renders_every_line_in_order() {
        let context = PromptContext::from_profile(&profile(
            &["Witty", "Bold"],
            &["Minimalist", "Pastel"],
            Some("Fashion"),
            Some("Streetwear"),
        ));
        let prompt = build_system_prompt(&context);
        let niche = prompt.find("Niche: Fashion (Streetwear).").unwrap();
        let style = prompt.find("Target visual style: Minimalist, Pastel.").unwrap();
        let tone = prompt.find("Communication tone: Witty, Bold.").unwrap();
        assert!(niche < style && style < tone);
    }

    #[test]
    fn sub_niche_without_niche_is_ignored() {
        let context = PromptContext::from_profile(&profile(&[], &[], None, Some("Streetwear")));
        assert!(!build_system_prompt(&context).contains("Streetwear"));

        let context = PromptContext::from_profile(&profile(&[], &[], Some("Food"), Some("  ")));
        assert!(build_system_prompt(&context).contains("Niche: Food."));
    }

    #[test]
    fn blank_list_entries_are_dropped() {
        let context = PromptContext::from_profile(&profile(&["", "  "], &[" Moody "], None, None));
        let prompt = build_system_prompt(&context);
        assert!(!prompt.contains("Communication tone"));
        assert!(prompt.contains("Target visual style: Moody."));
    }

    #[test]
    fn rendering_is_deterministic() {
        let context = PromptContext::from_profile(&profile(&["Calm"], &["Film"], Some("Travel"), None));
        assert_eq!(build_system_prompt(&context), build_system_prompt(&context.clone()));
    }

    #[test]
    fn user_message_includes_present_hints_only() {
        let mut request = GenerationRequest::text_only("  sunset over mountains ");
        request.hints = CreativeHints {
            image_description: Some("snowy peaks".to_string()),
            style: None,
            mood: Some(" ".to_string()),
        };
        let message = build_user_message(&request);
        assert!(message.starts_with("User Request: sunset over mountains\n"));
        assert!(message.contains("Image description / elements: snowy peaks"));
        assert!(!message.contains("Target style"));
        assert!(!message.contains("Mood"));
        assert!(!message.contains("reference photo"));
        assert!(message.ends_with("Generate the optimized image prompt now."));
    }

    #[test]
    fn image_conditioned_message_mentions_reference() {
        let image = ReferenceImage {
            bytes: vec![1],
            mime_type: "image/jpeg".to_string(),
            file_name: None,
        };
        let request = GenerationRequest::image_conditioned("me with a cap", Some(image));
        let (system, user) = build_messages(&request);
        assert!(system.starts_with(ROLE));
        assert!(user.contains("reference photo"));
    }
}
