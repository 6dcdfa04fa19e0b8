//! Prompt and template construction for the generate and refine flows.
//!
//! Each flow sends the model a system + user message pair. The user message
//! embeds a JSON template the model is asked to fill in and return verbatim
//! in shape.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::character::profile::{CharacterProfile, DEFAULT_MODEL_PROVIDER, DEFAULT_VOICE_MODEL};
use crate::llms::base_llm::LLMMessage;

/// Captures a capitalized name after the keyword `name`, `name is` or `name:`.
/// The keyword is case-insensitive; the captured words must be capitalized.
static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i:\bname\b)(?:\s+(?i:is)\b)?\s*:?\s*([A-Z][A-Za-z'-]*(?:[ \t]+[A-Z][A-Za-z'-]*)*)(?:[[:punct:]]|\s|$)",
    )
    .unwrap()
});

const GENERATION_SYSTEM_PROMPT: &str = "You are an expert character designer for conversational AI agents. \
You write vivid, consistent personas with a distinct voice. \
Respond with a single valid JSON object that follows the provided template exactly. \
Do not wrap the JSON in markdown and do not add commentary before or after it.";

const REFINEMENT_SYSTEM_PROMPT: &str = "You are an expert character designer refining an existing conversational AI persona. \
Keep what works, apply the requested changes, and stay consistent with the character's established voice. \
Respond with a single valid JSON object that follows the provided template exactly. \
Do not wrap the JSON in markdown and do not add commentary before or after it.";

const FIELD_GUIDE: &str = "Field guide:
- bio: 5 to 10 short statements describing who the character is.
- lore: 5 to 10 backstory facts, anecdotes or secrets.
- topics: subjects the character knows about and likes to discuss.
- messageExamples: 3 to 5 conversations; each is a list of {\"user\": ..., \"content\": {\"text\": ...}} turns alternating between \"{{user1}}\" and the character's name.
- postExamples: 5 to 10 standalone social posts in the character's voice.
- style.all, style.chat, style.post: concrete writing-style rules for every context, chat replies and posts.
- adjectives: single words describing the character.
- people: notable people the character knows, if any.
Every field must be present. Use arrays of strings wherever the template shows an array.";

/// A system + user message pair ready to send to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemPromptResult {
    /// The system prompt component.
    pub system: String,
    /// The user prompt component, including the embedded template.
    pub user: String,
}

impl SystemPromptResult {
    /// Chat-completion messages in send order.
    pub fn to_messages(&self) -> Vec<LLMMessage> {
        vec![LLMMessage::system(&self.system), LLMMessage::user(&self.user)]
    }
}

/// Pull a suggested character name out of free-form instructions.
///
/// Heuristic: the first `name [is][:] Capitalized Words` match
/// wins, and no match yields an empty string.
pub fn extract_character_name(text: &str) -> String {
    NAME_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn empty_narrative_fields(template: &mut Map<String, Value>) {
    for key in ["bio", "lore"] {
        template.insert(key.to_string(), json!([]));
    }
    template.insert("messageExamples".to_string(), json!([]));
    template.insert("postExamples".to_string(), json!([]));
    template.insert("topics".to_string(), json!([]));
    template.insert(
        "style".to_string(),
        json!({ "all": [], "chat": [], "post": [] }),
    );
    template.insert("adjectives".to_string(), json!([]));
}

/// Template for a brand new character.
pub fn generation_template(suggested_name: &str) -> Value {
    let mut template = Map::new();
    template.insert("name".to_string(), json!(suggested_name));
    template.insert("clients".to_string(), json!([]));
    template.insert("modelProvider".to_string(), json!(DEFAULT_MODEL_PROVIDER));
    template.insert(
        "settings".to_string(),
        json!({ "secrets": {}, "voice": { "model": DEFAULT_VOICE_MODEL } }),
    );
    template.insert("plugins".to_string(), json!([]));
    template.insert("knowledge".to_string(), json!([]));
    empty_narrative_fields(&mut template);
    template.insert("people".to_string(), json!([]));
    Value::Object(template)
}

/// Template for refining `existing`.
///
/// Structural fields are carried over as-is; `name` and `knowledge` only
/// when the existing profile has them. Narrative fields are left empty for
/// the model to rewrite.
pub fn refinement_template(existing: &CharacterProfile) -> Value {
    let mut template = Map::new();
    if !existing.name.is_empty() {
        template.insert("name".to_string(), json!(existing.name));
    }
    template.insert("clients".to_string(), json!(existing.clients));
    template.insert("modelProvider".to_string(), json!(existing.model_provider));
    template.insert("settings".to_string(), json!(existing.settings));
    template.insert("plugins".to_string(), json!(existing.plugins));
    if !existing.knowledge.is_empty() {
        template.insert("knowledge".to_string(), json!(existing.knowledge));
    }
    empty_narrative_fields(&mut template);
    template.insert("people".to_string(), json!(existing.people));
    Value::Object(template)
}

fn render(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Messages for the generate flow.
pub fn generation_prompt(instructions: &str, template: &Value) -> SystemPromptResult {
    let user = format!(
        "Create a character from this description:\n\n{}\n\n{}\n\nFill in this template and return only the JSON object:\n{}",
        instructions.trim(),
        FIELD_GUIDE,
        render(template),
    );
    SystemPromptResult {
        system: GENERATION_SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Messages for the refine flow.
pub fn refinement_prompt(
    instructions: &str,
    existing: &CharacterProfile,
    template: &Value,
) -> SystemPromptResult {
    let current = serde_json::to_value(existing)
        .map(|value| render(&value))
        .unwrap_or_default();
    let user = format!(
        "Here is the current character:\n{}\n\nRefine it according to these instructions:\n\n{}\n\n{}\n\nFill in this template and return only the JSON object. \
Keep the values already present in the template unchanged:\n{}",
        current,
        instructions.trim(),
        FIELD_GUIDE,
        render(template),
    );
    SystemPromptResult {
        system: REFINEMENT_SYSTEM_PROMPT.to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_character_name() {
        assert_eq!(
            extract_character_name("A witch whose name is Luna Star, raised by crows"),
            "Luna Star"
        );
        assert_eq!(extract_character_name("Name: Zed."), "Zed");
        assert_eq!(extract_character_name("NAME IS Captain Nemo and he sails"), "Captain Nemo");
        assert_eq!(extract_character_name("her name Ada"), "Ada");
        assert_eq!(extract_character_name("the name is Orion"), "Orion");
    }

    #[test]
    fn test_extract_character_name_without_match() {
        assert_eq!(extract_character_name("a grumpy wizard"), "");
        assert_eq!(extract_character_name("no name here"), "");
        assert_eq!(extract_character_name("someone named Bob"), "");
        assert_eq!(extract_character_name(""), "");
    }

    #[test]
    fn test_generation_template_shape() {
        let template = generation_template("Nova");
        assert_eq!(template["name"], "Nova");
        assert_eq!(template["modelProvider"], DEFAULT_MODEL_PROVIDER);
        assert_eq!(template["settings"]["voice"]["model"], DEFAULT_VOICE_MODEL);
        assert_eq!(template["style"], json!({"all": [], "chat": [], "post": []}));
        for key in ["bio", "lore", "knowledge", "messageExamples", "postExamples", "topics", "adjectives", "people", "clients", "plugins"] {
            assert_eq!(template[key], json!([]), "key: {}", key);
        }
    }

    #[test]
    fn test_refinement_template_carries_structure() {
        let mut existing = CharacterProfile {
            clients: vec!["discord".to_string()],
            plugins: vec!["image-gen".to_string()],
            people: vec!["Grace".to_string()],
            bio: vec!["Old bio.".to_string()],
            ..Default::default()
        };
        existing
            .settings
            .secrets
            .insert("TOKEN".to_string(), "t".to_string());

        let template = refinement_template(&existing);
        let obj = template.as_object().unwrap();
        assert!(!obj.contains_key("name"));
        assert!(!obj.contains_key("knowledge"));
        assert_eq!(template["clients"], json!(["discord"]));
        assert_eq!(template["plugins"], json!(["image-gen"]));
        assert_eq!(template["people"], json!(["Grace"]));
        assert_eq!(template["settings"]["secrets"]["TOKEN"], "t");
        assert_eq!(template["bio"], json!([]));

        existing.name = "Ada".to_string();
        existing.knowledge = vec!["Fact.".to_string()];
        let template = refinement_template(&existing);
        assert_eq!(template["name"], "Ada");
        assert_eq!(template["knowledge"], json!(["Fact."]));
    }

    #[test]
    fn test_prompts_embed_template_and_instructions() {
        let template = generation_template("Nova");
        let prompt = generation_prompt("  a starship pilot  ", &template);
        assert!(prompt.system.contains("JSON"));
        assert!(prompt.user.contains("a starship pilot"));
        assert!(prompt.user.contains("\"name\": \"Nova\""));

        let messages = prompt.to_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");

        let existing = CharacterProfile {
            name: "Nova".to_string(),
            bio: vec!["Flies fast.".to_string()],
            ..Default::default()
        };
        let refined = refinement_prompt("make her older", &existing, &refinement_template(&existing));
        assert!(refined.user.contains("Flies fast."));
        assert!(refined.user.contains("make her older"));
    }
}
