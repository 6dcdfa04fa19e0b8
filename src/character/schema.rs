//! Character schema enforcement.
//!
//! Turns a parsed JSON object into a [`CharacterProfile`]. Narrative fields
//! the model left out are an error; structural damage (wrong container
//! types, missing `style`, object-shaped knowledge entries) is repaired.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::character::profile::{
    CharacterProfile, CharacterSettings, Conversation, MessageContent, MessageExample,
    StyleGuide, VoiceSettings, DEFAULT_MODEL_PROVIDER,
};
use crate::utilities::string_utils::ensure_period;

/// Fields the model must always supply.
pub const REQUIRED_FIELDS: &[&str] = &[
    "bio",
    "lore",
    "topics",
    "style",
    "adjectives",
    "messageExamples",
    "postExamples",
];

/// Replacement for knowledge entries that carry no usable text.
pub const INVALID_KNOWLEDGE_ENTRY: &str = "Invalid knowledge entry.";

/// Keys probed, in order, for the text of an object-shaped knowledge entry.
const KNOWLEDGE_TEXT_KEYS: &[&str] = &["text", "content", "value"];

/// The parsed object omitted one or more required narrative fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Missing required fields: {}", .fields.join(", "))]
pub struct MissingFieldsError {
    /// Every absent field, in [`REQUIRED_FIELDS`] order.
    pub fields: Vec<String>,
}

/// Errors from [`enforce`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Character data must be a JSON object")]
    NotAnObject,

    #[error(transparent)]
    MissingFields(#[from] MissingFieldsError),
}

/// Caller-controlled enforcement behaviour.
#[derive(Debug, Clone, Default)]
pub struct EnforceOptions {
    /// When set, replaces the coerced `knowledge` verbatim once every other
    /// field has been normalized.
    pub preserved_knowledge: Option<Vec<String>>,
}

impl EnforceOptions {
    /// Options that keep `knowledge` exactly as given.
    pub fn preserve_knowledge(knowledge: Vec<String>) -> Self {
        Self {
            preserved_knowledge: Some(knowledge),
        }
    }
}

/// Validate and coerce a parsed object into a [`CharacterProfile`].
///
/// A required field is missing when its key is absent or its value is
/// `false`, `""` or numeric zero. An explicit `null` is treated as present
/// and coerced like any other malformed value.
pub fn enforce(value: &Value, options: &EnforceOptions) -> Result<CharacterProfile, SchemaError> {
    let obj = value.as_object().ok_or(SchemaError::NotAnObject)?;

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| is_missing(obj.get(**field)))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(MissingFieldsError { fields: missing }.into());
    }

    let mut profile = coerce_profile(value)?;

    if let Some(preserved) = &options.preserved_knowledge {
        profile.knowledge = preserved.clone();
    }

    Ok(profile)
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

/// Coerce every field of `value` to its canonical shape without checking
/// required fields.
///
/// Used directly for caller-supplied profiles, which may legitimately be
/// incomplete.
pub fn coerce_profile(value: &Value) -> Result<CharacterProfile, SchemaError> {
    let obj = value.as_object().ok_or(SchemaError::NotAnObject)?;

    Ok(CharacterProfile {
        name: obj.get("name").and_then(scalar_text).unwrap_or_default(),
        clients: string_list("clients", obj.get("clients")),
        model_provider: obj
            .get("modelProvider")
            .and_then(scalar_text)
            .unwrap_or_else(|| DEFAULT_MODEL_PROVIDER.to_string()),
        settings: settings(obj.get("settings")),
        plugins: string_list("plugins", obj.get("plugins")),
        bio: string_list("bio", obj.get("bio")),
        lore: string_list("lore", obj.get("lore")),
        knowledge: knowledge(obj.get("knowledge")),
        message_examples: conversations(obj.get("messageExamples")),
        post_examples: string_list("postExamples", obj.get("postExamples")),
        topics: string_list("topics", obj.get("topics")),
        style: style(obj.get("style")),
        adjectives: string_list("adjectives", obj.get("adjectives")),
        people: string_list("people", obj.get("people")),
        extra: obj
            .iter()
            .filter(|(key, _)| !CharacterProfile::CANONICAL_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    })
}

/// Coerce one knowledge entry into a period-terminated sentence.
pub fn knowledge_entry(entry: &Value) -> String {
    match entry {
        Value::String(text) => {
            ensure_period(text).unwrap_or_else(|| INVALID_KNOWLEDGE_ENTRY.to_string())
        }
        Value::Object(fields) => {
            let text = KNOWLEDGE_TEXT_KEYS
                .iter()
                .filter_map(|key| fields.get(*key))
                .find(|value| !value.is_null() && value.as_str() != Some(""))
                .map(|value| match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| entry.to_string());
            ensure_period(&text).unwrap_or_else(|| INVALID_KNOWLEDGE_ENTRY.to_string())
        }
        _ => INVALID_KNOWLEDGE_ENTRY.to_string(),
    }
}

fn knowledge(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(entries)) => entries.iter().map(knowledge_entry).collect(),
        _ => Vec::new(),
    }
}

/// Text of a scalar; containers and null have none.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_list(field: &str, value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let text = scalar_text(item);
                if text.is_none() {
                    log::debug!("Dropping non-scalar entry in {}: {}", field, item);
                }
                text
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn style(value: Option<&Value>) -> StyleGuide {
    match value {
        Some(Value::Object(fields)) => StyleGuide {
            all: string_list("style.all", fields.get("all")),
            chat: string_list("style.chat", fields.get("chat")),
            post: string_list("style.post", fields.get("post")),
        },
        _ => StyleGuide::default(),
    }
}

fn settings(value: Option<&Value>) -> CharacterSettings {
    let Some(Value::Object(fields)) = value else {
        return CharacterSettings::default();
    };

    let secrets = match fields.get("secrets") {
        Some(Value::Object(secrets)) => secrets
            .iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some((key.clone(), text))
            })
            .collect(),
        _ => Default::default(),
    };

    let voice = fields
        .get("voice")
        .and_then(|voice| voice.get("model"))
        .and_then(Value::as_str)
        .map(|model| VoiceSettings {
            model: model.to_string(),
        })
        .unwrap_or_default();

    let extra: Map<String, Value> = fields
        .iter()
        .filter(|(key, _)| key.as_str() != "secrets" && key.as_str() != "voice")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    CharacterSettings {
        secrets,
        voice,
        extra,
    }
}

fn conversations(value: Option<&Value>) -> Vec<Conversation> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_array)
        .map(|messages| messages.iter().filter_map(message_example).collect())
        .collect()
}

fn message_example(value: &Value) -> Option<MessageExample> {
    let fields = value.as_object()?;
    let user = fields.get("user").and_then(scalar_text).unwrap_or_default();
    let text = match fields.get("content") {
        Some(Value::Object(content)) => content.get("text").and_then(scalar_text).unwrap_or_default(),
        Some(Value::String(text)) => text.clone(),
        _ => String::new(),
    };
    Some(MessageExample {
        user,
        content: MessageContent { text },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "bio": [],
            "lore": [],
            "topics": [],
            "style": null,
            "adjectives": [],
            "messageExamples": [],
            "postExamples": [],
        })
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let value = json!({
            "bio": ["b"],
            "lore": ["l"],
            "topics": ["t"],
            "messageExamples": [],
            "postExamples": [],
        });
        let err = enforce(&value, &EnforceOptions::default()).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingFields(MissingFieldsError {
                fields: vec!["style".to_string(), "adjectives".to_string()],
            })
        );
        assert_eq!(err.to_string(), "Missing required fields: style, adjectives");
    }

    #[test]
    fn test_falsy_required_fields_are_missing() {
        let mut value = minimal();
        value["bio"] = json!("");
        value["lore"] = json!(false);
        value["topics"] = json!(0);
        value["adjectives"] = json!(null);
        let err = enforce(&value, &EnforceOptions::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required fields: bio, lore, topics"
        );

        let mut value = minimal();
        value["bio"] = json!("");
        let err = enforce(&value, &EnforceOptions::default()).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingFields(MissingFieldsError {
                fields: vec!["bio".to_string()],
            })
        );
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = enforce(&json!(["bio"]), &EnforceOptions::default()).unwrap_err();
        assert_eq!(err, SchemaError::NotAnObject);
    }

    #[test]
    fn test_null_style_and_bare_knowledge() {
        let mut value = minimal();
        value["knowledge"] = json!(["wisdom"]);
        let profile = enforce(&value, &EnforceOptions::default()).unwrap();
        assert_eq!(profile.knowledge, vec!["wisdom."]);
        assert_eq!(profile.style, StyleGuide::default());
        let style = serde_json::to_value(&profile.style).unwrap();
        assert_eq!(style, json!({"all": [], "chat": [], "post": []}));
    }

    #[test]
    fn test_object_knowledge_entries() {
        let mut value = minimal();
        value["knowledge"] = json!([
            {"text": "hello"},
            {"content": "from content."},
            {"value": 42},
            {"text": "", "content": "skips empty text"},
            {"other": "x"},
            7,
            null,
            "   ",
        ]);
        let profile = enforce(&value, &EnforceOptions::default()).unwrap();
        assert_eq!(
            profile.knowledge,
            vec![
                "hello.".to_string(),
                "from content.".to_string(),
                "42.".to_string(),
                "skips empty text.".to_string(),
                r#"{"other":"x"}."#.to_string(),
                INVALID_KNOWLEDGE_ENTRY.to_string(),
                INVALID_KNOWLEDGE_ENTRY.to_string(),
                INVALID_KNOWLEDGE_ENTRY.to_string(),
            ]
        );
    }

    #[test]
    fn test_non_array_knowledge_is_discarded() {
        let mut value = minimal();
        value["knowledge"] = json!({"text": "not a list"});
        let profile = enforce(&value, &EnforceOptions::default()).unwrap();
        assert!(profile.knowledge.is_empty());
    }

    #[test]
    fn test_structural_fields_are_coerced() {
        let value = json!({
            "bio": "a single string",
            "lore": null,
            "topics": ["rust", 3, true, {"x": 1}, null],
            "style": {"all": "terse", "chat": ["warm"]},
            "adjectives": {},
            "messageExamples": [
                [
                    {"user": "{{user1}}", "content": {"text": "hi"}},
                    {"user": "Nova", "content": "hello there"},
                    "garbage"
                ],
                "not a conversation"
            ],
            "postExamples": [],
            "people": 5,
        });
        let profile = enforce(&value, &EnforceOptions::default()).unwrap();
        assert!(profile.bio.is_empty());
        assert!(profile.lore.is_empty());
        assert_eq!(profile.topics, vec!["rust", "3", "true"]);
        assert!(profile.style.all.is_empty());
        assert_eq!(profile.style.chat, vec!["warm"]);
        assert!(profile.style.post.is_empty());
        assert!(profile.adjectives.is_empty());
        assert!(profile.people.is_empty());
        assert_eq!(profile.message_examples.len(), 1);
        assert_eq!(profile.message_examples[0].len(), 2);
        assert_eq!(profile.message_examples[0][1].user, "Nova");
        assert_eq!(profile.message_examples[0][1].content.text, "hello there");
    }

    #[test]
    fn test_settings_and_extra_keys() {
        let mut value = minimal();
        value["settings"] = json!({
            "secrets": {"API_TOKEN": "abc", "RETRIES": 3, "UNSET": null},
            "voice": {"model": "en_GB-alan-medium"},
            "imageModel": "flux"
        });
        value["system"] = json!("Roleplay as Nova.");
        let profile = enforce(&value, &EnforceOptions::default()).unwrap();
        assert_eq!(profile.settings.secrets.get("API_TOKEN").map(String::as_str), Some("abc"));
        assert_eq!(profile.settings.secrets.get("RETRIES").map(String::as_str), Some("3"));
        assert!(!profile.settings.secrets.contains_key("UNSET"));
        assert_eq!(profile.settings.voice.model, "en_GB-alan-medium");
        assert_eq!(profile.settings.extra["imageModel"], "flux");
        assert_eq!(profile.extra["system"], "Roleplay as Nova.");
        assert!(!profile.extra.contains_key("bio"));
    }

    #[test]
    fn test_preserved_knowledge_overrides_model_output() {
        let mut value = minimal();
        value["knowledge"] = json!(["model invented this"]);
        let prior = vec!["Kept verbatim".to_string(), "Second.".to_string()];
        let profile = enforce(&value, &EnforceOptions::preserve_knowledge(prior.clone())).unwrap();
        assert_eq!(profile.knowledge, prior);
    }

    #[test]
    fn test_coerce_profile_skips_required_check() {
        let value = json!({"name": "Ada", "plugins": ["voice"], "modelProvider": "openai"});
        let profile = coerce_profile(&value).unwrap();
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.plugins, vec!["voice"]);
        assert_eq!(profile.model_provider, "openai");
        assert!(profile.bio.is_empty());

        let bare = coerce_profile(&json!({})).unwrap();
        assert_eq!(bare.model_provider, DEFAULT_MODEL_PROVIDER);
    }
}
