//! Canonical character profile document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default voice model for freshly generated characters.
pub const DEFAULT_VOICE_MODEL: &str = "en_US-hfc_female-medium";

/// Default model provider for freshly generated characters.
pub const DEFAULT_MODEL_PROVIDER: &str = "anthropic";

/// A single line in an example conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageExample {
    /// Speaker, either the character's name or a placeholder like `{{user1}}`.
    #[serde(default)]
    pub user: String,
    /// What was said.
    #[serde(default)]
    pub content: MessageContent,
}

/// Body of a [`MessageExample`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageContent {
    #[serde(default)]
    pub text: String,
}

/// An ordered example conversation.
pub type Conversation = Vec<MessageExample>;

/// Voice configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    #[serde(default)]
    pub model: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_VOICE_MODEL.to_string(),
        }
    }
}

/// Runtime settings carried alongside the character.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterSettings {
    /// Secret values keyed by name, possibly empty.
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
    #[serde(default)]
    pub voice: VoiceSettings,
    /// Any other settings the caller or model supplied.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Writing style guidance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleGuide {
    #[serde(default)]
    pub all: Vec<String>,
    #[serde(default)]
    pub chat: Vec<String>,
    #[serde(default)]
    pub post: Vec<String>,
}

/// The structured document describing an AI persona.
///
/// After schema enforcement every sequence field is present, `style` and
/// its three lists exist, and each `knowledge` entry ends with a period.
/// Top-level keys outside the canonical set survive in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub clients: Vec<String>,
    #[serde(default)]
    pub model_provider: String,
    #[serde(default)]
    pub settings: CharacterSettings,
    #[serde(default)]
    pub plugins: Vec<String>,
    #[serde(default)]
    pub bio: Vec<String>,
    #[serde(default)]
    pub lore: Vec<String>,
    #[serde(default)]
    pub knowledge: Vec<String>,
    #[serde(default)]
    pub message_examples: Vec<Conversation>,
    #[serde(default)]
    pub post_examples: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub style: StyleGuide,
    #[serde(default)]
    pub adjectives: Vec<String>,
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CharacterProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            clients: Vec::new(),
            model_provider: DEFAULT_MODEL_PROVIDER.to_string(),
            settings: CharacterSettings::default(),
            plugins: Vec::new(),
            bio: Vec::new(),
            lore: Vec::new(),
            knowledge: Vec::new(),
            message_examples: Vec::new(),
            post_examples: Vec::new(),
            topics: Vec::new(),
            style: StyleGuide::default(),
            adjectives: Vec::new(),
            people: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl CharacterProfile {
    /// Top-level keys that map onto typed fields.
    pub const CANONICAL_KEYS: &'static [&'static str] = &[
        "name",
        "clients",
        "modelProvider",
        "settings",
        "plugins",
        "bio",
        "lore",
        "knowledge",
        "messageExamples",
        "postExamples",
        "topics",
        "style",
        "adjectives",
        "people",
    ];
}
