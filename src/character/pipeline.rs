//! Generate, refine and fix-json flows.
//!
//! Every LLM-backed flow follows the same path: build a prompt around a JSON
//! template, send it to the model, normalize the raw text and enforce the
//! character schema on the result.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::Instrument;

use crate::character::profile::CharacterProfile;
use crate::character::schema::{coerce_profile, enforce, EnforceOptions, SchemaError};
use crate::llms::base_llm::{generate_call_id, BaseLLM, CallOptions, LLMError};
use crate::utilities::converter::{normalize, JsonRepairError};
use crate::utilities::prompts::{
    extract_character_name, generation_prompt, generation_template, refinement_prompt,
    refinement_template,
};

/// Errors from the character flows.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The caller's request was unusable.
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Llm(#[from] LLMError),

    #[error(transparent)]
    Json(#[from] JsonRepairError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Body of a generate request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Free-form description of the character.
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Knowledge gathered beforehand (e.g. from uploaded documents); kept
    /// verbatim when non-empty.
    #[serde(default)]
    pub knowledge: Vec<String>,
}

/// Body of a refine request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineRequest {
    /// What to change.
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    /// The profile being refined, as the caller has it.
    pub current_character: Value,
}

/// Result of an LLM-backed flow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterResponse {
    pub character: CharacterProfile,
    /// The user message sent to the model.
    pub raw_prompt: String,
    /// The model's unprocessed reply.
    pub raw_response: String,
}

/// Runs the character flows against a chat-completion backend.
#[derive(Debug, Clone)]
pub struct CharacterPipeline {
    llm: Arc<dyn BaseLLM>,
}

impl CharacterPipeline {
    pub fn new(llm: Arc<dyn BaseLLM>) -> Self {
        Self { llm }
    }

    /// Default model of the underlying backend.
    pub fn default_model(&self) -> &str {
        self.llm.model()
    }

    /// Create a new character from a description.
    pub async fn generate(
        &self,
        request: GenerateRequest,
        api_key: Option<String>,
    ) -> Result<CharacterResponse, PipelineError> {
        let instructions = request.prompt.trim().to_string();
        if instructions.is_empty() {
            return Err(PipelineError::InvalidRequest("Prompt is required".to_string()));
        }

        let span = tracing::info_span!(
            "generate_character",
            request_id = %generate_call_id(),
            model = request.model.as_deref().unwrap_or(self.llm.model()),
        );

        async move {
            let suggested_name = extract_character_name(&instructions);
            let template = generation_template(&suggested_name);
            let prompt = generation_prompt(&instructions, &template);

            let options = CallOptions {
                model: request.model,
                temperature: request.temperature,
                max_tokens: None,
                api_key,
            };
            let raw_response = self.llm.acall(prompt.to_messages(), options).await?;
            tracing::debug!(chars = raw_response.len(), "received completion");

            let parsed = normalize(&raw_response).map_err(|e| {
                tracing::warn!(error = %e, "model output is not valid JSON");
                e
            })?;

            let enforce_options = if request.knowledge.is_empty() {
                EnforceOptions::default()
            } else {
                EnforceOptions::preserve_knowledge(request.knowledge)
            };
            let mut character = enforce(&parsed, &enforce_options)?;
            if character.name.trim().is_empty() {
                character.name = suggested_name;
            }

            tracing::info!(name = %character.name, "character generated");
            Ok(CharacterResponse {
                character,
                raw_prompt: prompt.user,
                raw_response,
            })
        }
        .instrument(span)
        .await
    }

    /// Rewrite an existing character according to new instructions.
    ///
    /// Structural fields (`clients`, `modelProvider`, `settings`, `plugins`),
    /// a non-empty `name` and a non-empty `knowledge` list are carried over
    /// from the existing profile regardless of what the model returns.
    pub async fn refine(
        &self,
        request: RefineRequest,
        api_key: Option<String>,
    ) -> Result<CharacterResponse, PipelineError> {
        let instructions = request.prompt.trim().to_string();
        if instructions.is_empty() {
            return Err(PipelineError::InvalidRequest("Prompt is required".to_string()));
        }
        if !request.current_character.is_object() {
            return Err(PipelineError::InvalidRequest(
                "currentCharacter must be a JSON object".to_string(),
            ));
        }

        let mut existing = coerce_profile(&request.current_character)?;
        existing.knowledge = verbatim_knowledge(&request.current_character);

        let span = tracing::info_span!(
            "refine_character",
            request_id = %generate_call_id(),
            model = request.model.as_deref().unwrap_or(self.llm.model()),
            character = %existing.name,
        );

        async move {
            let template = refinement_template(&existing);
            let prompt = refinement_prompt(&instructions, &existing, &template);

            let options = CallOptions {
                model: request.model,
                temperature: request.temperature,
                max_tokens: None,
                api_key,
            };
            let raw_response = self.llm.acall(prompt.to_messages(), options).await?;
            tracing::debug!(chars = raw_response.len(), "received completion");

            let parsed = normalize(&raw_response).map_err(|e| {
                tracing::warn!(error = %e, "model output is not valid JSON");
                e
            })?;

            let enforce_options = if existing.knowledge.is_empty() {
                EnforceOptions::default()
            } else {
                EnforceOptions::preserve_knowledge(existing.knowledge.clone())
            };
            let mut character = enforce(&parsed, &enforce_options)?;

            character.clients = existing.clients;
            character.model_provider = existing.model_provider;
            character.settings = existing.settings;
            character.plugins = existing.plugins;
            if !existing.name.is_empty() {
                character.name = existing.name;
            }
            if character.people.is_empty() {
                character.people = existing.people;
            }

            tracing::info!(name = %character.name, "character refined");
            Ok(CharacterResponse {
                character,
                raw_prompt: prompt.user,
                raw_response,
            })
        }
        .instrument(span)
        .await
    }
}

/// Normalize pasted JSON text without calling the model or enforcing the
/// character schema.
pub fn fix_json(content: &str) -> Result<Value, PipelineError> {
    if content.trim().is_empty() {
        return Err(PipelineError::InvalidRequest("Content is required".to_string()));
    }
    Ok(normalize(content)?)
}

/// Knowledge exactly as the caller sent it: string entries untouched, other
/// entries coerced the same way the schema enforcer would.
fn verbatim_knowledge(character: &Value) -> Vec<String> {
    match character.get("knowledge") {
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| match entry {
                Value::String(text) => text.clone(),
                other => crate::character::schema::knowledge_entry(other),
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llms::base_llm::LLMMessage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns a canned reply and records what it was sent.
    #[derive(Debug, Default)]
    struct CannedLLM {
        reply: String,
        seen: Mutex<Vec<(Vec<LLMMessage>, CallOptions)>>,
    }

    impl CannedLLM {
        fn new(reply: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.into(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl BaseLLM for CannedLLM {
        fn model(&self) -> &str {
            "canned/model"
        }

        async fn acall(
            &self,
            messages: Vec<LLMMessage>,
            options: CallOptions,
        ) -> Result<String, LLMError> {
            self.seen.lock().unwrap().push((messages, options));
            Ok(self.reply.clone())
        }
    }

    fn narrative_reply(extra: Value) -> String {
        let mut reply = json!({
            "name": "",
            "bio": ["Pilot of the Kestrel"],
            "lore": ["Lost a bet to a comet"],
            "topics": ["starships"],
            "style": {"all": ["brief"], "chat": [], "post": []},
            "adjectives": ["bold"],
            "messageExamples": [[{"user": "{{user1}}", "content": {"text": "hi"}}]],
            "postExamples": ["Engines hot."],
        });
        if let (Some(reply), Some(extra)) = (reply.as_object_mut(), extra.as_object()) {
            for (key, value) in extra {
                reply.insert(key.clone(), value.clone());
            }
        }
        reply.to_string()
    }

    #[tokio::test]
    async fn test_generate_repairs_and_enforces() {
        let raw = format!("Sure! Here it is:\n```json\n{}\n```", narrative_reply(json!({"knowledge": ["Speaks Martian"]})).replace("]}", "],}"));
        let llm = CannedLLM::new(raw.clone());
        let pipeline = CharacterPipeline::new(llm.clone());

        let response = pipeline
            .generate(
                GenerateRequest {
                    prompt: "A pilot whose name is Kira Vale.".to_string(),
                    model: Some("openai/gpt-4o".to_string()),
                    temperature: Some(0.4),
                    knowledge: Vec::new(),
                },
                Some("key".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(response.character.name, "Kira Vale");
        assert_eq!(response.character.knowledge, vec!["Speaks Martian."]);
        assert_eq!(response.character.bio, vec!["Pilot of the Kestrel"]);
        assert_eq!(response.raw_response, raw);
        assert!(response.raw_prompt.contains("\"name\": \"Kira Vale\""));

        let seen = llm.seen.lock().unwrap();
        let (messages, options) = &seen[0];
        assert_eq!(messages.len(), 2);
        assert_eq!(options.model.as_deref(), Some("openai/gpt-4o"));
        assert_eq!(options.temperature, Some(0.4));
        assert_eq!(options.api_key.as_deref(), Some("key"));
    }

    #[tokio::test]
    async fn test_generate_keeps_supplied_knowledge() {
        let llm = CannedLLM::new(narrative_reply(json!({"knowledge": ["made up"]})));
        let pipeline = CharacterPipeline::new(llm);
        let supplied = vec!["From the upload.".to_string()];

        let response = pipeline
            .generate(
                GenerateRequest {
                    prompt: "a pilot".to_string(),
                    knowledge: supplied.clone(),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(response.character.knowledge, supplied);
        assert_eq!(response.character.name, "");
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_prompt() {
        let pipeline = CharacterPipeline::new(CannedLLM::new("{}"));
        let err = pipeline
            .generate(GenerateRequest::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_generate_reports_missing_fields() {
        let pipeline = CharacterPipeline::new(CannedLLM::new(r#"{"bio": [], "lore": []}"#));
        let err = pipeline
            .generate(
                GenerateRequest {
                    prompt: "x".to_string(),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required fields: topics, style, adjectives, messageExamples, postExamples"
        );
    }

    #[tokio::test]
    async fn test_generate_reports_unparseable_output() {
        let pipeline = CharacterPipeline::new(CannedLLM::new("I cannot help with that."));
        let err = pipeline
            .generate(
                GenerateRequest {
                    prompt: "x".to_string(),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Json(JsonRepairError::NoJsonObjectFound)));
    }

    #[tokio::test]
    async fn test_refine_preserves_existing_knowledge_and_structure() {
        let reply = narrative_reply(json!({
            "name": "Someone Else",
            "knowledge": ["The model rewrote this", {"text": "and this"}],
            "clients": ["twitter"],
            "modelProvider": "openai",
            "plugins": [],
        }));
        let llm = CannedLLM::new(reply);
        let pipeline = CharacterPipeline::new(llm.clone());

        let current = json!({
            "name": "Kira",
            "clients": ["discord"],
            "modelProvider": "anthropic",
            "settings": {"secrets": {"TOKEN": "t"}, "voice": {"model": "v"}},
            "plugins": ["image"],
            "people": ["Tomas"],
            "knowledge": ["no period here", "Exact text."],
            "bio": ["Old bio"],
        });
        let response = pipeline
            .refine(
                RefineRequest {
                    prompt: "Make her more cheerful".to_string(),
                    model: None,
                    temperature: None,
                    current_character: current,
                },
                None,
            )
            .await
            .unwrap();

        let character = response.character;
        assert_eq!(character.knowledge, vec!["no period here", "Exact text."]);
        assert_eq!(character.name, "Kira");
        assert_eq!(character.clients, vec!["discord"]);
        assert_eq!(character.model_provider, "anthropic");
        assert_eq!(character.settings.secrets.get("TOKEN").map(String::as_str), Some("t"));
        assert_eq!(character.plugins, vec!["image"]);
        assert_eq!(character.people, vec!["Tomas"]);
        assert_eq!(character.bio, vec!["Pilot of the Kestrel"]);
        assert!(response.raw_prompt.contains("Make her more cheerful"));
        assert!(response.raw_prompt.contains("Old bio"));
    }

    #[tokio::test]
    async fn test_refine_without_prior_knowledge_uses_model_output() {
        let llm = CannedLLM::new(narrative_reply(json!({"knowledge": ["fresh fact"]})));
        let pipeline = CharacterPipeline::new(llm);
        let response = pipeline
            .refine(
                RefineRequest {
                    prompt: "add knowledge".to_string(),
                    model: None,
                    temperature: None,
                    current_character: json!({"name": "Kira", "knowledge": []}),
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(response.character.knowledge, vec!["fresh fact."]);
    }

    #[tokio::test]
    async fn test_refine_rejects_non_object_character() {
        let pipeline = CharacterPipeline::new(CannedLLM::new("{}"));
        let err = pipeline
            .refine(
                RefineRequest {
                    prompt: "x".to_string(),
                    model: None,
                    temperature: None,
                    current_character: json!("Kira"),
                },
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "currentCharacter must be a JSON object");
    }

    #[test]
    fn test_fix_json() {
        let value = fix_json("noise {\"a\": [1, 2,],} noise").unwrap();
        assert_eq!(value, json!({"a": [1, 2]}));
        assert!(matches!(fix_json("   "), Err(PipelineError::InvalidRequest(_))));
        assert!(matches!(
            fix_json("no json"),
            Err(PipelineError::Json(JsonRepairError::NoJsonObjectFound))
        ));
    }
}
