//! Character profiles: the document model, schema enforcement and the
//! LLM-backed generate/refine flows.

pub mod pipeline;
pub mod profile;
pub mod schema;

pub use self::pipeline::{
    fix_json, CharacterPipeline, CharacterResponse, GenerateRequest, PipelineError, RefineRequest,
};
pub use self::profile::{CharacterProfile, CharacterSettings, MessageExample, StyleGuide};
pub use self::schema::{enforce, EnforceOptions, MissingFieldsError, SchemaError};
