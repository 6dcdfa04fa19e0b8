//! Knowledge ingestion for character profiles.
//!
//! Uploaded documents are reduced to flat lists of period-terminated
//! sentences that can be dropped straight into a character's `knowledge`.

pub mod source;

pub use self::source::{
    collect_knowledge, BaseKnowledgeSource, StringKnowledgeSource, UploadedDocumentSource,
};
