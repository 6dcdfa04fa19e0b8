//! Knowledge source implementations.
//!
//! A source loads its content and splits it into sentences. Sources are
//! processed entirely in memory; nothing is written to disk.

use crate::utilities::string_utils::split_sentences;

/// File extensions accepted as text documents.
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "text", "csv", "json", "log"];

// ---------------------------------------------------------------------------
// Base trait
// ---------------------------------------------------------------------------

/// Base trait for all knowledge sources.
pub trait BaseKnowledgeSource: Send + Sync {
    /// Human-readable name of this source (for logging and errors).
    fn source_name(&self) -> &str;

    /// Validate the content before loading.
    ///
    /// Default implementation always succeeds.
    fn validate_content(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }

    /// Load content from the source as period-terminated sentences.
    fn load_content(&self) -> Result<Vec<String>, anyhow::Error>;
}

/// Validate and load every source, concatenating sentences in order.
pub fn collect_knowledge(
    sources: &[Box<dyn BaseKnowledgeSource>],
) -> Result<Vec<String>, anyhow::Error> {
    let mut knowledge = Vec::new();
    for source in sources {
        source.validate_content()?;
        let sentences = source.load_content()?;
        log::debug!(
            "Loaded {} sentences from {}",
            sentences.len(),
            source.source_name()
        );
        knowledge.extend(sentences);
    }
    Ok(knowledge)
}

// ---------------------------------------------------------------------------
// StringKnowledgeSource
// ---------------------------------------------------------------------------

/// Knowledge source backed by an in-memory string.
#[derive(Debug, Clone)]
pub struct StringKnowledgeSource {
    pub content: String,
}

impl StringKnowledgeSource {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl BaseKnowledgeSource for StringKnowledgeSource {
    fn source_name(&self) -> &str {
        "StringKnowledgeSource"
    }

    fn load_content(&self) -> Result<Vec<String>, anyhow::Error> {
        Ok(split_sentences(&self.content))
    }
}

// ---------------------------------------------------------------------------
// UploadedDocumentSource
// ---------------------------------------------------------------------------

/// Knowledge source for an uploaded document.
///
/// Only text documents are accepted. Invalid UTF-8 sequences are replaced
/// rather than rejected.
#[derive(Debug, Clone)]
pub struct UploadedDocumentSource {
    /// Client-supplied file name.
    pub file_name: String,
    /// Raw upload bytes.
    pub bytes: Vec<u8>,
}

impl UploadedDocumentSource {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

impl BaseKnowledgeSource for UploadedDocumentSource {
    fn source_name(&self) -> &str {
        &self.file_name
    }

    fn validate_content(&self) -> Result<(), anyhow::Error> {
        if let Some(ext) = self.extension() {
            if !TEXT_EXTENSIONS.contains(&ext.as_str()) {
                anyhow::bail!("Unsupported file type '.{}' for {}", ext, self.file_name);
            }
        }
        if self.bytes.contains(&0) {
            anyhow::bail!("{} does not look like a text document", self.file_name);
        }
        Ok(())
    }

    fn load_content(&self) -> Result<Vec<String>, anyhow::Error> {
        let text = String::from_utf8_lossy(&self.bytes);
        Ok(split_sentences(&text))
    }
}
