//! Core data types for guidance pages, the similarity index and request outcomes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Where a page of guidance text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Document path as it was handed to the loader.
    pub source: String,
    /// Zero-based page number within the source document.
    pub page: u32,
}

/// One page of text extracted from a guidance document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidePage {
    pub content: String,
    pub metadata: PageMeta,
}

impl GuidePage {
    pub fn new(content: impl Into<String>, source: impl Into<String>, page: u32) -> Self {
        Self {
            content: content.into(),
            metadata: PageMeta {
                source: source.into(),
                page,
            },
        }
    }
}

/// A page stored in the index together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPage {
    pub id: u64,
    pub page: GuidePage,
    pub embedding: Vec<f32>,
}

/// A similarity match result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub id: u64,
    pub similarity: f32,
}

/// In-memory container for all indexed guidance pages.
#[derive(Debug, Clone)]
pub struct GuideStore {
    pub pages: Vec<StoredPage>,
    pub embedding_dim: u32,
    pub next_id: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl GuideStore {
    /// Create a new empty store.
    pub fn new(embedding_dim: u32) -> Self {
        let now = unix_now();
        Self {
            pages: Vec::new(),
            embedding_dim,
            next_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Get a stored page by ID.
    pub fn get(&self, id: u64) -> Option<&StoredPage> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Add a page with its embedding and return the assigned ID.
    pub fn add(&mut self, page: GuidePage, embedding: Vec<f32>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        if self.embedding_dim == 0 {
            self.embedding_dim = embedding.len() as u32;
        }
        self.pages.push(StoredPage {
            id,
            page,
            embedding,
        });
        self.updated_at = unix_now();
        id
    }

    /// Return the number of stored pages.
    pub fn count(&self) -> usize {
        self.pages.len()
    }

    /// Distinct document sources, sorted.
    pub fn sources(&self) -> BTreeSet<String> {
        self.pages
            .iter()
            .map(|p| p.page.metadata.source.clone())
            .collect()
    }
}

/// Diagnostic summary of the index contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub document_count: usize,
    pub sources: BTreeSet<String>,
}

/// Result of routing one user request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestOutcome {
    /// The photo was analysed; guidance may itself be an informational text.
    Evaluated { analysis: String, guidance: String },
    /// The request could not be served as asked.
    Error { message: String },
    /// The request was not an evaluation request.
    Notice { message: String },
}

impl RequestOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn notice(message: impl Into<String>) -> Self {
        Self::Notice {
            message: message.into(),
        }
    }
}

/// Errors that can occur in the Picto library.
#[derive(thiserror::Error, Debug)]
pub enum PictoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Index is not initialized; build it from a PDF first")]
    IndexNotReady,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience result type.
pub type PictoResult<T> = Result<T, PictoError>;

pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
