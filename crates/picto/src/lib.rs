//! Picto: photo evaluation with a hosted vision model and PDF-backed shooting guidance.

pub mod analysis;
pub mod batch;
pub mod config;
pub mod dispatch;
pub mod download;
pub mod embedding;
pub mod guidance;
pub mod image_data;
pub mod index;
pub mod llm;
pub mod pdf;
pub mod similarity;
pub mod storage;
pub mod types;

pub use analysis::PhotoAnalyst;
pub use batch::{run_batch, BatchReport, PhotoRecord, DOWNLOAD_FAILED_MARKER};
pub use config::{Keywords, Settings};
pub use dispatch::{Dispatcher, IMAGE_PATH_REQUIRED};
pub use download::{DownloadedImage, PhotoDownloader};
pub use embedding::{Embedder, NgramEmbedder, OpenAiEmbedder};
pub use guidance::{retrieve_guidance, INDEX_NOT_READY_GUIDANCE};
pub use index::{IndexManager, IndexOpen};
pub use llm::{ChatMessage, ChatRequest, CompletionBackend, OpenAiClient};
pub use pdf::{DocumentLoader, PdfLoader};
pub use similarity::{cosine_similarity, find_similar};
pub use storage::{IndexReader, IndexWriter};
pub use types::*;
