//! Guidance index lifecycle: create-or-load, add, reset, inspect and search.

use std::path::{Path, PathBuf};

use crate::embedding::Embedder;
use crate::pdf::DocumentLoader;
use crate::similarity::find_similar;
use crate::storage::{index_file, IndexReader, IndexWriter};
use crate::types::{GuidePage, GuideStore, IndexSummary, PictoError, PictoResult};

/// How `create_or_load` obtained the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOpen {
    /// An existing persisted index was opened; nothing was embedded.
    Loaded,
    /// A new index was built from the document.
    Created,
}

/// Owns the persisted guidance index and its in-memory handle.
///
/// The handle is `None` until `create_or_load` succeeds and again after
/// `reset`; every read path checks it explicitly.
pub struct IndexManager {
    persist_dir: PathBuf,
    embedder: Box<dyn Embedder>,
    loader: Box<dyn DocumentLoader>,
    store: Option<GuideStore>,
}

impl IndexManager {
    pub fn new(
        persist_dir: impl Into<PathBuf>,
        embedder: Box<dyn Embedder>,
        loader: Box<dyn DocumentLoader>,
    ) -> Self {
        Self {
            persist_dir: persist_dir.into(),
            embedder,
            loader,
            store: None,
        }
    }

    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_some()
    }

    /// Open the persisted index if its directory exists, otherwise build one
    /// from the PDF at `pdf_path`. On failure the handle stays empty.
    pub async fn create_or_load(&mut self, pdf_path: &Path) -> PictoResult<IndexOpen> {
        if self.persist_dir.exists() {
            tracing::info!("Opening existing index at {}", self.persist_dir.display());
            let file = index_file(&self.persist_dir);
            let store = if file.exists() {
                IndexReader::read_from_file(&file)?
            } else {
                GuideStore::new(0)
            };
            tracing::info!("Index holds {} pages", store.count());
            self.store = Some(store);
            return Ok(IndexOpen::Loaded);
        }

        tracing::info!(
            "Building new index at {} from {}",
            self.persist_dir.display(),
            pdf_path.display()
        );
        let mut store = GuideStore::new(0);
        self.embed_into(&mut store, pdf_path).await?;
        if let Err(e) = IndexWriter::write_to_file(&store, &index_file(&self.persist_dir)) {
            // A bare directory would otherwise be opened as an empty index next time.
            if self.persist_dir.exists() {
                if let Err(cleanup) = std::fs::remove_dir_all(&self.persist_dir) {
                    tracing::warn!(
                        "Could not remove partial index at {}: {cleanup}",
                        self.persist_dir.display()
                    );
                }
            }
            return Err(e);
        }
        tracing::info!("Index built with {} pages", store.count());

        self.store = Some(store);
        Ok(IndexOpen::Created)
    }

    /// Append every page of another PDF to the initialized index.
    /// Returns the number of pages added.
    pub async fn add(&mut self, pdf_path: &Path) -> PictoResult<usize> {
        let Some(store) = self.store.as_mut() else {
            return Err(PictoError::IndexNotReady);
        };

        tracing::info!("Adding {} to the index", pdf_path.display());
        let pages = self.loader.load(pdf_path)?;
        let added = pages.len();
        let texts: Vec<String> = pages.iter().map(|p| p.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        ensure_same_len(added, vectors.len())?;

        // Work on a copy so a failed write leaves the in-memory handle untouched.
        let mut updated = store.clone();
        for (page, vector) in pages.into_iter().zip(vectors) {
            updated.add(page, vector);
        }
        IndexWriter::write_to_file(&updated, &index_file(&self.persist_dir))?;
        *store = updated;

        tracing::info!("Added {added} pages from {}", pdf_path.display());
        Ok(added)
    }

    /// Delete the persisted index and clear the handle.
    /// Returns whether anything was removed from disk.
    pub fn reset(&mut self) -> PictoResult<bool> {
        self.store = None;
        if !self.persist_dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&self.persist_dir)?;
        tracing::info!("Removed index at {}", self.persist_dir.display());
        Ok(true)
    }

    /// Page count and distinct sources, or `None` when uninitialized or empty.
    pub fn inspect(&self) -> Option<IndexSummary> {
        let store = self.store.as_ref()?;
        if store.count() == 0 {
            return None;
        }
        Some(IndexSummary {
            document_count: store.count(),
            sources: store.sources(),
        })
    }

    /// The `k` pages most similar to `query`, best first.
    pub async fn search(&self, query: &str, k: usize) -> PictoResult<Vec<GuidePage>> {
        let store = self.store.as_ref().ok_or(PictoError::IndexNotReady)?;
        if store.count() == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed_one(query).await?;
        if query_vec.len() != store.embedding_dim as usize {
            return Err(PictoError::Embedding(format!(
                "Query embedding has {} dimensions but the index was built with {}; \
                 rebuild the index after changing the embedding model",
                query_vec.len(),
                store.embedding_dim
            )));
        }
        let matches = find_similar(&query_vec, &store.pages, k);
        tracing::debug!("Similarity search returned {} matches", matches.len());

        Ok(matches
            .iter()
            .filter_map(|m| store.get(m.id).map(|p| p.page.clone()))
            .collect())
    }

    async fn embed_into(&self, store: &mut GuideStore, pdf_path: &Path) -> PictoResult<()> {
        let pages = self.loader.load(pdf_path)?;
        let texts: Vec<String> = pages.iter().map(|p| p.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        ensure_same_len(pages.len(), vectors.len())?;

        for (page, vector) in pages.into_iter().zip(vectors) {
            store.add(page, vector);
        }
        Ok(())
    }
}

fn ensure_same_len(pages: usize, vectors: usize) -> PictoResult<()> {
    if pages != vectors {
        return Err(PictoError::Embedding(format!(
            "Got {vectors} embeddings for {pages} pages"
        )));
    }
    Ok(())
}
