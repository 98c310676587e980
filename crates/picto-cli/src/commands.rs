//! Command handlers and component wiring.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use picto::{
    run_batch, CompletionBackend, Dispatcher, Embedder, IndexManager, IndexOpen, NgramEmbedder,
    OpenAiClient, OpenAiEmbedder, PdfLoader, PhotoAnalyst, PhotoDownloader, RequestOutcome,
    Settings,
};

use crate::output::{render_outcome, render_report, render_summary};

/// Everything a session needs: settings, the request dispatcher and the index.
pub struct App {
    pub settings: Settings,
    pub dispatcher: Dispatcher,
    pub index: IndexManager,
}

impl App {
    /// Wire up the hosted API client. Fails without an API key.
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let client = OpenAiClient::from_settings(&settings)?;
        let embedder = build_embedder(&settings, Some(&client));
        Ok(Self::with_parts(settings, Arc::new(client), embedder))
    }

    pub fn with_parts(
        settings: Settings,
        backend: Arc<dyn CompletionBackend>,
        embedder: Box<dyn Embedder>,
    ) -> Self {
        let analyst = PhotoAnalyst::new(backend, &settings);
        let dispatcher = Dispatcher::new(analyst, &settings);
        let index = IndexManager::new(settings.persist_dir.clone(), embedder, Box::new(PdfLoader));
        Self {
            settings,
            dispatcher,
            index,
        }
    }

    /// Create or open the index from the configured PDF. Failures are logged
    /// and reported as `false`; the app keeps running without guidance.
    pub async fn prepare_index(&mut self, pdf: &Path) -> bool {
        match self.index.create_or_load(pdf).await {
            Ok(IndexOpen::Loaded) => {
                println!("Opened the existing guidance index.");
                true
            }
            Ok(IndexOpen::Created) => {
                println!("Built a new guidance index from {}.", pdf.display());
                true
            }
            Err(e) => {
                tracing::error!("Index preparation failed: {e}");
                println!("Processing the PDF failed: {e}");
                false
            }
        }
    }
}

/// Embedder used for indexing and queries. Commands that never embed
/// (inspect, reset) may pass no client.
fn build_embedder(settings: &Settings, client: Option<&OpenAiClient>) -> Box<dyn Embedder> {
    match client {
        Some(c) if !settings.offline_embeddings => {
            Box::new(OpenAiEmbedder::new(c.clone(), settings.embedding_model.clone()))
        }
        _ => Box::new(NgramEmbedder),
    }
}

fn index_without_client(settings: &Settings) -> IndexManager {
    IndexManager::new(
        settings.persist_dir.clone(),
        build_embedder(settings, None),
        Box::new(PdfLoader),
    )
}

pub async fn cmd_index_build(settings: Settings, pdf: Option<PathBuf>) -> anyhow::Result<()> {
    let pdf = pdf.unwrap_or_else(|| settings.pdf_path.clone());
    let mut app = App::new(settings)?;
    if !app.prepare_index(&pdf).await {
        anyhow::bail!("Could not build the index from {}", pdf.display());
    }
    println!("{}", render_summary(app.index.inspect().as_ref()));
    Ok(())
}

pub async fn cmd_index_add(settings: Settings, pdf: PathBuf) -> anyhow::Result<()> {
    let mut app = App::new(settings)?;
    let persist_dir = app.settings.persist_dir.clone();
    if !persist_dir.exists() {
        anyhow::bail!(
            "No index at {}. Run `picto-cli index build` first.",
            persist_dir.display()
        );
    }
    let base_pdf = app.settings.pdf_path.clone();
    app.index
        .create_or_load(&base_pdf)
        .await
        .context("Failed to open the index")?;

    let added = app
        .index
        .add(&pdf)
        .await
        .with_context(|| format!("Failed to add {}", pdf.display()))?;
    println!("Added {added} pages from {}.", pdf.display());
    Ok(())
}

pub fn cmd_index_reset(settings: &Settings) -> anyhow::Result<()> {
    let mut index = index_without_client(settings);
    if index.reset()? {
        println!("The guidance index has been reset.");
    } else {
        println!("No index found at {}.", settings.persist_dir.display());
    }
    Ok(())
}

pub async fn cmd_index_inspect(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let mut index = index_without_client(settings);
    if settings.persist_dir.exists() {
        // Opening an existing directory never loads or embeds documents.
        index
            .create_or_load(&settings.pdf_path)
            .await
            .context("Failed to open the index")?;
    }

    let summary = index.inspect();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", render_summary(summary.as_ref()));
    }
    Ok(())
}

/// One-shot evaluation of a single image.
pub async fn cmd_evaluate(
    settings: Settings,
    image: PathBuf,
    request: Option<String>,
) -> anyhow::Result<RequestOutcome> {
    let mut app = App::new(settings)?;
    let pdf = app.settings.pdf_path.clone();
    if pdf.exists() || app.settings.persist_dir.exists() {
        app.prepare_index(&pdf).await;
    } else {
        tracing::warn!("No PDF at {}; evaluating without guidance", pdf.display());
    }

    let input = request.unwrap_or_else(|| app.dispatcher.evaluate_keyword().to_string());
    let outcome = app
        .dispatcher
        .process_user_request(&app.index, &input, Some(&image))
        .await;
    println!("{}", render_outcome(&outcome));
    Ok(outcome)
}

pub async fn cmd_batch(
    settings: Settings,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let input = input.unwrap_or_else(|| settings.batch_input.clone());
    let output = output.unwrap_or_else(|| settings.batch_output.clone());

    let client = OpenAiClient::from_settings(&settings)?;
    let analyst = PhotoAnalyst::new(Arc::new(client), &settings);
    let downloader = PhotoDownloader::from_settings(&settings)?;

    let report = run_batch(&input, &output, &downloader, &analyst)
        .await
        .with_context(|| format!("Batch run over {} failed", input.display()))?;

    println!("{}", render_report(&report));
    println!("Updated records saved to {}.", output.display());
    Ok(())
}
