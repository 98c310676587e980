//! Keyword routing for user requests.

use std::path::Path;

use crate::analysis::PhotoAnalyst;
use crate::config::Settings;
use crate::guidance::retrieve_guidance;
use crate::index::IndexManager;
use crate::types::RequestOutcome;

/// Returned when the evaluate keyword arrives without an image path.
pub const IMAGE_PATH_REQUIRED: &str =
    "No image path was provided. Please include an image path with your request.";

/// Guidance text used when the analysis itself failed.
pub const NO_GUIDANCE_AFTER_FAILURE: &str =
    "Guidance could not be provided because the analysis failed.";

/// Routes one request: evaluate (analysis + guidance), or explain how to ask.
///
/// Matching is a plain substring test on the evaluate keyword.
pub struct Dispatcher {
    analyst: PhotoAnalyst,
    evaluate_keyword: String,
    top_k: usize,
}

impl Dispatcher {
    pub fn new(analyst: PhotoAnalyst, settings: &Settings) -> Self {
        Self {
            analyst,
            evaluate_keyword: settings.keywords.evaluate.clone(),
            top_k: settings.top_k,
        }
    }

    pub fn analyst(&self) -> &PhotoAnalyst {
        &self.analyst
    }

    pub fn evaluate_keyword(&self) -> &str {
        &self.evaluate_keyword
    }

    /// Whether the input asks for an evaluation.
    pub fn wants_evaluation(&self, input: &str) -> bool {
        input.contains(&self.evaluate_keyword)
    }

    /// Message returned for inputs without the evaluate keyword.
    pub fn keyword_hint(&self) -> String {
        format!(
            "To analyse a photo, include the word '{}' in your request.",
            self.evaluate_keyword
        )
    }

    pub async fn process_user_request(
        &self,
        index: &IndexManager,
        input: &str,
        image_path: Option<&Path>,
    ) -> RequestOutcome {
        if !self.wants_evaluation(input) {
            return RequestOutcome::notice(self.keyword_hint());
        }

        let Some(image) = image_path.filter(|p| !p.as_os_str().is_empty()) else {
            return RequestOutcome::error(IMAGE_PATH_REQUIRED);
        };

        self.evaluate(index, input, image).await
    }

    async fn evaluate(&self, index: &IndexManager, input: &str, image: &Path) -> RequestOutcome {
        let analysis = match self.analyst.analyze(image, Some(input)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Analysis of {} failed: {e}", image.display());
                return RequestOutcome::Evaluated {
                    analysis: format!("Image analysis failed: {e}"),
                    guidance: NO_GUIDANCE_AFTER_FAILURE.to_string(),
                };
            }
        };

        let guidance = retrieve_guidance(index, &analysis, self.top_k).await;
        RequestOutcome::Evaluated { analysis, guidance }
    }
}
