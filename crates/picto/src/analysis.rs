//! Vision analysis and free-form chat against the hosted model.

use std::path::Path;
use std::sync::Arc;

use crate::config::Settings;
use crate::image_data::encode_data_url;
use crate::llm::{ChatMessage, ChatRequest, CompletionBackend};
use crate::types::PictoResult;

/// System instruction for every photo analysis request.
pub const PHOTO_CRITIC_PROMPT: &str = "You are an expert photo critic. Analyse the photo and \
     give practical advice on how to improve it.";

/// Text prompt used when the caller supplies no instruction.
pub const COMPOSITION_PROMPT: &str = "Describe the composition, subject placement, mood and \
     color combination of this photo in concrete terms, in at least 200 characters.";

/// Persona for general chat.
pub const CHAT_PERSONA: &str = "You are a friendly and helpful AI assistant. Answer questions \
     about photography with professional expertise.";

/// Sends photo-analysis and chat requests with the configured models and limits.
#[derive(Clone)]
pub struct PhotoAnalyst {
    backend: Arc<dyn CompletionBackend>,
    vision_model: String,
    max_tokens: u32,
    temperature: f32,
    chat_model: String,
    chat_max_tokens: u32,
    chat_temperature: f32,
}

impl PhotoAnalyst {
    pub fn new(backend: Arc<dyn CompletionBackend>, settings: &Settings) -> Self {
        Self {
            backend,
            vision_model: settings.vision_model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            chat_model: settings.chat_model.clone(),
            chat_max_tokens: settings.chat_max_tokens,
            chat_temperature: settings.chat_temperature,
        }
    }

    /// Analyse one image. With an instruction the prompt embeds the user's
    /// request; without one it asks for a composition breakdown.
    pub async fn analyze(&self, image: &Path, instruction: Option<&str>) -> PictoResult<String> {
        let data_url = encode_data_url(image)?;
        let prompt = match instruction {
            Some(text) => instruction_prompt(text),
            None => COMPOSITION_PROMPT.to_string(),
        };

        let request = ChatRequest {
            model: self.vision_model.clone(),
            messages: vec![
                ChatMessage::system(PHOTO_CRITIC_PROMPT),
                ChatMessage::user_with_image(prompt, data_url),
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::info!("Analysing {} with {}", image.display(), self.vision_model);
        self.backend.complete(&request).await
    }

    /// General chat completion. Failures come back as a readable message.
    pub async fn chat(&self, input: &str) -> String {
        let request = ChatRequest {
            model: self.chat_model.clone(),
            messages: vec![ChatMessage::system(CHAT_PERSONA), ChatMessage::user(input)],
            max_tokens: self.chat_max_tokens,
            temperature: self.chat_temperature,
        };

        match self.backend.complete(&request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Chat completion failed: {e}");
                format!("Chat response failed: {e}")
            }
        }
    }
}

fn instruction_prompt(user_input: &str) -> String {
    format!(
        "User request: {user_input}\nDescribe the characteristics of this photo and the colors \
         it uses in detail, then give advice for taking a better photo."
    )
}
