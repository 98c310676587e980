//! Runtime settings: API credentials, model choices, paths and limits.
//!
//! Values come from built-in defaults, optionally overlaid by a TOML file and
//! then by environment variables. Once loaded they are treated as read-only.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{PictoError, PictoResult};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Request keywords recognised by the shell and the dispatcher.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Keywords {
    pub evaluate: String,
    pub compare: String,
    pub region_search: String,
    pub nearby_search: String,
    pub exit: Vec<String>,
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            evaluate: "평가해줘".to_string(),
            compare: "비교해줘".to_string(),
            region_search: "지역검색".to_string(),
            nearby_search: "주변검색".to_string(),
            exit: vec!["종료".to_string(), "quit".to_string(), "exit".to_string()],
        }
    }
}

impl Keywords {
    /// Exact (trimmed, case-insensitive) match against the exit words.
    pub fn is_exit(&self, input: &str) -> bool {
        let lowered = input.trim().to_lowercase();
        self.exit.iter().any(|w| w.to_lowercase() == lowered)
    }
}

/// All tunables for the assistant.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub vision_model: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Use the local n-gram embedder instead of the embeddings endpoint.
    pub offline_embeddings: bool,
    pub max_tokens: u32,
    pub temperature: f32,
    pub chat_max_tokens: u32,
    pub chat_temperature: f32,
    pub pdf_path: PathBuf,
    pub persist_dir: PathBuf,
    pub default_image_path: PathBuf,
    /// Download URL template; `{photo_id}` is replaced with the record id.
    pub photo_store_url: String,
    pub batch_input: PathBuf,
    pub batch_output: PathBuf,
    /// Directory for downloaded photos; the system temp directory when unset.
    pub download_dir: Option<PathBuf>,
    pub top_k: usize,
    pub request_timeout_secs: Option<u64>,
    pub keywords: Keywords,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            vision_model: "gpt-4o".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            offline_embeddings: false,
            max_tokens: 1000,
            temperature: 0.7,
            chat_max_tokens: 500,
            chat_temperature: 0.7,
            pdf_path: PathBuf::from("docs/photo_guide.pdf"),
            persist_dir: PathBuf::from("chroma_db"),
            default_image_path: PathBuf::from("ImagesPath/land.jpg"),
            photo_store_url: "http://localhost:8086/photo-store/photos/download/{photo_id}"
                .to_string(),
            batch_input: PathBuf::from("./json.txt"),
            batch_output: PathBuf::from("./json_updated.txt"),
            download_dir: None,
            top_k: 4,
            request_timeout_secs: None,
            keywords: Keywords::default(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> PictoResult<Self> {
        toml::from_str(text).map_err(|e| PictoError::Config(format!("Invalid settings: {e}")))
    }

    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> PictoResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PictoError::Config(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Load from an optional file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> PictoResult<Self> {
        let mut settings = match path {
            Some(p) => {
                tracing::debug!("Loading settings from {}", p.display());
                Self::from_file(p)?
            }
            None => Self::default(),
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Overlay `OPENAI_API_KEY` and `OPENAI_API_BASE` when they are set.
    pub fn apply_env(&mut self) {
        if let Some(key) = non_empty_env("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(base) = non_empty_env("OPENAI_API_BASE") {
            self.api_base = base;
        }
    }

    /// The API key, or a configuration error naming how to provide one.
    pub fn require_api_key(&self) -> PictoResult<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                PictoError::Config(
                    "No API key configured. Set OPENAI_API_KEY or `api_key` in picto.toml."
                        .to_string(),
                )
            })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            vision_model = "gpt-4o-mini"
            top_k = 2

            [keywords]
            evaluate = "evaluate"
            "#,
        )
        .unwrap();
        assert_eq!(settings.vision_model, "gpt-4o-mini");
        assert_eq!(settings.top_k, 2);
        assert_eq!(settings.keywords.evaluate, "evaluate");
        assert_eq!(settings.keywords.compare, "비교해줘");
        assert_eq!(settings.chat_max_tokens, 500);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Settings::from_toml_str("top_k = \"many\"").unwrap_err();
        assert!(matches!(err, PictoError::Config(_)));
    }

    #[test]
    fn test_exit_words_are_case_insensitive() {
        let keywords = Keywords::default();
        assert!(keywords.is_exit("QUIT"));
        assert!(keywords.is_exit("  종료 "));
        assert!(!keywords.is_exit("quit now"));
    }

    #[test]
    fn test_require_api_key() {
        let mut settings = Settings::default();
        assert!(settings.require_api_key().is_err());
        settings.api_key = Some("sk-test".to_string());
        assert_eq!(settings.require_api_key().unwrap(), "sk-test");
    }
}
