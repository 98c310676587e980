//! Text embedding: the hosted embeddings endpoint and an offline fallback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::OpenAiClient;
use crate::types::{PictoError, PictoResult};

/// Inputs per embeddings request.
const EMBED_BATCH_SIZE: usize = 64;

/// Dimension of the offline n-gram embedder.
pub const NGRAM_EMBEDDING_DIM: usize = 256;

/// Turns texts into vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> PictoResult<Vec<Vec<f32>>>;

    async fn embed_one(&self, text: &str) -> PictoResult<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| PictoError::Embedding("Empty embedding response".to_string()))
    }
}

/// Embeddings from the hosted `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> PictoResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let reply: EmbeddingResponse = self
                .client
                .post_json(
                    "embeddings",
                    &EmbeddingRequest {
                        model: &self.model,
                        input: batch,
                    },
                )
                .await?;

            if reply.data.len() != batch.len() {
                return Err(PictoError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    reply.data.len()
                )));
            }

            let mut data = reply.data;
            data.sort_by_key(|d| d.index);
            out.extend(data.into_iter().map(|d| d.embedding));
        }

        tracing::debug!("Embedded {} texts with {}", texts.len(), self.model);
        Ok(out)
    }
}

/// Offline embedder hashing character trigrams into a fixed-size vector.
///
/// Good enough to rank pages that share vocabulary with the query; used when
/// no embedding service is reachable and in tests.
#[derive(Debug, Clone, Default)]
pub struct NgramEmbedder;

impl NgramEmbedder {
    pub fn embed_text(text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; NGRAM_EMBEDDING_DIM];
        let chars: Vec<char> = text
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        if chars.len() < 3 {
            for c in &chars {
                vec[bucket(&[*c])] += 1.0;
            }
        } else {
            for window in chars.windows(3) {
                vec[bucket(window)] += 1.0;
            }
        }

        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vec.iter_mut().for_each(|x| *x /= norm);
        }
        vec
    }
}

#[async_trait]
impl Embedder for NgramEmbedder {
    async fn embed(&self, texts: &[String]) -> PictoResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::embed_text(t)).collect())
    }
}

/// FNV-1a over the UTF-8 bytes of the gram.
fn bucket(gram: &[char]) -> usize {
    let mut hash: u64 = 0xcbf29ce484222325;
    let mut buf = [0u8; 4];
    for c in gram {
        for b in c.encode_utf8(&mut buf).bytes() {
            hash ^= b as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
    }
    (hash % NGRAM_EMBEDDING_DIM as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_ngram_is_normalized_and_deterministic() {
        let a = NgramEmbedder::embed_text("rule of thirds");
        let b = NgramEmbedder::embed_text("rule of thirds");
        assert_eq!(a, b);
        assert_eq!(a.len(), NGRAM_EMBEDDING_DIM);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_ngram_prefers_shared_vocabulary() {
        let query = NgramEmbedder::embed_text("sunset landscape horizon");
        let near = NgramEmbedder::embed_text("Keep the horizon level in a landscape at sunset.");
        let far = NgramEmbedder::embed_text("Portrait lenses blur backgrounds.");
        assert!(cosine_similarity(&query, &near) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_ngram_empty_text_is_zero_vector() {
        assert!(NgramEmbedder::embed_text("   ").iter().all(|&v| v == 0.0));
    }

    #[tokio::test]
    async fn test_openai_embedder_orders_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] }
                ]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&server.uri(), "sk-test", None).unwrap();
        let embedder = OpenAiEmbedder::new(client, "text-embedding-test");
        let vectors = embedder
            .embed(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_openai_embedder_rejects_short_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&server.uri(), "sk-test", None).unwrap();
        let embedder = OpenAiEmbedder::new(client, "text-embedding-test");
        let err = embedder.embed_one("lonely").await.unwrap_err();
        assert!(matches!(err, PictoError::Embedding(_)));
    }
}
