use crate::traits::EmbeddingProvider;
use crate::EmbeddingError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const BACKEND: &str = "embeddings-http";

#[derive(Debug, Clone)]
pub struct HttpEmbedderOptions {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
    pub batch_size: usize,
    pub request_timeout: Duration,
    pub max_concurrency: Option<usize>,
}

impl Default for HttpEmbedderOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/v1".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            api_key: None,
            dimensions: 384,
            batch_size: 64,
            request_timeout: Duration::from_secs(30),
            max_concurrency: None,
        }
    }
}

pub struct HttpEmbedder {
    client: Client,
    endpoint: Url,
    model: String,
    dimensions: usize,
    batch_size: usize,
    max_concurrency: Option<usize>,
}

impl HttpEmbedder {
    pub fn new(options: HttpEmbedderOptions) -> Result<Self, EmbeddingError> {
        if options.model.trim().is_empty() {
            return Err(EmbeddingError::Request("missing embedding model name".to_string()));
        }
        if options.dimensions == 0 {
            return Err(EmbeddingError::Request(
                "embedding dimensions must be positive".to_string(),
            ));
        }

        let base = Url::parse(&format!("{}/", options.base_url.trim_end_matches('/')))?;
        let endpoint = base.join("embeddings")?;

        let mut headers = HeaderMap::new();
        if let Some(key) = options.api_key.as_deref().filter(|key| !key.trim().is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", key.trim()))
                .map_err(|error| EmbeddingError::Request(format!("invalid api key: {error}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(options.request_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            model: options.model,
            dimensions: options.dimensions,
            batch_size: options.batch_size.max(1),
            max_concurrency: options.max_concurrency,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&EmbeddingRequest {
                model: &self.model,
                input: inputs,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmbeddingError::InvalidResponse {
                backend: BACKEND.to_string(),
                details: response.status().to_string(),
            });
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        if parsed.data.len() != inputs.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: inputs.len(),
                got: parsed.data.len(),
            });
        }
        parsed.data.sort_by_key(|entry| entry.index);

        parsed
            .data
            .into_iter()
            .map(|entry| {
                if entry.embedding.len() != self.dimensions {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: self.dimensions,
                        got: entry.embedding.len(),
                    });
                }
                Ok(entry.embedding)
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
