//! HTTP embedding backends: an OpenAI-compatible API and a local Ollama server.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::errors::Error;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client() -> Result<Client, Error> {
    Ok(Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f64>,
}

/// API-key backed OpenAI-compatible embeddings client.
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, Error> {
        Ok(Self {
            client: http_client()?,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            dimension,
        })
    }

    /// The text-embedding-3 family can shorten its output server-side.
    fn requested_dimensions(&self) -> Option<usize> {
        self.model
            .contains("text-embedding-3")
            .then_some(self.dimension)
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f64>, Error> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "embeddings"))
            .bearer_auth(&self.api_key)
            .json(&OpenAiRequest {
                model: &self.model,
                input: text,
                dimensions: self.requested_dimensions(),
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Embedding(format!(
                "OpenAI embedding request failed: HTTP {status} - {body}"
            )));
        }

        let parsed: OpenAiResponse = response.json()?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Embedding("OpenAI response contained no embedding".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    embedding: Vec<f64>,
}

/// Client for a locally hosted Ollama server.
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbedder {
    /// `dimension` is the store's dimension; the server's output is reconciled
    /// to it by the chain.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, Error> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.into(),
            model: model.into(),
            dimension,
        })
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f64>, Error> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "api/embeddings"))
            .json(&OllamaRequest {
                model: &self.model,
                prompt: text,
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Ollama embedding request failed: HTTP {status} - {body}"
            )));
        }

        let parsed: OllamaResponse = response.json()?;
        if parsed.embedding.is_empty() {
            return Err(Error::Embedding(
                "Ollama returned an empty embedding".to_string(),
            ));
        }
        Ok(parsed.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
