//! Embedding providers and the fallback chain that composes them.
//!
//! Tiers are tried in order: an API-key backed remote service, a local HTTP
//! model server, then the in-process ONNX model. A tier that fails is logged
//! and skipped; `embed` only errors when every tier has failed. Whatever a
//! tier returns is reconciled to the chain's dimension before it leaves the
//! chain.

mod lazy;
mod onnx;
mod remote;

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::config::{Config, ProviderKind};
use crate::errors::Error;

pub use lazy::LazyModel;
pub use onnx::{DEFAULT_LOCAL_MODEL, EMBEDDING_DIMS, EmbeddingEngine, LocalEmbedder};
pub use remote::{
    DEFAULT_OLLAMA_MODEL, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, OllamaEmbedder,
    OpenAiEmbedder,
};

/// Produces a vector for a piece of text.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f64>, Error>;

    /// Length of the vectors this embedder is expected to return.
    fn dimension(&self) -> usize;

    /// Short label used in logs.
    fn name(&self) -> &str;
}

/// One tier of the chain.
pub enum Provider {
    OpenAi(OpenAiEmbedder),
    Ollama(OllamaEmbedder),
    Local(LocalEmbedder),
    /// Caller-supplied backend, mainly for tests and embedding hosts.
    Custom(Box<dyn Embedder>),
}

impl Provider {
    fn as_embedder(&self) -> &dyn Embedder {
        match self {
            Provider::OpenAi(e) => e,
            Provider::Ollama(e) => e,
            Provider::Local(e) => e,
            Provider::Custom(e) => e.as_ref(),
        }
    }
}

/// Zero-pad or truncate `vec` to exactly `dimension` entries.
///
/// Padding leaves the shared prefix untouched, so cosine scores against
/// full-width vectors only see the first `vec.len()` components.
pub fn reconcile_dimension(mut vec: Vec<f64>, dimension: usize) -> Vec<f64> {
    vec.resize(dimension, 0.0);
    vec
}

struct Tier {
    provider: Provider,
    warned_mismatch: AtomicBool,
}

/// Ordered fallback over a fixed set of providers.
pub struct EmbeddingChain {
    tiers: Vec<Tier>,
    dimension: usize,
}

impl EmbeddingChain {
    /// Build a chain from explicit tiers, tried in the given order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `tiers` is empty or `dimension` is zero.
    pub fn from_tiers(dimension: usize, tiers: Vec<Provider>) -> Result<Self, Error> {
        if dimension == 0 {
            return Err(Error::Config(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }
        if tiers.is_empty() {
            return Err(Error::Config(
                "embedding chain needs at least one provider".to_string(),
            ));
        }
        Ok(Self {
            tiers: tiers
                .into_iter()
                .map(|provider| Tier {
                    provider,
                    warned_mismatch: AtomicBool::new(false),
                })
                .collect(),
            dimension,
        })
    }

    /// Build the chain described by the configuration.
    ///
    /// The in-process model is always the last tier. Nothing is loaded or
    /// contacted here.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let dimension = config.embedding_dimension;
        let mut tiers = Vec::new();

        let want_openai = matches!(
            config.embedding_provider,
            ProviderKind::Auto | ProviderKind::OpenAi
        );
        let want_ollama = matches!(
            config.embedding_provider,
            ProviderKind::Auto | ProviderKind::Ollama
        );

        if want_openai {
            match &config.openai_api_key {
                Some(key) => tiers.push(Provider::OpenAi(OpenAiEmbedder::new(
                    key.clone(),
                    config.openai_base_url.clone(),
                    config.openai_model.clone(),
                    dimension,
                )?)),
                None if config.embedding_provider == ProviderKind::OpenAi => {
                    warn!("openai provider selected but no API key configured");
                }
                None => {}
            }
        }

        if want_ollama {
            match &config.ollama_url {
                Some(url) => tiers.push(Provider::Ollama(OllamaEmbedder::new(
                    url.clone(),
                    config.ollama_model.clone(),
                    dimension,
                )?)),
                None if config.embedding_provider == ProviderKind::Ollama => {
                    warn!("ollama provider selected but no URL configured");
                }
                None => {}
            }
        }

        tiers.push(Provider::Local(LocalEmbedder::new(
            config.embedding_model.clone(),
            config.model_cache.clone(),
            dimension,
        )));

        Self::from_tiers(dimension, tiers)
    }

    /// Tier names in the order they are tried.
    pub fn tier_names(&self) -> Vec<&str> {
        self.tiers
            .iter()
            .map(|t| t.provider.as_embedder().name())
            .collect()
    }

    fn reconcile(&self, tier: &Tier, vec: Vec<f64>) -> Vec<f64> {
        if vec.len() != self.dimension && !tier.warned_mismatch.swap(true, Ordering::Relaxed) {
            warn!(
                provider = tier.provider.as_embedder().name(),
                got = vec.len(),
                expected = self.dimension,
                "embedding dimension mismatch; padding or truncating"
            );
        }
        reconcile_dimension(vec, self.dimension)
    }
}

impl Embedder for EmbeddingChain {
    fn embed(&self, text: &str) -> Result<Vec<f64>, Error> {
        let mut failures = Vec::new();
        for tier in &self.tiers {
            let embedder = tier.provider.as_embedder();
            match embedder.embed(text) {
                Ok(vec) => {
                    debug!(provider = embedder.name(), "embedded text");
                    return Ok(self.reconcile(tier, vec));
                }
                Err(e) => {
                    warn!(provider = embedder.name(), error = %e, "embedding provider failed, falling back");
                    failures.push(format!("{}: {}", embedder.name(), e));
                }
            }
        }
        Err(Error::Embedding(format!(
            "all embedding providers failed ({})",
            failures.join("; ")
        )))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "chain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    struct Fixed {
        label: &'static str,
        output: Option<Vec<f64>>,
        calls: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn ok(label: &'static str, output: Vec<f64>) -> (Box<dyn Embedder>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let e = Fixed {
                label,
                output: Some(output),
                calls: Arc::clone(&calls),
            };
            (Box::new(e), calls)
        }

        fn failing(label: &'static str) -> (Box<dyn Embedder>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let e = Fixed {
                label,
                output: None,
                calls: Arc::clone(&calls),
            };
            (Box::new(e), calls)
        }
    }

    impl Embedder for Fixed {
        fn embed(&self, _text: &str) -> Result<Vec<f64>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.output
                .clone()
                .ok_or_else(|| Error::Embedding(format!("{} unavailable", self.label)))
        }

        fn dimension(&self) -> usize {
            3
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    #[test]
    fn test_reconcile_pads_and_truncates() {
        assert_eq!(reconcile_dimension(vec![1.0, 2.0], 4), vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(reconcile_dimension(vec![1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
        assert_eq!(reconcile_dimension(vec![1.0], 1), vec![1.0]);
    }

    #[test]
    fn test_first_success_wins() {
        let (primary, primary_calls) = Fixed::ok("primary", vec![1.0, 0.0, 0.0]);
        let (fallback, fallback_calls) = Fixed::ok("fallback", vec![0.0, 1.0, 0.0]);
        let chain = EmbeddingChain::from_tiers(
            3,
            vec![Provider::Custom(primary), Provider::Custom(fallback)],
        )
        .unwrap();

        assert_eq!(chain.embed("x").unwrap(), vec![1.0, 0.0, 0.0]);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_falls_through_failed_tiers() {
        let (remote, _) = Fixed::failing("remote");
        let (server, _) = Fixed::failing("server");
        let (local, local_calls) = Fixed::ok("local", vec![0.0, 0.0, 1.0]);
        let chain = EmbeddingChain::from_tiers(
            3,
            vec![
                Provider::Custom(remote),
                Provider::Custom(server),
                Provider::Custom(local),
            ],
        )
        .unwrap();

        assert_eq!(chain.embed("x").unwrap(), vec![0.0, 0.0, 1.0]);
        assert_eq!(local_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_all_tiers_failing_reports_each() {
        let (a, _) = Fixed::failing("a");
        let (b, _) = Fixed::failing("b");
        let chain =
            EmbeddingChain::from_tiers(3, vec![Provider::Custom(a), Provider::Custom(b)]).unwrap();

        match chain.embed("x") {
            Err(Error::Embedding(msg)) => {
                assert!(msg.contains("a unavailable"));
                assert!(msg.contains("b unavailable"));
            }
            other => panic!("expected embedding error, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_output_reconciled_to_chain_dimension() {
        let (short, _) = Fixed::ok("short", vec![0.5, 0.5]);
        let chain = EmbeddingChain::from_tiers(4, vec![Provider::Custom(short)]).unwrap();
        assert_eq!(chain.embed("x").unwrap(), vec![0.5, 0.5, 0.0, 0.0]);
        // warning is only emitted once, output stays deterministic
        assert_eq!(chain.embed("x").unwrap(), vec![0.5, 0.5, 0.0, 0.0]);
        assert_eq!(chain.dimension(), 4);
    }

    #[test]
    fn test_from_tiers_rejects_empty_and_zero_dimension() {
        assert!(matches!(
            EmbeddingChain::from_tiers(3, Vec::new()),
            Err(Error::Config(_))
        ));
        let (a, _) = Fixed::ok("a", vec![1.0]);
        assert!(matches!(
            EmbeddingChain::from_tiers(0, vec![Provider::Custom(a)]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_config_tier_order() {
        let mut config = Config::default();
        assert_eq!(
            EmbeddingChain::from_config(&config).unwrap().tier_names(),
            vec!["local"]
        );

        config.openai_api_key = Some("sk-test".to_string());
        config.ollama_url = Some("http://localhost:11434".to_string());
        assert_eq!(
            EmbeddingChain::from_config(&config).unwrap().tier_names(),
            vec!["openai", "ollama", "local"]
        );

        config.embedding_provider = ProviderKind::Ollama;
        assert_eq!(
            EmbeddingChain::from_config(&config).unwrap().tier_names(),
            vec!["ollama", "local"]
        );

        config.embedding_provider = ProviderKind::Local;
        assert_eq!(
            EmbeddingChain::from_config(&config).unwrap().tier_names(),
            vec!["local"]
        );
    }

    #[test]
    fn test_chain_pads_short_ollama_output() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding":[0.5,0.5]}"#)
            .create();

        let ollama = OllamaEmbedder::new(server.url(), DEFAULT_OLLAMA_MODEL, 3).unwrap();
        let (local, local_calls) = Fixed::ok("local", vec![1.0, 2.0, 3.0]);
        let chain = EmbeddingChain::from_tiers(
            3,
            vec![Provider::Ollama(ollama), Provider::Custom(local)],
        )
        .unwrap();

        assert_eq!(chain.embed("x").unwrap(), vec![0.5, 0.5, 0.0]);
        assert_eq!(local_calls.load(Ordering::SeqCst), 0);
        mock.assert();
    }

    #[test]
    fn test_chain_with_unreachable_server_falls_back() {
        let ollama = OllamaEmbedder::new("http://127.0.0.1:1", DEFAULT_OLLAMA_MODEL, 3).unwrap();
        let (local, _) = Fixed::ok("local", vec![1.0, 2.0, 3.0]);
        let chain = EmbeddingChain::from_tiers(
            3,
            vec![Provider::Ollama(ollama), Provider::Custom(local)],
        )
        .unwrap();
        assert_eq!(chain.embed("x").unwrap(), vec![1.0, 2.0, 3.0]);
    }
}
