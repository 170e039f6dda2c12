//! The service struct and its lazy initialization.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::embedding::{Embedder, EmbeddingChain};
use crate::errors::Error;
use crate::sqlite::Database;

/// Source tag for memories stored through the CLI and library callers.
pub const DEFAULT_SOURCE: &str = "recollect:cli";
/// Source tag for memories stored by [`MemoryService::auto_capture`].
pub const AUTOSAVE_SOURCE: &str = "recollect:autosave";

/// Facade over the memory database and the embedding chain.
///
/// Nothing is opened or loaded at construction. Every operation calls
/// [`ensure_initialized`](Self::ensure_initialized) first, so callers never
/// need to sequence initialization themselves. Embedding-producing
/// operations take `&mut self` for that reason.
pub struct MemoryService {
    pub(crate) config: Config,
    pub(crate) db: Option<Database>,
    pub(crate) embedder: Option<Arc<dyn Embedder>>,
    injected: Option<Arc<dyn Embedder>>,
}

impl MemoryService {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            db: None,
            embedder: None,
            injected: None,
        }
    }

    /// Use `embedder` instead of building a chain from the configuration.
    ///
    /// The store is opened with the embedder's dimension.
    pub fn with_embedder(config: Config, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            injected: Some(embedder),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether the store is open and the embedder is built.
    pub fn is_initialized(&self) -> bool {
        self.embedder.is_some() && self.db.as_ref().is_some_and(Database::is_open)
    }

    /// Open the store and build the embedding chain if that has not happened yet.
    ///
    /// A no-op when already initialized and the store answers. A store
    /// handle that stopped answering is reopened.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the chain cannot be built or the database
    /// or model cache directories cannot be created, and a storage error if the database cannot
    /// be opened. A failed call leaves the service uninitialized; the next
    /// call retries.
    pub fn ensure_initialized(&mut self) -> Result<(), Error> {
        if self.is_initialized() {
            return Ok(());
        }

        let embedder = match &self.embedder {
            Some(embedder) => Arc::clone(embedder),
            None => self.build_embedder()?,
        };

        match self.db.as_mut() {
            Some(db) if !db.is_open() => {
                warn!(path = %db.path().display(), "memory database stopped answering, reopening");
                db.reopen()?;
            }
            Some(_) => {}
            None => {
                self.config.ensure_directories()?;
                let path = self.config.database_path.clone();
                let db = Database::open(&path, embedder.dimension())?;
                info!(
                    path = %path.display(),
                    dimension = embedder.dimension(),
                    "memory store initialized"
                );
                self.db = Some(db);
            }
        }

        self.embedder = Some(embedder);
        Ok(())
    }

    fn build_embedder(&self) -> Result<Arc<dyn Embedder>, Error> {
        if let Some(embedder) = &self.injected {
            return Ok(Arc::clone(embedder));
        }
        let chain = EmbeddingChain::from_config(&self.config)?;
        info!(providers = ?chain.tier_names(), "embedding chain ready");
        Ok(Arc::new(chain))
    }

    /// Close the store and drop the embedding chain. The next operation
    /// initializes again from the configuration.
    pub fn shutdown(&mut self) {
        if let Some(mut db) = self.db.take() {
            db.close();
        }
        self.embedder = None;
    }

    /// The open database.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotInitialized` before the first successful
    /// [`ensure_initialized`](Self::ensure_initialized) or after
    /// [`shutdown`](Self::shutdown).
    pub fn database(&self) -> Result<&Database, Error> {
        self.db.as_ref().ok_or(Error::NotInitialized)
    }

    /// Initialize, then embed `text`.
    pub(crate) fn embed(&mut self, text: &str) -> Result<Vec<f64>, Error> {
        self.ensure_initialized()?;
        self.embedder
            .as_ref()
            .ok_or(Error::NotInitialized)?
            .embed(text)
    }

    /// Initialize, then borrow the database.
    pub(crate) fn initialized_db(&mut self) -> Result<&Database, Error> {
        self.ensure_initialized()?;
        self.database()
    }
}

/// Reject empty and whitespace-only text.
pub(crate) fn validate_text(text: &str) -> Result<(), Error> {
    if text.trim().is_empty() {
        return Err(Error::Validation("text cannot be empty".to_string()));
    }
    Ok(())
}
