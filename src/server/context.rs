//! Read-only state shared by the document handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::server::store::{KeywordIndex, PageExtractor, SearchStore, TextPageExtractor};

/// Everything the document handlers need, fixed at start-up.
///
/// Built once and handed to the router; request handling never mutates it.
#[derive(Clone)]
pub struct ServerContext {
    documents_dir: PathBuf,
    extension: String,
    collection_name: String,
    store: Option<Arc<dyn SearchStore>>,
    extractor: Arc<dyn PageExtractor>,
}

impl ServerContext {
    /// Creates a context with no search store and the text extractor.
    #[must_use]
    pub fn new(documents_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            documents_dir: documents_dir.into(),
            extension: extension.into(),
            collection_name: "pdf_collection".to_string(),
            store: None,
            extractor: Arc::new(TextPageExtractor),
        }
    }

    /// Builds the context described by the configuration.
    ///
    /// A configured index that fails to load is logged and left absent, so
    /// the search tools answer with their "not initialized" text.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        let mut ctx = Self::new(&config.documents_dir, &config.document_extension)
            .with_collection_name(&config.collection_name);

        if let Some(index_path) = &config.index_path {
            match KeywordIndex::load(index_path) {
                Ok(index) => {
                    tracing::info!(path = %index_path.display(), "Loaded search index");
                    ctx = ctx.with_store(Arc::new(index));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load search index");
                }
            }
        }

        ctx
    }

    /// Sets the search store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SearchStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the page extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn PageExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Sets the collection name.
    #[must_use]
    pub fn with_collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = name.into();
        self
    }

    /// Directory scanned for documents.
    #[must_use]
    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    /// Document extension, without the dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Collection name reported by `get_collection_info`.
    #[must_use]
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// The search store, if one is initialised.
    #[must_use]
    pub fn store(&self) -> Option<&dyn SearchStore> {
        self.store.as_deref()
    }

    /// The page extractor.
    #[must_use]
    pub fn extractor(&self) -> &dyn PageExtractor {
        self.extractor.as_ref()
    }
}
