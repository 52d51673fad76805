//! Collaborators the document server consumes.
//!
//! The similarity-search engine and the page-text extractor are external to
//! the protocol layer. They are reached through [`SearchStore`] and
//! [`PageExtractor`] so a real vector database or PDF library can be plugged
//! in without touching request handling.
//!
//! The defaults shipped here are deliberately small: [`KeywordIndex`] ranks
//! pre-chunked text by term overlap, and [`TextPageExtractor`] reads text
//! dumps whose pages are separated by form feeds.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ExtractError, StoreError};

/// One ranked match from a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Matched chunk text.
    pub document: String,
    /// Distance from the query; lower is closer.
    pub distance: f64,
    /// Chunk metadata, e.g. `{"page": 3}`.
    pub metadata: Map<String, Value>,
}

/// A similarity-search collection.
pub trait SearchStore: Send + Sync {
    /// Returns up to `k` hits for `text`, closest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be executed.
    fn query(&self, text: &str, k: usize) -> Result<Vec<SearchHit>, StoreError>;

    /// Returns the number of items in the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be inspected.
    fn count(&self) -> Result<usize, StoreError>;
}

/// Turns a document file into the text of its pages.
pub trait PageExtractor: Send + Sync {
    /// Loads `path` and returns its pages in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or has no readable text.
    fn load(&self, path: &Path) -> Result<Vec<String>, ExtractError>;
}

/// One entry of an index file.
#[derive(Debug, Clone, Deserialize)]
pub struct Chunk {
    /// Chunk text.
    pub document: String,
    /// Arbitrary metadata carried into search hits.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

struct IndexedChunk {
    chunk: Chunk,
    terms: HashSet<String>,
}

/// An in-memory [`SearchStore`] ranking chunks by term overlap.
///
/// Distance is `1 - |Q ∩ C| / |Q ∪ C|` over the lower-cased word sets of the
/// query and the chunk. Chunks sharing no term with the query are not hits.
pub struct KeywordIndex {
    chunks: Vec<IndexedChunk>,
}

impl KeywordIndex {
    /// Builds an index from chunks.
    #[must_use]
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        let chunks = chunks
            .into_iter()
            .map(|chunk| IndexedChunk {
                terms: terms(&chunk.document),
                chunk,
            })
            .collect();
        Self { chunks }
    }

    /// Loads a JSON array of `{"document": ..., "metadata": {...}}` objects.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let chunks: Vec<Chunk> =
            serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_chunks(chunks))
    }
}

impl SearchStore for KeywordIndex {
    fn query(&self, text: &str, k: usize) -> Result<Vec<SearchHit>, StoreError> {
        let query_terms = terms(text);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SearchHit> = self
            .chunks
            .iter()
            .filter_map(|indexed| {
                let shared = indexed.terms.intersection(&query_terms).count();
                if shared == 0 {
                    return None;
                }
                let union = indexed.terms.union(&query_terms).count();
                Some(SearchHit {
                    document: indexed.chunk.document.clone(),
                    distance: 1.0 - shared as f64 / union as f64,
                    metadata: indexed.chunk.metadata.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.chunks.len())
    }
}

#[allow(clippy::expect_used)] // constant pattern
fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\w+").expect("valid word pattern"))
}

fn terms(text: &str) -> HashSet<String> {
    word_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// A [`PageExtractor`] for UTF-8 text whose pages are separated by form
/// feeds (`\x0c`), as written by common PDF-to-text converters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPageExtractor;

impl PageExtractor for TextPageExtractor {
    fn load(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        let text = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut pages: Vec<String> = text.split('\x0c').map(str::to_string).collect();
        // A trailing form feed closes the last page rather than opening a new one.
        if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
            pages.pop();
        }

        if pages.iter().all(|p| p.trim().is_empty()) {
            return Err(ExtractError::NoText {
                path: PathBuf::from(path),
            });
        }
        Ok(pages)
    }
}
