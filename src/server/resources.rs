//! Document resources addressed as `document://pdf/<name>`.
//!
//! The listing is recomputed from the documents directory on every call.
//! Reading parses the URI (malformed or foreign URIs are routing errors),
//! then extracts page text. Extraction failures come back as text content.

use std::path::PathBuf;

use crate::error::RouteError;
use crate::mcp::types::{ReadResourceResult, Resource, ResourceContents};
use crate::server::context::ServerContext;

/// URI prefix of every document resource.
pub const DOCUMENT_SCHEME: &str = "document://";

/// Resource type segment of document URIs.
pub const DOCUMENT_TYPE: &str = "pdf";

/// Lists and reads documents from a [`ServerContext`].
pub struct ResourceResolver<'a> {
    ctx: &'a ServerContext,
}

impl<'a> ResourceResolver<'a> {
    /// Creates a resolver over `ctx`.
    #[must_use]
    pub const fn new(ctx: &'a ServerContext) -> Self {
        Self { ctx }
    }

    /// Scans the documents directory.
    ///
    /// Scan failures are logged and yield whatever was found so far.
    #[must_use]
    pub fn list(&self) -> Vec<Resource> {
        let dir = self.ctx.documents_dir().to_string_lossy();
        let pattern = format!(
            "{}/*.{}",
            glob::Pattern::escape(&dir),
            glob::Pattern::escape(self.ctx.extension())
        );
        let options = glob::MatchOptions {
            case_sensitive: false,
            ..glob::MatchOptions::new()
        };

        let paths = match glob::glob_with(&pattern, options) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::error!(error = %e, "Error scanning for documents");
                return Vec::new();
            }
        };

        let mut resources = Vec::new();
        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::error!(error = %e, "Error scanning for documents");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            resources.push(Resource {
                uri: format!("{DOCUMENT_SCHEME}{DOCUMENT_TYPE}/{stem}"),
                name: display_name(stem),
                description: Some(format!(
                    "{} document: {stem}",
                    self.ctx.extension().to_uppercase()
                )),
                mime_type: Some(mime_type(self.ctx.extension()).to_string()),
            });
        }

        tracing::debug!(count = resources.len(), "Listed document resources");
        resources
    }

    /// Reads the document at `uri`.
    ///
    /// # Errors
    ///
    /// Returns a routing error if the URI is not a well-formed document URI.
    /// A document that cannot be loaded is *not* an error: its failure is
    /// returned as the text content.
    pub fn read(&self, uri: &str) -> Result<ReadResourceResult, RouteError> {
        let name = parse_document_uri(uri)?;
        let path = self.document_path(name);

        let text = match self.ctx.extractor().load(&path) {
            Ok(pages) => {
                let text = join_pages(&pages);
                tracing::info!(
                    document = name,
                    pages = pages.len(),
                    "Loaded document"
                );
                text
            }
            Err(e) => {
                tracing::error!(uri, error = %e, "Error loading document");
                format!("Error loading document {uri}: {e}")
            }
        };

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(uri, text)],
        })
    }

    fn document_path(&self, name: &str) -> PathBuf {
        let suffix = format!(".{}", self.ctx.extension());
        let file = if name.to_lowercase().ends_with(&suffix.to_lowercase()) {
            name.to_string()
        } else {
            format!("{name}{suffix}")
        };
        self.ctx.documents_dir().join(file)
    }
}

/// Extracts `<name>` from `document://pdf/<name>`.
///
/// # Errors
///
/// - [`RouteError::UnsupportedScheme`] for any other scheme
/// - [`RouteError::MalformedUri`] for missing segments or unusable names
/// - [`RouteError::UnsupportedResourceType`] for a type other than `pdf`
pub fn parse_document_uri(uri: &str) -> Result<&str, RouteError> {
    let Some(rest) = uri.strip_prefix(DOCUMENT_SCHEME) else {
        return Err(RouteError::UnsupportedScheme(uri.to_string()));
    };

    let mut segments = rest.split('/');
    let resource_type = segments.next().unwrap_or_default();
    let Some(name) = segments.next() else {
        return Err(RouteError::MalformedUri(uri.to_string()));
    };

    if resource_type != DOCUMENT_TYPE {
        return Err(RouteError::UnsupportedResourceType(resource_type.to_string()));
    }
    if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
        return Err(RouteError::MalformedUri(uri.to_string()));
    }

    Ok(name)
}

/// Concatenates pages, each preceded by a 1-based `--- Page N ---` marker.
#[must_use]
pub fn join_pages(pages: &[String]) -> String {
    let mut text = String::new();
    for (i, page) in pages.iter().enumerate() {
        text.push_str(&format!("\n\n--- Page {} ---\n\n", i + 1));
        text.push_str(page);
    }
    text
}

/// `quarterly_report` → `Quarterly Report`.
///
/// Every letter that follows a non-letter is upper-cased, the rest are
/// lower-cased.
#[must_use]
pub fn display_name(stem: &str) -> String {
    let mut name = String::with_capacity(stem.len());
    let mut at_word_start = true;
    for c in stem.replace('_', " ").chars() {
        if c.is_alphabetic() {
            if at_word_start {
                name.extend(c.to_uppercase());
            } else {
                name.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            name.push(c);
            at_word_start = true;
        }
    }
    name
}

fn mime_type(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        _ => "application/octet-stream",
    }
}
