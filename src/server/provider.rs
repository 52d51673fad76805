//! The seam between request routing and the capabilities behind it.

use serde_json::{Map, Value};

use crate::error::RouteError;
use crate::mcp::types::{
    GetPromptResult, Implementation, Prompt, ReadResourceResult, Resource, Tool, ToolCallResult,
};
use crate::server::context::ServerContext;
use crate::server::prompts::PromptRenderer;
use crate::server::resources::ResourceResolver;
use crate::server::tools::ToolExecutor;

/// Server name advertised by the document search profile.
pub const DOCUMENT_SERVER_NAME: &str = "document-search-mcp";

/// A set of tools, resources and prompts a server exposes.
///
/// Handlers take `&self`: providers are read-only during request handling.
pub trait CapabilityProvider: Send + Sync {
    /// Identity returned from the handshake.
    fn server_info(&self) -> Implementation;

    /// Advertised tools.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool list cannot be produced.
    fn list_tools(&self) -> Result<Vec<Tool>, RouteError>;

    /// Runs one tool.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::UnknownTool`] for names not in [`Self::list_tools`].
    fn call_tool(&self, name: &str, arguments: &Value) -> Result<ToolCallResult, RouteError>;

    /// Currently readable resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource list cannot be produced.
    fn list_resources(&self) -> Result<Vec<Resource>, RouteError>;

    /// Reads one resource.
    ///
    /// # Errors
    ///
    /// Returns a routing error for URIs this provider does not serve.
    fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, RouteError>;

    /// Advertised prompts.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt list cannot be produced.
    fn list_prompts(&self) -> Result<Vec<Prompt>, RouteError>;

    /// Renders one prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::UnknownPrompt`] for names not in [`Self::list_prompts`].
    fn get_prompt(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<GetPromptResult, RouteError>;
}

/// The document search server: search tools, document resources, analysis
/// prompts.
pub struct DocumentSearch {
    ctx: ServerContext,
}

impl DocumentSearch {
    /// Creates the provider over `ctx`.
    #[must_use]
    pub const fn new(ctx: ServerContext) -> Self {
        Self { ctx }
    }
}

impl CapabilityProvider for DocumentSearch {
    fn server_info(&self) -> Implementation {
        Implementation::new(DOCUMENT_SERVER_NAME, env!("CARGO_PKG_VERSION"))
    }

    fn list_tools(&self) -> Result<Vec<Tool>, RouteError> {
        Ok(ToolExecutor::definitions())
    }

    fn call_tool(&self, name: &str, arguments: &Value) -> Result<ToolCallResult, RouteError> {
        ToolExecutor::new(&self.ctx).call(name, arguments)
    }

    fn list_resources(&self) -> Result<Vec<Resource>, RouteError> {
        Ok(ResourceResolver::new(&self.ctx).list())
    }

    fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, RouteError> {
        ResourceResolver::new(&self.ctx).read(uri)
    }

    fn list_prompts(&self) -> Result<Vec<Prompt>, RouteError> {
        Ok(PromptRenderer::definitions())
    }

    fn get_prompt(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<GetPromptResult, RouteError> {
        PromptRenderer::render(name, arguments)
    }
}
