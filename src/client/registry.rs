//! Client-side cache of the server's tools, resources and prompts.

use crate::client::session::Session;
use crate::error::McpError;
use crate::mcp::types::{Prompt, Resource, Tool};

/// One consistent snapshot of everything the server advertised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    /// Advertised tools.
    pub tools: Vec<Tool>,
    /// Readable resources at refresh time.
    pub resources: Vec<Resource>,
    /// Advertised prompts.
    pub prompts: Vec<Prompt>,
}

impl Capabilities {
    async fn fetch(session: &Session) -> Result<Self, McpError> {
        Ok(Self {
            tools: session.list_tools().await?,
            resources: session.list_resources().await?,
            prompts: session.list_prompts().await?,
        })
    }
}

/// Capability cache with explicit refresh.
///
/// The cache always holds exactly what the last successful [`refresh`]
/// returned. A refresh that fails part-way leaves the previous snapshot in
/// place.
///
/// [`refresh`]: CapabilityRegistry::refresh
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    snapshot: Option<Capabilities>,
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { snapshot: None }
    }

    /// Replaces the cache with a fresh listing of all three kinds.
    ///
    /// # Errors
    ///
    /// Returns the first failing `list_*` call's error; nothing is committed
    /// in that case.
    pub async fn refresh(&mut self, session: &Session) -> Result<&Capabilities, McpError> {
        let fresh = Capabilities::fetch(session).await?;
        tracing::debug!(
            tools = fresh.tools.len(),
            resources = fresh.resources.len(),
            prompts = fresh.prompts.len(),
            "Capabilities refreshed"
        );
        Ok(self.snapshot.insert(fresh))
    }

    /// Cached tools, refreshing first if the cache was never filled.
    ///
    /// # Errors
    ///
    /// Returns the refresh error if a lazy refresh was needed and failed.
    pub async fn list_tools(&mut self, session: &Session) -> Result<&[Tool], McpError> {
        Ok(&self.snapshot(session).await?.tools)
    }

    /// Cached resources, refreshing first if the cache was never filled.
    ///
    /// # Errors
    ///
    /// Returns the refresh error if a lazy refresh was needed and failed.
    pub async fn list_resources(&mut self, session: &Session) -> Result<&[Resource], McpError> {
        Ok(&self.snapshot(session).await?.resources)
    }

    /// Cached prompts, refreshing first if the cache was never filled.
    ///
    /// # Errors
    ///
    /// Returns the refresh error if a lazy refresh was needed and failed.
    pub async fn list_prompts(&mut self, session: &Session) -> Result<&[Prompt], McpError> {
        Ok(&self.snapshot(session).await?.prompts)
    }

    /// Looks up a prompt in the cache without contacting the server.
    #[must_use]
    pub fn find_prompt(&self, name: &str) -> Option<&Prompt> {
        self.snapshot
            .as_ref()?
            .prompts
            .iter()
            .find(|prompt| prompt.name == name)
    }

    /// The current snapshot, if any refresh has succeeded.
    #[must_use]
    pub const fn cached(&self) -> Option<&Capabilities> {
        self.snapshot.as_ref()
    }

    async fn snapshot(&mut self, session: &Session) -> Result<&Capabilities, McpError> {
        let snapshot = match self.snapshot.take() {
            Some(snapshot) => snapshot,
            None => Capabilities::fetch(session).await?,
        };
        Ok(self.snapshot.insert(snapshot))
    }
}
