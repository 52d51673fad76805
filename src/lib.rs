//! document-search-mcp: MCP client and server for a local document collection
//!
//! The server exposes a document directory over the Model Context Protocol:
//!
//! - **Tools**: similarity search over an index of document chunks, and
//!   collection statistics
//! - **Resources**: each document as `document://pdf/<name>`, read page by page
//! - **Prompts**: analysis templates with the user's focus substituted in
//!
//! The client spawns a server, caches what it offers, and runs an interactive
//! command loop that records the conversation.
//!
//! # Modules
//!
//! - [`client`] — Session, capability cache, command loop, history
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol, data model and transport
//! - [`server`] — Server lifecycle, routing and the capability providers

pub mod client;
pub mod config;
pub mod error;
pub mod mcp;
pub mod server;
