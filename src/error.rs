//! Error types for document-search-mcp.
//!
//! Errors are split by who can recover from them. Only failures of the
//! connection itself ([`ErrorKind::TransportFailure`]) are allowed to end a
//! client session; everything else is absorbed at the nearest boundary and
//! turned into text for the user.

use std::path::PathBuf;

use thiserror::Error;

use crate::mcp::protocol::{ErrorCode, JsonRpcErrorData};

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Coarse classification of a client-side failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A capability call was attempted before the handshake completed.
    NotConnected,
    /// The server did not recognise a tool, prompt, or resource address.
    UnknownCapability,
    /// The server recognised the call but rejected it.
    ApplicationFailure,
    /// The connection to the server is broken. Ends the session.
    TransportFailure,
}

/// Errors raised by the client session and everything built on it.
#[derive(Error, Debug)]
pub enum McpError {
    /// No completed handshake.
    #[error("not connected to server")]
    NotConnected,

    /// The server answered with a JSON-RPC error.
    #[error("{message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i32,
        /// Message supplied by the server.
        message: String,
    },

    /// The initialize round trip failed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The server closed the stream while a reply was outstanding.
    #[error("connection to server closed")]
    ConnectionClosed,

    /// No reply arrived within the configured timeout.
    #[error("request '{method}' timed out after {seconds}s")]
    Timeout {
        /// Method that was waiting.
        method: String,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// A well-formed reply whose result has an unexpected shape. The
    /// stream itself is intact, so the session continues.
    #[error("invalid response from server: {0}")]
    InvalidResponse(String),

    /// Reading or writing the stream failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server process could not be started.
    #[error("failed to start server '{command}': {source}")]
    Spawn {
        /// Program that was launched.
        command: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl McpError {
    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConnected => ErrorKind::NotConnected,
            Self::Rpc { code, .. } if *code == ErrorCode::UNKNOWN_CAPABILITY => {
                ErrorKind::UnknownCapability
            }
            Self::Rpc { .. } | Self::InvalidResponse(_) => ErrorKind::ApplicationFailure,
            Self::Handshake(_)
            | Self::ConnectionClosed
            | Self::Timeout { .. }
            | Self::Io(_)
            | Self::Spawn { .. } => ErrorKind::TransportFailure,
        }
    }

    /// Returns `true` if the session cannot continue after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::TransportFailure)
    }
}

impl From<JsonRpcErrorData> for McpError {
    fn from(data: JsonRpcErrorData) -> Self {
        Self::Rpc {
            code: data.code,
            message: data.message,
        }
    }
}

/// A request the server could not route to a handler.
///
/// Distinct from failures *inside* a handler, which are reported as ordinary
/// text content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// `tools/call` named a tool the server does not have.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// `prompts/get` named a prompt the server does not have.
    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    /// The resource URI uses a scheme this server does not serve.
    #[error("Unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    /// The resource URI has too few path segments or an unusable name.
    #[error("Invalid URI format: {0}")]
    MalformedUri(String),

    /// The resource URI names a resource type this server does not serve.
    #[error("Unsupported resource type: {0}")]
    UnsupportedResourceType(String),

    /// The request parameters did not match the method.
    #[error("{0}")]
    InvalidParams(String),

    /// The method is not one the server speaks.
    #[error("Method not found: {0}")]
    UnknownMethod(String),

    /// A provider could not produce a listing.
    #[error("{0}")]
    Internal(String),
}

impl RouteError {
    /// Returns the JSON-RPC error code this error is reported with.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidParams(_) => ErrorCode::InvalidParams,
            Self::UnknownMethod(_) => ErrorCode::MethodNotFound,
            Self::Internal(_) => ErrorCode::InternalError,
            _ => ErrorCode::ServerError(ErrorCode::UNKNOWN_CAPABILITY),
        }
    }
}

impl From<RouteError> for JsonRpcErrorData {
    fn from(err: RouteError) -> Self {
        Self::with_message(err.code(), err.to_string())
    }
}

/// Failure of the similarity-search collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The index file could not be read.
    #[error("failed to read index {path}: {source}")]
    Read {
        /// Index path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The index file is not a valid chunk list.
    #[error("failed to parse index {path}: {source}")]
    Parse {
        /// Index path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The query could not be executed.
    #[error("query failed: {0}")]
    Query(String),
}

/// Failure of the page-text extractor.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The document could not be opened or read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Document path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The document has no extractable text.
    #[error("no extractable text in {path}")]
    NoText {
        /// Document path.
        path: PathBuf,
    },
}
