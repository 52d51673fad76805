//! Request routing.
//!
//! Every incoming method is parsed into one [`Request`] variant before it
//! reaches a handler, so dispatch is a single exhaustive `match`. Names the
//! server does not speak land in [`Request::Unsupported`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::RouteError;
use crate::mcp::protocol::{Method, MCP_PROTOCOL_VERSION};
use crate::mcp::types::{
    GetPromptParams, InitializeParams, InitializeResult, ListPromptsResult, ListResourcesResult,
    ListToolsResult, ReadResourceParams, ServerCapabilities, ToolCallParams,
};
use crate::server::provider::CapabilityProvider;

/// A parsed request, one variant per method.
#[derive(Debug, Clone)]
pub enum Request {
    /// `initialize`
    Initialize(InitializeParams),
    /// `ping`
    Ping,
    /// `tools/list`
    ListTools,
    /// `tools/call`
    CallTool(ToolCallParams),
    /// `resources/list`
    ListResources,
    /// `resources/read`
    ReadResource(ReadResourceParams),
    /// `prompts/list`
    ListPrompts,
    /// `prompts/get`
    GetPrompt(GetPromptParams),
    /// Any method outside the table.
    Unsupported(String),
}

impl Request {
    /// Builds a request from its method and raw params.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidParams`] if a method that takes params
    /// is missing them or they have the wrong shape.
    pub fn parse(method: Method, params: Option<Value>) -> Result<Self, RouteError> {
        Ok(match method {
            Method::Initialize => Self::Initialize(required_params(&method, params)?),
            Method::Ping => Self::Ping,
            Method::ListTools => Self::ListTools,
            Method::CallTool => Self::CallTool(required_params(&method, params)?),
            Method::ListResources => Self::ListResources,
            Method::ReadResource => Self::ReadResource(required_params(&method, params)?),
            Method::ListPrompts => Self::ListPrompts,
            Method::GetPrompt => Self::GetPrompt(required_params(&method, params)?),
            Method::Unsupported(name) => Self::Unsupported(name),
        })
    }

    /// Returns `true` for capability calls, which need a completed handshake.
    #[must_use]
    pub const fn needs_session(&self) -> bool {
        !matches!(
            self,
            Self::Initialize(_) | Self::Ping | Self::Unsupported(_)
        )
    }
}

fn required_params<T: DeserializeOwned>(
    method: &Method,
    params: Option<Value>,
) -> Result<T, RouteError> {
    let value =
        params.ok_or_else(|| RouteError::InvalidParams(format!("Missing {method} params")))?;
    serde_json::from_value(value)
        .map_err(|e| RouteError::InvalidParams(format!("Invalid {method} params: {e}")))
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, RouteError> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialise result");
        RouteError::Internal("Internal error: failed to serialise result".to_string())
    })
}

/// Maps each [`Request`] to the matching provider handler.
///
/// The router holds no session state; the lifecycle gate lives in
/// [`crate::server::McpServer`].
#[derive(Clone)]
pub struct RequestRouter {
    provider: Arc<dyn CapabilityProvider>,
}

impl RequestRouter {
    /// Creates a router over `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn CapabilityProvider>) -> Self {
        Self { provider }
    }

    /// The handshake reply: protocol version, capabilities, identity.
    #[must_use]
    pub fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: self.provider.server_info(),
        }
    }

    /// Runs `request` and returns the JSON result.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] if the request names a method, tool, prompt
    /// or resource address this server does not have.
    pub fn route(&self, request: Request) -> Result<Value, RouteError> {
        match request {
            Request::Initialize(_) => to_result(&self.initialize_result()),
            Request::Ping => Ok(json!({})),
            Request::ListTools => to_result(&ListToolsResult {
                tools: self.provider.list_tools()?,
            }),
            Request::CallTool(params) => {
                let arguments = match params.arguments {
                    Value::Null => Value::Object(Map::new()),
                    other => other,
                };
                to_result(&self.provider.call_tool(&params.name, &arguments)?)
            }
            Request::ListResources => to_result(&ListResourcesResult {
                resources: self.provider.list_resources()?,
            }),
            Request::ReadResource(params) => to_result(&self.provider.read_resource(&params.uri)?),
            Request::ListPrompts => to_result(&ListPromptsResult {
                prompts: self.provider.list_prompts()?,
            }),
            Request::GetPrompt(params) => {
                let arguments = params.arguments.unwrap_or_default();
                to_result(&self.provider.get_prompt(&params.name, &arguments)?)
            }
            Request::Unsupported(name) => Err(RouteError::UnknownMethod(name)),
        }
    }
}
