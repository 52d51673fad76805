//! Echo profile: one tool, one resource template and one prompt that
//! repeat their input. Handy for checking a client end to end without a
//! document collection.

use serde_json::{json, Map, Value};

use crate::error::RouteError;
use crate::mcp::types::{
    GetPromptResult, Implementation, Prompt, PromptArgument, PromptMessage, ReadResourceResult,
    Resource, ResourceContents, Role, Tool, ToolCallResult,
};
use crate::server::provider::CapabilityProvider;

/// URI prefix served by [`Echo`].
pub const ECHO_SCHEME: &str = "echo://";

/// The echo provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

fn message_argument(arguments: &Map<String, Value>) -> Option<String> {
    match arguments.get("message")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

impl CapabilityProvider for Echo {
    fn server_info(&self) -> Implementation {
        Implementation::new("echo", env!("CARGO_PKG_VERSION"))
    }

    fn list_tools(&self) -> Result<Vec<Tool>, RouteError> {
        Ok(vec![Tool {
            name: "echo_tool".to_string(),
            description: Some("Echo a message back".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string" }
                },
                "required": ["message"]
            }),
        }])
    }

    fn call_tool(&self, name: &str, arguments: &Value) -> Result<ToolCallResult, RouteError> {
        if name != "echo_tool" {
            return Err(RouteError::UnknownTool(name.to_string()));
        }
        let message = arguments
            .as_object()
            .and_then(message_argument)
            .unwrap_or_default();
        Ok(ToolCallResult::text(format!("Tool echo: {message}")))
    }

    fn list_resources(&self) -> Result<Vec<Resource>, RouteError> {
        // Echo resources are a URI template, not a fixed list.
        Ok(Vec::new())
    }

    fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, RouteError> {
        let Some(message) = uri.strip_prefix(ECHO_SCHEME) else {
            return Err(RouteError::UnsupportedScheme(uri.to_string()));
        };
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(
                uri,
                format!("Resource echo: {message}"),
            )],
        })
    }

    fn list_prompts(&self) -> Result<Vec<Prompt>, RouteError> {
        Ok(vec![Prompt {
            name: "echo_prompt".to_string(),
            description: Some("Ask the model to process a message".to_string()),
            arguments: vec![PromptArgument {
                name: "message".to_string(),
                description: None,
                required: true,
            }],
        }])
    }

    fn get_prompt(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<GetPromptResult, RouteError> {
        if name != "echo_prompt" {
            return Err(RouteError::UnknownPrompt(name.to_string()));
        }
        let message = message_argument(arguments).unwrap_or_default();
        Ok(GetPromptResult {
            description: None,
            messages: vec![PromptMessage::text(
                Role::User,
                format!("Please process this message: {message}"),
            )],
        })
    }
}
