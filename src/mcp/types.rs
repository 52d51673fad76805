//! Capability data model shared by the client and the server.
//!
//! Field names follow the MCP wire format (`camelCase`), so these types are
//! serialised by the server and deserialised by the client unchanged.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Name and version of one side of the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// Implementation name.
    pub name: String,
    /// Implementation version.
    pub version: String,
}

impl Implementation {
    /// Creates an implementation descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Per-capability flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChanged {
    /// Whether the list can change during the session.
    #[serde(default, skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

/// Capabilities a server declares during the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Present if the server exposes tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ListChanged>,
    /// Present if the server exposes resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ListChanged>,
    /// Present if the server exposes prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<ListChanged>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ListChanged::default()),
            resources: Some(ListChanged::default()),
            prompts: Some(ListChanged::default()),
        }
    }
}

/// Parameters of the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<Implementation>,
}

/// Result of the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Version the server agreed to.
    pub protocol_version: String,
    /// Declared capability set.
    #[serde(default)]
    pub capabilities: ServerCapabilities,
    /// Server identity.
    pub server_info: Implementation,
}

/// A tool definition for the `tools/list` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// A readable document for the `resources/list` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Unique address of the resource.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the underlying document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// One declared argument of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the argument must be supplied.
    #[serde(default)]
    pub required: bool,
}

/// A prompt template for the `prompts/list` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Unique prompt name.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Arguments in declaration order.
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// Speaker of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side.
    User,
    /// The model side.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Assistant => f.write_str("assistant"),
        }
    }
}

/// Content item in tool results and prompt messages.
///
/// Item types this crate does not know deserialise as [`Content::Unknown`]
/// instead of failing the whole reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
    /// Base64-encoded image.
    Image {
        /// Encoded bytes.
        data: String,
        /// Image MIME type.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Base64-encoded audio.
    Audio {
        /// Encoded bytes.
        data: String,
        /// Audio MIME type.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// A resource embedded in the message.
    Resource {
        /// The embedded contents.
        resource: ResourceContents,
    },
    /// Any other item type.
    #[serde(other)]
    Unknown,
}

impl Content {
    /// Creates text content.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Returns the text of this item, or a placeholder for non-text items.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text { text } => Cow::Borrowed(text),
            Self::Image { mime_type, .. } => Cow::Owned(format!("[image content: {mime_type}]")),
            Self::Audio { mime_type, .. } => Cow::Owned(format!("[audio content: {mime_type}]")),
            Self::Resource { resource } => resource.to_text(),
            Self::Unknown => Cow::Borrowed("[unsupported content]"),
        }
    }
}

/// Parameters for the `tools/call` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<Content>,
    /// Whether the tool call resulted in an error.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: true,
        }
    }

    /// Joins every text item with a newline.
    #[must_use]
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(Content::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Parameters for the `resources/read` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceParams {
    /// Address of the resource.
    pub uri: String,
}

/// One content item of a read resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    /// Address the content came from.
    pub uri: String,
    /// MIME type of the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Text content, if textual.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64 content, if binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

impl ResourceContents {
    /// Creates a plain-text content item.
    #[must_use]
    pub fn text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some("text/plain".to_string()),
            text: Some(text.into()),
            blob: None,
        }
    }

    /// The text of this item, or a `[binary content: <mime>]` placeholder.
    #[must_use]
    pub fn to_text(&self) -> Cow<'_, str> {
        match (&self.text, &self.mime_type) {
            (Some(text), _) => Cow::Borrowed(text),
            (None, Some(mime)) => Cow::Owned(format!("[binary content: {mime}]")),
            (None, None) => Cow::Borrowed("[binary content]"),
        }
    }
}

/// Result of the `resources/read` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResourceResult {
    /// Content items.
    pub contents: Vec<ResourceContents>,
}

impl ReadResourceResult {
    /// Renders every content item as text.
    ///
    /// Binary items become a `[binary content: <mime>]` placeholder.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.contents
            .iter()
            .map(ResourceContents::to_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Parameters for the `prompts/get` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptParams {
    /// Prompt name.
    pub name: String,
    /// Argument values by name.
    #[serde(default)]
    pub arguments: Option<serde_json::Map<String, Value>>,
}

/// One rendered message of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Speaker.
    pub role: Role,
    /// Message body.
    pub content: Content,
}

impl PromptMessage {
    /// Creates a text message.
    #[must_use]
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Content::text(text),
        }
    }
}

/// Result of the `prompts/get` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPromptResult {
    /// Summary of the rendered prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rendered messages in order.
    pub messages: Vec<PromptMessage>,
}

/// Result of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Advertised tools.
    pub tools: Vec<Tool>,
}

/// Result of `resources/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResourcesResult {
    /// Available resources.
    pub resources: Vec<Resource>,
}

/// Result of `prompts/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPromptsResult {
    /// Available prompts.
    pub prompts: Vec<Prompt>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tool_call_result_text() {
        let result = ToolCallResult::text("Hello, world!");
        assert!(!result.is_error);
        assert_eq!(result.content.len(), 1);
        assert_eq!(result.content[0].as_text(), "Hello, world!");
    }

    #[test]
    fn tool_call_result_error() {
        let result = ToolCallResult::error("Something went wrong");
        assert!(result.is_error);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isError"], true);
        assert_eq!(json["content"][0]["type"], "text");
    }

    #[test]
    fn success_result_omits_is_error() {
        let json = serde_json::to_string(&ToolCallResult::text("ok")).unwrap();
        assert!(!json.contains("isError"));
    }

    #[test]
    fn resource_uses_camel_case_mime_type() {
        let resource = Resource {
            uri: "document://pdf/report".to_string(),
            name: "Report".to_string(),
            description: None,
            mime_type: Some("application/pdf".to_string()),
        };
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["mimeType"], "application/pdf");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn binary_resource_renders_placeholder() {
        let result = ReadResourceResult {
            contents: vec![
                ResourceContents::text("a://b", "hello"),
                ResourceContents {
                    uri: "a://c".to_string(),
                    mime_type: Some("image/png".to_string()),
                    text: None,
                    blob: Some("AAAA".to_string()),
                },
            ],
        };
        assert_eq!(result.to_text(), "hello\n[binary content: image/png]");
    }

    #[test]
    fn non_text_content_renders_placeholders() {
        let content: Vec<Content> = serde_json::from_value(json!([
            {"type": "image", "data": "aGk=", "mimeType": "image/png"},
            {"type": "audio", "data": "aGk=", "mimeType": "audio/wav"},
            {"type": "resource", "resource": {"uri": "a://b", "text": "embedded"}},
            {"type": "resource", "resource": {"uri": "a://c", "blob": "AAAA"}},
            {"type": "video", "url": "https://example.com/clip"}
        ]))
        .unwrap();

        let rendered: Vec<_> = content.iter().map(Content::as_text).collect();
        assert_eq!(
            rendered,
            vec![
                "[image content: image/png]",
                "[audio content: audio/wav]",
                "embedded",
                "[binary content]",
                "[unsupported content]",
            ]
        );
        assert_eq!(content[4], Content::Unknown);
    }

    #[test]
    fn prompt_without_arguments_deserialises() {
        let prompt: Prompt = serde_json::from_str(r#"{"name":"p"}"#).unwrap();
        assert!(prompt.arguments.is_empty());
        assert!(prompt.description.is_none());
    }
}
