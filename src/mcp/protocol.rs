//! JSON-RPC 2.0 message types for the MCP protocol.
//!
//! Both halves of the crate use this module: the server parses
//! [`IncomingMessage`]s and writes [`JsonRpcResponse`]/[`JsonRpcError`], the
//! client writes [`JsonRpcRequest`]/[`OutgoingNotification`] and parses
//! [`JsonRpcReply`].
//!
//! # MCP-Specific Constraints
//!
//! - Request IDs must be strings or integers (never `null`)
//! - Request IDs must be unique within a session

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// A JSON-RPC 2.0 request ID.
///
/// Per the MCP specification, IDs must be strings or integers, never `null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// Every method this crate speaks.
///
/// Names outside the table land in [`Method::Unsupported`] so dispatch is a
/// single exhaustive `match`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// Handshake request.
    Initialize,
    /// Liveness check.
    Ping,
    /// `tools/list`
    ListTools,
    /// `tools/call`
    CallTool,
    /// `resources/list`
    ListResources,
    /// `resources/read`
    ReadResource,
    /// `prompts/list`
    ListPrompts,
    /// `prompts/get`
    GetPrompt,
    /// Anything else.
    Unsupported(String),
}

impl Method {
    /// Returns the wire name of this method.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::Ping => "ping",
            Self::ListTools => "tools/list",
            Self::CallTool => "tools/call",
            Self::ListResources => "resources/list",
            Self::ReadResource => "resources/read",
            Self::ListPrompts => "prompts/list",
            Self::GetPrompt => "prompts/get",
            Self::Unsupported(name) => name,
        }
    }
}

impl From<&str> for Method {
    fn from(name: &str) -> Self {
        match name {
            "initialize" => Self::Initialize,
            "ping" => Self::Ping,
            "tools/list" => Self::ListTools,
            "tools/call" => Self::CallTool,
            "resources/list" => Self::ListResources,
            "resources/read" => Self::ReadResource,
            "prompts/list" => Self::ListPrompts,
            "prompts/get" => Self::GetPrompt,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request in either direction. The peer must answer it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol marker, always "2.0".
    pub jsonrpc: String,

    /// Correlation id, unique per session.
    pub id: RequestId,

    /// Wire name of the method.
    pub method: String,

    /// Method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a new outgoing request.
    #[must_use]
    pub fn new(id: RequestId, method: &Method, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.as_str().to_string(),
            params,
        }
    }

    /// Checks the envelope. Returns the problem, if any.
    #[must_use]
    pub fn validate(&self) -> Option<&'static str> {
        if self.jsonrpc != "2.0" {
            return Some("jsonrpc field must be \"2.0\"");
        }
        if self.method.is_empty() {
            return Some("method field cannot be empty");
        }
        None
    }
}

/// An incoming notification: no id, no answer.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    /// Protocol marker.
    pub jsonrpc: String,

    /// Notification name, e.g. `notifications/initialized`.
    pub method: String,

    /// Notification parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

/// An outgoing JSON-RPC 2.0 notification.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingNotification {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl OutgoingNotification {
    /// Creates a new outgoing notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }

    /// The notification a client sends once the initialize reply is in.
    #[must_use]
    pub fn initialized() -> Self {
        Self::new("notifications/initialized", None)
    }
}

/// A success reply written by the server.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// Id of the request being answered.
    pub id: RequestId,

    /// Method result.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Wraps `result` as the answer to `id`.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result,
        }
    }
}

/// JSON-RPC error codes used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// Server-defined error.
    ServerError(i32),
}

impl ErrorCode {
    /// Server-defined code for an unknown tool, prompt, or resource address.
    pub const UNKNOWN_CAPABILITY: i32 = -32002;

    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerError(code) => code,
        }
    }

    /// Message used when no more specific text is available.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::ServerError(_) => "Server error",
        }
    }
}

/// The `error` member of an error reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// An error carrying the code's default message.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// An error with its own message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }
}

/// An error reply written by the server.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this error corresponds to (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Builds an error reply for `id`.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error,
        }
    }

    /// Reply to a line that is not JSON. There is no id to echo.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorData::from_code(ErrorCode::ParseError))
    }

    /// Reply to JSON that is not a valid request or notification.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorData::from_code(ErrorCode::InvalidRequest))
    }
}

/// A message arriving at the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Method or notification name.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Request(req) => &req.method,
            Self::Notification(notif) => &notif.method,
        }
    }
}

/// Parses one line received by the server.
///
/// # Errors
///
/// Returns the error reply to send back: a parse error for invalid JSON,
/// an invalid-request error for anything that is not a 2.0 request or
/// notification.
pub fn parse_message(json: &str) -> Result<IncomingMessage, JsonRpcError> {
    let value: Value = serde_json::from_str(json).map_err(|_| JsonRpcError::parse_error())?;

    let obj = value.as_object().ok_or_else(JsonRpcError::parse_error)?;

    let jsonrpc = obj
        .get("jsonrpc")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonRpcError::invalid_request(None))?;

    if jsonrpc != "2.0" {
        return Err(JsonRpcError::invalid_request(None));
    }

    if obj.contains_key("id") {
        let request: JsonRpcRequest =
            serde_json::from_value(value).map_err(|_| JsonRpcError::invalid_request(None))?;

        if request.validate().is_some() {
            return Err(JsonRpcError::invalid_request(Some(request.id)));
        }

        Ok(IncomingMessage::Request(request))
    } else {
        let notification: JsonRpcNotification =
            serde_json::from_value(value).map_err(|_| JsonRpcError::invalid_request(None))?;

        Ok(IncomingMessage::Notification(notification))
    }
}

/// A reply as seen by the client: either `result` or `error` is set.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcReply {
    /// The request ID this reply answers. `None` only for parse errors.
    #[serde(default)]
    pub id: Option<RequestId>,

    /// The result on success.
    #[serde(default)]
    pub result: Option<Value>,

    /// The error on failure.
    #[serde(default)]
    pub error: Option<JsonRpcErrorData>,
}

impl JsonRpcReply {
    /// Splits the reply into its result or its error.
    ///
    /// # Errors
    ///
    /// Returns the server's error object, or a synthesised internal error if
    /// the reply carried neither field.
    pub fn into_result(self) -> Result<Value, JsonRpcErrorData> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error),
            (Some(result), None) => Ok(result),
            (None, None) => Err(JsonRpcErrorData::with_message(
                ErrorCode::InternalError,
                "Response contained neither result nor error",
            )),
        }
    }
}

/// What the client reader can receive from the server.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    /// A reply to one of our requests.
    Reply(JsonRpcReply),
    /// A server-initiated request or notification.
    Other(IncomingMessage),
}

/// Parses a line received by the client.
///
/// Messages with a `method` are server-initiated; anything else with
/// `result` or `error` is a reply.
///
/// # Errors
///
/// Returns a description of the problem if the line is not a JSON-RPC 2.0
/// message.
pub fn parse_server_message(json: &str) -> Result<ServerMessage, String> {
    let value: Value = serde_json::from_str(json).map_err(|e| format!("invalid JSON: {e}"))?;

    let obj = value.as_object().ok_or("message is not an object")?;
    if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err("missing or wrong jsonrpc version".to_string());
    }

    if obj.contains_key("method") {
        return parse_message(json)
            .map(ServerMessage::Other)
            .map_err(|e| e.error.message);
    }

    serde_json::from_value(value)
        .map(ServerMessage::Reply)
        .map_err(|e| format!("malformed reply: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::Number(1));
        assert_eq!(req.method, "initialize");
    }

    #[test]
    fn parse_valid_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Notification(notif) = msg else {
            panic!("Expected Notification, got Request");
        };
        assert_eq!(notif.method, "notifications/initialized");
    }

    #[test]
    fn parse_string_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::String("abc-123".to_string()));
    }

    #[test]
    fn parse_invalid_json() {
        let err = parse_message("not valid json").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::ParseError.code());
    }

    #[test]
    fn parse_wrong_jsonrpc_version() {
        let json = r#"{"jsonrpc": "1.0", "id": 1, "method": "test"}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn method_table_is_closed() {
        for name in [
            "initialize",
            "ping",
            "tools/list",
            "tools/call",
            "resources/list",
            "resources/read",
            "prompts/list",
            "prompts/get",
        ] {
            let method = Method::from(name);
            assert!(!matches!(method, Method::Unsupported(_)), "{name}");
            assert_eq!(method.as_str(), name);
        }
        assert_eq!(
            Method::from("resources/subscribe"),
            Method::Unsupported("resources/subscribe".to_string())
        );
    }

    #[test]
    fn outgoing_request_serialises_method_name() {
        let req = JsonRpcRequest::new(RequestId::Number(7), &Method::CallTool, None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""method":"tools/call""#));
        assert!(json.contains(r#""id":7"#));
        assert!(!json.contains("params"));
    }

    #[test]
    fn reply_with_error_wins_over_result() {
        let json = r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32002,"message":"Unknown tool: x"}}"#;
        let ServerMessage::Reply(reply) = parse_server_message(json).unwrap() else {
            panic!("Expected Reply");
        };
        assert_eq!(reply.id, Some(RequestId::Number(3)));
        let err = reply.into_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::UNKNOWN_CAPABILITY);
    }

    #[test]
    fn server_notification_is_not_a_reply() {
        let json = r#"{"jsonrpc":"2.0","method":"notifications/message","params":{}}"#;
        assert!(matches!(
            parse_server_message(json).unwrap(),
            ServerMessage::Other(IncomingMessage::Notification(_))
        ));
    }

    #[test]
    fn empty_reply_is_an_error() {
        let reply = JsonRpcReply {
            id: Some(RequestId::Number(1)),
            result: None,
            error: None,
        };
        assert_eq!(
            reply.into_result().unwrap_err().code,
            ErrorCode::InternalError.code()
        );
    }

    #[test]
    fn serialise_error_response() {
        let error = JsonRpcError::new(
            Some(RequestId::Number(1)),
            JsonRpcErrorData::with_message(
                ErrorCode::MethodNotFound,
                "Method not found: unknown/method",
            ),
        );
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""code":-32601"#));
        assert!(json.contains("unknown/method"));
    }
}
