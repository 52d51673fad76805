//! Command loop and capability cache tests against an in-process server.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use document_search_mcp::client::{ChatClient, Command, LoopState, Session};
use document_search_mcp::error::{McpError, RouteError};
use document_search_mcp::mcp::types::{
    GetPromptResult, Implementation, Prompt, ReadResourceResult, Resource, Role, Tool,
    ToolCallResult,
};
use document_search_mcp::mcp::Transport;
use document_search_mcp::server::{CapabilityProvider, Echo, McpServer, RequestRouter};

/// Echo with a tool list that grows on every listing and a resource list
/// that can be made to fail.
#[derive(Default)]
struct Shifting {
    listings: AtomicUsize,
    fail_resources: AtomicBool,
}

impl CapabilityProvider for Shifting {
    fn server_info(&self) -> Implementation {
        Implementation::new("shifting", "0.0.1")
    }

    fn list_tools(&self) -> Result<Vec<Tool>, RouteError> {
        let count = self.listings.fetch_add(1, Ordering::SeqCst) + 1;
        Ok((0..count)
            .map(|i| Tool {
                name: format!("tool_{i}"),
                description: None,
                input_schema: json!({"type": "object"}),
            })
            .collect())
    }

    fn call_tool(&self, name: &str, arguments: &Value) -> Result<ToolCallResult, RouteError> {
        Echo.call_tool(name, arguments)
    }

    fn list_resources(&self) -> Result<Vec<Resource>, RouteError> {
        if self.fail_resources.load(Ordering::SeqCst) {
            return Err(RouteError::Internal("resource scan failed".to_string()));
        }
        Ok(vec![Resource {
            uri: "echo://fixed".to_string(),
            name: "Fixed".to_string(),
            description: Some("Always here".to_string()),
            mime_type: None,
        }])
    }

    fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, RouteError> {
        Echo.read_resource(uri)
    }

    fn list_prompts(&self) -> Result<Vec<Prompt>, RouteError> {
        Echo.list_prompts()
    }

    fn get_prompt(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<GetPromptResult, RouteError> {
        Echo.get_prompt(name, arguments)
    }
}

async fn session_for(provider: Arc<dyn CapabilityProvider>) -> Session {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let (server_read, server_write) = tokio::io::split(server_io);
    tokio::spawn(async move {
        let mut server = McpServer::new(
            Transport::new(server_read, server_write),
            RequestRouter::new(provider),
        );
        server.serve().await
    });

    let (client_read, client_write) = tokio::io::split(client_io);
    let mut session = Session::from_streams(client_read, client_write, Duration::from_secs(5));
    session
        .initialize(Implementation::new("test-client", "1.0.0"))
        .await
        .unwrap();
    session
}

/// Starts a hand-written server that answers every request with
/// `answer(method, params)` until the client hangs up.
async fn scripted_client<F>(answer: F) -> ChatClient
where
    F: Fn(&str, &Value) -> Value + Send + 'static,
{
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, mut server_write) = tokio::io::split(server_io);
    tokio::spawn(async move {
        let mut lines = BufReader::new(server_read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let message: Value = serde_json::from_str(&line).unwrap();
            let Some(id) = message.get("id") else {
                continue;
            };
            let method = message["method"].as_str().unwrap_or_default();
            let result = if method == "initialize" {
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {"tools": {}, "prompts": {}},
                    "serverInfo": {"name": "scripted", "version": "0.0.1"}
                })
            } else {
                answer(method, &message["params"])
            };
            let mut reply = json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string();
            reply.push('\n');
            if server_write.write_all(reply.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let (client_read, client_write) = tokio::io::split(client_io);
    let mut session = Session::from_streams(client_read, client_write, Duration::from_secs(5));
    session
        .initialize(Implementation::new("test-client", "1.0.0"))
        .await
        .unwrap();
    ChatClient::new(session, 500)
}

/// Answers listings with one tool and serves a `pic` prompt holding an image
/// and a `broken` prompt whose reply has the wrong shape.
fn media_server(method: &str, params: &Value) -> Value {
    match method {
        "tools/list" => json!({"tools": [{"name": "lookup", "inputSchema": {"type": "object"}}]}),
        "resources/list" => json!({"resources": []}),
        "prompts/list" => json!({"prompts": []}),
        "prompts/get" if params["name"] == "pic" => json!({"messages": [
            {"role": "user", "content": {"type": "image", "data": "aGk=", "mimeType": "image/png"}},
            {"role": "user", "content": {"type": "hologram", "frames": 3}}
        ]}),
        "prompts/get" => json!({"messages": "not a list"}),
        _ => json!({}),
    }
}

async fn echo_client(display_limit: usize) -> ChatClient {
    ChatClient::new(session_for(Arc::new(Echo)).await, display_limit)
}

async fn run_lines(client: &mut ChatClient, input: &str) -> (Result<(), McpError>, String) {
    let mut out = Vec::new();
    let result = client.run(input.as_bytes(), &mut out).await;
    (result, String::from_utf8(out).unwrap())
}

/// Returns the line printed right after the `Resource Content` rule.
fn printed_content(output: &str) -> &str {
    let after_header = output
        .split_once("Resource Content (")
        .map(|(_, rest)| rest)
        .unwrap();
    let after_rule = after_header
        .split_once(&format!("{}\n", "-".repeat(34)))
        .map(|(_, rest)| rest)
        .unwrap();
    after_rule.lines().next().unwrap()
}

// =============================================================================
// Resources
// =============================================================================

#[tokio::test]
async fn resource_is_shown_and_recorded() {
    let mut client = echo_client(500).await;

    let (result, output) = run_lines(&mut client, "/resource echo://hi\n").await;
    assert!(result.is_ok());
    assert!(output.contains("Fetching resource: echo://hi"));

    let shown = printed_content(&output);
    assert_eq!(shown, "Resource echo: hi");

    let entry = client.history().last().unwrap();
    assert_eq!(entry.role, Role::User);
    assert!(entry.content.starts_with(shown));
    assert_eq!(entry.metadata["resource_uri"], "echo://hi");
    assert_eq!(entry.metadata["is_resource"], true);
}

#[tokio::test]
async fn long_resource_is_truncated_on_screen_only() {
    let mut client = echo_client(8).await;

    let (_, output) = run_lines(&mut client, "/resource echo://a-longer-message\n").await;

    let shown = printed_content(&output);
    assert_eq!(shown, "Resource...");
    assert!(output.contains("full content is included in message history"));

    let entry = client.history().last().unwrap();
    assert_eq!(entry.content, "Resource echo: a-longer-message");
    assert!(entry.content.starts_with(shown.trim_end_matches("...")));
}

#[tokio::test]
async fn unreadable_resource_is_recorded_as_error() {
    let mut client = echo_client(500).await;

    let (result, output) = run_lines(&mut client, "/resource file:///etc/passwd\n").await;
    assert!(result.is_ok());
    assert!(output.contains("Error reading resource file:///etc/passwd"));

    let entry = client.history().last().unwrap();
    assert_eq!(entry.metadata["uri"], "file:///etc/passwd");
    assert_eq!(entry.metadata["error"], true);
}

// =============================================================================
// Loop Control
// =============================================================================

#[tokio::test]
async fn loop_continues_after_errors_and_stops_on_quit() {
    let mut client = echo_client(500).await;

    let input = "/prompt unknown_name some text\n/tools\n/quit\n/help\n";
    let (result, output) = run_lines(&mut client, input).await;

    assert!(result.is_ok());
    assert!(output.contains("Error: Unknown prompt: unknown_name"));
    assert!(output.contains("Available Tools:"));
    assert!(output.contains("echo_tool"));
    // Nothing after /quit runs.
    assert!(!output.contains("Toggle debug mode"));
}

#[tokio::test]
async fn undecodable_reply_does_not_end_loop() {
    let mut client = scripted_client(media_server).await;

    let (result, output) = run_lines(&mut client, "/prompt broken\n/tools\n").await;

    assert!(result.is_ok(), "{result:?}");
    assert!(output.contains("Error: invalid response from server"));
    assert!(output.contains("Available Tools:"));
    assert!(output.contains("lookup"));
}

#[tokio::test]
async fn non_text_prompt_content_is_shown_as_placeholder() {
    let mut client = scripted_client(media_server).await;

    let (result, output) = run_lines(&mut client, "/prompt pic\n").await;

    assert!(result.is_ok(), "{result:?}");
    assert!(output.contains("[user] [image content: image/png]"));
    assert!(output.contains("[user] [unsupported content]"));
}

#[tokio::test]
async fn end_of_input_ends_loop() {
    let mut client = echo_client(500).await;
    let (result, output) = run_lines(&mut client, "/help\n").await;
    assert!(result.is_ok());
    assert!(output.contains("/resource <uri>"));
}

#[tokio::test]
async fn usage_errors_are_printed() {
    let mut client = echo_client(500).await;
    let (_, output) = run_lines(&mut client, "/resource\n/prompt\n").await;
    assert!(output.contains("Usage: /resource <uri>"));
    assert!(output.contains("Error: Prompt name required"));
}

#[tokio::test]
async fn prompt_text_binds_first_argument() {
    let mut client = echo_client(500).await;
    let (_, output) = run_lines(&mut client, "/prompt echo_prompt Hello There\n").await;

    assert!(output.contains(r#"Getting prompt template: echo_prompt {"message":"Hello There"}"#));
    assert!(output.contains("[user] Please process this message: Hello There"));
}

#[tokio::test]
async fn plain_query_is_recorded() {
    let mut client = echo_client(500).await;
    let (_, output) = run_lines(&mut client, "what is in the report?\n\n").await;

    assert!(output.contains("query recorded"));
    assert_eq!(client.history().len(), 1);
    assert_eq!(client.history().last().unwrap().content, "what is in the report?");
}

#[tokio::test]
async fn debug_toggle_calls_hook() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let hook_seen = Arc::clone(&seen);
    let mut client = echo_client(500)
        .await
        .with_debug_hook(move |enabled| hook_seen.lock().unwrap().push(enabled));

    let (_, output) = run_lines(&mut client, "/debug\n/DEBUG\n/debug\n").await;

    assert_eq!(*seen.lock().unwrap(), vec![true, false, true]);
    assert!(client.debug_enabled());
    assert!(output.contains("Debug mode: enabled"));
    assert!(output.contains("Debug mode: disabled"));
}

#[tokio::test]
async fn execute_reports_next_state() {
    let mut client = echo_client(500).await;
    let mut out = Vec::new();

    let state = client.execute(Command::Help, &mut out).await.unwrap();
    assert_eq!(state, LoopState::Connected);
    let state = client.execute(Command::Quit, &mut out).await.unwrap();
    assert_eq!(state, LoopState::Closed);
}

#[tokio::test]
async fn transport_failure_ends_loop() {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);
    let server = tokio::spawn(async move {
        let mut server = McpServer::new(
            Transport::new(server_read, server_write),
            RequestRouter::new(Arc::new(Echo)),
        );
        server.serve().await
    });

    let (client_read, client_write) = tokio::io::split(client_io);
    let mut session = Session::from_streams(client_read, client_write, Duration::from_secs(5));
    session
        .initialize(Implementation::new("test-client", "1.0.0"))
        .await
        .unwrap();

    // Hang up after the handshake.
    server.abort();
    assert!(server.await.unwrap_err().is_cancelled());

    let mut client = ChatClient::new(session, 500);
    let (result, output) = run_lines(&mut client, "/tools\n/help\n").await;

    let err = result.unwrap_err();
    assert!(err.is_fatal(), "{err:?}");
    assert!(output.contains("Error:"));
    // The loop stopped before /help.
    assert!(!output.contains("Toggle debug mode"));
}

// =============================================================================
// Capability Cache
// =============================================================================

#[tokio::test]
async fn refresh_replaces_cache_with_latest_listing() {
    let provider = Arc::new(Shifting::default());
    let mut client = ChatClient::new(session_for(provider).await, 500);

    client.refresh().await.unwrap();
    client.refresh().await.unwrap();

    let cached = client.registry().cached().unwrap();
    let names: Vec<&str> = cached.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["tool_0", "tool_1"]);
    assert_eq!(cached.resources.len(), 1);
    assert_eq!(cached.prompts[0].name, "echo_prompt");
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let provider = Arc::new(Shifting::default());
    let session = session_for(Arc::clone(&provider) as Arc<dyn CapabilityProvider>).await;
    let mut client = ChatClient::new(session, 500);

    client.refresh().await.unwrap();
    let before = client.registry().cached().cloned().unwrap();

    provider.fail_resources.store(true, Ordering::SeqCst);
    let err = client.refresh().await.unwrap_err();
    assert!(!err.is_fatal());
    assert!(err.to_string().contains("resource scan failed"));

    // tools/list succeeded on the server, but nothing was committed.
    assert_eq!(client.registry().cached(), Some(&before));

    let mut out = Vec::new();
    client.execute(Command::Tools, &mut out).await.unwrap();
    let output = String::from_utf8(out).unwrap();
    assert!(output.contains("tool_0"));
    assert!(!output.contains("tool_1"));
}

#[tokio::test]
async fn listing_commands_fill_cache_lazily() {
    let provider = Arc::new(Shifting::default());
    let mut client = ChatClient::new(session_for(provider).await, 500);
    assert!(client.registry().cached().is_none());

    let (_, output) = run_lines(&mut client, "/resources\n/prompts\n").await;
    assert!(output.contains("echo://fixed"));
    assert!(output.contains("Always here"));
    assert!(output.contains("echo_prompt"));
    assert!(output.contains("Arguments: message"));
    assert!(client.registry().cached().is_some());
}
