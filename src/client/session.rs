//! Request/reply correlation over a [`Transport`].
//!
//! Outgoing requests get an increasing numeric id and park a oneshot sender
//! in the pending table. A background task reads the server's stream and
//! hands each reply to the sender registered under its id, so replies are
//! matched by id and never by arrival order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::error::McpError;
use crate::mcp::protocol::{
    parse_server_message, JsonRpcReply, JsonRpcRequest, Method, OutgoingNotification, RequestId,
    ServerMessage, MCP_PROTOCOL_VERSION,
};
use crate::mcp::transport::{ChildProcess, LineReader, LineWriter, Transport};
use crate::mcp::types::{
    GetPromptParams, GetPromptResult, Implementation, InitializeParams, InitializeResult,
    ListPromptsResult, ListResourcesResult, ListToolsResult, Prompt, ReadResourceParams,
    ReadResourceResult, Resource, ServerCapabilities, Tool, ToolCallParams, ToolCallResult,
};

/// How long a spawned server gets to exit after its stdin is closed.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Replies not yet delivered, keyed by request id.
#[derive(Default)]
struct PendingReplies {
    waiters: HashMap<RequestId, oneshot::Sender<JsonRpcReply>>,
    /// Set once the reader has stopped; no new waiter may register after.
    closed: bool,
}

type Pending = Arc<Mutex<PendingReplies>>;

/// A client connection to one MCP server.
///
/// Capability calls fail with [`McpError::NotConnected`] until
/// [`Session::initialize`] has completed.
pub struct Session {
    writer: Mutex<LineWriter<BoxedWriter>>,
    pending: Pending,
    next_id: AtomicI64,
    reader_task: JoinHandle<()>,
    timeout: Duration,
    server_info: Option<Implementation>,
    capabilities: Option<ServerCapabilities>,
    child: Option<ChildProcess>,
}

impl Session {
    /// Wraps an open transport. No handshake is performed.
    ///
    /// Must be called inside a Tokio runtime: the reply reader is spawned
    /// onto it.
    pub fn new<R, W>(transport: Transport<R, W>, timeout: Duration) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (reader, writer) = transport.into_split();
        let pending = Pending::default();
        let reader_task = tokio::spawn(read_replies(reader, Arc::clone(&pending)));

        Self {
            writer: Mutex::new(LineWriter::new(Box::new(writer.into_inner()) as BoxedWriter)),
            pending,
            next_id: AtomicI64::new(1),
            reader_task,
            timeout,
            server_info: None,
            capabilities: None,
            child: None,
        }
    }

    /// Wraps an already-open pair of streams. No handshake is performed.
    pub fn from_streams<R, W>(reader: R, writer: W, timeout: Duration) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::new(Transport::new(reader, writer), timeout)
    }

    /// Spawns `program` and completes the handshake with it.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Spawn`] if the process cannot be started, or the
    /// handshake error if the server does not complete `initialize`.
    pub async fn connect(
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let (child, transport) =
            ChildProcess::spawn(program, args).map_err(|source| McpError::Spawn {
                command: program.to_string(),
                source,
            })?;
        let mut session = Self::new(transport, timeout);
        session.child = Some(child);

        let client = Implementation::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let handshake = session.initialize(client).await.map(|_| ());
        if let Err(e) = handshake {
            session.close().await;
            return Err(e);
        }
        Ok(session)
    }

    /// Performs the `initialize` round trip and sends
    /// `notifications/initialized`.
    ///
    /// Calling it again on a connected session returns the stored identity.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Handshake`] if the server rejects the request or
    /// its reply is unusable, or a transport error if the stream fails.
    pub async fn initialize(
        &mut self,
        client_info: Implementation,
    ) -> Result<&Implementation, McpError> {
        if self.server_info.is_none() {
            let result = self.handshake(client_info).await?;
            self.capabilities = Some(result.capabilities);
            self.server_info = Some(result.server_info);
        }
        self.server_info.as_ref().ok_or(McpError::NotConnected)
    }

    async fn handshake(&self, client_info: Implementation) -> Result<InitializeResult, McpError> {
        let params = InitializeParams {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: Some(client_info),
        };
        let params = serde_json::to_value(params).map_err(|e| McpError::Handshake(e.to_string()))?;

        let value = self
            .request(&Method::Initialize, Some(params))
            .await
            .map_err(|e| match e {
                McpError::Rpc { message, .. } => McpError::Handshake(message),
                other => other,
            })?;
        let result: InitializeResult =
            serde_json::from_value(value).map_err(|e| McpError::Handshake(e.to_string()))?;

        if result.protocol_version != MCP_PROTOCOL_VERSION {
            tracing::warn!(
                server = %result.protocol_version,
                client = MCP_PROTOCOL_VERSION,
                "Protocol version mismatch"
            );
        }

        self.writer
            .lock()
            .await
            .write_message(&OutgoingNotification::initialized())
            .await?;

        tracing::debug!(
            server = %result.server_info.name,
            version = %result.server_info.version,
            "Handshake complete"
        );
        Ok(result)
    }

    /// Returns `true` once the handshake has completed.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.server_info.is_some()
    }

    /// Server identity from the handshake.
    #[must_use]
    pub const fn server_info(&self) -> Option<&Implementation> {
        self.server_info.as_ref()
    }

    /// Capability set declared in the handshake.
    #[must_use]
    pub const fn capabilities(&self) -> Option<&ServerCapabilities> {
        self.capabilities.as_ref()
    }

    /// Sends a capability call and waits for its reply.
    ///
    /// # Errors
    ///
    /// - [`McpError::NotConnected`] before the handshake
    /// - [`McpError::Rpc`] if the server answers with an error
    /// - a transport error if the stream fails or the reply times out
    pub async fn call(&self, method: &Method, params: Option<Value>) -> Result<Value, McpError> {
        if !self.is_connected() {
            return Err(McpError::NotConnected);
        }
        self.request(method, params).await
    }

    /// `tools/list`
    ///
    /// # Errors
    ///
    /// See [`Session::call`].
    pub async fn list_tools(&self) -> Result<Vec<Tool>, McpError> {
        let result: ListToolsResult = self.call_typed(&Method::ListTools, None).await?;
        Ok(result.tools)
    }

    /// `tools/call`
    ///
    /// # Errors
    ///
    /// See [`Session::call`].
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, McpError> {
        let params = ToolCallParams {
            name: name.to_string(),
            arguments,
        };
        self.call_typed(&Method::CallTool, Some(encode(&params)?))
            .await
    }

    /// `resources/list`
    ///
    /// # Errors
    ///
    /// See [`Session::call`].
    pub async fn list_resources(&self) -> Result<Vec<Resource>, McpError> {
        let result: ListResourcesResult = self.call_typed(&Method::ListResources, None).await?;
        Ok(result.resources)
    }

    /// `resources/read`
    ///
    /// # Errors
    ///
    /// See [`Session::call`].
    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        let params = ReadResourceParams {
            uri: uri.to_string(),
        };
        self.call_typed(&Method::ReadResource, Some(encode(&params)?))
            .await
    }

    /// `prompts/list`
    ///
    /// # Errors
    ///
    /// See [`Session::call`].
    pub async fn list_prompts(&self) -> Result<Vec<Prompt>, McpError> {
        let result: ListPromptsResult = self.call_typed(&Method::ListPrompts, None).await?;
        Ok(result.prompts)
    }

    /// `prompts/get`
    ///
    /// # Errors
    ///
    /// See [`Session::call`].
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<GetPromptResult, McpError> {
        let params = GetPromptParams {
            name: name.to_string(),
            arguments: Some(arguments),
        };
        self.call_typed(&Method::GetPrompt, Some(encode(&params)?))
            .await
    }

    /// Closes the connection: ends the outgoing stream, stops the reader,
    /// and waits for a spawned server to exit (killing it after
    /// [`SHUTDOWN_GRACE`]).
    pub async fn close(mut self) {
        if let Err(e) = self.writer.lock().await.shutdown().await {
            tracing::debug!(error = %e, "Failed to close server input");
        }
        if let Some(child) = self.child.take() {
            child.shutdown(SHUTDOWN_GRACE).await;
        }
        self.reader_task.abort();
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &Method,
        params: Option<Value>,
    ) -> Result<T, McpError> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| McpError::InvalidResponse(format!("{method}: {e}")))
    }

    async fn request(&self, method: &Method, params: Option<Value>) -> Result<Value, McpError> {
        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if pending.closed {
                return Err(McpError::ConnectionClosed);
            }
            pending.waiters.insert(id.clone(), tx);
        }

        tracing::debug!(id = %id, method = %method, "Sending request");
        let request = JsonRpcRequest::new(id.clone(), method, params);
        if let Err(e) = self.writer.lock().await.write_message(&request).await {
            self.pending.lock().await.waiters.remove(&id);
            return Err(e.into());
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) => reply.into_result().map_err(McpError::from),
            Ok(Err(_)) => Err(McpError::ConnectionClosed),
            Err(_) => {
                self.pending.lock().await.waiters.remove(&id);
                Err(McpError::Timeout {
                    method: method.to_string(),
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

fn encode<T: serde::Serialize>(params: &T) -> Result<Value, McpError> {
    serde_json::to_value(params).map_err(|e| McpError::InvalidResponse(e.to_string()))
}

/// Delivers replies to their waiters until the stream ends.
async fn read_replies<R: AsyncRead + Unpin>(mut reader: LineReader<R>, pending: Pending) {
    loop {
        let line = match reader.read_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::debug!("Server closed the connection");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read from server");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_server_message(&line) {
            Ok(ServerMessage::Reply(reply)) => {
                let Some(id) = reply.id.clone() else {
                    tracing::warn!(
                        error = ?reply.error,
                        "Server reported an error without a request id"
                    );
                    continue;
                };
                let waiter = pending.lock().await.waiters.remove(&id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(reply);
                    }
                    None => tracing::debug!(id = %id, "Discarding reply to unknown request"),
                }
            }
            Ok(ServerMessage::Other(message)) => {
                tracing::debug!(method = message.method(), "Ignoring server-initiated message");
            }
            Err(e) => tracing::warn!(error = %e, "Discarding malformed server message"),
        }
    }

    // Dropping the senders wakes every waiter with ConnectionClosed.
    let mut pending = pending.lock().await;
    pending.closed = true;
    pending.waiters.clear();
}
