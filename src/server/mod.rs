//! MCP server for document search.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: `initialize` request, then the client's
//!    `notifications/initialized`
//! 2. **Operation**: capability calls routed through [`RequestRouter`]
//! 3. **Shutdown**: end of input or a termination signal
//!
//! The server owns no mutable state besides its lifecycle: everything the
//! handlers read is fixed in a [`ServerContext`] before the loop starts.

mod context;
pub mod echo;
mod prompts;
mod provider;
mod resources;
mod router;
pub mod store;
mod tools;

use std::io;

use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::mcp::protocol::{
    parse_message, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Method,
};
use crate::mcp::transport::{LineReader, LineWriter, StdioTransport, Transport};

pub use context::ServerContext;
pub use echo::Echo;
pub use prompts::PromptRenderer;
pub use provider::{CapabilityProvider, DocumentSearch, DOCUMENT_SERVER_NAME};
pub use resources::{display_name, join_pages, parse_document_uri, ResourceResolver};
pub use router::{Request, RequestRouter};
pub use tools::{ToolExecutor, DEFAULT_NUM_RESULTS, MAX_NUM_RESULTS};

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// An MCP server bound to one connection.
pub struct McpServer<R, W> {
    state: ServerState,
    reader: LineReader<R>,
    writer: LineWriter<W>,
    router: RequestRouter,
}

impl McpServer<tokio::io::Stdin, tokio::io::Stdout> {
    /// Creates a server speaking over the process's stdin and stdout.
    #[must_use]
    pub fn stdio(router: RequestRouter) -> Self {
        Self::new(StdioTransport::stdio(), router)
    }
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> McpServer<R, W> {
    /// Creates a server over `transport`.
    pub fn new(transport: Transport<R, W>, router: RequestRouter) -> Self {
        let (reader, writer) = transport.into_split();
        Self {
            state: ServerState::AwaitingInit,
            reader,
            writer,
            router,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Runs the server until end of input or a termination signal.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails or signal handlers cannot be
    /// installed.
    pub async fn run(&mut self) -> io::Result<()> {
        let outcome = tokio::select! {
            result = self.serve() => result,
            signal = shutdown_signal() => signal,
        };
        self.state = ServerState::ShuttingDown;
        outcome
    }

    /// Serves requests until the peer closes the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve(&mut self) -> io::Result<()> {
        loop {
            let line_result = self.reader.read_line().await;
            if self.handle_transport_result(line_result).await? {
                return Ok(());
            }
        }
    }

    /// Handles the result from transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: io::Result<Option<String>>,
    ) -> io::Result<bool> {
        let Some(line) = line_result? else {
            tracing::info!("Input closed, shutting down");
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        self.handle_line(&line).await?;

        Ok(self.state == ServerState::ShuttingDown)
    }

    async fn handle_line(&mut self, line: &str) -> io::Result<()> {
        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => self.handle_request(req).await,
            Ok(IncomingMessage::Notification(ref notif)) => {
                self.handle_notification(notif);
                Ok(())
            }
            Err(error) => {
                tracing::debug!(code = error.error.code, "Rejected malformed message");
                self.writer.write_message(&error).await
            }
        }
    }

    async fn handle_request(&mut self, req: JsonRpcRequest) -> io::Result<()> {
        let method = Method::from(req.method.as_str());
        tracing::debug!(id = %req.id, method = %method, "Handling request");

        let outcome = Request::parse(method, req.params)
            .map_err(JsonRpcErrorData::from)
            .and_then(|request| self.dispatch(request));

        match outcome {
            Ok(result) => {
                self.writer
                    .write_message(&JsonRpcResponse::success(req.id, result))
                    .await
            }
            Err(error) => {
                self.writer
                    .write_message(&JsonRpcError::new(Some(req.id), error))
                    .await
            }
        }
    }

    fn dispatch(&mut self, request: Request) -> Result<serde_json::Value, JsonRpcErrorData> {
        match request {
            Request::Initialize(params) => {
                if self.state != ServerState::AwaitingInit {
                    return Err(JsonRpcErrorData::with_message(
                        ErrorCode::InvalidRequest,
                        "Server already initialised",
                    ));
                }
                if let Some(client) = &params.client_info {
                    tracing::info!(
                        client = %client.name,
                        version = %client.version,
                        requested = %params.protocol_version,
                        "Client connected"
                    );
                }
                let result = self.router.route(Request::Initialize(params))?;
                self.state = ServerState::Initialising;
                Ok(result)
            }
            Request::Ping => Ok(json!({})),
            request if request.needs_session() && self.state != ServerState::Running => Err(
                JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, "Server not initialised"),
            ),
            request => self.router.route(request).map_err(|e| {
                tracing::warn!(error = %e, "Routing error");
                e.into()
            }),
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" && self.state == ServerState::Initialising {
            tracing::info!("Client initialised, server running");
            self.state = ServerState::Running;
        } else {
            tracing::debug!(method = %notif.method, "Ignoring notification");
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown"),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    Ok(())
}
