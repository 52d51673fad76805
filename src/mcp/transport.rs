//! Newline-delimited JSON-RPC transport.
//!
//! Framing follows the MCP stdio transport:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stderr may be used for logging (never for MCP messages)
//!
//! The framing is independent of the byte stream underneath. The server runs
//! it over its own stdin/stdout, the client over a spawned child's pipes, and
//! tests over an in-memory duplex.

use std::io;
use std::process::Stdio;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Reading half: yields one message line at a time.
pub struct LineReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Wraps a byte stream.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Reads the next message line.
    ///
    /// Returns `None` if the stream is closed (EOF).
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the stream fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(Some(line))
    }
}

/// Writing half: serialises one message per line.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    /// Wraps a byte stream.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialises `message` as JSON and writes it as one line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_message<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.write_raw(&json).await
    }

    /// Writes a raw JSON string with newline termination.
    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        // MCP spec: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// Returns the underlying stream.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Flushes and shuts down the underlying stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}

/// A duplex message channel made of one reading and one writing half.
pub struct Transport<R, W> {
    /// Incoming messages.
    pub reader: LineReader<R>,
    /// Outgoing messages.
    pub writer: LineWriter<W>,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> Transport<R, W> {
    /// Creates a transport over an arbitrary pair of streams.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: LineReader::new(reader),
            writer: LineWriter::new(writer),
        }
    }

    /// Splits the transport into its halves.
    pub fn into_split(self) -> (LineReader<R>, LineWriter<W>) {
        (self.reader, self.writer)
    }
}

/// The server's transport: stdin in, stdout out.
pub type StdioTransport = Transport<tokio::io::Stdin, tokio::io::Stdout>;

impl StdioTransport {
    /// Creates a transport over the process's own stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

/// A server process launched by the client.
///
/// The child's stdin/stdout carry the protocol; its stderr is inherited so
/// server logs reach the operator's terminal.
pub struct ChildProcess {
    child: Child,
    command: String,
}

impl ChildProcess {
    /// Spawns `program` with `args`.
    ///
    /// The child is killed if this handle is dropped without [`Self::shutdown`].
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started or its pipes are
    /// unavailable.
    pub fn spawn(
        program: &str,
        args: &[String],
    ) -> io::Result<(Self, Transport<ChildStdout, ChildStdin>)> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "child stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "child stdout unavailable"))?;

        tracing::debug!(program, pid = ?child.id(), "Spawned server process");

        Ok((
            Self {
                child,
                command: program.to_string(),
            },
            Transport::new(stdout, stdin),
        ))
    }

    /// Waits up to `grace` for the child to exit, then kills it.
    ///
    /// The caller closes the child's stdin first, which a well-behaved
    /// server treats as the end of the session.
    pub async fn shutdown(mut self, grace: std::time::Duration) {
        let waited = tokio::time::timeout(grace, self.child.wait()).await;
        match waited {
            Ok(Ok(status)) => {
                tracing::debug!(command = %self.command, %status, "Server process exited");
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    command = %self.command,
                    error = %e,
                    "Failed to wait for server process"
                );
            }
            Err(_) => {
                tracing::warn!(command = %self.command, "Server process did not exit, killing it");
                if let Err(e) = self.child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill server process");
                }
            }
        }
    }
}
