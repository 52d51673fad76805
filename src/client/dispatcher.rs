//! The interactive command loop.
//!
//! The loop has one live state, [`LoopState::Connected`], and one terminal
//! state, [`LoopState::Closed`]. Each input line is parsed into a
//! [`Command`] and executed; any error that is not a transport failure is
//! printed and the loop carries on.

use std::io::Write;

use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::client::commands::{Command, HELP};
use crate::client::history::HistoryLog;
use crate::client::registry::CapabilityRegistry;
use crate::client::session::Session;
use crate::error::McpError;
use crate::mcp::types::Role;

/// Default number of characters of a resource shown on screen.
pub const DEFAULT_DISPLAY_LIMIT: usize = 500;

const TRUNCATION_NOTICE: &str =
    "(Resource content truncated for display purpose but full content is included in message history)";

/// Where the command loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Reading and executing commands.
    Connected,
    /// Finished; the session should be closed.
    Closed,
}

type DebugHook = Box<dyn FnMut(bool) + Send>;

/// Drives a [`Session`] from line-oriented user input.
pub struct ChatClient {
    session: Session,
    registry: CapabilityRegistry,
    history: HistoryLog,
    debug: bool,
    on_debug: Option<DebugHook>,
    display_limit: usize,
}

impl ChatClient {
    /// Creates a client over a connected session.
    #[must_use]
    pub fn new(session: Session, display_limit: usize) -> Self {
        Self {
            session,
            registry: CapabilityRegistry::new(),
            history: HistoryLog::new(),
            debug: false,
            on_debug: None,
            display_limit,
        }
    }

    /// Registers a callback invoked with the new value whenever `/debug`
    /// toggles.
    #[must_use]
    pub fn with_debug_hook(mut self, hook: impl FnMut(bool) + Send + 'static) -> Self {
        self.on_debug = Some(Box::new(hook));
        self
    }

    /// The underlying session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The capability cache.
    #[must_use]
    pub const fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// The conversation so far.
    #[must_use]
    pub const fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Whether `/debug` is on.
    #[must_use]
    pub const fn debug_enabled(&self) -> bool {
        self.debug
    }

    /// Fills the capability cache.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing listing call.
    pub async fn refresh(&mut self) -> Result<(), McpError> {
        let capabilities = self.registry.refresh(&self.session).await?;
        if self.debug {
            tracing::info!(
                tools = capabilities.tools.len(),
                resources = capabilities.resources.len(),
                prompts = capabilities.prompts.len(),
                "Server capabilities refreshed"
            );
        }
        Ok(())
    }

    /// Prints the connection banner and the command table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn print_banner<O: Write>(&self, out: &mut O) -> std::io::Result<()> {
        let server = self
            .session
            .server_info()
            .map_or("unknown server", |info| info.name.as_str());
        let rule = "=".repeat(50);
        writeln!(out, "\n{rule}")?;
        writeln!(out, "Client connected to: {server}")?;
        writeln!(out, "{rule}")?;
        writeln!(out, "Type your queries or use these commands:")?;
        print_help(out)
    }

    /// Runs the loop until `/quit`, end of input, or a transport failure.
    ///
    /// # Errors
    ///
    /// Returns the transport failure that ended the loop, if any.
    pub async fn run<I, O>(&mut self, input: I, output: &mut O) -> Result<(), McpError>
    where
        I: AsyncBufRead + Unpin,
        O: Write,
    {
        let mut lines = input.lines();
        let mut state = LoopState::Connected;

        while state == LoopState::Connected {
            write!(output, "\nQuery: ")?;
            output.flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            state = match self.execute(Command::parse(&line), output).await {
                Ok(next) => next,
                Err(e) if e.is_fatal() => {
                    writeln!(output, "\nError: {e}")?;
                    tracing::error!(error = %e, "Connection to server lost");
                    return Err(e);
                }
                Err(e) => {
                    writeln!(output, "\nError: {e}")?;
                    LoopState::Connected
                }
            };
        }

        if self.debug {
            tracing::info!("Cleaning up client resources");
        }
        Ok(())
    }

    /// Executes one command and returns the next loop state.
    ///
    /// # Errors
    ///
    /// Returns any session error raised by the command.
    pub async fn execute<O: Write>(
        &mut self,
        command: Command,
        out: &mut O,
    ) -> Result<LoopState, McpError> {
        match command {
            Command::Quit => return Ok(LoopState::Closed),
            Command::Debug => {
                self.debug = !self.debug;
                if let Some(hook) = self.on_debug.as_mut() {
                    hook(self.debug);
                }
                let status = if self.debug { "enabled" } else { "disabled" };
                writeln!(out, "\nDebug mode: {status}")?;
            }
            Command::Refresh => {
                self.refresh().await?;
                writeln!(out, "\nServer capabilities refreshed")?;
            }
            Command::Resources => {
                let resources = self.registry.list_resources(&self.session).await?;
                writeln!(out, "\nAvailable Resources:")?;
                if resources.is_empty() {
                    writeln!(out, "    (none)")?;
                }
                for resource in resources {
                    writeln!(out, "    - {}", resource.uri)?;
                    if let Some(description) = &resource.description {
                        writeln!(out, "    {description}")?;
                    }
                }
            }
            Command::Resource(uri) => self.show_resource(&uri, out).await?,
            Command::Prompts => {
                let prompts = self.registry.list_prompts(&self.session).await?;
                writeln!(out, "\nAvailable Prompts:")?;
                for prompt in prompts {
                    writeln!(out, "    - {}", prompt.name)?;
                    if let Some(description) = &prompt.description {
                        writeln!(out, "    {description}")?;
                    }
                    if !prompt.arguments.is_empty() {
                        let names: Vec<&str> =
                            prompt.arguments.iter().map(|a| a.name.as_str()).collect();
                        writeln!(out, "    Arguments: {}", names.join(", "))?;
                    }
                }
            }
            Command::Prompt { name, text } => self.show_prompt(&name, text, out).await?,
            Command::Tools => {
                let tools = self.registry.list_tools(&self.session).await?;
                writeln!(out, "\nAvailable Tools:")?;
                for tool in tools {
                    writeln!(out, "    - {}", tool.name)?;
                    if let Some(description) = &tool.description {
                        writeln!(out, "    {description}")?;
                    }
                }
            }
            Command::Help => print_help(out)?,
            Command::Query(query) => {
                self.history.add(Role::User, query, None);
                writeln!(
                    out,
                    "\nNo chat backend attached; query recorded ({} messages in history).",
                    self.history.len()
                )?;
            }
            Command::Empty => {}
            Command::Invalid(message) => writeln!(out, "{message}")?,
        }
        Ok(LoopState::Connected)
    }

    /// Consumes the client and closes its session.
    pub async fn close(self) {
        self.session.close().await;
    }

    async fn show_resource<O: Write>(&mut self, uri: &str, out: &mut O) -> Result<(), McpError> {
        writeln!(out, "\nFetching resource: {uri}")?;
        if self.debug {
            tracing::info!(uri, "Reading resource");
        }

        let content = match self.session.read_resource(uri).await {
            Ok(result) => {
                let mut text = result.to_text();
                if text.is_empty() {
                    text = "No content found for this resource.".to_string();
                }
                let mut metadata = Map::new();
                metadata.insert("resource_uri".to_string(), json!(uri));
                metadata.insert("is_resource".to_string(), json!(true));
                self.history.add(Role::User, text.clone(), Some(metadata));
                text
            }
            Err(e) => {
                let message = format!("Error reading resource {uri}: {e}");
                tracing::error!(uri, error = %e, "Error reading resource");
                let mut metadata = Map::new();
                metadata.insert("uri".to_string(), json!(uri));
                metadata.insert("error".to_string(), json!(true));
                self.history.add(Role::User, message.clone(), Some(metadata));
                if e.is_fatal() {
                    return Err(e);
                }
                message
            }
        };

        writeln!(out, "\nResource Content ({uri}):")?;
        writeln!(out, "{}", "-".repeat(34))?;
        match truncate_chars(&content, self.display_limit) {
            Some(shown) => {
                writeln!(out, "{shown}...")?;
                writeln!(out, "{TRUNCATION_NOTICE}")?;
            }
            None => writeln!(out, "{content}")?,
        }
        Ok(())
    }

    async fn show_prompt<O: Write>(
        &mut self,
        name: &str,
        text: Option<String>,
        out: &mut O,
    ) -> Result<(), McpError> {
        let mut arguments = Map::new();
        if let Some(text) = text {
            self.registry.list_prompts(&self.session).await?;
            let key = self
                .registry
                .find_prompt(name)
                .and_then(|prompt| prompt.arguments.first())
                .map_or("text", |argument| argument.name.as_str())
                .to_string();
            arguments.insert(key, Value::String(text));
        }

        writeln!(
            out,
            "\nGetting prompt template: {name} {}",
            Value::Object(arguments.clone())
        )?;
        if self.debug {
            tracing::info!(name, arguments = ?arguments, "Getting prompt");
        }

        let result = self.session.get_prompt(name, arguments).await?;
        for message in &result.messages {
            writeln!(out, "[{}] {}", message.role, message.content.as_text())?;
        }
        Ok(())
    }
}

/// Returns the first `limit` characters if `content` is longer than that.
fn truncate_chars(content: &str, limit: usize) -> Option<&str> {
    content
        .char_indices()
        .nth(limit)
        .map(|(index, _)| &content[..index])
}

fn print_help<O: Write>(out: &mut O) -> std::io::Result<()> {
    for (command, description) in HELP {
        writeln!(out, "    {command:<24} - {description}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("abc", 3), None);
        assert_eq!(truncate_chars("abcd", 3), Some("abc"));
        assert_eq!(truncate_chars("ééé", 2), Some("éé"));
        assert_eq!(truncate_chars("", 5), None);
    }

    #[test]
    fn help_lists_every_command() {
        let mut out = Vec::new();
        print_help(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        for command in ["/debug", "/refresh", "/resource <uri>", "/prompt <name> <text>", "/quit"] {
            assert!(text.contains(command), "{command}");
        }
    }
}
