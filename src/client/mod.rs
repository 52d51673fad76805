//! Interactive MCP client.
//!
//! [`Session`] owns the connection, [`CapabilityRegistry`] caches what the
//! server offers, and [`ChatClient`] turns user commands into calls while
//! recording the conversation in a [`HistoryLog`].

mod commands;
mod dispatcher;
mod history;
mod registry;
mod session;

pub use commands::{Command, HELP};
pub use dispatcher::{ChatClient, LoopState, DEFAULT_DISPLAY_LIMIT};
pub use history::{HistoryLog, Message};
pub use registry::{Capabilities, CapabilityRegistry};
pub use session::{Session, SHUTDOWN_GRACE};
