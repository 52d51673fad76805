//! Model Context Protocol (MCP) wire layer.
//!
//! Everything both processes agree on lives here: the JSON-RPC envelope,
//! the capability data model, and the newline-delimited transport. The
//! [`crate::server`] and [`crate::client`] modules are built on top.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                        ┌──────────────────┐
//! │      client      │                        │      server      │
//! │                  │   JSON-RPC, one msg    │                  │
//! │  Session ────────┼──── per line over ─────┼──▶ RequestRouter │
//! │     ▲            │   child stdin/stdout   │        │         │
//! │     └────────────┼────────────────────────┼────────┘         │
//! └──────────────────┘                        └──────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod transport;
pub mod types;

pub use protocol::{
    JsonRpcError, JsonRpcReply, JsonRpcRequest, JsonRpcResponse, Method, RequestId,
    MCP_PROTOCOL_VERSION,
};
pub use transport::{ChildProcess, StdioTransport, Transport};
