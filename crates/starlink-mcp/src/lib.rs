//! Starlink Enterprise MCP Server
//!
//! Exposes the Starlink Enterprise API as MCP tools over JSON-RPC 2.0, served
//! on stdio or HTTP. Each tool maps 1:1 to a REST endpoint; the account
//! overview additionally aggregates three list calls.

pub mod error;
pub mod jsonrpc;
pub mod mcp;
pub mod server;
pub mod tools;

// Re-export key types
pub use error::{McpError, McpResult};
pub use server::McpServer;
pub use tools::ToolKind;

pub use server::{serve_http, serve_stdio};
