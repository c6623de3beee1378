//! Oracle: a hybrid retrieval engine for a personal knowledge base.
//!
//! Documents (principles, patterns, learnings, retros) live in SQLite with an
//! FTS5 index. Their embeddings live in an external vector-search process
//! that speaks MCP over stdio. A search runs both legs concurrently, fuses
//! the two ranked lists into one, and keeps answering with keyword results
//! when the vector process is slow, broken or missing.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with FTS5 for keyword search
//! - **Vectors**: a managed subprocess (default `chroma-mcp`) reached through
//!   an `rmcp` client, reconnected once per call on a dropped connection
//! - **Search**: weighted score fusion with a boost for documents both legs agree on
//! - **Transport**: MCP over stdio, or HTTP (JSON API plus Streamable HTTP MCP)
//!
//! # Modules
//!
//! - [`config`]: configuration from TOML and environment variables
//! - [`db`]: SQLite initialization, schema and health checks
//! - [`documents`]: the document model and store
//! - [`vector`]: subprocess lifecycle, tool calls and response repair
//! - [`search`]: the lexical and semantic legs, fusion and orchestration
//! - [`context`]: the shared per-process state every surface uses

pub mod cli;
pub mod config;
pub mod context;
pub mod db;
pub mod documents;
pub mod error;
pub mod search;
pub mod server;
pub mod tools;
pub mod vector;
