//! SQLFlow - chat with your SQL database.
//!
//! Questions in natural language are turned into SQL by an LLM, executed
//! against MySQL, PostgreSQL or SQLite, and the result is explained back.
//! The library exposes the pipeline for the binary and integration tests.

pub mod chat;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod repl;
