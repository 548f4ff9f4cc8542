//! Abacus: a conversational agent engine for a bookkeeping assistant.
//!
//! Drives a multi-turn, tool-using dialogue with an OpenAI-compatible model
//! provider: streams and decodes the reply, separates reasoning and fenced
//! tool-call blocks from the user-facing text, runs the requested tools and
//! feeds their results back until the task converges.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use abacus::prelude::*;
//!
//! # async fn example() -> abacus::error::Result<()> {
//! let config = AgentConfig::load()?;
//! let mut agent = ChatAgent::from_config(config, Arc::new(ToolRegistry::new()))?;
//! let outcome = agent
//!     .send_message(ChatRequest::new("记一笔午餐支出50元").with_book(BookContext::new("book-1")))
//!     .await?;
//! println!("{}", outcome.text);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod history;
pub mod parser;
pub mod prelude;
pub mod provider;
pub mod stream;
pub mod tools;
pub mod transport;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
