//! # Assistant
//!
//! The conversational front of the movie assistant: it owns per-session
//! state and turns one chat message into one reply string.
//!
//! ## Components
//!
//! ### Orchestrator
//! `reply` routes clarification picks, runs the answering tiers and keeps
//! session memory up to date.
//!
//! ### ConversationStore
//! Session id to conversation state, locked per session.
//!
//! ### SessionMemory
//! A short rolling summary plus the last exchange, rendered into prompts.
//!
//! ## Example Usage
//!
//! ```ignore
//! use assistant::{AssistantConfig, ChatRequest, Orchestrator};
//!
//! let config = AssistantConfig::load(None)?;
//! let orchestrator = Orchestrator::from_parts(store, model, embedder, &config);
//! let answer = orchestrator
//!     .reply(ChatRequest::new("doraemon tập 5 nói về gì").with_session("u1"))
//!     .await;
//! ```

pub mod config;
pub mod conversation;
pub mod memory;
pub mod orchestrator;

pub use config::AssistantConfig;
pub use conversation::{Conversation, ConversationStore};
pub use memory::{ANONYMOUS_SESSION, MemoryConfig, SessionMemory, normalize_session_id};
pub use orchestrator::{ChatRequest, Orchestrator};
