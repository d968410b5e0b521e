//! # folio-llm
//!
//! Language-model collaborator for the Folio assistant.
//!
//! - [`ChatModel`]: the trait the engine calls once per attempt
//! - [`OpenAiChatModel`]: `OpenAI`-compatible chat-completions client
//! - [`ScriptedModel`]: deterministic replies for tests and offline runs

#![deny(unsafe_code)]

pub mod openai;
pub mod provider;
pub mod scripted;
pub mod types;

pub use openai::{OpenAiChatModel, OpenAiConfig, DEFAULT_BASE_URL};
pub use provider::{ChatModel, CompletionOptions, ProviderError, ProviderResult};
pub use scripted::{ScriptedModel, ScriptedReply};
pub use types::{ChatMessage, ChatRole};
