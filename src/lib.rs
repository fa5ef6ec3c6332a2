//! Voice-driven HR assistant conversation engine.
//!
//! Turns a live audio stream into persisted conversation sessions: energy-
//! based turn segmentation, speech-to-text, FAQ-first answer resolution
//! with retrieval-grounded generation, text-to-speech with a prebuilt
//! voice-answer cache, and numbered on-disk session recording.

pub mod audio;
pub mod config;
pub mod conversation;
pub mod corpus;
pub mod error;
pub mod gateway;
pub mod matcher;
pub mod resolver;
pub mod session;
pub mod text;

pub use config::{Config, Secrets};
pub use conversation::ConversationLoop;
pub use error::{AssistantError, Result, ServiceKind};
pub use matcher::{FaqMatch, FaqMatcher};
pub use resolver::{AnswerResolver, Resolution};
