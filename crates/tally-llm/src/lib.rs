//! LLM client layer for Tally.
//!
//! Provides the request/response and tool-call types shared across the
//! workspace, the [`ProviderAdapter`] seam with an environment-driven factory
//! registry, and an OpenAI-compatible HTTP adapter. Completions are processed
//! call-at-a-time; there is no streaming surface.

pub mod client;
pub mod errors;
pub mod openai;
pub mod provider;
pub mod types;

pub use client::*;
pub use errors::*;
pub use openai::*;
pub use provider::*;
pub use types::*;
