//! Stage 2 relevance scoring: a retrying HTTP client against an
//! OpenAI-compatible chat-completions endpoint.

mod client;
mod error;
mod request;

pub use client::{HttpVlmClient, VlmClient};
pub use error::VlmError;
pub use request::{build_payload, parse_scores};
