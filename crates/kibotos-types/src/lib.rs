//! # Shared Types
//!
//! Single source of truth for the domain entities and wire DTOs shared by
//! every Kibotos crate: the store, the admission pipeline, the API gateway,
//! and the evaluator worker all depend on this crate rather than redefining
//! these shapes locally.
//!
//! ## Components
//!
//! - `entities`: `Prompt`, `Cycle`, `Submission`, `Evaluation`, `CycleWeights`, `RateCounter`
//! - `error`: the `KibotosError` taxonomy (one variant per API error code)
//! - `dto`: request/response bodies for the HTTP surface and the worker leasing protocol

pub mod dto;
pub mod entities;
pub mod error;

pub use dto::*;
pub use entities::*;
pub use error::{KibotosError, Result};
