//! # Gateway Ensemble
//!
//! The ensemble debate engine (component F): parallel/sequential fan-out
//! across candidate providers, composite scoring, and deterministic
//! selection by strategy.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod scoring;

pub use engine::EnsembleEngine;
pub use scoring::{score, ScoredResponse};
