//! # Gateway Providers
//!
//! Vendor adapters for the LLM Inference Gateway (component A's concrete
//! implementations): a single OpenAI-compatible HTTP adapter reused across
//! every vendor that exposes that wire shape, a scripted mock for tests,
//! and the explicitly-constructed provider registry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod mock;
pub mod openai_compatible;
pub mod registry;

pub use mock::MockProvider;
pub use openai_compatible::OpenAiCompatibleProvider;
pub use registry::ProviderRegistry;
