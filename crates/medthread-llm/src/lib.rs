//! medthread-llm — generative-text backend abstraction and the Thread Generator.

pub mod audit;
pub mod backend;
pub mod thread;

pub use backend::{GeminiBackend, LlmBackend, LlmError};
pub use thread::{GenerationSettings, ThreadGenerator, ThreadSource, GENERATION_FAILED_MESSAGE};
