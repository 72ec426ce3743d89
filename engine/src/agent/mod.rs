//! Agent loop
//!
//! A tool-using agent over the LLM router. Each backend that needs tools
//! builds its own [`AgentCore`] with its own registry and system prompt, and
//! reads the answer back out of the run's transcript with [`extract`].

pub mod core;
pub mod extract;
pub mod working_memory;

pub use self::core::{AgentCore, AgentRun};
pub use extract::{extract_final_answer, strip_thinking, NO_RESULT_FALLBACK};
pub use working_memory::WorkingMemory;
