//! Request backends
//!
//! One backend per routing domain. Each takes the raw prompt and returns the
//! display string, or an [`sdk::errors::EngineError`] when the backend itself
//! fails.

pub mod general;
pub mod knowledge_base;
pub mod tasks;

pub use general::GeneralBackend;
pub use knowledge_base::{
    BedrockRetriever, KnowledgeBaseBackend, RetrievedDocument, Retriever, SearchKnowledgeBaseTool,
};
pub use tasks::TaskBackend;
