//! Intent classification
//!
//! Static keyword/regex classification of prompts into task, document and
//! general domains. Nothing here is learned or weighted; the lists live in
//! [`keywords`] and are compiled once when the router is built.

pub mod keywords;
pub mod matcher;
pub mod router;

pub use matcher::KeywordMatcher;
pub use router::{Classification, DomainTag, QueryRouter};
