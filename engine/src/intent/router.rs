//! Query Router
//!
//! Classifies a prompt into one of three handling paths. The task domain is
//! checked first, then the document domain, and everything else falls through
//! to general conversation. Task keywords are the higher-precision set, so a
//! prompt such as "プロジェクトの仕様書" (which hits both sets) routes to the
//! task path.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::keywords::{DOCUMENT_KEYWORDS, DOCUMENT_PATTERNS, TASK_KEYWORDS};
use super::KeywordMatcher;
use crate::config::RoutingConfig;

/// Handling path chosen for a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainTag {
    /// Task-management operations
    Task,

    /// Internal document retrieval
    Document,

    /// General conversation
    General,
}

impl fmt::Display for DomainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainTag::Task => write!(f, "task"),
            DomainTag::Document => write!(f, "document"),
            DomainTag::General => write!(f, "general"),
        }
    }
}

/// Raw per-domain match results, before ordering is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// The prompt hit a task-domain keyword
    pub task: bool,

    /// The prompt hit a document-domain keyword or pattern
    pub document: bool,
}

impl Classification {
    /// Collapse the two flags into a single tag (task wins)
    pub fn tag(&self) -> DomainTag {
        if self.task {
            DomainTag::Task
        } else if self.document {
            DomainTag::Document
        } else {
            DomainTag::General
        }
    }
}

/// Stateless prompt classifier
///
/// Holds two immutable matchers built once at startup. Safe to share across
/// request handlers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct QueryRouter {
    task: KeywordMatcher,
    document: KeywordMatcher,
}

impl QueryRouter {
    /// Build a router over the built-in keyword sets
    pub fn new() -> Self {
        Self::build(&RoutingConfig::default())
            .expect("built-in routing patterns are valid regular expressions")
    }

    /// Build a router over the built-in sets plus the configured additions
    ///
    /// # Errors
    ///
    /// Returns the regex error if a configured pattern fails to compile.
    pub fn build(routing: &RoutingConfig) -> Result<Self, regex::Error> {
        let task = KeywordMatcher::new(
            TASK_KEYWORDS
                .iter()
                .copied()
                .chain(routing.extra_task_keywords.iter().map(String::as_str)),
            Vec::<&str>::new(),
        )?;

        let document = KeywordMatcher::new(
            DOCUMENT_KEYWORDS
                .iter()
                .copied()
                .chain(routing.extra_document_keywords.iter().map(String::as_str)),
            DOCUMENT_PATTERNS
                .iter()
                .copied()
                .chain(routing.extra_document_patterns.iter().map(String::as_str)),
        )?;

        Ok(Self { task, document })
    }

    /// Choose the handling path for a prompt
    pub fn route(&self, query: &str) -> DomainTag {
        if let Some(hit) = self.task.find(query) {
            tracing::debug!("Task keyword found: {}", hit);
            return DomainTag::Task;
        }

        if let Some(hit) = self.document.find(query) {
            tracing::debug!("Knowledge base keyword or pattern matched: {}", hit);
            return DomainTag::Document;
        }

        DomainTag::General
    }

    /// Evaluate both domains independently
    pub fn classify(&self, query: &str) -> Classification {
        Classification {
            task: self.task.matches(query),
            document: self.document.matches(query),
        }
    }

    /// Task-domain matcher
    pub fn task_matcher(&self) -> &KeywordMatcher {
        &self.task
    }

    /// Document-domain matcher
    pub fn document_matcher(&self) -> &KeywordMatcher {
        &self.document
    }
}

impl Default for QueryRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_keyword_routes_to_task() {
        let router = QueryRouter::new();
        assert_eq!(router.route("今週のタスクを教えて"), DomainTag::Task);
        assert_eq!(router.route("List my Asana tasks"), DomainTag::Task);
    }

    #[test]
    fn test_task_routing_ignores_case() {
        let router = QueryRouter::new();
        assert_eq!(router.route("TASK"), DomainTag::Task);
        assert_eq!(router.route("Any DEADLINE soon?"), DomainTag::Task);
    }

    #[test]
    fn test_document_keyword_routes_to_document() {
        let router = QueryRouter::new();
        assert_eq!(router.route("最新のマニュアルを確認したい"), DomainTag::Document);
        assert_eq!(router.route("社内のセキュリティポリシーについて教えて"), DomainTag::Document);
        assert_eq!(router.route("会社の規程について知りたい"), DomainTag::Document);
        assert_eq!(router.route("システムの使い方を教えて"), DomainTag::Document);
    }

    #[test]
    fn test_document_pattern_routes_to_document() {
        let router = QueryRouter::new();
        // Only the `.*規程|.*ポリシー|.*ルール` pattern covers "ルール"
        assert_eq!(router.route("経費のルールは？"), DomainTag::Document);
    }

    #[test]
    fn test_overlapping_keyword_prefers_task() {
        let router = QueryRouter::new();
        let query = "プロジェクトの仕様書はどこにありますか？";

        let classification = router.classify(query);
        assert!(classification.task);
        assert!(classification.document);
        assert_eq!(router.route(query), DomainTag::Task);
    }

    #[test]
    fn test_unmatched_routes_to_general() {
        let router = QueryRouter::new();
        assert_eq!(router.route("今日の天気は？"), DomainTag::General);
        assert_eq!(router.route("計算して: 100 + 200"), DomainTag::General);
        assert_eq!(router.route("こんにちは"), DomainTag::General);
        assert_eq!(router.route(""), DomainTag::General);
    }

    #[test]
    fn test_configured_additions() {
        let routing = RoutingConfig {
            extra_task_keywords: vec!["チケット".to_string()],
            extra_document_keywords: vec!["wiki".to_string()],
            extra_document_patterns: vec![r"faq$".to_string()],
        };
        let router = QueryRouter::build(&routing).unwrap();

        assert_eq!(router.route("チケットを見せて"), DomainTag::Task);
        assert_eq!(router.route("Search the WIKI"), DomainTag::Document);
        assert_eq!(router.route("hr faq"), DomainTag::Document);
    }

    #[test]
    fn test_classification_tag() {
        let both = Classification { task: true, document: true };
        let doc = Classification { task: false, document: true };
        let none = Classification { task: false, document: false };

        assert_eq!(both.tag(), DomainTag::Task);
        assert_eq!(doc.tag(), DomainTag::Document);
        assert_eq!(none.tag(), DomainTag::General);
    }

    #[test]
    fn test_domain_tag_display() {
        assert_eq!(DomainTag::Task.to_string(), "task");
        assert_eq!(DomainTag::Document.to_string(), "document");
        assert_eq!(DomainTag::General.to_string(), "general");
    }
}
