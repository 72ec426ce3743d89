use regex::{Regex, RegexBuilder};

/// Case-folded keyword and pattern membership test for one domain
///
/// A query matches when any keyword is a substring of the lowercased query,
/// or any pattern finds a match in it. The first hit wins; there is no
/// scoring or weighting.
///
/// # Example
///
/// ```
/// use switchboard_engine::intent::KeywordMatcher;
///
/// let matcher = KeywordMatcher::new(["task", "タスク"], Vec::<&str>::new()).unwrap();
///
/// assert!(matcher.matches("Show my TASKS for today"));
/// assert!(!matcher.matches("What's the weather?"));
/// assert!(!matcher.matches(""));
/// ```
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
    patterns: Vec<Regex>,
}

impl KeywordMatcher {
    /// Build a matcher from keywords and regex patterns
    ///
    /// Keywords are lowercased once here. Empty keywords are dropped since
    /// they would match every query. Patterns are compiled case-insensitive
    /// because they run against the lowercased query.
    ///
    /// # Errors
    ///
    /// Returns the regex error if any pattern fails to compile.
    pub fn new<K, P>(keywords: K, patterns: P) -> Result<Self, regex::Error>
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let patterns = patterns
            .into_iter()
            .map(|p| RegexBuilder::new(p.as_ref()).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { keywords, patterns })
    }

    /// Test a query against this matcher's keywords and patterns
    pub fn matches(&self, query: &str) -> bool {
        self.find(query).is_some()
    }

    /// Return the keyword or pattern that matched, if any
    pub fn find(&self, query: &str) -> Option<&str> {
        if query.is_empty() {
            return None;
        }

        let folded = query.to_lowercase();

        if let Some(keyword) = self.keywords.iter().find(|k| folded.contains(k.as_str())) {
            return Some(keyword.as_str());
        }

        self.patterns
            .iter()
            .find(|p| p.is_match(&folded))
            .map(|p| p.as_str())
    }

    /// Number of keywords held by this matcher
    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    /// Number of patterns held by this matcher
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}
