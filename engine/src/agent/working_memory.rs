//! Working Memory for Agent Loop
//!
//! Holds the context window sent to the model on each iteration. Leading
//! system turns and the first user turn (the request itself) are pinned; when
//! the estimated token count passes the limit, the oldest unpinned turns are
//! dropped first. The full, untrimmed transcript is kept separately by the
//! agent so the final answer can always be extracted.

use crate::llm::{Message, MessageRole};

/// Default context limit in tokens (conservative estimate for most models)
const DEFAULT_CONTEXT_LIMIT: usize = 8000;

/// Rough estimate: 1 token ≈ 4 bytes of UTF-8
const CHARS_PER_TOKEN: usize = 4;

/// Per-message overhead for role and structure
const MESSAGE_OVERHEAD: usize = 10;

/// Minimum number of unpinned turns kept even when over the limit
const MIN_RECENT: usize = 2;

/// Working memory that manages conversation history within context limits
#[derive(Debug, Clone)]
pub struct WorkingMemory {
    messages: Vec<Message>,
    context_limit: usize,
    token_count: usize,
}

impl WorkingMemory {
    /// Create a new working memory with default context limit
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_CONTEXT_LIMIT)
    }

    /// Create a new working memory with a specific context limit
    pub fn with_limit(context_limit: usize) -> Self {
        Self {
            messages: Vec::new(),
            context_limit,
            token_count: 0,
        }
    }

    /// Add a message, trimming older turns if the limit is exceeded
    pub fn add_message(&mut self, message: Message) {
        self.token_count += Self::estimate_tokens(&message);
        self.messages.push(message);

        if self.token_count > self.context_limit {
            self.trim_messages();
        }
    }

    /// Get all messages in the current context window
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the current token count
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Get the context limit
    pub fn context_limit(&self) -> usize {
        self.context_limit
    }

    /// Number of leading turns that are never trimmed
    ///
    /// All leading system turns plus the user turn right after them.
    fn pinned_count(&self) -> usize {
        let systems = self
            .messages
            .iter()
            .take_while(|m| m.role == MessageRole::System)
            .count();

        match self.messages.get(systems) {
            Some(m) if m.role == MessageRole::User => systems + 1,
            _ => systems,
        }
    }

    fn trim_messages(&mut self) {
        let pinned = self.pinned_count();

        while self.token_count > self.context_limit && self.messages.len() > pinned + MIN_RECENT {
            let removed = self.messages.remove(pinned);
            self.token_count = self
                .token_count
                .saturating_sub(Self::estimate_tokens(&removed));
        }
    }

    /// Estimate the number of tokens in a message
    fn estimate_tokens(message: &Message) -> usize {
        let tool_call_id_chars = message.tool_call_id.as_ref().map_or(0, |id| id.len());
        let tool_calls_chars: usize = message
            .tool_calls
            .iter()
            .map(|c| c.name.len() + c.arguments.len())
            .sum();

        let total_chars = message.content.len() + tool_call_id_chars + tool_calls_chars;
        total_chars.div_ceil(CHARS_PER_TOKEN) + MESSAGE_OVERHEAD
    }
}

impl Default for WorkingMemory {
    fn default() -> Self {
        Self::new()
    }
}
