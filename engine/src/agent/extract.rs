//! Response Extractor
//!
//! Picks the user-facing answer out of an agent transcript. The newest
//! assistant turn that is not a pending tool call, with every
//! `<thinking>...</thinking>` span removed and whitespace trimmed, is the
//! answer. Turns that are empty after stripping are skipped.

use regex::Regex;
use std::sync::OnceLock;

use crate::llm::{Message, MessageRole};

/// Returned when no assistant turn carries visible text
pub const NO_RESULT_FALLBACK: &str = "適切な結果が見つかりませんでした。";

static THINKING_SPAN: OnceLock<Regex> = OnceLock::new();

fn thinking_span() -> &'static Regex {
    THINKING_SPAN
        .get_or_init(|| Regex::new(r"(?s)<thinking>.*?</thinking>").expect("Invalid thinking pattern"))
}

/// Remove every reasoning span from `text` and trim the result
///
/// ```
/// use switchboard_engine::agent::extract::strip_thinking;
///
/// assert_eq!(strip_thinking("<thinking>a</thinking> b <thinking>c</thinking>"), "b");
/// ```
pub fn strip_thinking(text: &str) -> String {
    thinking_span().replace_all(text, "").trim().to_string()
}

/// Extract the final answer from a transcript, or `fallback` if there is none
pub fn extract_final_answer(turns: &[Message], fallback: &str) -> String {
    turns
        .iter()
        .rev()
        .filter(|turn| turn.role == MessageRole::Assistant && !turn.has_tool_calls())
        .map(|turn| strip_thinking(&turn.content))
        .find(|text| !text.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// [`extract_final_answer`] with [`NO_RESULT_FALLBACK`]
pub fn extract(turns: &[Message]) -> String {
    extract_final_answer(turns, NO_RESULT_FALLBACK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;

    #[test]
    fn test_strips_thinking() {
        let turns = vec![Message::assistant("<thinking>ignore this</thinking>visible answer")];
        assert_eq!(extract(&turns), "visible answer");
    }

    #[test]
    fn test_strips_multiline_and_repeated_spans() {
        let turns = vec![Message::assistant(
            "<thinking>\nstep 1\nstep 2\n</thinking>\n前半<thinking>more</thinking>後半\n",
        )];
        assert_eq!(extract(&turns), "前半後半");
    }

    #[test]
    fn test_skips_trailing_tool_call() {
        let turns = vec![
            Message::user("今週のタスクは？"),
            Message::assistant("タスクは3件あります。"),
            Message::assistant_tool_call(ToolCall::new("call_1", "asana_get_task", "{}")),
        ];
        assert_eq!(extract(&turns), "タスクは3件あります。");
    }

    #[test]
    fn test_skips_non_assistant_turns() {
        let turns = vec![
            Message::system("system"),
            Message::user("user"),
            Message::tool_result("tool output", "call_1"),
        ];
        assert_eq!(extract(&turns), NO_RESULT_FALLBACK);
    }

    #[test]
    fn test_skips_turns_empty_after_stripping() {
        let turns = vec![
            Message::assistant("earlier answer"),
            Message::assistant("  <thinking>only reasoning</thinking>  "),
        ];
        assert_eq!(extract(&turns), "earlier answer");
    }

    #[test]
    fn test_empty_transcript_uses_fallback() {
        assert_eq!(extract(&[]), NO_RESULT_FALLBACK);
        assert_eq!(extract_final_answer(&[], "custom"), "custom");
    }

    #[test]
    fn test_unclosed_tag_is_kept() {
        let turns = vec![Message::assistant("<thinking>never closed")];
        assert_eq!(extract(&turns), "<thinking>never closed");
    }

    #[test]
    fn test_deterministic() {
        let turns = vec![Message::assistant("<thinking>x</thinking>answer")];
        assert_eq!(extract(&turns), extract(&turns));
    }
}
