//! Post-hoc cleanup of raw model output.

use lazy_static::lazy_static;
use regex::Regex;

/// Stand-in for a turn the model failed to produce.
pub const FALLBACK_TURN: &str = "...";

/// Returned when no dialogue line survives formatting.
pub const EMPTY_DIALOGUE: &str = "Could not generate valid dialogue";

/// Character ceiling on text returned to clients.
pub const MAX_OUTPUT_CHARS: usize = 2000;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
}

/// Reduce a raw continuation to one short sentence.
///
/// Never returns an empty string: anything shorter than two words
/// becomes [`FALLBACK_TURN`].
pub fn clean_turn(raw: &str) -> String {
    let sentence = first_piece(first_piece(first_piece(raw, '.'), '?'), '!');
    let cleaned = sentence
        .trim()
        .replace('"', "")
        .replace("--", ",")
        .replace('\n', " ");

    if cleaned.split_whitespace().count() < 2 {
        FALLBACK_TURN.to_string()
    } else {
        cleaned
    }
}

fn first_piece(s: &str, delimiter: char) -> &str {
    s.split(delimiter).next().unwrap_or_default()
}

/// Keep the opening line plus `2 * num_exchanges` turns and normalize
/// each `Speaker: text` line to `Speaker:text`.
pub fn format_dialogue(lines: &[String], num_exchanges: usize) -> String {
    let formatted: Vec<String> = lines
        .iter()
        .take(2 * num_exchanges + 1)
        .filter_map(|line| line.split_once(':'))
        .map(|(speaker, content)| format!("{}:{}", speaker.trim(), content.trim()))
        .collect();

    if formatted.is_empty() {
        EMPTY_DIALOGUE.to_string()
    } else {
        formatted.join("\n")
    }
}

/// Collapse whitespace runs, trim, and cap at [`MAX_OUTPUT_CHARS`].
pub fn sanitize_output(text: &str) -> String {
    WHITESPACE
        .replace_all(text, " ")
        .trim()
        .chars()
        .take(MAX_OUTPUT_CHARS)
        .collect()
}
