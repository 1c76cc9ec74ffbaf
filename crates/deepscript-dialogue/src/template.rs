/// The two fixed speakers. The user's prompt is always spoken by the first.
pub const SPEAKERS: [&str; 2] = ["Alex", "Taylor"];

/// Number of trailing dialogue lines fed back as context.
pub const HISTORY_LINES: usize = 4;

/// Context for the next turn: the opening line alone until someone has
/// replied, then the last [`HISTORY_LINES`] lines.
pub fn history_window(dialogue: &[String]) -> String {
    if dialogue.len() > 1 {
        dialogue[dialogue.len().saturating_sub(HISTORY_LINES)..].join("\n")
    } else {
        dialogue.first().cloned().unwrap_or_default()
    }
}

/// Render the per-turn generation prompt.
///
/// The indentation, including the four-space blank line, is part of the
/// text the model was fine-tuned on.
pub fn build_turn_prompt(emotion: &str, history: &str, next_speaker: &str) -> String {
    let (first, second) = (SPEAKERS[0], SPEAKERS[1]);
    format!(
        "Generate natural, realistic dialogue between {first} and {second}.
    Current mood: {emotion}
    Guidelines:
    - Keep responses to 1 short sentence
    - Stay on topic
    - Maintain natural conversation flow
    - Avoid repetition\n    \n    Current dialogue:
    {history}
    {next_speaker}:"
    )
}
