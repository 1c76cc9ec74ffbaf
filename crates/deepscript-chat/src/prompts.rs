/// Prompt templates for the remote script writer
pub struct ScreenplayPrompts;

impl ScreenplayPrompts {
    pub const SYSTEM: &'static str = "You are an expert screenplay and dialogue writer.";

    /// Wrap the user's request in screenplay-writing instructions.
    pub fn build_user_prompt(user_prompt: &str) -> String {
        format!(
            r#"
You are a professional screenplay and dialogue writer.
Follow the user's prompt to produce a creative and natural conversation or scene.

Rules:
- Do NOT repeat the prompt.
- Use character names and realistic exchanges.
- If it's a dialogue, use this format: NAME: line
- If it's a screenplay, follow industry-standard screenplay formatting.
- Keep it engaging and concise.

Example:
Prompt: Write a dialogue between two people deciding what movie to watch.
Output:
JAMES: What about a comedy?
LUCY: I’m not in the mood for something silly.
JAMES: Okay… thriller then?
LUCY: Now you’re talking.

Now respond to the following prompt:
Prompt: {prompt}
Output:
"#,
            prompt = user_prompt.trim()
        )
    }
}
