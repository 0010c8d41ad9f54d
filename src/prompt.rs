//! Prompt construction for the commit message rewriter.

use serde::Serialize;

use crate::convention::CommitType;
use crate::error::RewriteError;
use crate::language::Language;

/// Instruction payload handed to a [`Rewriter`](crate::rewriter::Rewriter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPayload {
    /// Opaque model identifier, passed through untouched.
    pub model: String,
    pub system: String,
    pub user: String,
}

/// Build the rewrite prompt from a raw language code.
///
/// Fails with [`RewriteError::UnsupportedLanguage`] before anything else is
/// done if the code is outside the supported set.
pub fn build_prompt(
    original: &str,
    language_code: &str,
    model: &str,
    custom_instructions: Option<&str>,
) -> Result<PromptPayload, RewriteError> {
    let language = language_code.parse::<Language>()?;
    Ok(render_prompt(original, language, model, custom_instructions))
}

/// Build the rewrite prompt for an already-validated language.
///
/// Pure: identical inputs always produce an identical payload.
pub fn render_prompt(
    original: &str,
    language: Language,
    model: &str,
    custom_instructions: Option<&str>,
) -> PromptPayload {
    let message = sanitize_message(original);

    let language_instruction = if language == Language::English {
        String::new()
    } else {
        let name = language.name();
        format!(
            "\n\nIMPORTANT: Write the commit message in {name}. The type prefix (feat, fix, etc.) must remain in English, but the description and body must be in {name}."
        )
    };

    // Custom instructions are appended verbatim.
    let custom_instruction = custom_instructions
        .filter(|c| !c.trim().is_empty())
        .map(|c| format!("\n\nAdditional instructions: {c}"))
        .unwrap_or_default();

    let user = format!(
        r#"Convert the following commit message to Conventional Commits format:

"{message}"

Return ONLY the formatted commit message, nothing else. Do not add explanations, quotes, or markdown.{language_instruction}{custom_instruction}"#
    );

    PromptPayload {
        model: model.to_string(),
        system: system_prompt(),
        user,
    }
}

fn system_prompt() -> String {
    let types = CommitType::ALL
        .iter()
        .map(|t| format!("- {}: {}", t, t.summary()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a commit message formatter that converts informal commit messages into Conventional Commits format.

Conventional Commits format:
<type>(<optional scope>): <description>

Types:
{types}

Rules:
1. Analyze the commit message and determine the most appropriate type
2. Output exactly one commit message; the first line MUST be `type(scope): description`
3. Type keywords are always the lowercase English words listed above, never translated
4. Keep the description concise (50 characters or less)
5. Use imperative mood (e.g., "add" not "added" or "adds")
6. Do not end the description with a period
7. If the commit message already follows conventional commits, return it as-is"#
    )
}

/// Sanitize the original message for inclusion in the prompt.
///
/// Removes control characters (except newlines and tabs) and ANSI escape
/// sequences, and neutralizes code fences so the message cannot close the
/// surrounding quote block.
pub fn sanitize_message(text: &str) -> String {
    let without_ansi = remove_ansi_escapes(text.trim());
    without_ansi
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect::<String>()
        .replace("```", "'''")
}

fn remove_ansi_escapes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // CSI sequence ends at the first byte in 0x40..=0x7E
            for next in chars.by_ref() {
                if ('@'..='~').contains(&next) {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}
