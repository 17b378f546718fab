//! Post-processing: deterministic cleanup of model replies.
//!
//! Even with a strict system prompt the chat model occasionally wraps the
//! whole verdict in a ```` ``` ```` fence, answers with Windows line endings,
//! or leaks zero-width characters copied from the OCR text. These rules fix
//! such artefacts without touching the legal content itself.
//!
//! Blank lines are preserved: paragraph boundaries carry meaning in a verdict
//! and the prompt forbids merging or splitting paragraphs.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw model reply.
///
/// Rules (applied in order):
/// 1. Strip an outer code fence wrapping the whole reply
/// 2. Normalise line endings (CRLF / CR → LF)
/// 3. Trim trailing whitespace per line
/// 4. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, …)
/// 5. Trim leading/trailing blank space of the whole text
pub fn clean_reply(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip outer fence ────────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:markdown|md|text|plaintext|txt)?[ \t]*\r?\n(.*?)\r?\n```\s*$")
        .expect("static fence regex")
});

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .split('\n')
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}
