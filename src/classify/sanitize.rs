//! Prompt Sanitizer
//!
//! Strips structural noise out of raw prompt text before keyword matching so
//! that mode names quoted inside markup, URLs, paths, or code never activate
//! a mode. The original text is never modified; matching runs on a stripped,
//! lowercased copy.

use once_cell::sync::Lazy;
use regex::Regex;

static OPEN_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([A-Za-z][A-Za-z0-9_-]*)(?:\s[^<>]*)?>").expect("open tag pattern")
});

static SELF_CLOSING_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<[A-Za-z][A-Za-z0-9_-]*(?:\s[^<>]*)?/>").expect("self-closing tag pattern")
});

static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>\[\]()"']+"#).expect("url pattern"));

static FENCED_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```.*?```").expect("fenced code pattern"));

static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`\n]+`").expect("inline code pattern"));

/// Absolute or `~`-prefixed path anchored at a line or word boundary.
static ABS_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\B~?/[^\s:;,'"()\[\]<>]+"#).expect("absolute path pattern"));

/// Multi-segment relative path (`src/gate.rs`, `a/b/c`).
static REL_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[\w.-]+(?:/[\w.-]+)+\b").expect("relative path pattern"));

/// Produce the matcher's view of a prompt.
///
/// Removal order: matched open/close tag blocks, self-closing tags, URLs,
/// path-like tokens, fenced code blocks, inline code spans. The result is
/// lowercased; callers keep the original text for outbound messages.
pub fn sanitize(raw: &str) -> String {
    let text = strip_tag_blocks(raw);
    let text = SELF_CLOSING_TAG.replace_all(&text, " ");
    let text = URL.replace_all(&text, " ");
    let text = ABS_PATH.replace_all(&text, " ");
    let text = REL_PATH.replace_all(&text, " ");
    let text = FENCED_CODE.replace_all(&text, " ");
    let text = INLINE_CODE.replace_all(&text, " ");
    text.to_lowercase()
}

/// Remove `<tag>...</tag>` blocks, including their content.
///
/// Matching is same-tag and non-recursive: the block ends at the first
/// matching close tag, so same-named nested tags are not balanced (the inner
/// close ends the block and the outer close tag is left behind). Known
/// limitation, kept as-is.
fn strip_tag_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(caps) = OPEN_TAG.captures(rest) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let close = format!("</{}>", name.as_str());
        match rest[whole.end()..].find(&close) {
            Some(offset) => {
                out.push_str(&rest[..whole.start()]);
                out.push(' ');
                rest = &rest[whole.end() + offset + close.len()..];
            }
            None => {
                // Unmatched open tag: keep it and continue past it.
                out.push_str(&rest[..whole.end()]);
                rest = &rest[whole.end()..];
            }
        }
    }
    out.push_str(rest);
    out
}
