//! Task text sanitization and validation.
//!
//! # Responsibility
//! - Strip markup from user input before it reaches the model.
//! - Reject empty, oversized or obviously dangerous text.
//! - Escape text for markup-free rendering contexts.
//!
//! # Invariants
//! - `sanitize` is pure and idempotent.
//! - Text accepted by `prepare_task_text` is 1..=500 characters and contains
//!   no tag-like substrings.
//!
//! The dangerous-pattern list is a shallow guard, not an HTML sanitizer.
//! Rendering must still go through `escape_for_display`.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum task text length, counted in characters.
pub const MAX_TASK_TEXT_CHARS: usize = 500;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

const DANGEROUS_PATTERNS: &[&str] = &["<script", "javascript:", "vbscript:", "onload=", "onerror="];

static DANGEROUS_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = DANGEROUS_PATTERNS
        .iter()
        .map(|pattern| regex::escape(pattern))
        .collect::<Vec<_>>()
        .join("|");
    // ASCII-only case folding: `ſ` or the Kelvin sign must not stand in for `s`/`k`.
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .unicode(false)
        .build()
        .expect("valid dangerous pattern regex")
});

/// Reason a task text was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskTextError {
    Empty,
    TooLong { len: usize, max: usize },
    DangerousPattern(&'static str),
}

impl Display for TaskTextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "task text cannot be empty"),
            Self::TooLong { len, max } => {
                write!(f, "task text must be {max} characters or less (got {len})")
            }
            Self::DangerousPattern(pattern) => {
                write!(f, "task text contains a disallowed pattern `{pattern}`")
            }
        }
    }
}

impl Error for TaskTextError {}

/// Removes tag-like substrings (`<...>`) and surrounding whitespace.
pub fn sanitize(input: &str) -> String {
    TAG_RE.replace_all(input, "").trim().to_string()
}

/// Sanitizes a loosely typed value; anything but a JSON string yields `""`.
pub fn sanitize_value(input: &Value) -> String {
    match input {
        Value::String(text) => sanitize(text),
        _ => String::new(),
    }
}

/// Checks text against length bounds and the dangerous-pattern list.
///
/// # Errors
/// - `Empty` when `text` has no characters.
/// - `TooLong` when `text` exceeds `MAX_TASK_TEXT_CHARS`.
/// - `DangerousPattern` on the first case-insensitive denylist hit.
pub fn validate_task_text(text: &str) -> Result<(), TaskTextError> {
    if text.is_empty() {
        return Err(TaskTextError::Empty);
    }

    let len = text.chars().count();
    if len > MAX_TASK_TEXT_CHARS {
        return Err(TaskTextError::TooLong {
            len,
            max: MAX_TASK_TEXT_CHARS,
        });
    }

    check_dangerous(text)
}

/// Boolean form of [`validate_task_text`].
pub fn is_valid_task_text(text: &str) -> bool {
    validate_task_text(text).is_ok()
}

/// Turns raw user input into storable task text.
///
/// Raw input is screened before tags are stripped, so markup such as
/// `<script>alert(1)</script>` is refused instead of being reduced to its
/// inner text.
pub fn prepare_task_text(raw: &str) -> Result<String, TaskTextError> {
    check_dangerous(raw)?;
    let sanitized = sanitize(raw);
    validate_task_text(&sanitized)?;
    Ok(sanitized)
}

/// Escapes text so no markup is interpreted when rendered.
pub fn escape_for_display(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn check_dangerous(text: &str) -> Result<(), TaskTextError> {
    let Some(hit) = DANGEROUS_RE.find(text) else {
        return Ok(());
    };

    let matched = hit.as_str().to_ascii_lowercase();
    let pattern = DANGEROUS_PATTERNS
        .iter()
        .copied()
        .find(|pattern| *pattern == matched)
        .unwrap_or(DANGEROUS_PATTERNS[0]);
    Err(TaskTextError::DangerousPattern(pattern))
}

#[cfg(test)]
mod tests {
    use super::{
        escape_for_display, is_valid_task_text, prepare_task_text, sanitize, sanitize_value,
        validate_task_text, TaskTextError, MAX_TASK_TEXT_CHARS,
    };
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn sanitize_strips_tags_and_trims() {
        assert_eq!(sanitize("  <b>bold</b> move  "), "bold move");
        assert_eq!(sanitize("<br/>"), "");
        assert_eq!(sanitize("a < b"), "a < b");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            "  plain  ",
            "<<a>b>",
            "<a<b>>c",
            " <i> x </i> ",
            "tail <open",
            "> stray > brackets <",
            "\u{a0}<p>nbsp</p>\u{a0}",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn sanitize_value_rejects_non_strings() {
        assert_eq!(sanitize_value(&json!(" <i>hi</i> ")), "hi");
        assert_eq!(sanitize_value(&json!(42)), "");
        assert_eq!(sanitize_value(&json!(null)), "");
        assert_eq!(sanitize_value(&json!(["x"])), "");
    }

    #[test]
    fn validate_enforces_length_bounds() {
        assert_eq!(validate_task_text(""), Err(TaskTextError::Empty));
        assert!(is_valid_task_text("x"));
        assert!(is_valid_task_text(&"é".repeat(MAX_TASK_TEXT_CHARS)));
        assert_eq!(
            validate_task_text(&"a".repeat(MAX_TASK_TEXT_CHARS + 1)),
            Err(TaskTextError::TooLong {
                len: MAX_TASK_TEXT_CHARS + 1,
                max: MAX_TASK_TEXT_CHARS
            })
        );
    }

    #[test]
    fn validate_rejects_dangerous_patterns_case_insensitively() {
        assert_eq!(
            validate_task_text("click JavaScript:void(0)"),
            Err(TaskTextError::DangerousPattern("javascript:"))
        );
        assert_eq!(
            validate_task_text("img OnError=x"),
            Err(TaskTextError::DangerousPattern("onerror="))
        );
        assert!(!is_valid_task_text("<SCRIPT src=x>"));
        assert!(!is_valid_task_text("vbscript:msgbox"));
        assert!(!is_valid_task_text("body onload=go()"));
        assert!(is_valid_task_text("read about javascript closures"));
    }

    #[test]
    fn dangerous_patterns_fold_ascii_case_only() {
        assert!(is_valid_task_text("java\u{17f}cript:x"));
        assert!(is_valid_task_text("<\u{17f}cript tag"));
        assert!(is_valid_task_text("vb\u{17f}cript:"));
        assert_eq!(
            validate_task_text("JAVASCRIPT:x"),
            Err(TaskTextError::DangerousPattern("javascript:"))
        );
    }

    #[test]
    fn prepare_rejects_script_before_stripping() {
        assert_eq!(
            prepare_task_text("<script>alert(1)</script>"),
            Err(TaskTextError::DangerousPattern("<script"))
        );
        assert_eq!(prepare_task_text(" <em>ship</em> it "), Ok("ship it".to_string()));
        assert_eq!(prepare_task_text("<p></p>"), Err(TaskTextError::Empty));
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(
            escape_for_display(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_for_display("plain"), "plain");
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent_for_any_input(input in any::<String>()) {
            let once = sanitize(&input);
            prop_assert_eq!(sanitize(&once), once);
        }

        #[test]
        fn plain_text_within_bounds_is_accepted(text in "[a-zA-Z0-9 ,.!?]{0,499}[a-zA-Z0-9]") {
            prop_assert_eq!(prepare_task_text(&text), Ok(text.trim().to_string()));
        }
    }
}
