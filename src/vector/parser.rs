//! Recover structured values from the vector subprocess's text responses.
//!
//! The subprocess prints a best-effort textual rendering of its in-memory
//! results, which is often not strict JSON: single-quoted strings, `None` /
//! `True` / `False`, numeric arrays wrapped as `array([...], dtype=float32)`,
//! and long arrays elided with `...`. [`parse`] tries strict JSON first and
//! only then runs the repair pipeline, in this order, on text outside string
//! literals:
//!
//! 1. drop the `array(` wrapper prefix
//! 2. drop the orphaned `)` (and any `dtype=...`) after the wrapped list
//! 3. delete truncation markers (`...`, `... 12 more items`). This is lossy:
//!    the affected array comes back shorter than it really is, and a warning
//!    is logged
//! 4. rewrite native literals and single-quoted strings into JSON spellings

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::VectorError;

static ARRAY_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\barray\(").expect("valid regex"));
static ARRAY_CLOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\]\s*(?:,\s*dtype\s*=\s*[\w.]+\s*)?\)").expect("valid regex")
});
static TRUNCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.\.\.(?:\s*\d+\s+more\s+items?)?").expect("valid regex")
});
static DOUBLE_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*,").expect("valid regex"));
static LEADING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*,").expect("valid regex"));
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\]").expect("valid regex"));
static NONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bNone\b").expect("valid regex"));
static TRUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bTrue\b").expect("valid regex"));
static FALSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bFalse\b").expect("valid regex"));

/// Output of [`repair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    pub text: String,
    /// Truncation markers deleted. Non-zero means some arrays lost elements.
    pub truncation_markers: usize,
}

/// Parse a response, repairing it if strict JSON parsing fails.
pub fn parse(text: &str) -> Result<Value, VectorError> {
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }

    let repaired = repair(text);
    if repaired.truncation_markers > 0 {
        tracing::warn!(
            markers = repaired.truncation_markers,
            "dropped truncation markers from vector response; affected arrays are incomplete"
        );
    }

    serde_json::from_str(&repaired.text).map_err(|e| VectorError::ProtocolParse {
        message: e.to_string(),
        raw: text.to_string(),
    })
}

/// Apply the repair pipeline without parsing.
pub fn repair(text: &str) -> Repaired {
    let mut out = String::with_capacity(text.len());
    let mut truncation_markers = 0;

    for segment in split_segments(text) {
        match segment {
            Segment::Code(code) => {
                let (fixed, markers) = repair_code(code);
                truncation_markers += markers;
                out.push_str(&fixed);
            }
            Segment::Quoted { body, quote } => push_json_string(&mut out, body, quote),
        }
    }

    Repaired {
        text: out,
        truncation_markers,
    }
}

enum Segment<'a> {
    Code(&'a str),
    /// String body without its delimiters. An unterminated string runs to the end.
    Quoted { body: &'a str, quote: char },
}

fn split_segments(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut code_start = 0;
    let mut chars = text.char_indices();

    while let Some((i, c)) = chars.next() {
        if c != '\'' && c != '"' {
            continue;
        }
        if code_start < i {
            segments.push(Segment::Code(&text[code_start..i]));
        }
        let body_start = i + c.len_utf8();
        let mut body_end = text.len();
        let mut escaped = false;
        for (j, d) in chars.by_ref() {
            if escaped {
                escaped = false;
            } else if d == '\\' {
                escaped = true;
            } else if d == c {
                body_end = j;
                break;
            }
        }
        segments.push(Segment::Quoted {
            body: &text[body_start..body_end],
            quote: c,
        });
        code_start = (body_end + c.len_utf8()).min(text.len());
    }

    if code_start < text.len() {
        segments.push(Segment::Code(&text[code_start..]));
    }
    segments
}

fn repair_code(code: &str) -> (String, usize) {
    let fixed = ARRAY_OPEN.replace_all(code, "");
    let fixed = ARRAY_CLOSE.replace_all(&fixed, "]");

    let markers = TRUNCATION.find_iter(&fixed).count();
    let mut fixed = TRUNCATION.replace_all(&fixed, "").into_owned();
    if markers > 0 {
        while DOUBLE_COMMA.is_match(&fixed) {
            fixed = DOUBLE_COMMA.replace_all(&fixed, ",").into_owned();
        }
        fixed = LEADING_COMMA.replace_all(&fixed, "[").into_owned();
        fixed = TRAILING_COMMA.replace_all(&fixed, "]").into_owned();
    }

    let fixed = NONE.replace_all(&fixed, "null");
    let fixed = TRUE.replace_all(&fixed, "true");
    let fixed = FALSE.replace_all(&fixed, "false");
    (fixed.into_owned(), markers)
}

/// Re-emit a string literal body as a JSON string.
fn push_json_string(out: &mut String, body: &str, quote: char) {
    out.push('"');
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some('x') => {
                    let hex: String = chars.by_ref().take(2).collect();
                    out.push_str("\\u00");
                    out.push_str(&hex);
                }
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push_str("\\\\"),
            },
            '"' if quote == '\'' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
}
