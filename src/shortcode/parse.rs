//! Tag scanning and argument parsing.

use super::ShortcodeError;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{%-?\s*(\w+)").expect("Invalid shortcode tag regex"));

static END_RAW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{%-?\s*endraw\s*-?%\}").expect("Invalid endraw regex"));

/// A `{% name args %}` tag found in content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    pub name: &'a str,
    /// Raw argument text, without the surrounding delimiters.
    pub args: &'a str,
    /// The whole tag as written, for passing unknown tags through.
    pub source: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Tag(Tag<'a>),
}

/// Split content into literal text and tags.
///
/// A tag closes at the first `%}` outside a quoted string. An opener with no
/// close before the next `{%` is left as text. The body of a `{% raw %}`
/// block comes back as text, with the markers dropped. An unterminated raw
/// block is an error.
pub fn segments(input: &str) -> Result<Vec<Segment<'_>>, ShortcodeError> {
    let mut out = Vec::new();
    let mut cursor = 0;
    let mut search = 0;

    while let Some(caps) = OPEN.captures_at(input, search) {
        let (Some(open), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let Some(close) = find_close(input, name.end()) else {
            search = open.start() + 2;
            continue;
        };
        let end = close + 2;

        if open.start() > cursor {
            out.push(Segment::Text(&input[cursor..open.start()]));
        }

        if name.as_str() == "raw" {
            let end_raw = END_RAW.find_at(input, end).ok_or_else(|| {
                ShortcodeError::Parse(format!(
                    "unterminated {{% raw %}} block at byte {}",
                    open.start()
                ))
            })?;
            if end_raw.start() > end {
                out.push(Segment::Text(&input[end..end_raw.start()]));
            }
            cursor = end_raw.end();
            search = cursor;
            continue;
        }

        let args = input[name.end()..close].trim();
        let args = args.strip_suffix('-').map_or(args, str::trim_end);
        out.push(Segment::Tag(Tag {
            name: name.as_str(),
            args,
            source: &input[open.start()..end],
        }));
        cursor = end;
        search = end;
    }

    if cursor < input.len() {
        out.push(Segment::Text(&input[cursor..]));
    }
    Ok(out)
}

/// Byte offset of the `%}` closing a tag whose arguments start at `from`.
fn find_close(input: &str, from: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut quote = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'%' if bytes.get(i + 1) == Some(&b'}') => return Some(i),
                b'{' if bytes.get(i + 1) == Some(&b'%') => return None,
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Parse a tag's argument text as a comma-separated list of JSON values.
///
/// Strings may also be single-quoted, as in Nunjucks.
pub fn parse_args(shortcode: &'static str, raw: &str) -> Result<Vec<Value>, ShortcodeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let json = double_quoted(raw);
    serde_json::from_str::<Vec<Value>>(&format!("[{json}]")).map_err(|e| {
        ShortcodeError::Arguments {
            shortcode,
            message: format!("cannot parse `{raw}`: {e}"),
        }
    })
}

/// Rewrite `'...'` strings as JSON strings, leaving `"..."` strings alone.
fn double_quoted(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut quote = None;
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (None, '\'') => {
                out.push('"');
                quote = Some('\'');
            }
            (None, '"') => {
                out.push('"');
                quote = Some('"');
            }
            (Some('\''), '\'') | (Some('"'), '"') => {
                out.push('"');
                quote = None;
            }
            (Some('\''), '"') => out.push_str("\\\""),
            (Some('\''), '\\') => match chars.next() {
                Some('\'') => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            (Some(_), '\\') => {
                out.push('\\');
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            _ => out.push(c),
        }
    }
    out
}
