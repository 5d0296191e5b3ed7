//! Splits source text into chunks at top-level block boundaries.
//!
//! A chunk ends right after a `}` that closes a top-level block. Strings,
//! comments and parenthesised text are skipped over, so a boundary never
//! falls inside a token. The same pass reports unbalanced braces and
//! unterminated comments or strings with the offset of the culprit.

use crate::error::{Error, Result};

/// Return the exclusive end offset of every chunk in `text`.
///
/// `base` is added to the offsets of reported errors.
pub(crate) fn chunk(text: &str, base: usize) -> Result<Vec<usize>> {
    let bytes = text.as_bytes();
    let mut chunks = Vec::new();
    let mut level = 0usize;
    let mut parens = 0usize;
    let mut last_open = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                if level == 0 {
                    last_open = i;
                }
                level += 1;
            }
            b'}' => {
                if level == 0 {
                    return Err(Error::parse("missing opening `{`", base + i));
                }
                level -= 1;
                if level == 0 {
                    chunks.push(i + 1);
                }
            }
            b'(' => parens += 1,
            b')' => parens = parens.saturating_sub(1),
            quote @ (b'"' | b'\'') => {
                let start = i;
                i += 1;
                loop {
                    match bytes.get(i) {
                        None => {
                            return Err(Error::parse(
                                format!("unmatched `{}`", quote as char),
                                base + start,
                            ));
                        }
                        Some(b'\\') => i += 2,
                        Some(&c) if c == quote => break,
                        Some(_) => i += 1,
                    }
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i;
                match text[i + 2..].find("*/") {
                    Some(end) => i += end + 3,
                    None => {
                        return Err(Error::parse("missing closing `*/`", base + start));
                    }
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') && parens == 0 => {
                i = text[i..].find('\n').map_or(bytes.len(), |end| i + end);
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    if level > 0 {
        return Err(Error::parse("missing closing `}`", base + last_open));
    }
    if chunks.last() != Some(&text.len()) {
        chunks.push(text.len());
    }
    Ok(chunks)
}
