//! The scanner: a cursor over chunked source text.
//!
//! Every successful match advances the cursor past the matched text and any
//! whitespace that follows it. Failed matches leave the cursor untouched, so
//! productions can try alternatives freely; [`ParserInput::save`] and
//! [`ParserInput::restore`] cover the cases where a production consumed
//! several tokens before failing.

use regex::{Captures, Regex};

/// A saved cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint(usize);

pub(crate) struct ParserInput<'s> {
    text: &'s str,
    pos: usize,
    furthest: usize,
    /// Exclusive end offsets of each chunk, ascending; the last is `text.len()`.
    chunks: Vec<usize>,
}

impl<'s> ParserInput<'s> {
    pub fn new(text: &'s str, mut chunks: Vec<usize>) -> Self {
        if chunks.last() != Some(&text.len()) {
            chunks.push(text.len());
        }
        let mut input = Self {
            text,
            pos: 0,
            furthest: 0,
            chunks,
        };
        input.skip_whitespace();
        input
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The furthest offset any match has reached, including backtracked ones.
    pub fn furthest(&self) -> usize {
        self.furthest
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn save(&self) -> Checkpoint {
        Checkpoint(self.pos)
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.0;
    }

    /// The character under the cursor.
    pub fn current(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    /// The character immediately before the cursor.
    pub fn previous(&self) -> Option<char> {
        self.text[..self.pos].chars().next_back()
    }

    pub fn peek_char(&self, c: char) -> bool {
        self.current() == Some(c)
    }

    /// Consume a single character.
    pub fn char(&mut self, c: char) -> bool {
        if self.peek_char(c) {
            self.advance(c.len_utf8());
            true
        } else {
            false
        }
    }

    pub fn peek_str(&self, s: &str) -> bool {
        self.text[self.pos..].starts_with(s)
    }

    /// Match an anchored pattern against the rest of the current chunk.
    ///
    /// Patterns must start with `^`.
    pub fn re(&mut self, re: &Regex) -> Option<Captures<'s>> {
        let caps = self.peek_re(re)?;
        let len = caps.get(0).map_or(0, |m| m.end());
        self.advance(len);
        Some(caps)
    }

    /// Consume an anchored pattern and return the whole match.
    pub fn re_str(&mut self, re: &Regex) -> Option<&'s str> {
        self.re(re).and_then(|caps| caps.get(0)).map(|m| m.as_str())
    }

    /// Test an anchored pattern without advancing.
    pub fn peek_re(&self, re: &Regex) -> Option<Captures<'s>> {
        let haystack: &'s str = &self.text[self.pos..self.chunk_end()];
        re.captures(haystack)
    }

    fn chunk_end(&self) -> usize {
        let i = self.chunks.partition_point(|&end| end <= self.pos);
        self.chunks.get(i).copied().unwrap_or(self.text.len())
    }

    fn advance(&mut self, len: usize) {
        self.pos += len;
        self.skip_whitespace();
        self.furthest = self.furthest.max(self.pos);
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.text[self.pos..];
        let trimmed = rest.trim_start_matches([' ', '\t', '\n', '\r']);
        self.pos += rest.len() - trimmed.len();
    }
}
