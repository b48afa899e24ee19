use super::cursor::{split_top_level, PathCursor};
use crate::error::{AccessError, Result};

/// Classification of one path segment.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// `name`
    Normal { name: &'a str },
    /// `name(arg, ...)`
    Method { name: &'a str, args: Vec<&'a str> },
    /// `[expr]`
    Index { expr: &'a str },
    /// `.{ clause, ... }`
    NestedBlock { body: &'a str },
    /// `.?`, the following segment short-circuits on null
    NullSafe,
    /// `new Type(arg, ...)`, only as the first segment
    Constructor { type_name: &'a str, args: Vec<&'a str> },
    Done,
}

/// A token and the offset its segment starts at, separator included.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment<'a> {
    pub token: Token<'a>,
    pub offset: usize,
}

/// Splits a path into segments on demand.
#[derive(Debug, Clone)]
pub struct SegmentTokenizer<'a> {
    cursor: PathCursor<'a>,
    first: bool,
    /// Whether the next segment must begin with `.` or `[`.
    expect_separator: bool,
}

const NAME_STOPS: &[u8] = b".[(";

impl<'a> SegmentTokenizer<'a> {
    pub fn new(path: &'a str) -> Self {
        Self {
            cursor: PathCursor::new(path),
            first: true,
            expect_separator: false,
        }
    }

    /// Resumes tokenizing at a segment boundary recorded earlier. The segment
    /// there is not treated as the first one.
    pub fn resume(path: &'a str, offset: usize) -> Self {
        Self {
            cursor: PathCursor::at(path, offset),
            first: false,
            expect_separator: false,
        }
    }

    pub fn path(&self) -> &'a str {
        self.cursor.text()
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    pub fn is_first(&self) -> bool {
        self.first
    }

    /// Whether only whitespace is left.
    pub fn is_done(&self) -> bool {
        self.cursor.remaining().trim().is_empty()
    }

    pub fn next_segment(&mut self) -> Result<Segment<'a>> {
        self.cursor.skip_whitespace();
        let offset = self.cursor.position();
        let token = self.next_token()?;
        if !matches!(token, Token::Done) {
            self.first = false;
        }
        Ok(Segment { token, offset })
    }

    fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.cursor.peek() else {
            return Ok(Token::Done);
        };
        match byte {
            b'[' => {
                let opener = self.cursor.position();
                let expr = self.cursor.capture_balanced(b'[', b']')?.trim();
                if expr.is_empty() {
                    return Err(AccessError::syntax(opener, "empty index"));
                }
                self.expect_separator = true;
                Ok(Token::Index { expr })
            }
            b'.' => {
                self.cursor.advance();
                self.cursor.skip_whitespace();
                match self.cursor.peek() {
                    Some(b'?') => {
                        self.cursor.advance();
                        self.expect_separator = false;
                        Ok(Token::NullSafe)
                    }
                    Some(b'{') => {
                        let body = self.cursor.capture_balanced(b'{', b'}')?;
                        self.expect_separator = true;
                        Ok(Token::NestedBlock { body })
                    }
                    _ => self.member(),
                }
            }
            _ if self.expect_separator => Err(AccessError::syntax(
                self.cursor.position(),
                format!("expected '.' or '[' before '{}'", self.cursor.remaining()),
            )),
            _ if self.first && self.at_constructor() => self.constructor(),
            _ => self.member(),
        }
    }

    fn at_constructor(&self) -> bool {
        let rest = self.cursor.remaining();
        rest.strip_prefix("new")
            .and_then(|after| after.bytes().next())
            .is_some_and(|b| b.is_ascii_whitespace())
    }

    fn constructor(&mut self) -> Result<Token<'a>> {
        let keyword = self.cursor.position();
        self.cursor.set_position(keyword + "new".len());
        let type_name = self.cursor.take_until(b"(").trim();
        if type_name.is_empty() {
            return Err(AccessError::syntax(keyword, "missing type after 'new'"));
        }
        if self.cursor.peek() != Some(b'(') {
            return Err(AccessError::syntax(
                self.cursor.position(),
                format!("expected '(' after 'new {}'", type_name),
            ));
        }
        let args = self.arguments()?;
        self.expect_separator = true;
        Ok(Token::Constructor { type_name, args })
    }

    fn member(&mut self) -> Result<Token<'a>> {
        let from = self.cursor.position();
        let name = self.cursor.take_until(NAME_STOPS).trim();
        if name.is_empty() {
            return Err(AccessError::syntax(from, "empty segment name"));
        }
        self.expect_separator = true;
        if self.cursor.peek() == Some(b'(') {
            let args = self.arguments()?;
            return Ok(Token::Method { name, args });
        }
        Ok(Token::Normal { name })
    }

    fn arguments(&mut self) -> Result<Vec<&'a str>> {
        let opener = self.cursor.position();
        let inner = self.cursor.capture_balanced(b'(', b')')?;
        split_top_level(inner, b',').map_err(|e| e.at_offset(opener + 1))
    }
}

impl<'a> Iterator for SegmentTokenizer<'a> {
    type Item = Result<Segment<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_segment() {
            Ok(Segment {
                token: Token::Done, ..
            }) => None,
            other => Some(other),
        }
    }
}
