use crate::error::{AccessError, Result};

/// Position tracker over the bytes of a path.
///
/// Every delimiter the cursor cares about is ASCII, so offsets it reports are
/// always valid `str` boundaries.
#[derive(Debug, Clone)]
pub struct PathCursor<'a> {
    text: &'a str,
    start: usize,
    cursor: usize,
    end: usize,
}

impl<'a> PathCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::at(text, 0)
    }

    /// A cursor positioned at `offset` inside `text`.
    pub fn at(text: &'a str, offset: usize) -> Self {
        let offset = offset.min(text.len());
        Self {
            text,
            start: offset,
            cursor: offset,
            end: text.len(),
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn set_position(&mut self, position: usize) {
        self.cursor = position.min(self.end);
    }

    pub fn at_end(&self) -> bool {
        self.cursor >= self.end
    }

    pub fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.cursor).copied().filter(|_| !self.at_end())
    }

    pub fn advance(&mut self) {
        if !self.at_end() {
            self.cursor += 1;
        }
    }

    /// Consumes `byte` if it is next.
    pub fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.cursor += 1;
        }
    }

    pub fn slice(&self, from: usize, to: usize) -> &'a str {
        &self.text[from..to]
    }

    pub fn remaining(&self) -> &'a str {
        &self.text[self.cursor..self.end]
    }

    /// Advances up to the next byte in `stops` (or the end) and returns what was skipped.
    pub fn take_until(&mut self, stops: &[u8]) -> &'a str {
        let from = self.cursor;
        while self.peek().is_some_and(|b| !stops.contains(&b)) {
            self.cursor += 1;
        }
        self.slice(from, self.cursor)
    }

    /// With the cursor on an opening delimiter, moves past its matching close
    /// and returns the enclosed text. Only delimiters of the same kind count
    /// toward the depth; quoted strings inside are skipped whole.
    pub fn capture_balanced(&mut self, open: u8, close: u8) -> Result<&'a str> {
        let opener = self.cursor;
        let bytes = self.text.as_bytes();
        let mut depth = 0usize;
        let mut i = opener;
        while i < self.end {
            match bytes[i] {
                b'"' | b'\'' => {
                    i = self.skip_quoted(i)?;
                    continue;
                }
                b if b == open => depth += 1,
                b if b == close => {
                    depth -= 1;
                    if depth == 0 {
                        self.cursor = i + 1;
                        return Ok(self.slice(opener + 1, i));
                    }
                }
                _ => {}
            }
            i += 1;
        }
        Err(AccessError::UnterminatedDelimiter {
            delimiter: open as char,
            offset: opener,
        })
    }

    /// Given the offset of an opening quote, returns the offset just past the
    /// closing one. Backslash escapes the following character.
    pub fn skip_quoted(&self, quote_at: usize) -> Result<usize> {
        let bytes = self.text.as_bytes();
        let quote = bytes[quote_at];
        let mut i = quote_at + 1;
        while i < self.end {
            match bytes[i] {
                b'\\' => i += 2,
                b if b == quote => return Ok(i + 1),
                _ => i += 1,
            }
        }
        Err(AccessError::UnterminatedDelimiter {
            delimiter: quote as char,
            offset: quote_at,
        })
    }
}

/// Splits `text` on commas outside quotes and brackets, trimming each part.
/// Offsets in errors are relative to `text`.
pub fn split_top_level(text: &str, separator: u8) -> Result<Vec<&str>> {
    let cursor = PathCursor::new(text);
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut from = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = cursor.skip_quoted(i)?;
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b if b == separator && depth == 0 => {
                parts.push(&text[from..i]);
                from = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if text.trim().is_empty() && parts.is_empty() {
        return Ok(Vec::new());
    }
    parts.push(&text[from..]);
    let mut offset = 0;
    let mut trimmed = Vec::with_capacity(parts.len());
    for part in parts {
        if part.trim().is_empty() {
            return Err(AccessError::syntax(offset, "empty element in list"));
        }
        trimmed.push(part.trim());
        offset += part.len() + 1;
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn captures_nested_brackets_and_quotes() {
        let mut cursor = PathCursor::new("[a[1] + ']'].rest");
        assert_eq!(cursor.capture_balanced(b'[', b']').unwrap(), "a[1] + ']'");
        assert_eq!(cursor.remaining(), ".rest");
    }

    #[test]
    fn escaped_quote_does_not_terminate() {
        let mut cursor = PathCursor::new(r#"("a\"b")x"#);
        assert_eq!(cursor.capture_balanced(b'(', b')').unwrap(), r#""a\"b""#);
        assert_eq!(cursor.peek(), Some(b'x'));
    }

    #[test]
    fn unterminated_reports_the_opener() {
        let mut cursor = PathCursor::at("foo(bar", 3);
        assert_eq!(
            cursor.capture_balanced(b'(', b')'),
            Err(AccessError::UnterminatedDelimiter {
                delimiter: '(',
                offset: 3
            })
        );
        let mut cursor = PathCursor::new("['abc]");
        assert_eq!(
            cursor.capture_balanced(b'[', b']'),
            Err(AccessError::UnterminatedDelimiter {
                delimiter: '\'',
                offset: 1
            })
        );
    }

    #[test]
    fn splits_arguments_at_top_level() {
        assert_eq!(
            split_top_level(" 1, f(a, b) ,'x,y' ", b',').unwrap(),
            vec!["1", "f(a, b)", "'x,y'"]
        );
        assert!(split_top_level("  ", b',').unwrap().is_empty());
        assert!(split_top_level("1,,2", b',').is_err());
    }
}
