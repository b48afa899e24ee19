//! Path text: a byte cursor and the segment tokenizer built on it.

mod cursor;
mod token;

pub use cursor::*;
pub use token::*;

use crate::error::Result;

/// Splits a nested-block clause `name = expr` into its two sides. Returns
/// `None` for a bare expression. `==`, `!=`, `<=` and `>=` are not assignments.
pub fn split_assignment(clause: &str) -> Result<Option<(&str, &str)>> {
    let cursor = PathCursor::new(clause);
    let bytes = clause.as_bytes();
    let mut depth = 0i32;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = cursor.skip_quoted(i)?;
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'=' if depth == 0 => {
                let before = i.checked_sub(1).map(|p| bytes[p]);
                let after = bytes.get(i + 1).copied();
                let comparison = matches!(before, Some(b'=' | b'!' | b'<' | b'>'))
                    || after == Some(b'=');
                if !comparison {
                    return Ok(Some((clause[..i].trim(), clause[i + 1..].trim())));
                }
                if after == Some(b'=') {
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn assignment_is_split_once() {
        assert_eq!(split_assignment(" name = 'a=b' ").unwrap(), Some(("name", "'a=b'")));
        assert_eq!(split_assignment("items[0] = x").unwrap(), Some(("items[0]", "x")));
        assert_eq!(split_assignment("a == b").unwrap(), None);
        assert_eq!(split_assignment("touch()").unwrap(), None);
    }
}
