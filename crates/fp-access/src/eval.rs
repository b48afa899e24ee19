//! Sub-expression evaluation for call arguments, indexes and nested-block clauses.

use crate::context::ResolutionContext;
use crate::error::Result;
use crate::scope::VariableScope;
use crate::value::Value;

/// Evaluates the expression text embedded in a path.
pub trait Evaluator: Send + Sync {
    fn evaluate(
        &self,
        cx: &ResolutionContext,
        text: &str,
        root: &Value,
        scope: &dyn VariableScope,
    ) -> Result<Value>;

    /// The value of `text` when it depends on neither root nor scope. Such
    /// arguments are folded into the compiled chain.
    fn literal(&self, _text: &str) -> Option<Value> {
        None
    }
}

/// Literals, and anything else as a path against the root.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEvaluator;

impl Evaluator for DefaultEvaluator {
    fn evaluate(
        &self,
        cx: &ResolutionContext,
        text: &str,
        root: &Value,
        scope: &dyn VariableScope,
    ) -> Result<Value> {
        match parse_literal(text) {
            Some(value) => Ok(value),
            None => cx.get(text.trim(), root, scope),
        }
    }

    fn literal(&self, text: &str) -> Option<Value> {
        parse_literal(text)
    }
}

/// Parses `true`, `false`, `null`, quoted strings and numbers.
///
/// Integers are `int` unless they overflow it or carry an `L` suffix.
/// Decimals are `double` unless suffixed with `f`.
pub fn parse_literal(text: &str) -> Option<Value> {
    let text = text.trim();
    match text {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" => return Some(Value::Null),
        _ => {}
    }
    match text.chars().next()? {
        quote @ ('\'' | '"') => unquote(text, quote).map(Value::string),
        '-' | '0'..='9' => number(text),
        _ => None,
    }
}

fn unquote(text: &str, quote: char) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text[1..].chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(match chars.next()? {
                't' => '\t',
                'r' => '\r',
                'n' => '\n',
                other => other,
            }),
            c if c == quote => return chars.as_str().is_empty().then_some(out),
            c => out.push(c),
        }
    }
    None
}

fn number(text: &str) -> Option<Value> {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    if !unsigned.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let (digits, suffix) = match text.chars().last() {
        Some(c) if c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E') => {
            (&text[..text.len() - 1], Some(c.to_ascii_lowercase()))
        }
        _ => (text, None),
    };
    let decimal = digits.contains(['.', 'e', 'E']);
    match suffix {
        Some('l') if !decimal => digits.parse().ok().map(Value::Long),
        Some('f') => digits.parse().ok().map(Value::Float),
        Some('d') => digits.parse().ok().map(Value::Double),
        None if decimal => digits.parse().ok().map(Value::Double),
        None => digits
            .parse()
            .map(Value::Int)
            .or_else(|_| digits.parse().map(Value::Long))
            .ok(),
        _ => None,
    }
}
