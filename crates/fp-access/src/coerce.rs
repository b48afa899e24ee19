//! Value conversion between types.

use crate::error::{AccessError, Result};
use crate::types::{is_string_type, satisfies, Prim, TypeInfo};
use crate::value::Value;

/// Converts values into the type a slot or parameter declares.
pub trait Coercion: Send + Sync {
    /// Whether a value of `source` can be turned into `target`.
    fn can_convert(&self, target: &TypeInfo, source: &TypeInfo) -> bool;

    fn convert(&self, value: &Value, target: &TypeInfo) -> Result<Value>;
}

/// Numeric conversion in every direction, text parsing, and stringification.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCoercion;

impl Coercion for DefaultCoercion {
    fn can_convert(&self, target: &TypeInfo, source: &TypeInfo) -> bool {
        if target.is_assignable_from(source) || is_string_type(target) {
            return true;
        }
        match (target.prim(), source.prim()) {
            (Some(t), Some(s)) => t == s || (t.is_numeric() && s.is_numeric()),
            (Some(_), None) => is_string_type(source),
            _ => false,
        }
    }

    fn convert(&self, value: &Value, target: &TypeInfo) -> Result<Value> {
        if satisfies(value, target) {
            return Ok(value.clone());
        }
        let fail = || AccessError::conversion(value.type_name(), target.name());
        if value.is_null() {
            return Err(fail());
        }
        if is_string_type(target) {
            return Ok(Value::string(value.to_string()));
        }
        let prim = target.prim().ok_or_else(fail)?;
        match value {
            Value::String(s) => parse_text(s, prim).ok_or_else(fail),
            Value::Char(c) if prim.is_numeric() => Ok(numeric(*c as i64 as f64, Some(*c as i64), prim)),
            other => match (other.as_f64(), prim) {
                (Some(f), p) if p.is_numeric() => Ok(numeric(f, other.as_i64(), p)),
                (Some(f), Prim::Char) => char::from_u32(f as u32).map(Value::Char).ok_or_else(fail),
                _ => Err(fail()),
            },
        }
    }
}

// Integral sources keep full precision when the target is integral
fn numeric(decimal: f64, integral: Option<i64>, prim: Prim) -> Value {
    let whole = integral.unwrap_or(decimal as i64);
    match prim {
        Prim::Int => Value::Int(whole as i32),
        Prim::Long => Value::Long(whole),
        Prim::Float => Value::Float(decimal as f32),
        _ => Value::Double(decimal),
    }
}

fn parse_text(text: &str, prim: Prim) -> Option<Value> {
    let text = text.trim();
    match prim {
        Prim::Bool => match text {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        Prim::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(Value::Char(c)),
                _ => None,
            }
        }
        Prim::Int => text.parse().ok().map(Value::Int),
        Prim::Long => text.trim_end_matches(['L', 'l']).parse().ok().map(Value::Long),
        Prim::Float => text.trim_end_matches(['F', 'f']).parse().ok().map(Value::Float),
        Prim::Double => text.trim_end_matches(['D', 'd']).parse().ok().map(Value::Double),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::builtins;
    use pretty_assertions::assert_eq;

    #[test]
    fn converts_between_numbers_and_text() {
        let b = builtins();
        let c = DefaultCoercion;
        assert_eq!(c.convert(&Value::string("42"), &b.prim_int).unwrap(), Value::Int(42));
        assert_eq!(c.convert(&Value::Int(7), &b.prim_double).unwrap(), Value::Double(7.0));
        assert_eq!(c.convert(&Value::Double(2.9), &b.integer).unwrap(), Value::Int(2));
        assert_eq!(c.convert(&Value::Long(5), &b.string).unwrap(), Value::string("5"));
        assert_eq!(c.convert(&Value::string("x"), &b.prim_char).unwrap(), Value::Char('x'));
    }

    #[test]
    fn null_only_fits_references() {
        let b = builtins();
        let c = DefaultCoercion;
        assert_eq!(c.convert(&Value::Null, &b.string).unwrap(), Value::Null);
        assert!(c.convert(&Value::Null, &b.prim_int).is_err());
        assert!(c.convert(&Value::string("abc"), &b.prim_int).is_err());
    }

    #[test]
    fn reports_convertible_pairs() {
        let b = builtins();
        let c = DefaultCoercion;
        assert!(c.can_convert(&b.prim_int, &b.string));
        assert!(c.can_convert(&b.prim_long, &b.double));
        assert!(!c.can_convert(&b.list, &b.string));
    }
}
