use crate::coerce::Coercion;
use crate::types::{Callable, TypeInfo};
use crate::value::Value;
use std::sync::Arc;

pub const EXACT: u32 = 5;
pub const BOXING: u32 = 4;
pub const WIDENING: u32 = 3;
pub const ASSIGNABLE: u32 = 2;
pub const CONVERTIBLE: u32 = 1;

/// Runtime types of call arguments; `None` stands for `null`.
pub fn argument_types(args: &[Value]) -> Vec<Option<&TypeInfo>> {
    args.iter().map(|arg| arg.type_info().map(|ty| &**ty)).collect()
}

/// How well an argument of type `arg` fits a parameter declared as `param`.
/// Zero means it does not fit at all.
pub fn score_parameter(param: &TypeInfo, arg: Option<&TypeInfo>, coercion: &dyn Coercion) -> u32 {
    let Some(arg) = arg else {
        return if param.is_primitive() { 0 } else { ASSIGNABLE };
    };
    if param.key() == arg.key() {
        return EXACT;
    }
    match (param.prim(), arg.prim()) {
        (Some(p), Some(a)) if p == a => return BOXING,
        (Some(p), Some(a)) if p.is_numeric() && a.is_numeric() => return WIDENING,
        _ => {}
    }
    if param.is_assignable_from(arg) {
        ASSIGNABLE
    } else if coercion.can_convert(param, arg) {
        CONVERTIBLE
    } else {
        0
    }
}

/// Total score of a candidate, `None` when its arity differs or any argument does not fit.
pub fn score<M: Callable>(candidate: &M, args: &[Option<&TypeInfo>], coercion: &dyn Coercion) -> Option<u32> {
    let params = candidate.params();
    if params.len() != args.len() {
        return None;
    }
    params.iter().zip(args).try_fold(0, |total, (param, arg)| {
        match score_parameter(param, *arg, coercion) {
            0 => None,
            points => Some(total + points),
        }
    })
}

/// Picks the candidate with the strictly highest score. Ties keep the one
/// enumerated first, so the choice only depends on the candidate order.
pub fn select_best<'m, M: Callable>(
    candidates: &'m [Arc<M>],
    args: &[Option<&TypeInfo>],
    coercion: &dyn Coercion,
) -> Option<&'m Arc<M>> {
    let mut best: Option<(&'m Arc<M>, u32)> = None;
    for candidate in candidates {
        if args.is_empty() && candidate.params().is_empty() {
            return Some(candidate);
        }
        let Some(points) = score(candidate.as_ref(), args, coercion) else {
            continue;
        };
        if best.map_or(true, |(_, top)| points > top) {
            best = Some((candidate, points));
        }
    }
    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::DefaultCoercion;
    use crate::types::{builtins, TypeBuilder};
    use pretty_assertions::assert_eq;

    #[test]
    fn tiers_follow_the_fit() {
        let b = builtins();
        let c = DefaultCoercion;
        assert_eq!(score_parameter(&b.integer, Some(&b.integer), &c), EXACT);
        assert_eq!(score_parameter(&b.prim_int, Some(&b.integer), &c), BOXING);
        assert_eq!(score_parameter(&b.prim_long, Some(&b.integer), &c), WIDENING);
        assert_eq!(score_parameter(&b.prim_int, Some(&b.long), &c), WIDENING);
        assert_eq!(score_parameter(&b.prim_float, Some(&b.double), &c), WIDENING);
        assert_eq!(score_parameter(&b.object, Some(&b.string), &c), ASSIGNABLE);
        assert_eq!(score_parameter(&b.prim_int, Some(&b.string), &c), CONVERTIBLE);
        assert_eq!(score_parameter(&b.list, Some(&b.string), &c), 0);
        assert_eq!(score_parameter(&b.string, None, &c), ASSIGNABLE);
        assert_eq!(score_parameter(&b.prim_int, None, &c), 0);
    }

    #[test]
    fn highest_total_wins_and_ties_keep_the_first() {
        let b = builtins();
        let ty = TypeBuilder::class("Overloads")
            .method("f", &[&b.object], |_, _| Ok(Value::string("object")))
            .method("f", &[&b.prim_long], |_, _| Ok(Value::string("long")))
            .method("f", &[&b.prim_int], |_, _| Ok(Value::string("int")))
            .method("g", &[&b.object], |_, _| Ok(Value::string("first")))
            .method("g", &[&b.char_sequence], |_, _| Ok(Value::string("second")))
            .build();
        let c = DefaultCoercion;

        let int_arg = [Value::Int(1)];
        let picked = select_best(&ty.methods_named("f"), &argument_types(&int_arg), &c)
            .map(|m| m.invoke(&Value::Null, &int_arg).unwrap());
        assert_eq!(picked, Some(Value::string("int")));

        let text = [Value::string("s")];
        let picked = select_best(&ty.methods_named("g"), &argument_types(&text), &c)
            .map(|m| m.invoke(&Value::Null, &text).unwrap());
        assert_eq!(picked, Some(Value::string("first")));
    }

    #[test]
    fn narrowing_numbers_beat_text_conversion() {
        let b = builtins();
        let ty = TypeBuilder::class("Narrowing")
            .method("f", &[&b.string], |_, _| Ok(Value::string("string")))
            .method("f", &[&b.prim_int], |_, _| Ok(Value::string("int")))
            .method("g", &[&b.string], |_, _| Ok(Value::string("string")))
            .method("g", &[&b.prim_float], |_, _| Ok(Value::string("float")))
            .build();
        let c = DefaultCoercion;

        let long = [Value::Long(7)];
        let picked = select_best(&ty.methods_named("f"), &argument_types(&long), &c)
            .map(|m| m.invoke(&Value::Null, &long).unwrap());
        assert_eq!(picked, Some(Value::string("int")));

        let double = [Value::Double(0.5)];
        let picked = select_best(&ty.methods_named("g"), &argument_types(&double), &c)
            .map(|m| m.invoke(&Value::Null, &double).unwrap());
        assert_eq!(picked, Some(Value::string("float")));
    }

    #[test]
    fn arity_mismatch_finds_nothing() {
        let b = builtins();
        let candidates = b.string.methods_named("substring");
        let args = [Value::Int(1), Value::Int(2), Value::Int(3)];
        assert!(select_best(&candidates, &argument_types(&args), &DefaultCoercion).is_none());
    }
}
