use super::*;
use crate::error::{AccessError, Result};
use crate::value::ListRef;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

/// The built-in types every [`crate::ResolutionContext`] knows about.
pub struct Builtins {
    pub object: TypeRef,
    pub number: TypeRef,
    pub char_sequence: TypeRef,
    pub string: TypeRef,
    pub boolean: TypeRef,
    pub character: TypeRef,
    pub integer: TypeRef,
    pub long: TypeRef,
    pub float: TypeRef,
    pub double: TypeRef,
    pub prim_boolean: TypeRef,
    pub prim_char: TypeRef,
    pub prim_int: TypeRef,
    pub prim_long: TypeRef,
    pub prim_float: TypeRef,
    pub prim_double: TypeRef,
    pub collection: TypeRef,
    pub list: TypeRef,
    pub map: TypeRef,
    pub class: TypeRef,
    pub math: TypeRef,
}

static BUILTINS: LazyLock<Builtins> = LazyLock::new(Builtins::create);

pub fn builtins() -> &'static Builtins {
    &BUILTINS
}

impl Builtins {
    pub fn primitive(&self, prim: Prim) -> &TypeRef {
        match prim {
            Prim::Bool => &self.prim_boolean,
            Prim::Char => &self.prim_char,
            Prim::Int => &self.prim_int,
            Prim::Long => &self.prim_long,
            Prim::Float => &self.prim_float,
            Prim::Double => &self.prim_double,
        }
    }

    pub fn boxed(&self, prim: Prim) -> &TypeRef {
        match prim {
            Prim::Bool => &self.boolean,
            Prim::Char => &self.character,
            Prim::Int => &self.integer,
            Prim::Long => &self.long,
            Prim::Float => &self.float,
            Prim::Double => &self.double,
        }
    }

    pub fn all(&self) -> [&TypeRef; 21] {
        [
            &self.object,
            &self.number,
            &self.char_sequence,
            &self.string,
            &self.boolean,
            &self.character,
            &self.integer,
            &self.long,
            &self.float,
            &self.double,
            &self.prim_boolean,
            &self.prim_char,
            &self.prim_int,
            &self.prim_long,
            &self.prim_float,
            &self.prim_double,
            &self.collection,
            &self.list,
            &self.map,
            &self.class,
            &self.math,
        ]
    }

    // Must not reach `builtins()`: the table is still being initialized.
    fn create() -> Builtins {
        let prim_boolean = TypeBuilder::primitive(Prim::Bool).build();
        let prim_char = TypeBuilder::primitive(Prim::Char).build();
        let prim_int = TypeBuilder::primitive(Prim::Int).build();
        let prim_long = TypeBuilder::primitive(Prim::Long).build();
        let prim_float = TypeBuilder::primitive(Prim::Float).build();
        let prim_double = TypeBuilder::primitive(Prim::Double).build();

        let object = TypeBuilder::class("Object")
            .method("toString", &[], |this, _| Ok(Value::string(this.to_string())))
            .method("hashCode", &[], |this, _| {
                let mut hasher = DefaultHasher::new();
                this.hash(&mut hasher);
                Ok(Value::Int(hasher.finish() as i32))
            })
            .method("getClass", &[], |this, _| {
                Ok(this.type_info().cloned().map(Value::Type).unwrap_or_default())
            })
            .default_constructor()
            .build();

        let class = TypeBuilder::class("Class")
            .method("getName", &[], |this, _| {
                Ok(this
                    .as_type()
                    .map(|ty| Value::string(ty.name()))
                    .unwrap_or_default())
            })
            .method("isInterface", &[], |this, _| {
                Ok(Value::Bool(this.as_type().is_some_and(|ty| ty.is_interface())))
            })
            .method("isArray", &[], |this, _| {
                Ok(Value::Bool(this.as_type().is_some_and(|ty| ty.is_array())))
            })
            .build();

        let number = TypeBuilder::class("Number")
            .method("intValue", &[], |this, _| Ok(Value::Int(integral(this)? as i32)))
            .method("longValue", &[], |this, _| Ok(Value::Long(integral(this)?)))
            .method("floatValue", &[], |this, _| Ok(Value::Float(decimal(this)? as f32)))
            .method("doubleValue", &[], |this, _| Ok(Value::Double(decimal(this)?)))
            .build();

        let boolean = TypeBuilder::boxed(Prim::Bool)
            .constant("TRUE", &prim_boolean, Value::Bool(true))
            .constant("FALSE", &prim_boolean, Value::Bool(false))
            .static_method("parseBoolean", &[&object], |args| {
                Ok(Value::Bool(
                    text(args, 0).is_ok_and(|s| s.eq_ignore_ascii_case("true")),
                ))
            })
            .method("booleanValue", &[], |this, _| Ok(this.clone()))
            .build();

        let character = TypeBuilder::boxed(Prim::Char)
            .static_method("isDigit", &[&prim_char], |args| {
                Ok(Value::Bool(matches!(args.first(), Some(Value::Char(c)) if c.is_ascii_digit())))
            })
            .static_method("isLetter", &[&prim_char], |args| {
                Ok(Value::Bool(matches!(args.first(), Some(Value::Char(c)) if c.is_alphabetic())))
            })
            .method("charValue", &[], |this, _| Ok(this.clone()))
            .build();

        let integer = TypeBuilder::boxed(Prim::Int)
            .extends(&number)
            .constant("MAX_VALUE", &prim_int, Value::Int(i32::MAX))
            .constant("MIN_VALUE", &prim_int, Value::Int(i32::MIN))
            .static_method("parseInt", &[&object], |args| {
                parse_number(args, "int", |s| s.parse::<i32>().ok().map(Value::Int))
            })
            .static_method("valueOf", &[&prim_int], |args| Ok(first(args)))
            .static_method("valueOf", &[&object], |args| {
                parse_number(args, "int", |s| s.parse::<i32>().ok().map(Value::Int))
            })
            .build();

        let long = TypeBuilder::boxed(Prim::Long)
            .extends(&number)
            .constant("MAX_VALUE", &prim_long, Value::Long(i64::MAX))
            .constant("MIN_VALUE", &prim_long, Value::Long(i64::MIN))
            .static_method("parseLong", &[&object], |args| {
                parse_number(args, "long", |s| s.parse::<i64>().ok().map(Value::Long))
            })
            .static_method("valueOf", &[&prim_long], |args| Ok(first(args)))
            .build();

        let float = TypeBuilder::boxed(Prim::Float)
            .extends(&number)
            .constant("MAX_VALUE", &prim_float, Value::Float(f32::MAX))
            .static_method("parseFloat", &[&object], |args| {
                parse_number(args, "float", |s| s.parse::<f32>().ok().map(Value::Float))
            })
            .build();

        let double = TypeBuilder::boxed(Prim::Double)
            .extends(&number)
            .constant("MAX_VALUE", &prim_double, Value::Double(f64::MAX))
            .static_method("parseDouble", &[&object], |args| {
                parse_number(args, "double", |s| s.parse::<f64>().ok().map(Value::Double))
            })
            .static_method("valueOf", &[&prim_double], |args| Ok(first(args)))
            .build();

        let char_sequence = TypeBuilder::interface("CharSequence")
            .abstract_method("length", &[])
            .abstract_method("charAt", &[&prim_int])
            .build();

        let string = Self::string(&object, &char_sequence, &prim_int, &prim_char);
        let (collection, list) = Self::sequences(&object, &prim_int);

        let map = TypeBuilder::class("Map")
            .method("size", &[], |this, _| with_map(this, |m| Value::Int(m.len() as i32)))
            .method("isEmpty", &[], |this, _| with_map(this, |m| Value::Bool(m.is_empty())))
            .method("get", &[&object], |this, args| {
                with_map(this, |m| m.get(&first(args)).unwrap_or_default())
            })
            .method("containsKey", &[&object], |this, args| {
                with_map(this, |m| Value::Bool(m.contains_key(&first(args))))
            })
            .method("put", &[&object, &object], |this, args| {
                with_map(this, |m| {
                    m.insert(first(args), args.get(1).cloned().unwrap_or_default())
                        .unwrap_or_default()
                })
            })
            .method("remove", &[&object], |this, args| {
                with_map(this, |m| m.remove(&first(args)).unwrap_or_default())
            })
            .default_constructor_with(|_, _| Ok(Value::Map(Default::default())))
            .build();

        let math = TypeBuilder::class("Math")
            .constant("PI", &prim_double, Value::Double(std::f64::consts::PI))
            .constant("E", &prim_double, Value::Double(std::f64::consts::E))
            // numeric overloads widest first, so equal scores settle on the wider type
            .static_method("abs", &[&prim_double], |args| Ok(Value::Double(decimal(&first(args))?.abs())))
            .static_method("abs", &[&prim_long], |args| match first(args) {
                Value::Long(i) => Ok(Value::Long(i.wrapping_abs())),
                other => Err(AccessError::conversion(other.type_name(), "long")),
            })
            .static_method("abs", &[&prim_int], |args| match first(args) {
                Value::Int(i) => Ok(Value::Int(i.wrapping_abs())),
                other => Err(AccessError::conversion(other.type_name(), "int")),
            })
            .static_method("max", &[&prim_double, &prim_double], |args| {
                decimal_pair(args, |a, b| Value::Double(a.max(b)))
            })
            .static_method("max", &[&prim_long, &prim_long], |args| {
                pair(args, |a, b| Value::Long(a.max(b)))
            })
            .static_method("max", &[&prim_int, &prim_int], |args| {
                pair(args, |a, b| Value::Int(a.max(b) as i32))
            })
            .static_method("min", &[&prim_double, &prim_double], |args| {
                decimal_pair(args, |a, b| Value::Double(a.min(b)))
            })
            .static_method("min", &[&prim_long, &prim_long], |args| {
                pair(args, |a, b| Value::Long(a.min(b)))
            })
            .static_method("min", &[&prim_int, &prim_int], |args| {
                pair(args, |a, b| Value::Int(a.min(b) as i32))
            })
            .static_method("sqrt", &[&prim_double], |args| {
                Ok(Value::Double(decimal(&first(args))?.sqrt()))
            })
            .build();

        Builtins {
            object,
            number,
            char_sequence,
            string,
            boolean,
            character,
            integer,
            long,
            float,
            double,
            prim_boolean,
            prim_char,
            prim_int,
            prim_long,
            prim_float,
            prim_double,
            collection,
            list,
            map,
            class,
            math,
        }
    }

    fn string(
        object: &TypeRef,
        char_sequence: &TypeRef,
        int: &TypeRef,
        char: &TypeRef,
    ) -> TypeRef {
        TypeBuilder::class("String")
            .implements(char_sequence)
            .method("length", &[], |this, _| {
                Ok(Value::Int(receiver_str(this)?.chars().count() as i32))
            })
            .method("isEmpty", &[], |this, _| Ok(Value::Bool(receiver_str(this)?.is_empty())))
            .method("toUpperCase", &[], |this, _| {
                Ok(Value::string(receiver_str(this)?.to_uppercase()))
            })
            .method("toLowerCase", &[], |this, _| {
                Ok(Value::string(receiver_str(this)?.to_lowercase()))
            })
            .method("trim", &[], |this, _| Ok(Value::string(receiver_str(this)?.trim())))
            .method("charAt", &[int], |this, args| {
                let s = receiver_str(this)?;
                let index = index_arg(args, 0)?;
                s.chars()
                    .nth(index)
                    .map(Value::Char)
                    .ok_or_else(|| AccessError::IndexOutOfRange {
                        index: index as i64,
                        size: s.chars().count(),
                    })
            })
            .method("substring", &[int], |this, args| {
                let s = receiver_str(this)?;
                let len = s.chars().count();
                substring(s, index_arg(args, 0)?, len)
            })
            .method("substring", &[int, int], |this, args| {
                let s = receiver_str(this)?;
                substring(s, index_arg(args, 0)?, index_arg(args, 1)?)
            })
            .method("indexOf", &[object], |this, args| {
                let s = receiver_str(this)?;
                let needle = text(args, 0)?;
                Ok(char_position(s, s.find(needle)))
            })
            .method("indexOf", &[char], |this, args| {
                let s = receiver_str(this)?;
                let found = match args.first() {
                    Some(Value::Char(c)) => s.find(*c),
                    _ => None,
                };
                Ok(char_position(s, found))
            })
            .method("contains", &[char_sequence], |this, args| {
                Ok(Value::Bool(receiver_str(this)?.contains(text(args, 0)?)))
            })
            .method("startsWith", &[object], |this, args| {
                Ok(Value::Bool(receiver_str(this)?.starts_with(text(args, 0)?)))
            })
            .method("endsWith", &[object], |this, args| {
                Ok(Value::Bool(receiver_str(this)?.ends_with(text(args, 0)?)))
            })
            .method("concat", &[object], |this, args| {
                Ok(Value::string(format!("{}{}", receiver_str(this)?, text(args, 0)?)))
            })
            .method("replace", &[char_sequence, char_sequence], |this, args| {
                Ok(Value::string(
                    receiver_str(this)?.replace(text(args, 0)?, text(args, 1)?),
                ))
            })
            .method("equalsIgnoreCase", &[object], |this, args| {
                let other = args.first().and_then(Value::as_str);
                Ok(Value::Bool(other.is_some_and(|o| {
                    receiver_str(this).is_ok_and(|s| s.to_lowercase() == o.to_lowercase())
                })))
            })
            .method("equals", &[object], |this, args| Ok(Value::Bool(*this == first(args))))
            .build()
    }

    fn sequences(object: &TypeRef, int: &TypeRef) -> (TypeRef, TypeRef) {
        let collection = TypeBuilder::class("Collection")
            .method("size", &[], |this, _| Ok(Value::Int(sequence(this)?.len() as i32)))
            .method("isEmpty", &[], |this, _| Ok(Value::Bool(sequence(this)?.is_empty())))
            .method("contains", &[object], |this, args| {
                Ok(Value::Bool(sequence(this)?.contains(&first(args))))
            })
            .method("add", &[object], |this, args| {
                match this {
                    Value::List(list) => list.push(first(args)),
                    Value::Collection(collection) => collection.push(first(args)),
                    other => return Err(AccessError::conversion(other.type_name(), "Collection")),
                }
                Ok(Value::Bool(true))
            })
            .default_constructor_with(|_, _| Ok(Value::Collection(Default::default())))
            .build();
        let list = TypeBuilder::class("List")
            .extends(&collection)
            .method("get", &[int], |this, args| {
                let list = receiver_list(this)?;
                let index = index_arg(args, 0)?;
                list.get(index).ok_or_else(|| AccessError::IndexOutOfRange {
                    index: index as i64,
                    size: list.len(),
                })
            })
            .method("set", &[int, object], |this, args| {
                let list = receiver_list(this)?;
                let index = index_arg(args, 0)?;
                let value = args.get(1).cloned().unwrap_or_default();
                list.set(index, value).map_err(|size| AccessError::IndexOutOfRange {
                    index: index as i64,
                    size,
                })
            })
            .method("indexOf", &[object], |this, args| {
                let position = receiver_list(this)?.index_of(&first(args));
                Ok(Value::Int(position.map(|p| p as i32).unwrap_or(-1)))
            })
            .default_constructor_with(|_, _| Ok(Value::List(ListRef::default())))
            .build();
        (collection, list)
    }
}

impl TypeBuilder {
    /// Zero-argument constructor producing a value other than a plain object.
    pub(super) fn default_constructor_with<F>(self, body: F) -> Self
    where
        F: Fn(&TypeRef, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.constructor(&[], body)
    }
}

fn first(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or_default()
}

fn receiver_str(this: &Value) -> Result<&str> {
    this.as_str()
        .ok_or_else(|| AccessError::conversion(this.type_name(), "String"))
}

fn receiver_list(this: &Value) -> Result<&ListRef> {
    match this {
        Value::List(list) => Ok(list),
        other => Err(AccessError::conversion(other.type_name(), "List")),
    }
}

/// Elements of a list or collection receiver.
fn sequence(this: &Value) -> Result<Vec<Value>> {
    match this {
        Value::List(list) => Ok(list.snapshot()),
        Value::Collection(collection) => Ok(collection.snapshot()),
        other => Err(AccessError::conversion(other.type_name(), "Collection")),
    }
}

fn with_map(this: &Value, f: impl FnOnce(&crate::value::MapRef) -> Value) -> Result<Value> {
    match this {
        Value::Map(map) => Ok(f(map)),
        other => Err(AccessError::conversion(other.type_name(), "Map")),
    }
}

fn text(args: &[Value], index: usize) -> Result<&str> {
    let arg = args.get(index).unwrap_or(&Value::NULL);
    arg.as_str()
        .ok_or_else(|| AccessError::conversion(arg.type_name(), "String"))
}

fn index_arg(args: &[Value], index: usize) -> Result<usize> {
    let arg = args.get(index).unwrap_or(&Value::NULL);
    let raw = arg
        .as_i64()
        .ok_or_else(|| AccessError::conversion(arg.type_name(), "int"))?;
    usize::try_from(raw).map_err(|_| AccessError::IndexOutOfRange {
        index: raw,
        size: 0,
    })
}

fn integral(this: &Value) -> Result<i64> {
    this.as_i64()
        .ok_or_else(|| AccessError::conversion(this.type_name(), "long"))
}

fn decimal(this: &Value) -> Result<f64> {
    this.as_f64()
        .ok_or_else(|| AccessError::conversion(this.type_name(), "double"))
}

fn pair(args: &[Value], f: impl FnOnce(i64, i64) -> Value) -> Result<Value> {
    let a = integral(args.first().unwrap_or(&Value::NULL))?;
    let b = integral(args.get(1).unwrap_or(&Value::NULL))?;
    Ok(f(a, b))
}

fn decimal_pair(args: &[Value], f: impl FnOnce(f64, f64) -> Value) -> Result<Value> {
    let a = decimal(args.first().unwrap_or(&Value::NULL))?;
    let b = decimal(args.get(1).unwrap_or(&Value::NULL))?;
    Ok(f(a, b))
}

fn parse_number(
    args: &[Value],
    target: &str,
    parse: impl FnOnce(&str) -> Option<Value>,
) -> Result<Value> {
    let s = text(args, 0)?;
    parse(s.trim()).ok_or_else(|| AccessError::conversion(format!("\"{}\"", s), target))
}

fn substring(s: &str, start: usize, end: usize) -> Result<Value> {
    let len = s.chars().count();
    if start > end || end > len {
        return Err(AccessError::IndexOutOfRange {
            index: end.max(start) as i64,
            size: len,
        });
    }
    Ok(Value::string(s.chars().skip(start).take(end - start).collect::<String>()))
}

// Byte offsets from `str::find` reported as char positions, -1 when absent
fn char_position(s: &str, byte_offset: Option<usize>) -> Value {
    Value::Int(
        byte_offset
            .map(|offset| s[..offset].chars().count() as i32)
            .unwrap_or(-1),
    )
}
