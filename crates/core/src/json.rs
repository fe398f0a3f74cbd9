//! Canonical JSON serialization (§6 "Serialization format (JSON)").
//!
//! Hand-rolled rather than built on `serde_json`, in the spirit of the
//! teacher's hand-rolled SON codec (`runtime/src/son.rs`): this is a
//! small, fixed grammar owned end-to-end by the evaluator, not a
//! general-purpose document format.

use crate::arraydata::HArray;
use crate::error::{EvalResult, HemlockException};
use crate::objectdata::{HObject, ObjectData};
use crate::value::Value;
use std::collections::HashSet;

/// `serialize()` (§4.7, §6): objects as `{"name":value,...}` preserving
/// insertion order, arrays as `[...]`, cycle detection across both kinds
/// sharing one visited-address set (§9 Open Question resolution).
pub fn serialize(value: &Value) -> EvalResult<String> {
    let mut out = String::new();
    let mut visiting = HashSet::new();
    write_value(value, &mut out, &mut visiting)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut String, visiting: &mut HashSet<usize>) -> EvalResult<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::I8(n) => out.push_str(&n.to_string()),
        Value::I16(n) => out.push_str(&n.to_string()),
        Value::I32(n) => out.push_str(&n.to_string()),
        Value::I64(n) => out.push_str(&n.to_string()),
        Value::U8(n) => out.push_str(&n.to_string()),
        Value::U16(n) => out.push_str(&n.to_string()),
        Value::U32(n) => out.push_str(&n.to_string()),
        Value::U64(n) => out.push_str(&n.to_string()),
        Value::F32(f) => write_float(*f as f64, out),
        Value::F64(f) => write_float(*f, out),
        Value::String(s) => write_string(&s.read().as_str_lossy(), out),
        Value::Rune(c) => write_string(&c.to_string(), out),
        Value::Array(arr) => write_array(arr, out, visiting)?,
        Value::Object(obj) => write_object(obj, out, visiting)?,
        other => {
            return Err(HemlockException::msg(format!(
                "cannot serialize a value of type '{}'",
                other.type_name()
            )))
        }
    }
    Ok(())
}

fn write_float(f: f64, out: &mut String) {
    if f.fract() == 0.0 && f.is_finite() {
        out.push_str(&format!("{f:.1}"));
    } else {
        out.push_str(&f.to_string());
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_array(arr: &HArray, out: &mut String, visiting: &mut HashSet<usize>) -> EvalResult<()> {
    let addr = arr.ptr_addr();
    if !visiting.insert(addr) {
        return Err(HemlockException::msg("serialize: cyclic array"));
    }
    out.push('[');
    for (i, item) in arr.read().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_value(item, out, visiting)?;
    }
    out.push(']');
    visiting.remove(&addr);
    Ok(())
}

fn write_object(obj: &HObject, out: &mut String, visiting: &mut HashSet<usize>) -> EvalResult<()> {
    let addr = obj.ptr_addr();
    if !visiting.insert(addr) {
        return Err(HemlockException::msg("serialize: cyclic object"));
    }
    out.push('{');
    for (i, (name, value)) in obj.read().fields().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(name, out);
        out.push(':');
        write_value(value, out, visiting)?;
    }
    out.push('}');
    visiting.remove(&addr);
    Ok(())
}

/// `deserialize(json)` (§6): integer literals yield i32 if in range else
/// i64; numbers with a decimal point yield f64; objects become untyped
/// Hemlock objects.
pub fn deserialize(json: &str) -> EvalResult<Value> {
    let mut chars = json.char_indices().peekable();
    let value = parse_value(json, &mut chars)?;
    skip_ws(json, &mut chars);
    if chars.peek().is_some() {
        return Err(HemlockException::msg("trailing data after JSON value"));
    }
    Ok(value)
}

type Chars<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

fn skip_ws(_src: &str, chars: &mut Chars) {
    while let Some((_, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else {
            break;
        }
    }
}

fn parse_value(src: &str, chars: &mut Chars) -> EvalResult<Value> {
    skip_ws(src, chars);
    match chars.peek().copied() {
        Some((_, '{')) => parse_object(src, chars),
        Some((_, '[')) => parse_array(src, chars),
        Some((_, '"')) => Ok(Value::string(parse_string(src, chars)?)),
        Some((_, 't')) => parse_literal(src, chars, "true", Value::Bool(true)),
        Some((_, 'f')) => parse_literal(src, chars, "false", Value::Bool(false)),
        Some((_, 'n')) => parse_literal(src, chars, "null", Value::Null),
        Some((_, c)) if c == '-' || c.is_ascii_digit() => parse_number(src, chars),
        Some((_, c)) => Err(HemlockException::msg(format!("unexpected character '{c}' in JSON"))),
        None => Err(HemlockException::msg("unexpected end of JSON input")),
    }
}

fn parse_literal(src: &str, chars: &mut Chars, lit: &str, value: Value) -> EvalResult<Value> {
    for expected in lit.chars() {
        match chars.next() {
            Some((_, c)) if c == expected => {}
            _ => return Err(HemlockException::msg(format!("invalid JSON literal, expected '{lit}'"))),
        }
    }
    let _ = src;
    Ok(value)
}

fn parse_string(src: &str, chars: &mut Chars) -> EvalResult<String> {
    chars.next(); // opening quote
    let mut out = String::new();
    loop {
        match chars.next() {
            Some((_, '"')) => return Ok(out),
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, 't')) => out.push('\t'),
                Some((_, '"')) => out.push('"'),
                Some((_, '\\')) => out.push('\\'),
                Some((_, '/')) => out.push('/'),
                Some((_, 'u')) => {
                    let mut code = 0u32;
                    for _ in 0..4 {
                        let (_, c) = chars
                            .next()
                            .ok_or_else(|| HemlockException::msg("truncated \\u escape"))?;
                        code = code * 16
                            + c.to_digit(16)
                                .ok_or_else(|| HemlockException::msg("invalid \\u escape"))?;
                    }
                    out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                }
                _ => return Err(HemlockException::msg("invalid escape in JSON string")),
            },
            Some((_, c)) => out.push(c),
            None => return Err(HemlockException::msg("unterminated JSON string")),
        }
        let _ = src;
    }
}

fn parse_number(src: &str, chars: &mut Chars) -> EvalResult<Value> {
    let start = chars.peek().unwrap().0;
    let mut end = start;
    let mut is_float = false;
    while let Some(&(i, c)) = chars.peek() {
        if c.is_ascii_digit() || c == '-' || c == '+' {
            end = i + c.len_utf8();
            chars.next();
        } else if c == '.' || c == 'e' || c == 'E' {
            is_float = true;
            end = i + c.len_utf8();
            chars.next();
        } else {
            break;
        }
    }
    let text = &src[start..end];
    if is_float {
        let f: f64 = text
            .parse()
            .map_err(|_| HemlockException::msg(format!("invalid JSON number '{text}'")))?;
        Ok(Value::F64(f))
    } else {
        let n: i64 = text
            .parse()
            .map_err(|_| HemlockException::msg(format!("invalid JSON number '{text}'")))?;
        if let Ok(small) = i32::try_from(n) {
            Ok(Value::I32(small))
        } else {
            Ok(Value::I64(n))
        }
    }
}

fn parse_array(src: &str, chars: &mut Chars) -> EvalResult<Value> {
    chars.next(); // '['
    let mut items = Vec::new();
    skip_ws(src, chars);
    if let Some((_, ']')) = chars.peek().copied() {
        chars.next();
        return Ok(Value::Array(HArray::new(items)));
    }
    loop {
        items.push(parse_value(src, chars)?);
        skip_ws(src, chars);
        match chars.next() {
            Some((_, ',')) => continue,
            Some((_, ']')) => break,
            _ => return Err(HemlockException::msg("expected ',' or ']' in JSON array")),
        }
    }
    Ok(Value::Array(HArray::new(items)))
}

fn parse_object(src: &str, chars: &mut Chars) -> EvalResult<Value> {
    chars.next(); // '{'
    let mut fields = Vec::new();
    skip_ws(src, chars);
    if let Some((_, '}')) = chars.peek().copied() {
        chars.next();
        return Ok(Value::Object(HObject::new(ObjectData::new(None, fields))));
    }
    loop {
        skip_ws(src, chars);
        let key = parse_string(src, chars)?;
        skip_ws(src, chars);
        match chars.next() {
            Some((_, ':')) => {}
            _ => return Err(HemlockException::msg("expected ':' in JSON object")),
        }
        let value = parse_value(src, chars)?;
        fields.push((key, value));
        skip_ws(src, chars);
        match chars.next() {
            Some((_, ',')) => continue,
            Some((_, '}')) => break,
            _ => return Err(HemlockException::msg("expected ',' or '}' in JSON object")),
        }
    }
    Ok(Value::Object(HObject::new(ObjectData::new(None, fields))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_acyclic_nested_structure() {
        let arr = Value::Array(HArray::new(vec![Value::I32(1), Value::string("hi"), Value::Bool(true)]));
        let obj = Value::Object(HObject::new(ObjectData::new(
            None,
            vec![("a".into(), arr), ("b".into(), Value::Null)],
        )));
        let json = serialize(&obj).unwrap();
        let parsed = deserialize(&json).unwrap();
        let reserialized = serialize(&parsed).unwrap();
        assert_eq!(json, reserialized);
    }

    #[test]
    fn cyclic_array_is_rejected() {
        let arr = HArray::new(vec![]);
        arr.write().push(Value::Array(arr.clone()));
        let err = serialize(&Value::Array(arr)).unwrap_err();
        assert!(err.to_string().contains("cyclic"));
    }

    #[test]
    fn object_preserves_field_insertion_order() {
        let obj = ObjectData::new(None, vec![("z".into(), Value::I32(1)), ("a".into(), Value::I32(2))]);
        let json = serialize(&Value::Object(HObject::new(obj))).unwrap();
        assert_eq!(json, r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn deserialize_preserves_escapes() {
        let v = deserialize(r#""line1\nline2\ttab""#).unwrap();
        match v {
            Value::String(s) => assert_eq!(s.read().as_str_lossy(), "line1\nline2\ttab"),
            _ => panic!("expected string"),
        }
    }

    #[test]
    fn integer_literal_prefers_i32_over_i64() {
        assert_eq!(deserialize("42").unwrap(), Value::I32(42));
        assert_eq!(deserialize("9999999999").unwrap(), Value::I64(9999999999));
        assert_eq!(deserialize("3.5").unwrap(), Value::F64(3.5));
    }
}
