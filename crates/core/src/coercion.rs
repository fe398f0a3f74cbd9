//! Numeric rank promotion and `convert_to_type` (§4.3).

use crate::error::{EvalResult, HemlockException};
use crate::objectdata::{ObjectData, ObjectShape};
use crate::value::{NumRank, TypeDescriptor, Value};

/// The common rank two operands promote to for binary arithmetic/comparison
/// (§4.3): the higher of the two ranks on the total order
/// i8<u8<i16<u16<i32<u32<i64<u64<f32<f64, except that a signed/unsigned
/// mixed comparison promotes to the signed side if any operand is signed.
pub fn promote_rank(a: NumRank, b: NumRank, for_comparison: bool) -> NumRank {
    let naive = a.max(b);
    if for_comparison && !naive.is_float() && (a.is_signed() || b.is_signed()) && !naive.is_signed()
    {
        return signed_floor_for(naive);
    }
    naive
}

/// The smallest signed rank that can represent every value of `rank`,
/// used when a signed/unsigned comparison would otherwise promote to an
/// unsigned rank that can't hold a negative signed operand.
fn signed_floor_for(rank: NumRank) -> NumRank {
    match rank {
        NumRank::U8 => NumRank::I16,
        NumRank::U16 => NumRank::I32,
        NumRank::U32 => NumRank::I64,
        NumRank::U64 => NumRank::I64,
        other => other,
    }
}

/// Materialize a promoted numeric `Value` at the given rank, from an f64
/// magnitude. Used by the evaluator's binary-arithmetic implementation
/// after promotion.
pub fn value_at_rank(rank: NumRank, f: f64) -> Value {
    match rank {
        NumRank::I8 => Value::I8(f as i64 as i8),
        NumRank::U8 => Value::U8(f as i64 as u8),
        NumRank::I16 => Value::I16(f as i64 as i16),
        NumRank::U16 => Value::U16(f as i64 as u16),
        NumRank::I32 => Value::I32(f as i64 as i32),
        NumRank::U32 => Value::U32(f as i64 as u32),
        NumRank::I64 => Value::I64(f as i64),
        NumRank::U64 => Value::U64(f as i64 as u64),
        NumRank::F32 => Value::F32(f as f32),
        NumRank::F64 => Value::F64(f),
    }
}

/// Materialize an integer `Value` at `rank` from an exact `i128`
/// magnitude, truncating/reinterpreting bits per the target width (two's
/// complement wraparound, matching §4.3's "wrapping semantics for
/// integer arithmetic"). Used by binary-arithmetic evaluation, which
/// carries operands as `i128` rather than `f64` to avoid losing
/// precision on `i64`/`u64` operands.
pub fn int_at_rank(rank: NumRank, n: i128) -> Value {
    match rank {
        NumRank::I8 => Value::I8(n as i8),
        NumRank::U8 => Value::U8(n as u8),
        NumRank::I16 => Value::I16(n as i16),
        NumRank::U16 => Value::U16(n as u16),
        NumRank::I32 => Value::I32(n as i32),
        NumRank::U32 => Value::U32(n as u32),
        NumRank::I64 => Value::I64(n as i64),
        NumRank::U64 => Value::U64(n as u64),
        NumRank::F32 | NumRank::F64 => unreachable!("int_at_rank called with a float rank"),
    }
}

/// Exact integer magnitude of a numeric `Value`, zero/sign-extended into
/// `i128` so unsigned `u64` operands don't lose range the way a cast
/// through `i64` would.
pub fn int_value(value: &Value) -> Option<i128> {
    Some(match value {
        Value::I8(n) => *n as i128,
        Value::I16(n) => *n as i128,
        Value::I32(n) => *n as i128,
        Value::I64(n) => *n as i128,
        Value::U8(n) => *n as i128,
        Value::U16(n) => *n as i128,
        Value::U32(n) => *n as i128,
        Value::U64(n) => *n as i128,
        _ => return None,
    })
}

/// Range for each integer rank, used by `convert_to_type`'s range check.
fn int_range(desc: &TypeDescriptor) -> Option<(i128, i128)> {
    Some(match desc {
        TypeDescriptor::I8 => (i8::MIN as i128, i8::MAX as i128),
        TypeDescriptor::U8 => (u8::MIN as i128, u8::MAX as i128),
        TypeDescriptor::I16 => (i16::MIN as i128, i16::MAX as i128),
        TypeDescriptor::U16 => (u16::MIN as i128, u16::MAX as i128),
        TypeDescriptor::I32 => (i32::MIN as i128, i32::MAX as i128),
        TypeDescriptor::U32 => (u32::MIN as i128, u32::MAX as i128),
        TypeDescriptor::I64 => (i64::MIN as i128, i64::MAX as i128),
        TypeDescriptor::U64 => (u64::MIN as i128, u64::MAX as i128),
        _ => return None,
    })
}

fn make_int(desc: &TypeDescriptor, n: i128) -> Value {
    match desc {
        TypeDescriptor::I8 => Value::I8(n as i8),
        TypeDescriptor::U8 => Value::U8(n as u8),
        TypeDescriptor::I16 => Value::I16(n as i16),
        TypeDescriptor::U16 => Value::U16(n as u16),
        TypeDescriptor::I32 => Value::I32(n as i32),
        TypeDescriptor::U32 => Value::U32(n as u32),
        TypeDescriptor::I64 => Value::I64(n as i64),
        TypeDescriptor::U64 => Value::U64(n as u64),
        _ => unreachable!(),
    }
}

fn type_name_str(desc: &TypeDescriptor) -> &'static str {
    match desc {
        TypeDescriptor::I8 => "i8",
        TypeDescriptor::I16 => "i16",
        TypeDescriptor::I32 => "i32",
        TypeDescriptor::I64 => "i64",
        TypeDescriptor::U8 => "u8",
        TypeDescriptor::U16 => "u16",
        TypeDescriptor::U32 => "u32",
        TypeDescriptor::U64 => "u64",
        TypeDescriptor::F32 => "f32",
        TypeDescriptor::F64 => "f64",
        TypeDescriptor::Bool => "bool",
        TypeDescriptor::Null => "null",
        TypeDescriptor::Rune => "rune",
        TypeDescriptor::String => "string",
        TypeDescriptor::Buffer => "buffer",
        TypeDescriptor::Ptr => "ptr",
        TypeDescriptor::Array => "array",
        TypeDescriptor::Function => "function",
        TypeDescriptor::Object(_) => "object",
        TypeDescriptor::Any => "any",
    }
}

/// `convert_to_type(value, kind)` (§4.3): the core of parameter binding,
/// `let`/`const` annotations, and return-value coercion. Does not handle
/// the declared-object-type case (`TypeDescriptor::Object`) — callers
/// should route that through `validate_object_shape` instead, since it
/// needs an `ObjectShape` registry and a validation environment that this
/// function has no access to.
pub fn convert_to_type(value: Value, kind: &TypeDescriptor) -> EvalResult<Value> {
    match kind {
        TypeDescriptor::Any => Ok(value),
        TypeDescriptor::Bool => match value {
            Value::Bool(_) => Ok(value),
            _ => Err(type_error(&value, kind)),
        },
        TypeDescriptor::Null => match value {
            Value::Null => Ok(value),
            _ => Err(type_error(&value, kind)),
        },
        TypeDescriptor::Rune => match value {
            Value::Rune(_) => Ok(value),
            _ => Err(type_error(&value, kind)),
        },
        TypeDescriptor::String => match value {
            Value::String(_) => Ok(value),
            _ => Err(type_error(&value, kind)),
        },
        TypeDescriptor::Buffer => match value {
            Value::Buffer(_) => Ok(value),
            _ => Err(type_error(&value, kind)),
        },
        TypeDescriptor::Ptr => match value {
            Value::Ptr(_) => Ok(value),
            _ => Err(type_error(&value, kind)),
        },
        TypeDescriptor::Array => match value {
            Value::Array(_) => Ok(value),
            _ => Err(type_error(&value, kind)),
        },
        TypeDescriptor::Function => match value {
            Value::Function(_) | Value::Builtin(_) | Value::FfiFunction(_) => Ok(value),
            _ => Err(type_error(&value, kind)),
        },
        TypeDescriptor::F32 | TypeDescriptor::F64 => convert_to_float(value, kind),
        TypeDescriptor::I8
        | TypeDescriptor::U8
        | TypeDescriptor::I16
        | TypeDescriptor::U16
        | TypeDescriptor::I32
        | TypeDescriptor::U32
        | TypeDescriptor::I64
        | TypeDescriptor::U64 => convert_to_int(value, kind),
        TypeDescriptor::Object(_) => Err(HemlockException::msg(
            "object types must be converted via validate_object_shape",
        )),
    }
}

fn convert_to_float(value: Value, kind: &TypeDescriptor) -> EvalResult<Value> {
    let f = match &value {
        Value::F32(n) => *n as f64,
        Value::F64(n) => *n,
        v if v.is_numeric() => v.as_f64().unwrap(),
        _ => return Err(type_error(&value, kind)),
    };
    Ok(match kind {
        TypeDescriptor::F32 => Value::F32(f as f32),
        TypeDescriptor::F64 => Value::F64(f),
        _ => unreachable!(),
    })
}

/// Integer target: integer→integer performs a range check; float→integer
/// truncates then range-checks (§4.3).
fn convert_to_int(value: Value, kind: &TypeDescriptor) -> EvalResult<Value> {
    let (lo, hi) = int_range(kind).unwrap();
    let n: i128 = match &value {
        Value::F32(f) => *f as i128,
        Value::F64(f) => *f as i128,
        v if v.is_numeric() => v.as_i64().unwrap() as i128,
        _ => return Err(type_error(&value, kind)),
    };
    if n < lo || n > hi {
        return Err(HemlockException::msg(format!(
            "value {n} out of range for {}",
            type_name_str(kind)
        )));
    }
    Ok(make_int(kind, n))
}

fn type_error(value: &Value, kind: &TypeDescriptor) -> HemlockException {
    HemlockException::msg(format!(
        "cannot convert {} to {}",
        value.type_name(),
        type_name_str(kind)
    ))
}

/// Duck-typed object-shape validation (§4.3): every required field must
/// be present; missing optional fields materialize from their default
/// expression (evaluated by the caller, since it needs the evaluator) or
/// null; present fields with a primitive declared type are checked
/// against the runtime tag. On success the object is tagged with the
/// shape's name for `typeof`.
///
/// `eval_default` evaluates a field's default-value AST in the
/// validation environment; it is injected so this crate stays
/// evaluator-agnostic.
pub fn validate_object_shape(
    shape: &ObjectShape,
    mut data: ObjectData,
    mut eval_default: impl FnMut(&crate::ast::Expr) -> EvalResult<Value>,
) -> EvalResult<ObjectData> {
    for field in &shape.fields {
        match data.get(&field.name).cloned() {
            Some(value) => {
                if let Some(desc) = &field.type_desc {
                    if is_primitive(desc) {
                        let converted = convert_to_type(value, desc)?;
                        data.set(&field.name, converted);
                    }
                }
            }
            None => {
                if field.required {
                    return Err(HemlockException::msg(format!(
                        "missing required field '{}' for type '{}'",
                        field.name, shape.name
                    )));
                }
                let default = match &field.default {
                    Some(expr) => eval_default(expr)?,
                    None => Value::Null,
                };
                data.set(&field.name, default);
            }
        }
    }
    data.type_name = Some(shape.name.clone());
    Ok(data)
}

fn is_primitive(desc: &TypeDescriptor) -> bool {
    !matches!(desc, TypeDescriptor::Object(_) | TypeDescriptor::Any)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u8_rejects_out_of_range() {
        let err = convert_to_type(Value::I32(256), &TypeDescriptor::U8).unwrap_err();
        assert!(err.to_string().contains("out of range for u8"));
    }

    #[test]
    fn float_to_int_truncates_then_range_checks() {
        let v = convert_to_type(Value::F64(41.9), &TypeDescriptor::I32).unwrap();
        assert_eq!(v, Value::I32(41));
    }

    #[test]
    fn int_to_float_widens() {
        let v = convert_to_type(Value::I32(3), &TypeDescriptor::F64).unwrap();
        assert_eq!(v, Value::F64(3.0));
    }

    #[test]
    fn object_shape_fills_default_for_missing_optional_field() {
        let shape = ObjectShape {
            name: "Point".into(),
            fields: vec![
                crate::objectdata::FieldDescriptor {
                    name: "x".into(),
                    type_desc: Some(TypeDescriptor::I32),
                    required: true,
                    default: None,
                },
                crate::objectdata::FieldDescriptor {
                    name: "y".into(),
                    type_desc: Some(TypeDescriptor::I32),
                    required: false,
                    default: None,
                },
            ],
        };
        let data = ObjectData::new(None, vec![("x".into(), Value::I32(1))]);
        let validated = validate_object_shape(&shape, data, |_| Ok(Value::Null)).unwrap();
        assert_eq!(validated.get("y"), Some(&Value::Null));
        assert_eq!(validated.type_name, Some("Point".to_string()));
    }

    #[test]
    fn object_shape_throws_on_missing_required_field() {
        let shape = ObjectShape {
            name: "Point".into(),
            fields: vec![crate::objectdata::FieldDescriptor {
                name: "x".into(),
                type_desc: None,
                required: true,
                default: None,
            }],
        };
        let data = ObjectData::default();
        assert!(validate_object_shape(&shape, data, |_| Ok(Value::Null)).is_err());
    }
}
