//! Array method dispatch table (§4.7).

use hemlock_core::{EvalResult, HArray, HemlockException, Value};

pub const METHODS: &[&str] = &[
    "push", "pop", "shift", "unshift", "insert", "remove", "find", "slice", "join", "concat",
    "reverse", "first", "last", "clear", "contains",
];

pub fn dispatch(array: &HArray, method: &str, mut args: Vec<Value>) -> EvalResult<Value> {
    match method {
        "push" => {
            array.write().extend(args);
            Ok(Value::I32(array.len() as i32))
        }
        "pop" => Ok(array.write().pop().unwrap_or(Value::Null)),
        "shift" => {
            let mut items = array.write();
            if items.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(items.remove(0))
            }
        }
        "unshift" => {
            let mut items = array.write();
            for (i, v) in args.into_iter().enumerate() {
                items.insert(i, v);
            }
            Ok(Value::I32(items.len() as i32))
        }
        "insert" => {
            let index = index_arg(&mut args, 0, "insert")?;
            let value = args.into_iter().next().unwrap_or(Value::Null);
            let mut items = array.write();
            let index = index.min(items.len());
            items.insert(index, value);
            Ok(Value::Null)
        }
        "remove" => {
            let index = index_arg(&mut args, 0, "remove")?;
            let mut items = array.write();
            if index >= items.len() {
                return Err(HemlockException::msg("remove index out of bounds"));
            }
            Ok(items.remove(index))
        }
        "find" => {
            let needle = args.into_iter().next().unwrap_or(Value::Null);
            let items = array.read();
            Ok(match items.iter().position(|v| crate::eval::values_equal(v, &needle)) {
                Some(i) => Value::I32(i as i32),
                None => Value::I32(-1),
            })
        }
        "contains" => {
            let needle = args.into_iter().next().unwrap_or(Value::Null);
            let items = array.read();
            Ok(Value::Bool(
                items.iter().any(|v| crate::eval::values_equal(v, &needle)),
            ))
        }
        "slice" => {
            let items = array.read();
            let start = match args.first() {
                Some(v) => v.as_i64().unwrap_or(0).max(0) as usize,
                None => 0,
            };
            let end = match args.get(1) {
                Some(v) => (v.as_i64().unwrap_or(items.len() as i64).max(0) as usize).min(items.len()),
                None => items.len(),
            };
            let start = start.min(end);
            Ok(Value::Array(HArray::new(items[start..end].to_vec())))
        }
        "join" => {
            let sep = match args.first() {
                Some(Value::String(s)) => s.read().as_str_lossy().into_owned(),
                Some(_) => return Err(HemlockException::msg("join requires a string separator")),
                None => ",".to_string(),
            };
            let items = array.read();
            let joined = items
                .iter()
                .map(crate::eval::display_value)
                .collect::<Vec<_>>()
                .join(&sep);
            Ok(Value::string(joined))
        }
        "concat" => {
            let mut items = array.read().clone();
            for other in args {
                match other {
                    Value::Array(a) => items.extend(a.read().clone()),
                    other => return Err(HemlockException::msg(format!(
                        "concat requires arrays, got '{}'",
                        other.type_name()
                    ))),
                }
            }
            Ok(Value::Array(HArray::new(items)))
        }
        "reverse" => {
            array.write().reverse();
            Ok(Value::Null)
        }
        "first" => Ok(array.read().first().cloned().unwrap_or(Value::Null)),
        "last" => Ok(array.read().last().cloned().unwrap_or(Value::Null)),
        "clear" => {
            array.write().clear();
            Ok(Value::Null)
        }
        other => Err(HemlockException::msg(format!("array has no method '{other}'"))),
    }
}

fn index_arg(args: &mut Vec<Value>, i: usize, caller: &str) -> EvalResult<usize> {
    args.get(i)
        .and_then(|v| v.as_i64())
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| HemlockException::msg(format!("{caller} requires a non-negative integer index")))
}
