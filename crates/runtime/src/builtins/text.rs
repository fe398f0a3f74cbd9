//! String method dispatch table (§4.7).

use hemlock_core::{EvalResult, HArray, HString, HemlockException, Value};

pub const METHODS: &[&str] = &[
    "substr",
    "slice",
    "find",
    "contains",
    "split",
    "trim",
    "to_upper",
    "to_lower",
    "starts_with",
    "ends_with",
    "replace",
    "replace_all",
    "repeat",
    "char_at",
    "chars",
    "bytes",
    "byte_at",
    "to_bytes",
];

pub fn dispatch(string: &HString, method: &str, mut args: Vec<Value>) -> EvalResult<Value> {
    match method {
        "substr" => {
            let text = string.read().as_str_lossy().into_owned();
            let chars: Vec<char> = text.chars().collect();
            let start = usize_arg(&mut args, 0, "substr")?.min(chars.len());
            let len = match args.first() {
                Some(v) => v.as_i64().unwrap_or(0).max(0) as usize,
                None => chars.len() - start,
            };
            let end = (start + len).min(chars.len());
            Ok(Value::string(chars[start..end].iter().collect::<String>()))
        }
        "slice" => {
            let text = string.read().as_str_lossy().into_owned();
            let chars: Vec<char> = text.chars().collect();
            let start = match args.first() {
                Some(v) => v.as_i64().unwrap_or(0).max(0) as usize,
                None => 0,
            }
            .min(chars.len());
            let end = match args.get(1) {
                Some(v) => (v.as_i64().unwrap_or(chars.len() as i64).max(0) as usize).min(chars.len()),
                None => chars.len(),
            };
            let start = start.min(end);
            Ok(Value::string(chars[start..end].iter().collect::<String>()))
        }
        "find" => {
            let needle = expect_string(&arg(&mut args, 0, "find")?)?;
            let text = string.read().as_str_lossy().into_owned();
            Ok(match text.find(&needle) {
                Some(byte_idx) => Value::I32(text[..byte_idx].chars().count() as i32),
                None => Value::I32(-1),
            })
        }
        "contains" => {
            let needle = expect_string(&arg(&mut args, 0, "contains")?)?;
            let text = string.read().as_str_lossy().into_owned();
            Ok(Value::Bool(text.contains(&needle)))
        }
        "starts_with" => {
            let needle = expect_string(&arg(&mut args, 0, "starts_with")?)?;
            Ok(Value::Bool(string.read().as_str_lossy().starts_with(&needle)))
        }
        "ends_with" => {
            let needle = expect_string(&arg(&mut args, 0, "ends_with")?)?;
            Ok(Value::Bool(string.read().as_str_lossy().ends_with(&needle)))
        }
        "split" => {
            let sep = expect_string(&arg(&mut args, 0, "split")?)?;
            let text = string.read().as_str_lossy().into_owned();
            let parts: Vec<Value> = if sep.is_empty() {
                text.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                text.split(&sep as &str).map(Value::string).collect()
            };
            Ok(Value::Array(HArray::new(parts)))
        }
        "trim" => Ok(Value::string(string.read().as_str_lossy().trim().to_string())),
        "to_upper" => Ok(Value::string(string.read().as_str_lossy().to_uppercase())),
        "to_lower" => Ok(Value::string(string.read().as_str_lossy().to_lowercase())),
        "replace" => {
            let from = expect_string(&arg(&mut args, 0, "replace")?)?;
            let to = expect_string(&arg(&mut args, 1, "replace")?)?;
            let text = string.read().as_str_lossy().into_owned();
            Ok(Value::string(text.replacen(&from, &to, 1)))
        }
        "replace_all" => {
            let from = expect_string(&arg(&mut args, 0, "replace_all")?)?;
            let to = expect_string(&arg(&mut args, 1, "replace_all")?)?;
            let text = string.read().as_str_lossy().into_owned();
            Ok(Value::string(text.replace(&from, &to)))
        }
        "repeat" => {
            let n = usize_arg(&mut args, 0, "repeat")?;
            Ok(Value::string(string.read().as_str_lossy().repeat(n)))
        }
        "char_at" => {
            let index = usize_arg(&mut args, 0, "char_at")?;
            Ok(match string.read().byte_at(index) {
                Some(b) => Value::U8(b),
                None => Value::Null,
            })
        }
        "chars" => {
            let text = string.read().as_str_lossy().into_owned();
            let runes = text.chars().map(Value::Rune).collect();
            Ok(Value::Array(HArray::new(runes)))
        }
        "bytes" => {
            let data = string.read().bytes().to_vec();
            Ok(Value::Buffer(hemlock_core::HBuffer::new(data)))
        }
        "to_bytes" => {
            let data = string.read().bytes().to_vec();
            let items = data.into_iter().map(Value::U8).collect();
            Ok(Value::Array(HArray::new(items)))
        }
        "byte_at" => {
            let index = usize_arg(&mut args, 0, "byte_at")?;
            Ok(match string.read().byte_at(index) {
                Some(b) => Value::U8(b),
                None => Value::Null,
            })
        }
        other => Err(HemlockException::msg(format!("string has no method '{other}'"))),
    }
}

fn arg(args: &mut Vec<Value>, index: usize, caller: &str) -> EvalResult<Value> {
    if index >= args.len() {
        return Err(HemlockException::msg(format!(
            "{caller} expects at least {} argument(s)",
            index + 1
        )));
    }
    Ok(std::mem::replace(&mut args[index], Value::Null))
}

fn expect_string(value: &Value) -> EvalResult<String> {
    match value {
        Value::String(s) => Ok(s.read().as_str_lossy().into_owned()),
        other => Err(HemlockException::msg(format!(
            "expected a string, got '{}'",
            other.type_name()
        ))),
    }
}

fn usize_arg(args: &mut Vec<Value>, index: usize, caller: &str) -> EvalResult<usize> {
    arg(args, index, caller)?
        .as_i64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| HemlockException::msg(format!("{caller} requires a non-negative integer")))
}
