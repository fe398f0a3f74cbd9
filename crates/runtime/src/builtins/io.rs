//! File method dispatch table (§4.7).

use hemlock_core::{EvalResult, HBuffer, HFile, HemlockException, Value};

use crate::interpreter::SharedInterpreter;

pub const METHODS: &[&str] = &["read_text", "read_bytes", "write", "seek", "tell", "close"];

pub fn dispatch(
    _interp: &SharedInterpreter,
    file: &HFile,
    method: &str,
    mut args: Vec<Value>,
) -> EvalResult<Value> {
    let mut f = file.lock().expect("file lock poisoned");
    match method {
        "read_text" => {
            let n = match args.first() {
                Some(v) => v.as_i64().unwrap_or(4096).max(0) as usize,
                None => 4096,
            };
            f.read_text(n).map(Value::string).map_err(to_exception)
        }
        "read_bytes" => {
            let n = match args.first() {
                Some(v) => v.as_i64().unwrap_or(4096).max(0) as usize,
                None => 4096,
            };
            f.read_bytes(n)
                .map(|bytes| Value::Buffer(HBuffer::new(bytes)))
                .map_err(to_exception)
        }
        "write" => {
            let data = match args.first() {
                Some(Value::String(s)) => s.read().bytes().to_vec(),
                Some(Value::Buffer(b)) => b.read().clone(),
                _ => return Err(HemlockException::msg("write requires a string or buffer")),
            };
            f.write(&data).map(|n| Value::I64(n as i64)).map_err(to_exception)
        }
        "seek" => {
            let offset = args
                .first()
                .and_then(|v| v.as_i64())
                .ok_or_else(|| HemlockException::msg("seek requires an integer offset"))?;
            f.seek(offset).map(|n| Value::I64(n as i64)).map_err(to_exception)
        }
        "tell" => f.tell().map(|n| Value::I64(n as i64)).map_err(to_exception),
        "close" => {
            f.close();
            Ok(Value::Null)
        }
        other => {
            let _ = args.pop();
            Err(HemlockException::msg(format!("file has no method '{other}'")))
        }
    }
}

fn to_exception(e: hemlock_core::FileError) -> HemlockException {
    HemlockException::msg(e.to_string())
}
