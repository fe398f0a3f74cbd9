//! Object method dispatch table (§4.7).

use hemlock_core::{EvalResult, HObject, HemlockException, Value};

pub fn dispatch(object: &HObject, method: &str, _args: Vec<Value>) -> EvalResult<Value> {
    match method {
        "serialize" => hemlock_core::json::serialize(&Value::Object(object.clone())).map(Value::string),
        other => Err(HemlockException::msg(format!("object has no method '{other}'"))),
    }
}
