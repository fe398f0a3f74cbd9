//! Decodes a `Program` from the JSON-shaped AST artifact an external
//! frontend (lexer/parser/module bundler, out of scope here per §1) hands
//! the evaluator (§6 "AST input"). Reuses `json::deserialize`'s hand-rolled
//! JSON reader rather than writing a second one: the wire shape is JSON
//! objects tagged by a `"node"` field naming the `Stmt`/`Expr` variant, so
//! decoding is just a walk over the `Value` tree `deserialize()` already
//! builds.

use crate::ast::{
    Block, CatchClause, Expr, IncDecOp, Literal, NumberLit, ObjectFieldDef, Param, Program, Stmt,
    SwitchCase, UnOp,
};
use crate::ast::{BinOp, CompoundOp};
use crate::error::{EvalResult, HemlockException};
use crate::json;
use crate::value::{TypeDescriptor, Value};

pub fn program_from_json(text: &str) -> EvalResult<Program> {
    let root = json::deserialize(text)?;
    let fields = obj_fields(&root)?;
    let statements = arr_items(get(&fields, "statements")?)?
        .iter()
        .map(stmt_from_value)
        .collect::<EvalResult<Vec<_>>>()?;
    Ok(Program { statements })
}

// --- JSON tree helpers --------------------------------------------------

fn obj_fields(v: &Value) -> EvalResult<Vec<(String, Value)>> {
    match v {
        Value::Object(o) => Ok(o.read().fields().to_vec()),
        other => Err(bad(other, "object")),
    }
}

fn arr_items(v: &Value) -> EvalResult<Vec<Value>> {
    match v {
        Value::Array(a) => Ok(a.read().clone()),
        other => Err(bad(other, "array")),
    }
}

fn str_value(v: &Value) -> EvalResult<String> {
    match v {
        Value::String(s) => Ok(s.read().as_str_lossy().into_owned()),
        other => Err(bad(other, "string")),
    }
}

fn bad(v: &Value, expected: &str) -> HemlockException {
    HemlockException::msg(format!(
        "malformed AST artifact: expected a JSON {expected}, got '{}'",
        v.type_name()
    ))
}

fn get<'a>(fields: &'a [(String, Value)], name: &str) -> EvalResult<&'a Value> {
    fields
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v)
        .ok_or_else(|| HemlockException::msg(format!("malformed AST artifact: missing field '{name}'")))
}

fn opt<'a>(fields: &'a [(String, Value)], name: &str) -> Option<&'a Value> {
    fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

fn tag(fields: &[(String, Value)]) -> EvalResult<String> {
    str_value(get(fields, "node")?)
}

fn line_of(fields: &[(String, Value)]) -> crate::ast::Line {
    opt(fields, "line").and_then(|v| v.as_i64()).map(|n| n as u32)
}

fn node_fields(v: &Value) -> EvalResult<Vec<(String, Value)>> {
    obj_fields(v)
}

fn type_desc_of(fields: &[(String, Value)], name: &str) -> EvalResult<Option<TypeDescriptor>> {
    match opt(fields, name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => Ok(Some(parse_type_descriptor(&str_value(v)?)?)),
    }
}

fn parse_type_descriptor(name: &str) -> EvalResult<TypeDescriptor> {
    use TypeDescriptor::*;
    Ok(match name {
        "i8" => I8,
        "i16" => I16,
        "i32" => I32,
        "i64" => I64,
        "u8" => U8,
        "u16" => U16,
        "u32" => U32,
        "u64" => U64,
        "f32" => F32,
        "f64" => F64,
        "bool" => Bool,
        "null" => Null,
        "rune" => Rune,
        "string" => String,
        "buffer" => Buffer,
        "ptr" => Ptr,
        "array" => Array,
        "function" => Function,
        "any" => Any,
        other => Object(other.to_string()),
    })
}

// --- Expr ---------------------------------------------------------------

fn expr_from_value(v: &Value) -> EvalResult<Expr> {
    let fields = node_fields(v)?;
    let line = line_of(&fields);
    Ok(match tag(&fields)?.as_str() {
        "Literal" => Expr::Literal(literal_from_value(get(&fields, "value")?)?, line),
        "Ident" => Expr::Ident(str_value(get(&fields, "name")?)?, line),
        "Unary" => Expr::Unary(
            unop_from_str(&str_value(get(&fields, "op")?)?)?,
            Box::new(expr_from_value(get(&fields, "operand")?)?),
            line,
        ),
        "Binary" => Expr::Binary(
            binop_from_str(&str_value(get(&fields, "op")?)?)?,
            Box::new(expr_from_value(get(&fields, "left")?)?),
            Box::new(expr_from_value(get(&fields, "right")?)?),
            line,
        ),
        "Ternary" => Expr::Ternary(
            Box::new(expr_from_value(get(&fields, "cond")?)?),
            Box::new(expr_from_value(get(&fields, "then")?)?),
            Box::new(expr_from_value(get(&fields, "otherwise")?)?),
            line,
        ),
        "Assign" => Expr::Assign(
            Box::new(expr_from_value(get(&fields, "target")?)?),
            Box::new(expr_from_value(get(&fields, "value")?)?),
            line,
        ),
        "CompoundAssign" => Expr::CompoundAssign(
            compound_op_from_str(&str_value(get(&fields, "op")?)?)?,
            Box::new(expr_from_value(get(&fields, "target")?)?),
            Box::new(expr_from_value(get(&fields, "value")?)?),
            line,
        ),
        "IncDec" => Expr::IncDec(
            incdec_from_str(&str_value(get(&fields, "op")?)?)?,
            Box::new(expr_from_value(get(&fields, "target")?)?),
            line,
        ),
        "Index" => Expr::Index(
            Box::new(expr_from_value(get(&fields, "target")?)?),
            Box::new(expr_from_value(get(&fields, "index")?)?),
            line,
        ),
        "IndexAssign" => Expr::IndexAssign(
            Box::new(expr_from_value(get(&fields, "target")?)?),
            Box::new(expr_from_value(get(&fields, "index")?)?),
            Box::new(expr_from_value(get(&fields, "value")?)?),
            line,
        ),
        "GetProperty" => Expr::GetProperty(
            Box::new(expr_from_value(get(&fields, "target")?)?),
            str_value(get(&fields, "name")?)?,
            line,
        ),
        "SetProperty" => Expr::SetProperty(
            Box::new(expr_from_value(get(&fields, "target")?)?),
            str_value(get(&fields, "name")?)?,
            Box::new(expr_from_value(get(&fields, "value")?)?),
            line,
        ),
        "Call" => Expr::Call(
            Box::new(expr_from_value(get(&fields, "callee")?)?),
            arr_items(get(&fields, "args")?)?
                .iter()
                .map(expr_from_value)
                .collect::<EvalResult<_>>()?,
            line,
        ),
        "Function" => Expr::Function {
            name: match opt(&fields, "name") {
                Some(Value::Null) | None => None,
                Some(v) => Some(str_value(v)?),
            },
            params: params_from_value(get(&fields, "params")?)?,
            return_type: type_desc_of(&fields, "return_type")?,
            is_async: matches!(opt(&fields, "is_async"), Some(Value::Bool(true))),
            body: std::sync::Arc::new(block_from_value(get(&fields, "body")?)?),
            line,
        },
        "ArrayLiteral" => Expr::ArrayLiteral(
            arr_items(get(&fields, "items")?)?
                .iter()
                .map(expr_from_value)
                .collect::<EvalResult<_>>()?,
            line,
        ),
        "ObjectLiteral" => Expr::ObjectLiteral(
            arr_items(get(&fields, "fields")?)?
                .iter()
                .map(|entry| {
                    let entry = node_fields(entry)?;
                    Ok((str_value(get(&entry, "name")?)?, expr_from_value(get(&entry, "value")?)?))
                })
                .collect::<EvalResult<_>>()?,
            line,
        ),
        "Await" => Expr::Await(Box::new(expr_from_value(get(&fields, "value")?)?), line),
        other => return Err(HemlockException::msg(format!("unknown expression node '{other}'"))),
    })
}

fn literal_from_value(v: &Value) -> EvalResult<Literal> {
    let fields = node_fields(v)?;
    Ok(match tag(&fields)?.as_str() {
        "Int" => Literal::Number(NumberLit::Int(
            get(&fields, "value")?
                .as_i64()
                .ok_or_else(|| HemlockException::msg("malformed integer literal"))?,
        )),
        "Float" => Literal::Number(NumberLit::Float(
            get(&fields, "value")?
                .as_f64()
                .ok_or_else(|| HemlockException::msg("malformed float literal"))?,
        )),
        "Bool" => Literal::Bool(matches!(get(&fields, "value")?, Value::Bool(true))),
        "Null" => Literal::Null,
        "Str" => Literal::Str(str_value(get(&fields, "value")?)?),
        "Rune" => Literal::Rune(
            str_value(get(&fields, "value")?)?
                .chars()
                .next()
                .ok_or_else(|| HemlockException::msg("empty rune literal"))?,
        ),
        other => return Err(HemlockException::msg(format!("unknown literal kind '{other}'"))),
    })
}

fn params_from_value(v: &Value) -> EvalResult<Vec<Param>> {
    arr_items(v)?
        .iter()
        .map(|p| {
            let fields = node_fields(p)?;
            Ok(Param {
                name: str_value(get(&fields, "name")?)?,
                type_desc: type_desc_of(&fields, "type_desc")?,
            })
        })
        .collect()
}

fn unop_from_str(s: &str) -> EvalResult<UnOp> {
    Ok(match s {
        "neg" | "Neg" => UnOp::Neg,
        "not" | "Not" => UnOp::Not,
        other => return Err(HemlockException::msg(format!("unknown unary op '{other}'"))),
    })
}

fn binop_from_str(s: &str) -> EvalResult<BinOp> {
    use BinOp::*;
    Ok(match s {
        "+" | "Add" => Add,
        "-" | "Sub" => Sub,
        "*" | "Mul" => Mul,
        "/" | "Div" => Div,
        "%" | "Mod" => Mod,
        "==" | "Eq" => Eq,
        "!=" | "NotEq" => NotEq,
        "<" | "Lt" => Lt,
        "<=" | "LtEq" => LtEq,
        ">" | "Gt" => Gt,
        ">=" | "GtEq" => GtEq,
        "&&" | "And" => And,
        "||" | "Or" => Or,
        other => return Err(HemlockException::msg(format!("unknown binary op '{other}'"))),
    })
}

fn compound_op_from_str(s: &str) -> EvalResult<CompoundOp> {
    Ok(match s {
        "+=" | "Add" => CompoundOp::Add,
        "-=" | "Sub" => CompoundOp::Sub,
        "*=" | "Mul" => CompoundOp::Mul,
        "/=" | "Div" => CompoundOp::Div,
        other => return Err(HemlockException::msg(format!("unknown compound op '{other}'"))),
    })
}

fn incdec_from_str(s: &str) -> EvalResult<IncDecOp> {
    Ok(match s {
        "++pre" | "PreInc" => IncDecOp::PreInc,
        "--pre" | "PreDec" => IncDecOp::PreDec,
        "++post" | "PostInc" => IncDecOp::PostInc,
        "--post" | "PostDec" => IncDecOp::PostDec,
        other => return Err(HemlockException::msg(format!("unknown inc/dec op '{other}'"))),
    })
}

// --- Stmt / Block ---------------------------------------------------------

fn block_from_value(v: &Value) -> EvalResult<Block> {
    Ok(Block(
        arr_items(v)?.iter().map(stmt_from_value).collect::<EvalResult<_>>()?,
    ))
}

fn stmt_from_value(v: &Value) -> EvalResult<Stmt> {
    let fields = node_fields(v)?;
    let line = line_of(&fields);
    Ok(match tag(&fields)?.as_str() {
        "Let" => Stmt::Let {
            name: str_value(get(&fields, "name")?)?,
            type_desc: type_desc_of(&fields, "type_desc")?,
            value: match opt(&fields, "value") {
                None | Some(Value::Null) => None,
                Some(v) => Some(expr_from_value(v)?),
            },
            line,
        },
        "Const" => Stmt::Const {
            name: str_value(get(&fields, "name")?)?,
            type_desc: type_desc_of(&fields, "type_desc")?,
            value: expr_from_value(get(&fields, "value")?)?,
            line,
        },
        "Expr" => Stmt::Expr(expr_from_value(get(&fields, "value")?)?),
        "If" => Stmt::If {
            cond: expr_from_value(get(&fields, "cond")?)?,
            then_branch: block_from_value(get(&fields, "then_branch")?)?,
            else_branch: match opt(&fields, "else_branch") {
                None | Some(Value::Null) => None,
                Some(v) => Some(block_from_value(v)?),
            },
            line,
        },
        "While" => Stmt::While {
            cond: expr_from_value(get(&fields, "cond")?)?,
            body: block_from_value(get(&fields, "body")?)?,
            line,
        },
        "For" => Stmt::For {
            init: match opt(&fields, "init") {
                None | Some(Value::Null) => None,
                Some(v) => Some(Box::new(stmt_from_value(v)?)),
            },
            cond: match opt(&fields, "cond") {
                None | Some(Value::Null) => None,
                Some(v) => Some(expr_from_value(v)?),
            },
            step: match opt(&fields, "step") {
                None | Some(Value::Null) => None,
                Some(v) => Some(expr_from_value(v)?),
            },
            body: block_from_value(get(&fields, "body")?)?,
            line,
        },
        "ForIn" => Stmt::ForIn {
            binding: str_value(get(&fields, "binding")?)?,
            index_binding: match opt(&fields, "index_binding") {
                None | Some(Value::Null) => None,
                Some(v) => Some(str_value(v)?),
            },
            iterable: expr_from_value(get(&fields, "iterable")?)?,
            body: block_from_value(get(&fields, "body")?)?,
            line,
        },
        "Break" => Stmt::Break(line),
        "Continue" => Stmt::Continue(line),
        "Block" => Stmt::Block(block_from_value(get(&fields, "body")?)?),
        "Return" => Stmt::Return(
            match opt(&fields, "value") {
                None | Some(Value::Null) => None,
                Some(v) => Some(expr_from_value(v)?),
            },
            line,
        ),
        "DefineObject" => Stmt::DefineObject {
            name: str_value(get(&fields, "name")?)?,
            fields: arr_items(get(&fields, "fields")?)?
                .iter()
                .map(object_field_def_from_value)
                .collect::<EvalResult<_>>()?,
            line,
        },
        "Try" => Stmt::Try {
            body: block_from_value(get(&fields, "body")?)?,
            catch: match opt(&fields, "catch") {
                None | Some(Value::Null) => None,
                Some(v) => Some(catch_clause_from_value(v)?),
            },
            finally: match opt(&fields, "finally") {
                None | Some(Value::Null) => None,
                Some(v) => Some(block_from_value(v)?),
            },
            line,
        },
        "Throw" => Stmt::Throw(expr_from_value(get(&fields, "value")?)?, line),
        "Switch" => Stmt::Switch {
            scrutinee: expr_from_value(get(&fields, "scrutinee")?)?,
            cases: arr_items(get(&fields, "cases")?)?
                .iter()
                .map(switch_case_from_value)
                .collect::<EvalResult<_>>()?,
            default: match opt(&fields, "default") {
                None | Some(Value::Null) => None,
                Some(v) => Some(
                    arr_items(v)?
                        .iter()
                        .map(stmt_from_value)
                        .collect::<EvalResult<_>>()?,
                ),
            },
            line,
        },
        "Defer" => Stmt::Defer(expr_from_value(get(&fields, "value")?)?, line),
        "Import" => Stmt::Import(str_value(get(&fields, "path")?)?, line),
        "ImportFfi" => Stmt::ImportFfi(str_value(get(&fields, "path")?)?, line),
        "ExternFn" => Stmt::ExternFn {
            name: str_value(get(&fields, "name")?)?,
            params: params_from_value(get(&fields, "params")?)?,
            return_type: type_desc_of(&fields, "return_type")?,
            line,
        },
        "Export" => Stmt::Export(Box::new(stmt_from_value(get(&fields, "stmt")?)?), line),
        other => return Err(HemlockException::msg(format!("unknown statement node '{other}'"))),
    })
}

fn object_field_def_from_value(v: &Value) -> EvalResult<ObjectFieldDef> {
    let fields = node_fields(v)?;
    Ok(ObjectFieldDef {
        name: str_value(get(&fields, "name")?)?,
        type_desc: type_desc_of(&fields, "type_desc")?,
        required: matches!(opt(&fields, "required"), Some(Value::Bool(true)) | None),
        default: match opt(&fields, "default") {
            None | Some(Value::Null) => None,
            Some(v) => Some(expr_from_value(v)?),
        },
    })
}

fn catch_clause_from_value(v: &Value) -> EvalResult<CatchClause> {
    let fields = node_fields(v)?;
    Ok(CatchClause {
        binding: str_value(get(&fields, "binding")?)?,
        body: block_from_value(get(&fields, "body")?)?,
    })
}

fn switch_case_from_value(v: &Value) -> EvalResult<SwitchCase> {
    let fields = node_fields(v)?;
    Ok(SwitchCase {
        value: expr_from_value(get(&fields, "value")?)?,
        body: arr_items(get(&fields, "body")?)?
            .iter()
            .map(stmt_from_value)
            .collect::<EvalResult<_>>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_let_binding_with_a_literal_initializer() {
        let src = r#"{"statements":[
            {"node":"Let","name":"x","value":{"node":"Literal","value":{"node":"Int","value":5}}}
        ]}"#;
        let program = program_from_json(src).unwrap();
        match &program.statements[0] {
            Stmt::Let { name, value: Some(Expr::Literal(Literal::Number(NumberLit::Int(5)), _)), .. } => {
                assert_eq!(name, "x");
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn decodes_nested_binary_and_call_expressions() {
        let src = r#"{"statements":[
            {"node":"Expr","value":{"node":"Call","callee":{"node":"Ident","name":"print"},
             "args":[{"node":"Binary","op":"+","left":{"node":"Literal","value":{"node":"Int","value":1}},
                      "right":{"node":"Literal","value":{"node":"Int","value":2}}}]}}
        ]}"#;
        let program = program_from_json(src).unwrap();
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn rejects_an_unknown_node_tag() {
        let src = r#"{"statements":[{"node":"Bogus"}]}"#;
        let err = program_from_json(src).unwrap_err();
        assert!(err.to_string().contains("unknown statement node"));
    }
}
