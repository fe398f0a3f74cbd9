//! End-to-end scenarios driven by hand-built AST fragments, the way the
//! teacher's `test_closures.rs` exercises low-level runtime functions
//! directly rather than through a parser (none is part of this workspace).

use std::sync::Arc;

use hemlock_core::ast::{
    Block, CatchClause, CompoundOp, Expr, Literal, NumberLit, Stmt,
};
use hemlock_core::{
    ChannelData, Environment, ExecutionContext, FnParam, FunctionData, HArray, TypeDescriptor,
    Value,
};
use hemlock_runtime::call::call_hemlock_function;
use hemlock_runtime::eval::{eval_expr, eval_stmt};
use hemlock_runtime::{Interpreter, InterpreterConfig};

fn ident(name: &str) -> Expr {
    Expr::Ident(name.to_string(), None)
}

fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Number(NumberLit::Int(n)), None)
}

fn lit_str(s: &str) -> Expr {
    Expr::Literal(Literal::Str(s.to_string()), None)
}

fn get_prop(obj: Expr, name: &str) -> Expr {
    Expr::GetProperty(Box::new(obj), name.to_string(), None)
}

fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call(Box::new(callee), args, None)
}

fn push_stmt(target: &str, value: Expr) -> Stmt {
    Stmt::Expr(call(get_prop(ident(target), "push"), vec![value]))
}

fn new_interp() -> hemlock_runtime::SharedInterpreter {
    Interpreter::new(InterpreterConfig::default())
}

#[test]
fn closures_capture_their_defining_environment_by_reference() {
    let interp = new_interp();
    let mut ctx = ExecutionContext::default();

    // fn make_counter() { let n = 0; return fn inc() { n += 1; return n; }; }
    let inc_body = Block(vec![
        Stmt::Expr(Expr::CompoundAssign(
            CompoundOp::Add,
            Box::new(ident("n")),
            Box::new(lit_int(1)),
            None,
        )),
        Stmt::Return(Some(ident("n")), None),
    ]);
    let inc_expr = Expr::Function {
        name: Some("inc".to_string()),
        params: vec![],
        return_type: None,
        is_async: false,
        body: Arc::new(inc_body),
        line: None,
    };
    let make_counter_body = Block(vec![
        Stmt::Let {
            name: "n".to_string(),
            type_desc: None,
            value: Some(lit_int(0)),
            line: None,
        },
        Stmt::Return(Some(inc_expr), None),
    ]);
    let make_counter = Arc::new(FunctionData {
        name: Some("make_counter".to_string()),
        params: vec![],
        return_type: None,
        is_async: false,
        body: Arc::new(make_counter_body),
        closure_env: Environment::root(),
    });

    let counter_value =
        call_hemlock_function(&interp, &mut ctx, &make_counter, vec![], None, None).unwrap();
    let inc = match counter_value {
        Value::Function(f) => f,
        other => panic!("expected a function value, got {other:?}"),
    };

    let first = call_hemlock_function(&interp, &mut ctx, &inc, vec![], None, None).unwrap();
    let second = call_hemlock_function(&interp, &mut ctx, &inc, vec![], None, None).unwrap();
    assert_eq!(first, Value::I32(1));
    assert_eq!(second, Value::I32(2));
}

#[test]
fn string_indexing_counts_unicode_codepoints_not_bytes() {
    let interp = new_interp();
    let env = Environment::root();
    let mut ctx = ExecutionContext::default();

    let indexed = eval_expr(
        &interp,
        &env,
        &mut ctx,
        &Expr::Index(Box::new(lit_str("h\u{e9}llo")), Box::new(lit_int(1)), None),
    )
    .unwrap();
    assert_eq!(indexed, Value::Rune('\u{e9}'));

    let length = eval_expr(&interp, &env, &mut ctx, &get_prop(lit_str("h\u{e9}llo"), "length"))
        .unwrap();
    assert_eq!(length, Value::I32(5));

    let byte_length =
        eval_expr(&interp, &env, &mut ctx, &get_prop(lit_str("h\u{e9}llo"), "byte_length"))
            .unwrap();
    assert_eq!(byte_length, Value::I32(6));
}

#[test]
fn declaring_a_let_with_a_narrower_type_rejects_out_of_range_values() {
    let interp = new_interp();
    let env = Environment::root();
    let mut ctx = ExecutionContext::default();

    let err = eval_stmt(
        &interp,
        &env,
        &mut ctx,
        &Stmt::Let {
            name: "x".to_string(),
            type_desc: Some(TypeDescriptor::U8),
            value: Some(lit_int(256)),
            line: None,
        },
    )
    .unwrap_err();
    assert!(err.to_string().contains("out of range"));
    assert!(env.get("x").is_err(), "a rejected declaration must not bind");
}

#[test]
fn try_catch_finally_runs_body_then_catch_then_finally_in_order() {
    let interp = new_interp();
    let env = Environment::root();
    let mut ctx = ExecutionContext::default();
    env.define("log", Value::Array(HArray::new(vec![])), false).unwrap();

    let try_stmt = Stmt::Try {
        body: Block(vec![
            push_stmt("log", lit_int(1)),
            Stmt::Throw(lit_int(99), None),
        ]),
        catch: Some(CatchClause {
            binding: "e".to_string(),
            body: Block(vec![push_stmt("log", lit_int(2))]),
        }),
        finally: Some(Block(vec![push_stmt("log", lit_int(3))])),
        line: None,
    };

    eval_stmt(&interp, &env, &mut ctx, &try_stmt).unwrap();

    let log = match env.get("log").unwrap() {
        Value::Array(a) => a.read().clone(),
        other => panic!("expected an array, got {other:?}"),
    };
    assert_eq!(log, vec![Value::I32(1), Value::I32(2), Value::I32(3)]);
}

#[test]
fn defer_entries_run_in_lifo_order_even_when_the_body_throws() {
    let interp = new_interp();
    let mut ctx = ExecutionContext::default();
    let env = Environment::root();
    env.define("log", Value::Array(HArray::new(vec![])), false).unwrap();

    let body = Block(vec![
        Stmt::Defer(call(get_prop(ident("log"), "push"), vec![lit_str("A")]), None),
        Stmt::Defer(call(get_prop(ident("log"), "push"), vec![lit_str("B")]), None),
        Stmt::Throw(lit_str("boom"), None),
    ]);
    let throws = Arc::new(FunctionData {
        name: Some("f".to_string()),
        params: vec![],
        return_type: None,
        is_async: false,
        body: Arc::new(body),
        closure_env: env.clone(),
    });

    let err = call_hemlock_function(&interp, &mut ctx, &throws, vec![], None, None).unwrap_err();
    assert_eq!(err.payload, Value::string("boom"));

    let log = match env.get("log").unwrap() {
        Value::Array(a) => a.read().clone(),
        other => panic!("expected an array, got {other:?}"),
    };
    assert_eq!(log, vec![Value::string("B"), Value::string("A")]);
}

#[test]
fn spawned_task_deliveries_arrive_over_the_channel_in_fifo_order() {
    let interp = new_interp();

    let chan = ChannelData::new(2);
    let producer_body = Block(vec![
        Stmt::Expr(call(get_prop(ident("ch"), "send"), vec![lit_int(1)])),
        Stmt::Expr(call(get_prop(ident("ch"), "send"), vec![lit_int(2)])),
        Stmt::Expr(call(get_prop(ident("ch"), "send"), vec![lit_int(3)])),
        Stmt::Expr(call(get_prop(ident("ch"), "close"), vec![])),
    ]);
    let producer = Arc::new(FunctionData {
        name: Some("producer".to_string()),
        params: vec![FnParam {
            name: "ch".to_string(),
            type_desc: None,
        }],
        return_type: None,
        is_async: true,
        body: Arc::new(producer_body),
        closure_env: Environment::root(),
    });

    let task = hemlock_runtime::concurrency::spawn(&interp, producer, vec![Value::Channel(chan.clone())]);

    let mut received = Vec::new();
    while let Some(v) = chan.recv() {
        received.push(v);
    }
    assert_eq!(received, vec![Value::I32(1), Value::I32(2), Value::I32(3)]);

    match task {
        Value::Task(t) => {
            t.join().unwrap();
        }
        other => panic!("expected a task value, got {other:?}"),
    }
}
