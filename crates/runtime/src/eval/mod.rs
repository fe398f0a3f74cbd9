//! The mutually-recursive expression/statement evaluator (§4.4).

mod expr;
mod stmt;

pub use expr::{display_value, eval_expr, print_format};
pub(crate) use expr::values_equal;
pub use stmt::{eval_block, eval_stmt};
