//! Expression evaluation into generic values.

use crate::error::{CompileError, CompileResult};
use gantry_core::{Value, ValueMap};
use gantry_lang::{Bindings, Expr, ExprKind};

/// Evaluate one expression
///
/// # Errors
///
/// Returns [`CompileError::UnsupportedExpression`] for references, function
/// calls and chains, including when nested inside arrays or objects
pub fn evaluate(expr: &Expr) -> CompileResult<Value> {
    match &expr.kind {
        ExprKind::String(s) => Ok(Value::String(s.clone())),
        ExprKind::Array(items) => items
            .iter()
            .map(evaluate)
            .collect::<CompileResult<Vec<_>>>()
            .map(Value::List),
        ExprKind::Object(bindings) => evaluate_bindings(bindings).map(Value::Map),
        ExprKind::Reference(name) => Err(unsupported(expr, format!("variable `{}`", name))),
        ExprKind::Call { name, .. } => Err(unsupported(expr, format!("function `{}()`", name))),
        ExprKind::Chain(_) => Err(unsupported(expr, expr.kind_name().to_string())),
    }
}

/// Evaluate every binding of a block
///
/// # Errors
///
/// Stops at the first binding that fails to evaluate
pub fn evaluate_bindings(bindings: &Bindings) -> CompileResult<ValueMap> {
    bindings
        .iter()
        .map(|(name, binding)| Ok((name.clone(), evaluate(&binding.expr)?)))
        .collect()
}

fn unsupported(expr: &Expr, what: String) -> CompileError {
    CompileError::UnsupportedExpression {
        what,
        location: expr.location,
    }
}
