//! Binary operator dispatch.
//!
//! Each operator registers a descriptor holding `(left type, right type,
//! callback)` overloads, tried in registration order against the evaluated
//! operands. On total failure the dispatcher reports which operand is at
//! fault: if the left operand matched at least one overload, the error
//! enumerates the right side's permissible types, and vice versa.
//!
//! `and`, `or`, and `=` never reach the dispatcher — they need lazy
//! operands or lvalues and are handled by the evaluator directly.

mod comparison;
mod equality;
mod in_op;
mod left_shift;
mod match_op;
mod minus;
mod modulo;
mod multiply;
mod divide;
mod plus;
mod relationship;

use ahash::AHashMap;

use crate::ast::BinaryOp;
use crate::error::{EvalResult, EvaluationError};
use crate::eval::context::Context;
use crate::lexer::position::Span;
use crate::types::{Type, type_of};
use crate::value::Value;

/// The evaluated operands of one binary operation.
#[derive(Debug)]
pub struct BinaryContext {
    pub left: Value,
    pub right: Value,
    pub left_span: Span,
    pub right_span: Span,
    pub op_span: Span,
}

impl BinaryContext {
    /// An evaluation error at the operator.
    #[must_use]
    pub fn error(&self, message: impl Into<std::borrow::Cow<'static, str>>) -> EvaluationError {
        EvaluationError::new(message, self.op_span)
    }
}

/// One overload: operand type patterns and the implementation.
pub struct Overload {
    pub left: Type,
    pub right: Type,
    pub callback: fn(&mut Context<'_>, BinaryContext) -> EvalResult<Value>,
}

/// All overloads registered for one operator.
pub struct BinaryDescriptor {
    op: BinaryOp,
    overloads: Vec<Overload>,
}

impl BinaryDescriptor {
    #[must_use]
    pub fn new(op: BinaryOp) -> Self {
        Self {
            op,
            overloads: Vec::new(),
        }
    }

    /// Registers an overload; order is significant.
    pub fn add(
        &mut self,
        left: Type,
        right: Type,
        callback: fn(&mut Context<'_>, BinaryContext) -> EvalResult<Value>,
    ) {
        self.overloads.push(Overload { left, right, callback });
    }

    /// Finds the first overload matching both operands and invokes it.
    pub fn dispatch(&self, context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
        for overload in &self.overloads {
            if overload.left.instance_of(&operands.left) && overload.right.instance_of(&operands.right) {
                return (overload.callback)(context, operands);
            }
        }
        Err(self.type_error(&operands))
    }

    /// Builds the expected-type message: the side that matched nothing is
    /// the one reported, listing the types that would have been accepted.
    fn type_error(&self, operands: &BinaryContext) -> EvaluationError {
        let left_matches = self
            .overloads
            .iter()
            .any(|overload| overload.left.instance_of(&operands.left));
        if left_matches {
            let permissible: Vec<String> = self
                .overloads
                .iter()
                .filter(|overload| overload.left.instance_of(&operands.left))
                .map(|overload| overload.right.to_string())
                .collect();
            EvaluationError::new(
                format!(
                    "expected {} for right operand of '{}' but found {}",
                    join_types(&permissible),
                    self.op,
                    type_of(&operands.right).generalize()
                ),
                operands.right_span,
            )
        } else {
            let permissible: Vec<String> = self.overloads.iter().map(|overload| overload.left.to_string()).collect();
            EvaluationError::new(
                format!(
                    "expected {} for left operand of '{}' but found {}",
                    join_types(&permissible),
                    self.op,
                    type_of(&operands.left).generalize()
                ),
                operands.left_span,
            )
        }
    }
}

fn join_types(types: &[String]) -> String {
    let mut unique: Vec<&str> = Vec::new();
    for t in types {
        if !unique.contains(&t.as_str()) {
            unique.push(t);
        }
    }
    match unique.len() {
        0 => "a value".to_owned(),
        1 => unique[0].to_owned(),
        2 => format!("{} or {}", unique[0], unique[1]),
        _ => {
            let (last, rest) = unique.split_last().expect("non-empty");
            format!("{}, or {last}", rest.join(", "))
        }
    }
}

/// The operator table, keyed by [`BinaryOp`].
pub struct BinaryDispatcher {
    table: AHashMap<BinaryOp, BinaryDescriptor>,
}

impl BinaryDispatcher {
    /// Builds the dispatcher with every built-in operator registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut dispatcher = Self {
            table: AHashMap::new(),
        };
        dispatcher.register(plus::create_descriptor());
        dispatcher.register(minus::create_descriptor());
        dispatcher.register(multiply::create_descriptor());
        dispatcher.register(divide::create_descriptor());
        dispatcher.register(modulo::create_descriptor());
        dispatcher.register(left_shift::create_descriptor());
        dispatcher.register(left_shift::create_right_shift_descriptor());
        for descriptor in equality::create_descriptors() {
            dispatcher.register(descriptor);
        }
        for descriptor in comparison::create_descriptors() {
            dispatcher.register(descriptor);
        }
        for descriptor in match_op::create_descriptors() {
            dispatcher.register(descriptor);
        }
        dispatcher.register(in_op::create_descriptor());
        for descriptor in relationship::create_descriptors() {
            dispatcher.register(descriptor);
        }
        dispatcher
    }

    fn register(&mut self, descriptor: BinaryDescriptor) {
        self.table.insert(descriptor.op, descriptor);
    }

    /// Dispatches an operator; `None` means the operator has no
    /// descriptor (it is evaluator-handled).
    pub fn dispatch(
        &self,
        context: &mut Context<'_>,
        op: BinaryOp,
        operands: BinaryContext,
    ) -> Option<EvalResult<Value>> {
        self.table
            .get(&op)
            .map(|descriptor| descriptor.dispatch(context, operands))
    }
}

/// The variant type accepted wherever a resource or class reference (or an
/// array of them) is expected.
pub(crate) fn reference_type() -> Type {
    Type::variant(vec![
        Type::Type(Some(Box::new(Type::CatalogEntry))),
        Type::string(),
        Type::Array {
            element: Box::new(Type::Any),
            from: 0,
            to: crate::types::INTEGER_MAX,
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_types_forms() {
        assert_eq!(join_types(&["Integer".to_owned()]), "Integer");
        assert_eq!(join_types(&["Integer".to_owned(), "Float".to_owned()]), "Integer or Float");
        assert_eq!(
            join_types(&["A".to_owned(), "B".to_owned(), "C".to_owned()]),
            "A, B, or C"
        );
    }
}
