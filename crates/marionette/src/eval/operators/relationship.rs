//! The relationship operators, which form catalog edges rather than
//! compute values.
//!
//! `A -> B` orders A before B; `~>` additionally notifies; `<-` and `<~`
//! are the reverses. Operands may be a resource reference, a class
//! reference, a `Type[title]` string, or an array of any of these
//! (collectors evaluate to such arrays); multiple sources and targets fan
//! out pairwise. The operation's value is its right operand, so chains
//! associate naturally.

use crate::ast::BinaryOp;
use crate::catalog::{Relationship, ResourceIndex, each_reference};
use crate::error::{EvalResult, EvaluationError};
use crate::eval::context::Context;
use crate::eval::operators::{BinaryContext, BinaryDescriptor, reference_type};
use crate::lexer::position::Span;
use crate::value::Value;

pub(crate) fn create_descriptors() -> Vec<BinaryDescriptor> {
    [
        (BinaryOp::InEdge, Relationship::Before, false),
        (BinaryOp::InEdgeSubscribe, Relationship::Notify, false),
        (BinaryOp::OutEdge, Relationship::Before, true),
        (BinaryOp::OutEdgeSubscribe, Relationship::Notify, true),
    ]
    .into_iter()
    .map(|(op, relationship, reverse)| {
        let mut descriptor = BinaryDescriptor::new(op);
        let callback = match (relationship, reverse) {
            (Relationship::Before, false) => before,
            (Relationship::Notify, false) => notify,
            (Relationship::Before, true) => reverse_before,
            _ => reverse_notify,
        };
        descriptor.add(reference_type(), reference_type(), callback);
        descriptor
    })
    .collect()
}

fn before(context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    relate(context, operands, Relationship::Before, false)
}

fn notify(context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    relate(context, operands, Relationship::Notify, false)
}

fn reverse_before(context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    relate(context, operands, Relationship::Before, true)
}

fn reverse_notify(context: &mut Context<'_>, operands: BinaryContext) -> EvalResult<Value> {
    relate(context, operands, Relationship::Notify, true)
}

fn relate(
    context: &mut Context<'_>,
    operands: BinaryContext,
    relationship: Relationship,
    reverse: bool,
) -> EvalResult<Value> {
    let sources = resolve(context, &operands.left, operands.left_span)?;
    let targets = resolve(context, &operands.right, operands.right_span)?;
    let (sources, targets) = if reverse { (targets, sources) } else { (sources, targets) };
    for source in &sources {
        for target in &targets {
            context.catalog.add_edge(*source, *target, relationship);
        }
    }
    Ok(operands.right)
}

/// Resolves an operand to catalog resources; every reference must name a
/// declared resource.
fn resolve(context: &mut Context<'_>, operand: &Value, span: Span) -> EvalResult<Vec<ResourceIndex>> {
    let mut indices = Vec::new();
    let mut missing: Option<String> = None;
    each_reference(operand, &mut |reference| {
        match context.catalog.find_by_reference(&reference) {
            Some(index) => indices.push(index),
            None => {
                if missing.is_none() {
                    missing = Some(reference.to_string());
                }
            }
        }
    });
    if let Some(reference) = missing {
        return Err(EvaluationError::new(
            format!("resource {reference} does not exist in the catalog"),
            span,
        ));
    }
    if indices.is_empty() {
        return Err(EvaluationError::new(
            "expected at least one resource or class reference for relationship operand",
            span,
        ));
    }
    Ok(indices)
}
