//! Collectors: attribute-query evaluation and realization.
//!
//! `Type <| query |>` matches non-exported resources of the type in the
//! current catalog; `Type <<| query |>>` additionally matches exported
//! ones. Matches are realized and any attribute tail applies as
//! overrides. Collectors re-run at finalization so resources declared
//! after the collector still match.

use crate::ast::{CollectorExpr, Query, QueryOp};
use crate::catalog::ResourceIndex;
use crate::error::EvalResult;
use crate::eval::context::Context;
use crate::types::normalize_type_name;
use crate::value::Value;

/// Evaluates a collector against the current catalog, realizing matches
/// and applying the override tail. Returns the matched resources.
pub fn evaluate_collector(context: &mut Context<'_>, expr: &CollectorExpr) -> EvalResult<Vec<ResourceIndex>> {
    let type_name = normalize_type_name(&expr.type_name);

    let mut matched = Vec::new();
    for index in context.catalog.indices() {
        {
            let resource = context.catalog.get(index);
            if resource.type_name() != type_name {
                continue;
            }
            if resource.exported() && !expr.exported {
                continue;
            }
        }
        let accepted = match &expr.query {
            None => true,
            Some(query) => query_matches(context, query, index)?,
        };
        if accepted {
            matched.push(index);
        }
    }

    for &index in &matched {
        context.catalog.realize(index);
        if !expr.operations.is_empty() {
            context.apply_override(index, &expr.operations)?;
        }
    }
    Ok(matched)
}

/// Evaluates an attribute query against one resource. The `title` and
/// `tag` names query identity and tags; anything else reads the
/// attribute.
fn query_matches(context: &mut Context<'_>, query: &Query, index: ResourceIndex) -> EvalResult<bool> {
    match query {
        Query::And(left, right) => {
            Ok(query_matches(context, left, index)? && query_matches(context, right, index)?)
        }
        Query::Or(left, right) => {
            Ok(query_matches(context, left, index)? || query_matches(context, right, index)?)
        }
        Query::Condition {
            attribute,
            op,
            value,
            ..
        } => {
            let expected = context.evaluate(value)?;
            let resource = context.catalog.get(index);
            let matches = match attribute.as_str() {
                "title" => expected.equals(&Value::string(resource.title())),
                "tag" => match &expected {
                    Value::String(tag) => resource
                        .calculate_tags(&context.catalog)
                        .contains(&tag.to_ascii_lowercase()),
                    _ => false,
                },
                name => {
                    let actual = resource
                        .get(name)
                        .map_or(Value::Undef, |attribute| attribute.value.clone());
                    actual.equals(&expected)
                }
            };
            Ok(match op {
                QueryOp::Equals => matches,
                QueryOp::NotEquals => !matches,
            })
        }
    }
}
