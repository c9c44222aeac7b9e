//! The nested-map filter DSL.
//!
//! ```text
//! { "status": "active",                      -> equality
//!   "price": { "gte": 10, "lt": 20 },        -> operator map
//!   "or": [ { "tag": "sale" }, { ... } ],    -> logical keys (also `$or`)
//!   "not": { "name": { "contains": "x" } } }
//! ```

use bson::{Bson, Document};
use docket_query::{FilterValue, LogicalOperator, Operator};
use indexmap::IndexMap;

use super::clause::combine;
use super::predicate::{is_operator_doc, render_predicate};
use crate::error::{MongoError, MongoResult};
use crate::id::operand_for;

/// Translate a DSL filter into a native filter.
pub fn translate_dsl(filter: &FilterValue) -> MongoResult<Document> {
    match filter {
        FilterValue::Null => Ok(Document::new()),
        FilterValue::Map(map) => translate_map(map),
        other => Err(MongoError::invalid_filter(format!(
            "filter must be a map, got {:?}",
            other
        ))),
    }
}

/// Translate the entries of a DSL map.
pub fn translate_map(map: &IndexMap<String, FilterValue>) -> MongoResult<Document> {
    let mut parts = Vec::with_capacity(map.len());

    for (key, value) in map {
        let logical = key.strip_prefix('$').unwrap_or(key).to_ascii_lowercase();
        match logical.as_str() {
            "and" | "or" => {
                let operator = if logical == "and" {
                    LogicalOperator::And
                } else {
                    LogicalOperator::Or
                };
                if let Some(rendered) = combine(sub_filters(key, value)?, operator) {
                    parts.push(rendered);
                }
            }
            "not" => {
                let negated = sub_filters(key, value)?;
                if !negated.is_empty() {
                    parts.push(bson::doc! { "$nor": negated });
                }
            }
            _ => parts.extend(field_predicates(key, value)?),
        }
    }

    Ok(merge_parts(parts))
}

/// Sub-filters under a logical key: a list of maps, or one map whose entries
/// each become a sub-filter.
fn sub_filters(key: &str, value: &FilterValue) -> MongoResult<Vec<Document>> {
    let mut out = Vec::new();
    match value {
        FilterValue::List(items) => {
            for item in items {
                let rendered = translate_dsl(item)?;
                if !rendered.is_empty() {
                    out.push(rendered);
                }
            }
        }
        FilterValue::Map(map) => {
            for (k, v) in map {
                let mut single = IndexMap::with_capacity(1);
                single.insert(k.clone(), v.clone());
                let rendered = translate_map(&single)?;
                if !rendered.is_empty() {
                    out.push(rendered);
                }
            }
        }
        other => {
            return Err(MongoError::invalid_filter(format!(
                "'{}' expects a list or map, got {:?}",
                key, other
            )));
        }
    }
    Ok(out)
}

fn field_predicates(field: &str, value: &FilterValue) -> MongoResult<Vec<Document>> {
    let Some(map) = value.as_map() else {
        let mut literal = Document::new();
        literal.insert(field, operand_for(field, value));
        return Ok(vec![literal]);
    };

    let resolved: Vec<Option<Operator>> = map.keys().map(|k| Operator::parse(k)).collect();

    if !map.is_empty() && resolved.iter().all(Option::is_some) {
        let mut out = Vec::with_capacity(map.len());
        for (op, operand) in resolved.into_iter().flatten().zip(map.values()) {
            if let Some(predicate) = render_predicate(field, op, operand) {
                out.push(predicate);
            }
        }
        if out.len() > 1 {
            return Ok(fold_field_operators(field, out));
        }
        return Ok(out);
    }

    let has_operator_key = map
        .keys()
        .any(|k| k.starts_with('$') || Operator::parse(k).is_some());
    if has_operator_key {
        if let Some(unknown) = map.keys().find(|k| Operator::parse(k).is_none()) {
            return Err(MongoError::invalid_filter(format!(
                "unknown operator '{}' on field '{}'",
                unknown, field
            )));
        }
    }

    // No operator keys at all: equality against an embedded document.
    let mut literal = Document::new();
    literal.insert(field, operand_for(field, value));
    Ok(vec![literal])
}

/// Merge predicates into one document, falling back to `$and` when two
/// predicates constrain the same key.
fn merge_parts(parts: Vec<Document>) -> Document {
    let mut merged = Document::new();
    let mut collided = false;
    for part in &parts {
        for (k, v) in part {
            if merged.contains_key(k) {
                collided = true;
                break;
            }
            merged.insert(k.clone(), v.clone());
        }
    }
    if collided {
        combine(parts, LogicalOperator::And).unwrap_or_default()
    } else {
        merged
    }
}

/// Fold several operator predicates on one field into a single operator
/// document when their operators do not overlap.
fn fold_field_operators(field: &str, predicates: Vec<Document>) -> Vec<Document> {
    let mut ops = Document::new();
    for predicate in &predicates {
        let folded = match (predicate.len(), predicate.get(field)) {
            (1, Some(Bson::Document(inner))) if is_operator_doc(inner) => {
                inner.keys().all(|k| !ops.contains_key(k))
            }
            _ => false,
        };
        if !folded {
            return predicates;
        }
        if let Ok(inner) = predicate.get_document(field) {
            for (k, v) in inner {
                ops.insert(k.clone(), v.clone());
            }
        }
    }
    let mut single = Document::new();
    single.insert(field, ops);
    vec![single]
}
