//! Single-field predicate rendering and negation.

use bson::{Bson, Document, doc};
use docket_query::{FilterValue, Operator};

use super::pattern::{escape_regex, like_to_regex};
use crate::id::operand_for;

/// Render `field <op> value` as a native predicate.
///
/// Returns `None` when the operand does not fit the operator: a non-string
/// operand for a pattern or full-text operator, or a `between` operand that
/// carries neither bound. Callers drop such conditions instead of failing,
/// which widens the result set.
pub fn render_predicate(field: &str, op: Operator, value: &FilterValue) -> Option<Document> {
    let predicate = match op {
        Operator::Equals | Operator::Includes => doc! { field: operand_for(field, value) },
        Operator::NotEquals => doc! { field: { "$ne": operand_for(field, value) } },
        Operator::GreaterThan => doc! { field: { "$gt": operand_for(field, value) } },
        Operator::GreaterThanOrEqual => doc! { field: { "$gte": operand_for(field, value) } },
        Operator::LessThan => doc! { field: { "$lt": operand_for(field, value) } },
        Operator::LessThanOrEqual => doc! { field: { "$lte": operand_for(field, value) } },
        Operator::Contains => {
            let s = value.as_str()?;
            doc! { field: { "$regex": escape_regex(s), "$options": "i" } }
        }
        Operator::StartsWith => {
            let s = value.as_str()?;
            doc! { field: { "$regex": format!("^{}", escape_regex(s)), "$options": "i" } }
        }
        Operator::EndsWith => {
            let s = value.as_str()?;
            doc! { field: { "$regex": format!("{}$", escape_regex(s)), "$options": "i" } }
        }
        Operator::Like => {
            let s = value.as_str()?;
            doc! { field: { "$regex": like_to_regex(s) } }
        }
        Operator::ILike => {
            let s = value.as_str()?;
            doc! { field: { "$regex": like_to_regex(s), "$options": "i" } }
        }
        Operator::In => doc! { field: { "$in": membership(field, value) } },
        Operator::NotIn => doc! { field: { "$nin": membership(field, value) } },
        Operator::IsNull => doc! { field: Bson::Null },
        Operator::IsNotNull => doc! { field: { "$ne": Bson::Null } },
        Operator::Between => {
            let (low, high) = bounds(value)?;
            let mut range = Document::new();
            if let Some(low) = low {
                range.insert("$gte", operand_for(field, low));
            }
            if let Some(high) = high {
                range.insert("$lte", operand_for(field, high));
            }
            doc! { field: range }
        }
        Operator::Fuzzy => {
            let s = value.as_str()?;
            doc! { "$text": { "$search": s } }
        }
    };
    Some(predicate)
}

fn membership(field: &str, value: &FilterValue) -> Bson {
    match operand_for(field, value) {
        Bson::Array(items) => Bson::Array(items),
        Bson::Null => Bson::Array(Vec::new()),
        scalar => Bson::Array(vec![scalar]),
    }
}

fn bounds(value: &FilterValue) -> Option<(Option<&FilterValue>, Option<&FilterValue>)> {
    let (low, high) = match value {
        FilterValue::Map(map) => (
            map.get("low").filter(|v| !v.is_null()),
            map.get("high").filter(|v| !v.is_null()),
        ),
        FilterValue::List(items) if items.len() == 2 => (Some(&items[0]), Some(&items[1])),
        _ => return None,
    };
    if low.is_none() && high.is_none() {
        return None;
    }
    Some((low, high))
}

/// Negate a rendered single-field predicate.
///
/// Operator documents are wrapped in `$not`, literal equality becomes `$ne`
/// and anything else (full-text search) is wrapped in `$nor`. An empty
/// predicate yields `None`.
pub fn negate_predicate(field: &str, predicate: Document) -> Option<Document> {
    if predicate.is_empty() {
        return None;
    }

    if predicate.len() == 1 {
        match predicate.get(field) {
            Some(Bson::Document(ops)) if is_operator_doc(ops) => {
                return Some(doc! { field: { "$not": ops.clone() } });
            }
            Some(literal) => {
                return Some(doc! { field: { "$ne": literal.clone() } });
            }
            None => {}
        }
    }

    Some(doc! { "$nor": [predicate] })
}

/// Whether every key of `doc` is a query operator.
pub(crate) fn is_operator_doc(doc: &Document) -> bool {
    !doc.is_empty() && doc.keys().all(|k| k.starts_with('$'))
}
