//! In-memory stand-in for a collection, evaluating the subset of the native
//! filter language the translator and pagination engine emit.

#![allow(dead_code)]

use std::cmp::Ordering;

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use docket_mongodb::options::{FindOptions, Projection};
use docket_mongodb::pagination::PageSource;
use docket_mongodb::MongoResult;
use docket_query::SortOrder;
use parking_lot::Mutex;

/// A collection held in memory.
#[derive(Default)]
pub struct MemoryCollection {
    docs: Mutex<Vec<Document>>,
    finds: Mutex<usize>,
}

impl MemoryCollection {
    pub fn new(docs: Vec<Document>) -> Self {
        Self {
            docs: Mutex::new(docs),
            finds: Mutex::new(0),
        }
    }

    /// Every document matching `filter`, in insertion order.
    pub fn matching(&self, filter: &Document) -> Vec<Document> {
        self.docs
            .lock()
            .iter()
            .filter(|d| matches(d, filter))
            .cloned()
            .collect()
    }

    pub fn find_calls(&self) -> usize {
        *self.finds.lock()
    }
}

#[async_trait]
impl PageSource for MemoryCollection {
    async fn count(&self, filter: Document) -> MongoResult<u64> {
        Ok(self.matching(&filter).len() as u64)
    }

    async fn find(&self, filter: Document, options: FindOptions) -> MongoResult<Vec<Document>> {
        *self.finds.lock() += 1;
        let mut docs = self.matching(&filter);
        docs.sort_by(|a, b| compare_by(a, b, &options.sort));

        let skip = options.skip.unwrap_or(0) as usize;
        let limit = options.limit.map_or(usize::MAX, |l| l as usize);
        let docs = docs.into_iter().skip(skip).take(limit);

        Ok(match &options.projection {
            Some(projection) => docs.map(|d| project(d, projection)).collect(),
            None => docs.collect(),
        })
    }
}

fn compare_by(a: &Document, b: &Document, sort: &[(String, SortOrder)]) -> Ordering {
    for (field, order) in sort {
        let left = a.get(field).unwrap_or(&Bson::Null);
        let right = b.get(field).unwrap_or(&Bson::Null);
        let ordering = compare(left, right).unwrap_or(Ordering::Equal);
        let ordering = match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn project(document: Document, projection: &Projection) -> Document {
    match projection {
        Projection::Include(fields) => document
            .into_iter()
            .filter(|(k, _)| k == "_id" || fields.contains(k))
            .collect(),
        Projection::Exclude(fields) => document
            .into_iter()
            .filter(|(k, _)| !fields.contains(k))
            .collect(),
    }
}

/// Total order over the BSON types the tests use. Null sorts first.
pub fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        (Bson::Null, _) => Some(Ordering::Less),
        (_, Bson::Null) => Some(Ordering::Greater),
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        _ => {
            let x = as_f64(a)?;
            let y = as_f64(b)?;
            x.partial_cmp(&y)
        }
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn equal(a: &Bson, b: &Bson) -> bool {
    a == b || compare(a, b) == Some(Ordering::Equal)
}

/// Whether `document` satisfies `filter`.
pub fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, condition)| match key.as_str() {
        "$and" => sub_filters(condition).iter().all(|f| matches(document, f)),
        "$or" => sub_filters(condition).iter().any(|f| matches(document, f)),
        "$nor" => !sub_filters(condition).iter().any(|f| matches(document, f)),
        other if other.starts_with('$') => panic!("unsupported top-level operator {other}"),
        field => field_matches(document.get(field), condition),
    })
}

fn sub_filters(condition: &Bson) -> Vec<Document> {
    match condition {
        Bson::Array(items) => items
            .iter()
            .filter_map(|item| item.as_document().cloned())
            .collect(),
        other => panic!("logical operator expects an array, got {other:?}"),
    }
}

fn is_operator_doc(condition: &Bson) -> Option<&Document> {
    match condition {
        Bson::Document(d) if !d.is_empty() && d.keys().all(|k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> bool {
    match is_operator_doc(condition) {
        Some(ops) => operators_match(value, ops),
        None => value_equals(value, condition),
    }
}

fn value_equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match (value, expected) {
        (None, Bson::Null) => true,
        (None, _) => false,
        (Some(Bson::Array(items)), expected) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| equal(item, expected))
        }
        (Some(actual), expected) => equal(actual, expected),
    }
}

fn operators_match(value: Option<&Bson>, ops: &Document) -> bool {
    let options = ops.get_str("$options").unwrap_or("");
    ops.iter().all(|(op, operand)| match op.as_str() {
        "$eq" => value_equals(value, operand),
        "$ne" => !value_equals(value, operand),
        "$gt" => ordered(value, operand, |o| o == Ordering::Greater),
        "$gte" => ordered(value, operand, |o| o != Ordering::Less),
        "$lt" => ordered(value, operand, |o| o == Ordering::Less),
        "$lte" => ordered(value, operand, |o| o != Ordering::Greater),
        "$in" => in_list(value, operand),
        "$nin" => !in_list(value, operand),
        "$exists" => value.is_some() == operand.as_bool().unwrap_or(true),
        "$regex" => regex_matches(value, operand, options),
        "$options" => true,
        "$not" => !field_matches(value, operand),
        other => panic!("unsupported operator {other}"),
    })
}

/// Range comparison within one type bracket. Missing and null only meet a
/// null operand, and only through `$gte`/`$lte`.
fn ordered(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    match (value, operand) {
        (Some(Bson::Null) | None, Bson::Null) => accept(Ordering::Equal),
        (Some(Bson::Null) | None, _) | (_, Bson::Null) => false,
        (Some(actual), operand) => compare(actual, operand).is_some_and(accept),
    }
}

fn in_list(value: Option<&Bson>, operand: &Bson) -> bool {
    match operand {
        Bson::Array(items) => items.iter().any(|item| value_equals(value, item)),
        other => panic!("$in expects an array, got {other:?}"),
    }
}

fn regex_matches(value: Option<&Bson>, pattern: &Bson, options: &str) -> bool {
    let Some(Bson::String(text)) = value else {
        return false;
    };
    let pattern = match pattern {
        Bson::String(p) => p.clone(),
        Bson::RegularExpression(r) => r.pattern.clone(),
        other => panic!("$regex expects a string, got {other:?}"),
    };
    let pattern = if options.contains('i') {
        format!("(?i){pattern}")
    } else {
        pattern
    };
    regex_lite::Regex::new(&pattern)
        .unwrap_or_else(|e| panic!("invalid pattern {pattern}: {e}"))
        .is_match(text)
}

/// `n` documents `{_id: "doc-NN", seq: i, score: i % buckets}`.
pub fn numbered(n: usize, buckets: i64) -> Vec<Document> {
    (0..n)
        .map(|i| doc! { "_id": format!("doc-{i:02}"), "seq": i as i64, "score": i as i64 % buckets })
        .collect()
}

/// The `_id` values of `docs` as strings.
pub fn ids(docs: &[Document]) -> Vec<String> {
    docs.iter()
        .map(|d| match d.get("_id") {
            Some(Bson::String(s)) => s.clone(),
            Some(Bson::ObjectId(oid)) => oid.to_hex(),
            other => panic!("unexpected _id {other:?}"),
        })
        .collect()
}
