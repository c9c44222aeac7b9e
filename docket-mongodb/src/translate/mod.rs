//! Translation of store-agnostic filters into native MongoDB filters.
//!
//! Two inputs are accepted:
//!
//! - structured [`WhereClause`](docket_query::WhereClause) trees, via [`QueryBuilder`]
//! - the nested-map DSL, via [`translate_dsl`]
//!
//! Both share the same operator table ([`render_predicate`]) and coerce
//! ObjectId-shaped strings compared against `_id`.

mod clause;
mod dsl;
mod pattern;
mod predicate;

pub use clause::{QueryBuilder, render_where};
pub use dsl::{translate_dsl, translate_map};
pub use pattern::{escape_regex, like_to_regex};
pub use predicate::{negate_predicate, render_predicate};
