//! Structured where-clause rendering.

use bson::{Document, doc};
use docket_query::{Condition, LogicalOperator, QueryError, WhereClause};
use tracing::debug;

use super::predicate::{negate_predicate, render_predicate};

/// Renders [`WhereClause`] trees into native filters.
///
/// The builder does not stop at the first unknown operator: the offending
/// condition is skipped, the error is recorded and rendering continues.
/// Check [`has_errors`](Self::has_errors) or call [`build`](Self::build)
/// to decide whether to run a partially rendered filter.
///
/// ```rust
/// use docket_mongodb::QueryBuilder;
/// use docket_query::{Condition, Operator, WhereClause};
///
/// let clause = WhereClause::and(vec![
///     Condition::new("status", Operator::Equals, "active"),
///     Condition::raw("price", "approximately", 10),
/// ]);
///
/// let builder = QueryBuilder::new().where_clause(&clause);
/// assert!(builder.has_errors());
/// assert_eq!(builder.to_document().get_str("status").unwrap(), "active");
/// ```
#[derive(Debug, Default)]
pub struct QueryBuilder {
    parts: Vec<Document>,
    errors: Vec<QueryError>,
}

impl QueryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a where clause; successive clauses are combined with AND.
    pub fn where_clause(mut self, clause: &WhereClause) -> Self {
        if let Some(rendered) = self.render_clause(clause) {
            self.parts.push(rendered);
        }
        self
    }

    /// Add a single condition.
    pub fn condition(mut self, condition: &Condition) -> Self {
        if let Some(rendered) = self.render_condition(condition) {
            self.parts.push(rendered);
        }
        self
    }

    /// Errors recorded so far.
    pub fn errors(&self) -> &[QueryError] {
        &self.errors
    }

    /// Whether any condition failed to render.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The filter rendered so far, ignoring recorded errors.
    pub fn to_document(&self) -> Document {
        combine(self.parts.clone(), LogicalOperator::And).unwrap_or_default()
    }

    /// Finish: the filter, or every recorded error.
    pub fn build(self) -> Result<Document, Vec<QueryError>> {
        if self.errors.is_empty() {
            Ok(combine(self.parts, LogicalOperator::And).unwrap_or_default())
        } else {
            Err(self.errors)
        }
    }

    fn render_clause(&mut self, clause: &WhereClause) -> Option<Document> {
        let mut parts = Vec::with_capacity(clause.conditions.len() + clause.groups.len());
        for condition in &clause.conditions {
            if let Some(rendered) = self.render_condition(condition) {
                parts.push(rendered);
            }
        }
        for group in &clause.groups {
            if let Some(rendered) = self.render_clause(group) {
                parts.push(rendered);
            }
        }
        combine(parts, clause.operator)
    }

    fn render_condition(&mut self, condition: &Condition) -> Option<Document> {
        if let Some(nested) = &condition.nested {
            let inner = self.render_clause(nested)?;
            return Some(if condition.not {
                doc! { "$nor": [inner] }
            } else {
                inner
            });
        }

        let Some(op) = condition.resolved_operator() else {
            self.errors.push(
                QueryError::invalid_filter(format!("unknown operator '{}'", condition.operator))
                    .with_field(condition.field.clone()),
            );
            return None;
        };

        let Some(predicate) = render_predicate(&condition.field, op, &condition.value) else {
            debug!(
                field = %condition.field,
                operator = %op,
                "Operand does not fit operator, condition dropped"
            );
            return None;
        };

        if condition.not {
            negate_predicate(&condition.field, predicate)
        } else {
            Some(predicate)
        }
    }
}

/// Combine sibling predicates; a single predicate is returned unwrapped.
pub(crate) fn combine(mut parts: Vec<Document>, operator: LogicalOperator) -> Option<Document> {
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => {
            let key = match operator {
                LogicalOperator::And => "$and",
                LogicalOperator::Or => "$or",
            };
            let mut combined = Document::new();
            combined.insert(key, parts);
            Some(combined)
        }
    }
}

/// Render a where clause, failing on the first unknown operator.
pub fn render_where(clause: &WhereClause) -> Result<Document, QueryError> {
    QueryBuilder::new()
        .where_clause(clause)
        .build()
        .map_err(|mut errors| errors.remove(0))
}
