//! Index declarations produced by schema tooling.

use serde::{Deserialize, Serialize};

/// The kind of index to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Plain ascending key index.
    #[default]
    Plain,
    /// Full-text index.
    Text,
    /// Geospatial index.
    Geospatial,
}

/// One compound index over a list of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDeclaration {
    /// Optional explicit index name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Indexed fields, in key order.
    pub fields: Vec<String>,
    /// Enforce uniqueness.
    #[serde(default)]
    pub unique: bool,
    /// Index kind.
    #[serde(default)]
    pub kind: IndexKind,
}

impl IndexDeclaration {
    /// Create a plain index over the given fields.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            fields: fields.into_iter().map(Into::into).collect(),
            unique: false,
            kind: IndexKind::Plain,
        }
    }

    /// Mark the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set the index kind.
    pub fn kind(mut self, kind: IndexKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set an explicit name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_declaration_defaults() {
        let decl: IndexDeclaration = serde_json::from_str(r#"{"fields": ["email"]}"#).unwrap();
        assert_eq!(decl.kind, IndexKind::Plain);
        assert!(!decl.unique);
    }

    #[test]
    fn test_index_declaration_builder() {
        let decl = IndexDeclaration::new(["title", "body"])
            .kind(IndexKind::Text)
            .named("search");
        assert_eq!(decl.fields, vec!["title", "body"]);
        assert_eq!(decl.kind, IndexKind::Text);
        assert_eq!(decl.name.as_deref(), Some("search"));
    }
}
