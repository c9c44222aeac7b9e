//! Identifier normalization between opaque strings and ObjectIds.
//!
//! Collections may mix caller-supplied string identifiers with native
//! ObjectIds. A string that parses as a 24-character hex ObjectId is always
//! treated as one; anything else is kept verbatim.

use std::fmt;
use std::str::FromStr;

use bson::Bson;
use bson::oid::ObjectId;
use docket_query::FilterValue;

/// The identifier field every document carries.
pub const ID_FIELD: &str = "_id";

/// A document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentId {
    /// A native ObjectId.
    ObjectId(ObjectId),
    /// A caller-supplied string that is not an ObjectId.
    String(String),
}

impl DocumentId {
    /// Normalize an opaque string identifier.
    pub fn parse(id: &str) -> Self {
        match ObjectId::parse_str(id) {
            Ok(oid) => Self::ObjectId(oid),
            Err(_) => Self::String(id.to_string()),
        }
    }

    /// Generate a fresh ObjectId.
    pub fn generate() -> Self {
        Self::ObjectId(ObjectId::new())
    }

    /// Read an identifier back from a stored value.
    pub fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::ObjectId(oid) => Some(Self::ObjectId(*oid)),
            Bson::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }

    /// Whether this is a native ObjectId.
    pub fn is_object_id(&self) -> bool {
        matches!(self, Self::ObjectId(_))
    }

    /// The ObjectId, if native.
    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Self::ObjectId(oid) => Some(*oid),
            Self::String(_) => None,
        }
    }

    /// The value stored in the `_id` field.
    pub fn to_bson(&self) -> Bson {
        match self {
            Self::ObjectId(oid) => Bson::ObjectId(*oid),
            Self::String(s) => Bson::String(s.clone()),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObjectId(oid) => write!(f, "{}", oid.to_hex()),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl FromStr for DocumentId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        Self::ObjectId(oid)
    }
}

impl From<DocumentId> for Bson {
    fn from(id: DocumentId) -> Self {
        match id {
            DocumentId::ObjectId(oid) => Bson::ObjectId(oid),
            DocumentId::String(s) => Bson::String(s),
        }
    }
}

/// Coerce a value assigned to or compared with `_id`.
///
/// Strings that parse as ObjectIds become ObjectIds, arrays are coerced
/// element-wise, everything else passes through.
pub fn normalize_bson(value: Bson) -> Bson {
    match value {
        Bson::String(s) => DocumentId::parse(&s).into(),
        Bson::Array(items) => Bson::Array(items.into_iter().map(normalize_bson).collect()),
        other => other,
    }
}

/// Convert a filter operand to BSON.
pub fn filter_value_to_bson(value: &FilterValue) -> Bson {
    match value {
        FilterValue::Null => Bson::Null,
        FilterValue::Bool(b) => Bson::Boolean(*b),
        FilterValue::Int(i) => Bson::Int64(*i),
        FilterValue::Float(f) => Bson::Double(*f),
        FilterValue::String(s) => Bson::String(s.clone()),
        FilterValue::List(items) => Bson::Array(items.iter().map(filter_value_to_bson).collect()),
        FilterValue::Map(map) => Bson::Document(
            map.iter()
                .map(|(k, v)| (k.clone(), filter_value_to_bson(v)))
                .collect(),
        ),
    }
}

/// Convert a filter operand, coercing identifiers when `field` is `_id`.
pub fn operand_for(field: &str, value: &FilterValue) -> Bson {
    let bson = filter_value_to_bson(value);
    if field == ID_FIELD {
        normalize_bson(bson)
    } else {
        bson
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "65a1f0c2e4b0a1b2c3d4e5f6";

    #[test]
    fn test_parse_valid_object_id() {
        let id = DocumentId::parse(HEX);
        assert!(id.is_object_id());
        assert_eq!(id.to_string(), HEX);
        assert_eq!(id.to_bson(), Bson::ObjectId(ObjectId::parse_str(HEX).unwrap()));
    }

    #[test]
    fn test_parse_keeps_other_strings_verbatim() {
        for raw in ["order-42", "65a1f0c2e4b0a1b2c3d4e5f", "ZZa1f0c2e4b0a1b2c3d4e5f6", ""] {
            let id = DocumentId::parse(raw);
            assert_eq!(id, DocumentId::String(raw.to_string()));
            assert_eq!(id.to_string(), raw);
        }
    }

    #[test]
    fn test_normalize_bson_arrays() {
        let oid = ObjectId::parse_str(HEX).unwrap();
        let normalized = normalize_bson(Bson::Array(vec![
            Bson::String(HEX.to_string()),
            Bson::String("legacy".to_string()),
            Bson::Int32(7),
        ]));
        assert_eq!(
            normalized,
            Bson::Array(vec![
                Bson::ObjectId(oid),
                Bson::String("legacy".to_string()),
                Bson::Int32(7),
            ])
        );
    }

    #[test]
    fn test_operand_for_only_coerces_id_field() {
        let value = FilterValue::from(HEX);
        assert!(matches!(operand_for("_id", &value), Bson::ObjectId(_)));
        assert_eq!(operand_for("ref", &value), Bson::String(HEX.to_string()));
    }

    #[test]
    fn test_from_bson() {
        let oid = ObjectId::new();
        assert_eq!(
            DocumentId::from_bson(&Bson::ObjectId(oid)),
            Some(DocumentId::ObjectId(oid))
        );
        assert_eq!(
            DocumentId::from_bson(&Bson::String("a".into())),
            Some(DocumentId::String("a".into()))
        );
        assert_eq!(DocumentId::from_bson(&Bson::Int32(1)), None);
    }
}
