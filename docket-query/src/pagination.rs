//! Pagination requests, cursors and page responses.
//!
//! Two modes are supported:
//!
//! - **Offset**: `page`/`limit` (or an explicit `offset`), reports a total count.
//! - **Cursor**: opaque `after`/`before` tokens referencing a document
//!   identifier; no total is reported.
//!
//! ```rust
//! use docket_query::{CursorDirection, PageCursor, PageRequest};
//!
//! let request = PageRequest::offset(2, 10).validate().unwrap();
//! assert_eq!(request.skip(), 10);
//!
//! let cursor = PageCursor::new("65a1f0c2e4b0a1b2c3d4e5f6", CursorDirection::Forward);
//! let token = cursor.encode();
//! assert_eq!(PageCursor::decode(&token).unwrap(), cursor);
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QueryError, QueryResult};

/// Page size used when a request does not specify one.
pub const DEFAULT_PAGE_LIMIT: u64 = 20;

/// Largest page size a request may ask for.
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Pagination mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    /// Skip/limit pagination.
    #[default]
    Offset,
    /// Keyset pagination over opaque cursors.
    Cursor,
}

/// A request for one page of results.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// Pagination mode.
    #[serde(default, rename = "type")]
    pub page_type: PageType,
    /// 1-indexed page number (offset mode).
    #[serde(default)]
    pub page: u64,
    /// Page size; defaulted when zero.
    #[serde(default)]
    pub limit: u64,
    /// Explicit skip count; overrides `page` when set (offset mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Walk backward from this cursor (cursor mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    /// Walk forward from this cursor (cursor mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl PageRequest {
    /// Offset-mode request for a 1-indexed page.
    pub fn offset(page: u64, limit: u64) -> Self {
        Self {
            page_type: PageType::Offset,
            page,
            limit,
            ..Self::default()
        }
    }

    /// Cursor-mode request for the first page.
    pub fn cursor(limit: u64) -> Self {
        Self {
            page_type: PageType::Cursor,
            limit,
            ..Self::default()
        }
    }

    /// Continue forward after the given token.
    pub fn after(mut self, token: impl Into<String>) -> Self {
        self.after = Some(token.into());
        self
    }

    /// Continue backward before the given token.
    pub fn before(mut self, token: impl Into<String>) -> Self {
        self.before = Some(token.into());
        self
    }

    /// Set an explicit skip count.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Normalize defaults and reject contradictory requests.
    ///
    /// After validation `limit` is in `1..=MAX_PAGE_LIMIT` and `page >= 1`.
    pub fn validate(mut self) -> QueryResult<Self> {
        if self.before.is_some() && self.after.is_some() {
            return Err(QueryError::invalid_filter(
                "`before` and `after` are mutually exclusive",
            ));
        }

        if self.limit == 0 {
            self.limit = DEFAULT_PAGE_LIMIT;
        } else if self.limit > MAX_PAGE_LIMIT {
            debug!(requested = self.limit, max = MAX_PAGE_LIMIT, "Clamping page limit");
            self.limit = MAX_PAGE_LIMIT;
        }

        if self.page == 0 {
            self.page = 1;
        }

        Ok(self)
    }

    /// Number of documents to skip in offset mode.
    pub fn skip(&self) -> u64 {
        self.offset
            .unwrap_or_else(|| self.page.saturating_sub(1).saturating_mul(self.limit))
    }

    /// Whether the page is preceded by other pages in offset mode.
    pub fn has_previous_offset(&self) -> bool {
        match self.offset {
            Some(offset) => offset > 0,
            None => self.page > 1,
        }
    }

    /// Direction selected by the request in cursor mode.
    pub fn direction(&self) -> CursorDirection {
        if self.before.is_some() {
            CursorDirection::Backward
        } else {
            CursorDirection::Forward
        }
    }

    /// The cursor token for the selected direction, if any.
    pub fn cursor_token(&self) -> Option<&str> {
        match self.direction() {
            CursorDirection::Backward => self.before.as_deref(),
            CursorDirection::Forward => self.after.as_deref(),
        }
    }
}

/// Direction a cursor walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorDirection {
    /// Toward later documents.
    Forward,
    /// Toward earlier documents.
    Backward,
}

/// A position in a sorted result set.
///
/// Cursors are exchanged with clients as opaque tokens: the JSON form of the
/// cursor, hex encoded. `decode(encode(c)) == c` holds for every cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageCursor {
    /// Identifier of the boundary document.
    pub id: String,
    /// Direction the cursor was issued for.
    pub direction: CursorDirection,
}

impl PageCursor {
    /// Create a new cursor.
    pub fn new(id: impl Into<String>, direction: CursorDirection) -> Self {
        Self {
            id: id.into(),
            direction,
        }
    }

    /// Encode as an opaque token.
    pub fn encode(&self) -> String {
        // Serializing a struct of a String and a unit enum cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(json)
    }

    /// Decode an opaque token.
    pub fn decode(token: &str) -> QueryResult<Self> {
        let bytes = hex::decode(token.trim())
            .map_err(|e| QueryError::invalid_cursor(format!("not a cursor token: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| QueryError::invalid_cursor(format!("malformed cursor payload: {}", e)))
    }
}

/// Metadata describing a returned page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Total matching documents (offset mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Page number (offset mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    /// Page size.
    pub limit: u64,
    /// Another page follows.
    pub has_next: bool,
    /// Another page precedes.
    pub has_previous: bool,
    /// Token for the following page (cursor mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Token for the preceding page (cursor mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_cursor: Option<String>,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The page contents, in display order.
    pub data: Vec<T>,
    /// Page metadata.
    pub pagination: PageInfo,
}

impl<T> PageResponse<T> {
    /// Create a response.
    pub fn new(data: Vec<T>, pagination: PageInfo) -> Self {
        Self { data, pagination }
    }

    /// Number of items on the page.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T> IntoIterator for PageResponse<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_validate_defaults_limit_and_page() {
        let request = PageRequest::default().validate().unwrap();
        assert_eq!(request.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(request.page, 1);
        assert_eq!(request.skip(), 0);
    }

    #[test]
    fn test_validate_clamps_limit() {
        let request = PageRequest::offset(1, 5_000).validate().unwrap();
        assert_eq!(request.limit, MAX_PAGE_LIMIT);
    }

    #[test]
    fn test_validate_rejects_both_directions() {
        let err = PageRequest::cursor(10)
            .after("aa")
            .before("bb")
            .validate()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFilter);
    }

    #[test]
    fn test_skip_from_page_and_offset() {
        let request = PageRequest::offset(3, 25).validate().unwrap();
        assert_eq!(request.skip(), 50);
        assert!(request.has_previous_offset());

        let request = PageRequest::offset(1, 25).with_offset(7).validate().unwrap();
        assert_eq!(request.skip(), 7);
        assert!(request.has_previous_offset());
    }

    #[test]
    fn test_direction_selection() {
        let forward = PageRequest::cursor(10).after("t1");
        assert_eq!(forward.direction(), CursorDirection::Forward);
        assert_eq!(forward.cursor_token(), Some("t1"));

        let backward = PageRequest::cursor(10).before("t2");
        assert_eq!(backward.direction(), CursorDirection::Backward);
        assert_eq!(backward.cursor_token(), Some("t2"));

        assert_eq!(PageRequest::cursor(10).cursor_token(), None);
    }

    #[test]
    fn test_cursor_round_trip() {
        for cursor in [
            PageCursor::new("65a1f0c2e4b0a1b2c3d4e5f6", CursorDirection::Forward),
            PageCursor::new("order-0042", CursorDirection::Backward),
            PageCursor::new("", CursorDirection::Forward),
            PageCursor::new("ünïcødé \"quoted\"", CursorDirection::Backward),
        ] {
            assert_eq!(PageCursor::decode(&cursor.encode()).unwrap(), cursor);
        }
    }

    #[test]
    fn test_cursor_decode_rejects_garbage() {
        assert_eq!(
            PageCursor::decode("zz-not-hex").unwrap_err().code,
            ErrorCode::InvalidCursor
        );
        assert_eq!(
            PageCursor::decode(&hex::encode("{}")).unwrap_err().code,
            ErrorCode::InvalidCursor
        );
    }

    #[test]
    fn test_page_info_serializes_camel_case() {
        let info = PageInfo {
            total: Some(25),
            page: Some(1),
            limit: 10,
            has_next: true,
            ..PageInfo::default()
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["hasNext"], true);
        assert_eq!(json["hasPrevious"], false);
        assert!(json.get("nextCursor").is_none());
    }

    #[test]
    fn test_request_deserializes_type_field() {
        let request: PageRequest =
            serde_json::from_str(r#"{"type": "cursor", "limit": 5, "after": "abc"}"#).unwrap();
        assert_eq!(request.page_type, PageType::Cursor);
        assert_eq!(request.after.as_deref(), Some("abc"));
    }
}
