//! Offset and cursor pagination over any [`PageSource`].
//!
//! Both modes fetch one document more than the page size to learn whether
//! another page follows without a second query.
//!
//! Cursor mode is keyset pagination: a cursor names the boundary document by
//! identifier. When the primary sort key is `_id` the boundary is a single
//! range condition; for any other key the boundary document is looked up
//! once and the page is ordered by `(key, _id)` so ties are stable.
//!
//! Missing and null keys sort below every other value. Range operators
//! never match them, so the boundary names them explicitly.

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use docket_query::{
    CursorDirection, PageCursor, PageInfo, PageRequest, PageResponse, PageType, SortOrder,
};
use tracing::debug;

use crate::document::DocumentExt;
use crate::error::{MongoError, MongoResult};
use crate::filter::and_filters;
use crate::id::{DocumentId, ID_FIELD};
use crate::options::FindOptions;

/// The reads pagination is built from.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Number of documents matching `filter`.
    async fn count(&self, filter: Document) -> MongoResult<u64>;

    /// Documents matching `filter`, honoring sort, skip, limit and projection.
    async fn find(&self, filter: Document, options: FindOptions) -> MongoResult<Vec<Document>>;
}

/// Fetch one page of `filter` from `source`.
///
/// `options` supplies ordering and projection; its limit and skip are
/// replaced by the request's window.
pub async fn paginate<S>(
    source: &S,
    filter: Document,
    options: FindOptions,
    request: PageRequest,
) -> MongoResult<PageResponse<Document>>
where
    S: PageSource + ?Sized,
{
    let request = request.validate()?;
    match request.page_type {
        PageType::Offset => paginate_offset(source, filter, options, &request).await,
        PageType::Cursor => paginate_cursor(source, filter, options, &request).await,
    }
}

async fn paginate_offset<S>(
    source: &S,
    filter: Document,
    mut options: FindOptions,
    request: &PageRequest,
) -> MongoResult<PageResponse<Document>>
where
    S: PageSource + ?Sized,
{
    let limit = request.limit;
    // ties on the caller's keys would otherwise shift between pages
    if !options.sort.iter().any(|(field, _)| field == ID_FIELD) {
        options.sort.push((ID_FIELD.to_string(), SortOrder::Asc));
    }
    options.skip = Some(request.skip());
    options.limit = Some(limit + 1);

    debug!(skip = request.skip(), limit, "Fetching offset page");
    let (total, mut data) =
        futures::try_join!(source.count(filter.clone()), source.find(filter, options))?;

    let has_next = data.len() as u64 > limit;
    data.truncate(limit as usize);

    Ok(PageResponse::new(
        data,
        PageInfo {
            total: Some(total),
            page: Some(request.page),
            limit,
            has_next,
            has_previous: request.has_previous_offset(),
            next_cursor: None,
            prev_cursor: None,
        },
    ))
}

async fn paginate_cursor<S>(
    source: &S,
    filter: Document,
    options: FindOptions,
    request: &PageRequest,
) -> MongoResult<PageResponse<Document>>
where
    S: PageSource + ?Sized,
{
    let limit = request.limit;
    let direction = request.direction();
    let (sort_field, requested) = options
        .primary_sort()
        .map(|(field, order)| (field.to_string(), order))
        .unwrap_or_else(|| (ID_FIELD.to_string(), SortOrder::Asc));

    let effective = match direction {
        CursorDirection::Forward => requested,
        CursorDirection::Backward => requested.reverse(),
    };

    let token = request.cursor_token();
    let mut page_filter = filter.clone();
    if let Some(token) = token {
        let cursor = PageCursor::decode(token)?;
        let boundary = boundary_filter(source, &filter, &sort_field, effective, &cursor.id).await?;
        page_filter = and_filters(page_filter, boundary);
    }

    let mut page_options = FindOptions {
        sort: vec![(sort_field.clone(), effective)],
        limit: Some(limit + 1),
        skip: None,
        projection: options.projection.clone(),
    };
    if sort_field != ID_FIELD {
        page_options.sort.push((ID_FIELD.to_string(), effective));
    }

    debug!(
        sort = %sort_field,
        ?direction,
        has_cursor = token.is_some(),
        limit,
        "Fetching cursor page"
    );
    let mut data = source.find(page_filter, page_options).await?;

    let has_more = data.len() as u64 > limit;
    data.truncate(limit as usize);
    if direction == CursorDirection::Backward {
        data.reverse();
    }

    let next_cursor = data
        .last()
        .and_then(|d| d.id())
        .map(|id| PageCursor::new(id.to_string(), CursorDirection::Forward).encode());
    let prev_cursor = data
        .first()
        .and_then(|d| d.id())
        .map(|id| PageCursor::new(id.to_string(), CursorDirection::Backward).encode());

    let (has_next, has_previous) = match direction {
        CursorDirection::Forward => (has_more, token.is_some()),
        CursorDirection::Backward => (token.is_some(), has_more),
    };

    Ok(PageResponse::new(
        data,
        PageInfo {
            total: None,
            page: None,
            limit,
            has_next,
            has_previous,
            next_cursor,
            prev_cursor,
        },
    ))
}

/// The condition selecting documents strictly past the cursor in the
/// effective sort order.
///
/// The range operator follows the effective order, so a backward walk over
/// a descending sort compares with `$gt`.
async fn boundary_filter<S>(
    source: &S,
    filter: &Document,
    sort_field: &str,
    effective: SortOrder,
    cursor_id: &str,
) -> MongoResult<Document>
where
    S: PageSource + ?Sized,
{
    let op = match effective {
        SortOrder::Asc => "$gt",
        SortOrder::Desc => "$lt",
    };
    let id = DocumentId::parse(cursor_id).to_bson();

    if sort_field == ID_FIELD {
        let mut range = Document::new();
        range.insert(op, id);
        return Ok(doc! { ID_FIELD: range });
    }

    let lookup = FindOptions::new().limit(1);
    let anchor = source
        .find(and_filters(filter.clone(), doc! { ID_FIELD: id.clone() }), lookup)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| MongoError::invalid_filter("cursor references a missing document"))?;
    let key = anchor.get(sort_field).cloned().unwrap_or(Bson::Null);
    let null_key = key == Bson::Null;

    let mut past_id = Document::new();
    past_id.insert(op, id);
    let mut tie_past = Document::new();
    tie_past.insert(sort_field, key.clone());
    tie_past.insert(ID_FIELD, past_id);

    let branches = match (effective, null_key) {
        // nulls first: everything keyed follows
        (SortOrder::Asc, true) => vec![keyed(sort_field, "$ne", Bson::Null), tie_past],
        (SortOrder::Asc, false) => vec![keyed(sort_field, op, key), tie_past],
        // nulls last: only null ties remain
        (SortOrder::Desc, true) => return Ok(tie_past),
        (SortOrder::Desc, false) => {
            let mut unkeyed = Document::new();
            unkeyed.insert(sort_field, Bson::Null);
            vec![keyed(sort_field, op, key), tie_past, unkeyed]
        }
    };

    Ok(doc! { "$or": branches })
}

fn keyed(field: &str, op: &str, value: Bson) -> Document {
    let mut condition = Document::new();
    condition.insert(op, value);
    let mut keyed = Document::new();
    keyed.insert(field, condition);
    keyed
}
