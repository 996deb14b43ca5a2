//! Cursor-based pagination for list methods.
//!
//! A cursor is an opaque token encoding a zero-based offset into a stably
//! ordered collection. Clients must not interpret it; a cursor that fails
//! to decode restarts from the first page.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A resume position in a paginated collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    offset: usize,
}

impl Cursor {
    /// Creates a cursor pointing at `offset`.
    #[must_use]
    pub const fn new(offset: usize) -> Self {
        Self { offset }
    }

    /// Returns the zero-based offset.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.offset
    }

    /// Encodes the cursor as an opaque token.
    #[must_use]
    pub fn encode(self) -> String {
        // Serialising a struct of one integer cannot fail.
        let json = serde_json::to_vec(&self).unwrap_or_default();
        BASE64_STANDARD.encode(json)
    }

    /// Decodes a token issued by [`Cursor::encode`].
    ///
    /// Returns `None` for anything that is not such a token.
    #[must_use]
    pub fn decode(token: &str) -> Option<Self> {
        let bytes = BASE64_STANDARD.decode(token).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// One page of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Cursor for the following page, absent on the last page.
    pub next_cursor: Option<String>,
}

impl<T: Serialize> Page<T> {
    /// Builds a list result `{<key>: [...], nextCursor?}`.
    ///
    /// `nextCursor` is omitted entirely on the last page.
    ///
    /// # Errors
    ///
    /// Returns an error if an item fails to serialise.
    pub fn into_result(self, key: &str) -> serde_json::Result<Value> {
        let mut result = Map::new();
        result.insert(key.to_string(), serde_json::to_value(self.items)?);
        if let Some(cursor) = self.next_cursor {
            result.insert("nextCursor".to_string(), Value::String(cursor));
        }
        Ok(Value::Object(result))
    }
}

/// Page size policy shared by every list method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    default_per_page: usize,
    max_per_page: usize,
}

impl Paginator {
    /// Creates a paginator; both sizes are raised to at least one.
    #[must_use]
    pub fn new(default_per_page: usize, max_per_page: usize) -> Self {
        Self {
            default_per_page: default_per_page.max(1),
            max_per_page: max_per_page.max(1),
        }
    }

    /// Resolves the effective page size for a request.
    ///
    /// `min(requested ?? default, max)`, never less than one.
    #[must_use]
    pub fn per_page(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_per_page)
            .min(self.max_per_page)
            .max(1)
    }

    /// Returns one page of `items`.
    #[must_use]
    pub fn paginate<T>(&self, items: Vec<T>, requested: Option<usize>, cursor: Option<&str>) -> Page<T> {
        paginate(items, self.per_page(requested), cursor)
    }
}

/// Returns the page of `items` starting at `cursor`.
///
/// An absent or undecodable cursor starts at offset zero. `next_cursor` is
/// present iff `offset + per_page < items.len()`.
#[must_use]
pub fn paginate<T>(items: Vec<T>, per_page: usize, cursor: Option<&str>) -> Page<T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let offset = cursor
        .and_then(Cursor::decode)
        .map_or(0, Cursor::offset)
        .min(total);

    let end = offset.saturating_add(per_page).min(total);
    let next_cursor = (end < total).then(|| Cursor::new(end).encode());

    let items = items.into_iter().skip(offset).take(end - offset).collect();

    Page { items, next_cursor }
}
