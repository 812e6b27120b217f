//! Length-aware, simple, and cursor paginators.
//!
//! [`Connection::paginate`] counts first and fetches the page only
//! when something matched. [`Connection::simple_paginate`] skips the
//! count by probing one row past the page. [`Connection::cursor_paginate`]
//! keyset-pages on the query's order columns with an opaque [`Cursor`]
//! token, which stays correct when rows shift between requests.
//!
//! Each paginator serializes to the JSON shape its page type defines,
//! with page URLs built from a caller-supplied base path.

use quarry_core::builder::Builder;
use quarry_core::cursor::Cursor;
use quarry_core::value::Value;
use serde::Serialize;

use crate::connection::Connection;
use crate::driver::Row;
use crate::error::Result;
use crate::exec::strip_table;

/// Base path and query-string key for page URLs.
#[derive(Debug, Clone)]
pub struct PageOptions {
    /// URL path the page links hang off.
    pub path: String,
    /// Query-string parameter carrying the page number.
    pub page_name: String,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            path: String::from("/"),
            page_name: String::from("page"),
        }
    }
}

/// Base path and query-string key for cursor URLs.
#[derive(Debug, Clone)]
pub struct CursorOptions {
    /// URL path the page links hang off.
    pub path: String,
    /// Query-string parameter carrying the encoded cursor.
    pub cursor_name: String,
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self {
            path: String::from("/"),
            cursor_name: String::from("cursor"),
        }
    }
}

fn normalize_path(path: &str) -> String {
    if path == "/" {
        String::from(path)
    } else {
        String::from(path.trim_end_matches('/'))
    }
}

fn page_url(path: &str, page_name: &str, page: u64) -> String {
    let page = page.max(1);
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{page_name}={page}")
}

fn cursor_url(path: &str, cursor_name: &str, cursor: &Cursor) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{cursor_name}={}", cursor.encode())
}

/// A page that knows the total row count.
///
/// Serializes with its fields in declaration order, `from` and `to`
/// being the one-based positions of the page's first and last row.
#[derive(Debug, Clone, Serialize)]
pub struct LengthAwarePage<T> {
    /// The page these rows belong to.
    pub current_page: u64,
    /// The rows of this page.
    pub data: Vec<T>,
    /// URL of page one.
    pub first_page_url: String,
    /// Position of the first row, `None` on an empty page.
    pub from: Option<u64>,
    /// The highest page number.
    pub last_page: u64,
    /// URL of the last page.
    pub last_page_url: String,
    /// URL of the following page, when one exists.
    pub next_page_url: Option<String>,
    /// Normalized base path.
    pub path: String,
    /// Rows per page.
    pub per_page: u64,
    /// URL of the preceding page, when one exists.
    pub prev_page_url: Option<String>,
    /// Position of the last row, `None` on an empty page.
    pub to: Option<u64>,
    /// Total matching rows across all pages.
    pub total: u64,
}

impl<T> LengthAwarePage<T> {
    /// Builds a page from fetched rows and the overall count.
    #[must_use]
    pub fn new(
        data: Vec<T>,
        total: u64,
        per_page: u64,
        current_page: u64,
        options: &PageOptions,
    ) -> Self {
        let path = normalize_path(&options.path);
        let per = per_page.max(1);
        let current = current_page.max(1);
        let last_page = total.div_ceil(per).max(1);
        let count = u64::try_from(data.len()).unwrap_or(u64::MAX);
        let from = (count > 0).then(|| (current - 1) * per + 1);
        let to = from.map(|start| start + count - 1);
        let first_page_url = page_url(&path, &options.page_name, 1);
        let last_page_url = page_url(&path, &options.page_name, last_page);
        let next_page_url =
            (current < last_page).then(|| page_url(&path, &options.page_name, current + 1));
        let prev_page_url = (current > 1).then(|| page_url(&path, &options.page_name, current - 1));
        Self {
            current_page: current,
            data,
            first_page_url,
            from,
            last_page,
            last_page_url,
            next_page_url,
            path,
            per_page: per,
            prev_page_url,
            to,
            total,
        }
    }

    /// Whether pages follow this one.
    #[must_use]
    pub const fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// A page without a total, based on probing one row past the page.
#[derive(Debug, Clone, Serialize)]
pub struct SimplePage<T> {
    /// The page these rows belong to.
    pub current_page: u64,
    /// The rows of this page.
    pub data: Vec<T>,
    /// URL of page one.
    pub first_page_url: String,
    /// Position of the first row, `None` on an empty page.
    pub from: Option<u64>,
    /// URL of the following page, when one exists.
    pub next_page_url: Option<String>,
    /// Normalized base path.
    pub path: String,
    /// Rows per page.
    pub per_page: u64,
    /// URL of the preceding page, when one exists.
    pub prev_page_url: Option<String>,
    /// Position of the last row, `None` on an empty page.
    pub to: Option<u64>,
    #[serde(skip)]
    has_more: bool,
}

impl<T> SimplePage<T> {
    /// Builds a page from a probe fetch of `per_page + 1` rows; the
    /// extra row only signals that another page exists.
    #[must_use]
    pub fn new(mut data: Vec<T>, per_page: u64, current_page: u64, options: &PageOptions) -> Self {
        let path = normalize_path(&options.path);
        let per = per_page.max(1);
        let current = current_page.max(1);
        let keep = usize::try_from(per).unwrap_or(usize::MAX);
        let has_more = data.len() > keep;
        data.truncate(keep);
        let count = u64::try_from(data.len()).unwrap_or(u64::MAX);
        let from = (count > 0).then(|| (current - 1) * per + 1);
        let to = from.map(|start| start + count - 1);
        let first_page_url = page_url(&path, &options.page_name, 1);
        let next_page_url = has_more.then(|| page_url(&path, &options.page_name, current + 1));
        let prev_page_url = (current > 1).then(|| page_url(&path, &options.page_name, current - 1));
        Self {
            current_page: current,
            data,
            first_page_url,
            from,
            next_page_url,
            path,
            per_page: per,
            prev_page_url,
            to,
            has_more,
        }
    }

    /// Whether pages follow this one.
    #[must_use]
    pub const fn has_more_pages(&self) -> bool {
        self.has_more
    }
}

/// A keyset page bounded by opaque cursors instead of page numbers.
#[derive(Debug, Clone, Serialize)]
pub struct CursorPage<T> {
    /// The rows of this page, in presentation order.
    pub data: Vec<T>,
    /// Normalized base path.
    pub path: String,
    /// Rows per page.
    pub per_page: u64,
    /// URL continuing forward, when rows follow.
    pub next_page_url: Option<String>,
    /// URL going back, when rows precede.
    pub prev_page_url: Option<String>,
    #[serde(skip)]
    next_cursor: Option<Cursor>,
    #[serde(skip)]
    prev_cursor: Option<Cursor>,
}

impl<T> CursorPage<T> {
    /// Whether rows follow this page.
    #[must_use]
    pub const fn has_more_pages(&self) -> bool {
        self.next_cursor.is_some()
    }

    /// Cursor for the page after this one.
    #[must_use]
    pub const fn next_cursor(&self) -> Option<&Cursor> {
        self.next_cursor.as_ref()
    }

    /// Cursor for the page before this one.
    #[must_use]
    pub const fn prev_cursor(&self) -> Option<&Cursor> {
        self.prev_cursor.as_ref()
    }
}

impl CursorPage<Row> {
    /// Builds a page from a probe fetch of `per_page + 1` rows.
    ///
    /// A backward page was fetched in flipped order, so its kept rows
    /// reverse back into presentation order. End cursors come from the
    /// boundary rows' values for the order `parameters`.
    #[must_use]
    pub fn from_rows(
        mut rows: Vec<Row>,
        per_page: u64,
        cursor: Option<Cursor>,
        parameters: &[String],
        options: &CursorOptions,
    ) -> Self {
        let path = normalize_path(&options.path);
        let per = per_page.max(1);
        let keep = usize::try_from(per).unwrap_or(usize::MAX);
        let has_more = rows.len() > keep;
        rows.truncate(keep);
        if cursor.as_ref().is_some_and(Cursor::points_backward) {
            rows.reverse();
        }

        let prev_cursor = match (&cursor, rows.first()) {
            (Some(current), Some(first)) if !(current.points_backward() && !has_more) => {
                Some(Cursor::new(item_parameters(first, parameters), false))
            }
            _ => None,
        };
        let next_cursor = match rows.last() {
            Some(last) if has_more || cursor.as_ref().is_some_and(Cursor::points_backward) => {
                Some(Cursor::new(item_parameters(last, parameters), true))
            }
            _ => None,
        };

        let next_page_url = next_cursor
            .as_ref()
            .map(|next| cursor_url(&path, &options.cursor_name, next));
        let prev_page_url = prev_cursor
            .as_ref()
            .map(|prev| cursor_url(&path, &options.cursor_name, prev));
        Self {
            data: rows,
            path,
            per_page: per,
            next_page_url,
            prev_page_url,
            next_cursor,
            prev_cursor,
        }
    }
}

/// Boundary values for a cursor, one per order column. A qualified
/// column falls back to its bare name, since rows key by that.
fn item_parameters(row: &Row, parameters: &[String]) -> Vec<(String, Value)> {
    parameters
        .iter()
        .map(|name| {
            let value = row
                .get(name)
                .or_else(|| row.get(strip_table(name)))
                .cloned()
                .unwrap_or(Value::Null);
            (name.clone(), value)
        })
        .collect()
}

impl Connection {
    /// Pages the query with a full count, returning page `page`.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`crate::Error::Query`]
    /// when execution fails.
    pub fn paginate(
        &mut self,
        query: &Builder,
        per_page: u64,
        page: u64,
        options: &PageOptions,
    ) -> Result<LengthAwarePage<Row>> {
        let current = page.max(1);
        let total = u64::try_from(self.count_for_pagination(query)?).unwrap_or(0);
        let data = if total > 0 {
            self.get(&query.clone().for_page(current, per_page))?
        } else {
            Vec::new()
        };
        Ok(LengthAwarePage::new(data, total, per_page, current, options))
    }

    /// Pages the query without counting, probing one row past the
    /// page to learn whether more follow.
    ///
    /// # Errors
    ///
    /// Compilation errors from the grammar, or [`crate::Error::Query`]
    /// when execution fails.
    pub fn simple_paginate(
        &mut self,
        query: &Builder,
        per_page: u64,
        page: u64,
        options: &PageOptions,
    ) -> Result<SimplePage<Row>> {
        let current = page.max(1);
        let probe = query
            .clone()
            .skip((current - 1) * per_page)
            .take(per_page + 1);
        let data = self.get(&probe)?;
        Ok(SimplePage::new(data, per_page, current, options))
    }

    /// Keyset-pages the query from `cursor`, or from the start when
    /// `None`. The query must carry a directed column order.
    ///
    /// # Errors
    ///
    /// [`quarry_core::Error::MissingOrderBy`] without a directed
    /// order, [`quarry_core::Error::CursorParameter`] when the cursor
    /// lacks an ordered column, plus the usual execution errors.
    pub fn cursor_paginate(
        &mut self,
        query: &Builder,
        per_page: u64,
        cursor: Option<Cursor>,
        options: &CursorOptions,
    ) -> Result<CursorPage<Row>> {
        let should_reverse = cursor.as_ref().is_some_and(Cursor::points_backward);
        let mut probe = query.clone();
        let orders = probe.ensure_order_for_cursor(should_reverse)?;
        if let Some(current) = &cursor {
            probe = probe.apply_cursor(current, &orders)?;
        }
        let rows = self.get(&probe.take(per_page + 1))?;
        let parameters: Vec<String> = orders.into_iter().map(|(column, _)| column).collect();
        Ok(CursorPage::from_rows(
            rows, per_page, cursor, &parameters, options,
        ))
    }
}
