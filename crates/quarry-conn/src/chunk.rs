//! Walks large result sets in chunks.
//!
//! [`Connection::chunk`] pages by limit and offset, which needs a
//! stable order and re-evaluates the query between pages. The
//! `_by_id` variants keyset-page on a column instead, so rows
//! modified mid-walk are not skipped or repeated. [`Lazy`] wraps the
//! same walks behind a pull-based iterator that fetches a chunk only
//! when the buffer runs dry.

use std::collections::VecDeque;

use quarry_core::builder::Builder;
use quarry_core::error::Error as CoreError;
use quarry_core::value::Value;

use crate::connection::Connection;
use crate::driver::Row;
use crate::error::{Error, Result};
use crate::exec::strip_table;

impl Connection {
    /// Feeds the callback `size` rows at a time with the one-based
    /// chunk number. Returning `Ok(false)` stops the walk and reports
    /// `false`.
    ///
    /// # Errors
    ///
    /// [`CoreError::MissingOrderBy`] when the query has no order, plus
    /// the usual compilation and execution errors.
    pub fn chunk<F>(&mut self, query: &Builder, size: u64, mut callback: F) -> Result<bool>
    where
        F: FnMut(&[Row], u64) -> Result<bool>,
    {
        enforce_order_by(query)?;
        let expected = usize::try_from(size).unwrap_or(usize::MAX);
        let mut page: u64 = 1;
        loop {
            let rows = self.get(&query.clone().for_page(page, size))?;
            let count = rows.len();
            if count == 0 {
                break;
            }
            if !callback(&rows, page)? {
                return Ok(false);
            }
            if count < expected {
                break;
            }
            page += 1;
        }
        Ok(true)
    }

    /// Feeds the callback one row at a time with its index within the
    /// current chunk.
    ///
    /// # Errors
    ///
    /// [`CoreError::MissingOrderBy`] when the query has no order, plus
    /// the usual compilation and execution errors.
    pub fn each<F>(&mut self, query: &Builder, size: u64, mut callback: F) -> Result<bool>
    where
        F: FnMut(&Row, usize) -> Result<bool>,
    {
        self.chunk(query, size, |rows, _| {
            for (index, row) in rows.iter().enumerate() {
                if !callback(row, index)? {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }

    /// Chunks by keyset-paging on `column`, ordering by it ascending
    /// and resuming each chunk after the last seen value.
    ///
    /// # Errors
    ///
    /// [`Error::MissingChunkColumn`] when a fetched row lacks the
    /// paging column, plus the usual compilation and execution errors.
    pub fn chunk_by_id<F>(
        &mut self,
        query: &Builder,
        size: u64,
        column: &str,
        mut callback: F,
    ) -> Result<bool>
    where
        F: FnMut(&[Row], u64) -> Result<bool>,
    {
        let key = strip_table(column);
        let expected = usize::try_from(size).unwrap_or(usize::MAX);
        let mut last_id: Option<Value> = None;
        let mut page: u64 = 1;
        loop {
            let probe = query.clone().for_page_after_id(size, last_id.take(), column);
            let rows = self.get(&probe)?;
            let count = rows.len();
            if count == 0 {
                break;
            }
            if !callback(&rows, page)? {
                return Ok(false);
            }
            last_id = rows
                .last()
                .and_then(|row| row.get(key))
                .filter(|value| !value.is_null())
                .cloned();
            if last_id.is_none() {
                return Err(Error::MissingChunkColumn(String::from(key)));
            }
            if count < expected {
                break;
            }
            page += 1;
        }
        Ok(true)
    }

    /// Keyset-paged [`Connection::each`], with a running row index.
    ///
    /// # Errors
    ///
    /// [`Error::MissingChunkColumn`] when a fetched row lacks the
    /// paging column, plus the usual compilation and execution errors.
    pub fn each_by_id<F>(
        &mut self,
        query: &Builder,
        size: u64,
        column: &str,
        mut callback: F,
    ) -> Result<bool>
    where
        F: FnMut(&Row, u64) -> Result<bool>,
    {
        let mut index: u64 = 0;
        self.chunk_by_id(query, size, column, |rows, _| {
            for row in rows {
                if !callback(row, index)? {
                    return Ok(false);
                }
                index += 1;
            }
            Ok(true)
        })
    }

    /// A lazy row stream over limit-and-offset pages.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidArgument`] when `size` is zero, or
    /// [`CoreError::MissingOrderBy`] when the query has no order.
    pub fn lazy(&mut self, query: &Builder, size: u64) -> Result<Lazy<'_>> {
        ensure_chunk_size(size)?;
        enforce_order_by(query)?;
        Ok(Lazy::new(self, query.clone(), size, LazyMode::ByPage { page: 1 }))
    }

    /// A lazy row stream keyset-paged on `column`, ascending.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidArgument`] when `size` is zero.
    pub fn lazy_by_id(&mut self, query: &Builder, size: u64, column: &str) -> Result<Lazy<'_>> {
        ensure_chunk_size(size)?;
        Ok(Lazy::new(
            self,
            query.clone(),
            size,
            LazyMode::ById {
                column: String::from(column),
                last_id: None,
                descending: false,
            },
        ))
    }

    /// A lazy row stream keyset-paged on `column`, descending.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidArgument`] when `size` is zero.
    pub fn lazy_by_id_desc(
        &mut self,
        query: &Builder,
        size: u64,
        column: &str,
    ) -> Result<Lazy<'_>> {
        ensure_chunk_size(size)?;
        Ok(Lazy::new(
            self,
            query.clone(),
            size,
            LazyMode::ById {
                column: String::from(column),
                last_id: None,
                descending: true,
            },
        ))
    }
}

fn enforce_order_by(query: &Builder) -> Result<()> {
    if query.orders.is_empty() && query.union_orders.is_empty() {
        return Err(CoreError::MissingOrderBy.into());
    }
    Ok(())
}

fn ensure_chunk_size(size: u64) -> Result<()> {
    if size == 0 {
        return Err(CoreError::InvalidArgument(String::from(
            "the chunk size should be at least 1",
        ))
        .into());
    }
    Ok(())
}

enum LazyMode {
    ByPage {
        page: u64,
    },
    ById {
        column: String,
        last_id: Option<Value>,
        descending: bool,
    },
}

/// Iterator over a chunked walk; each `next` serves from a buffer and
/// fetches the following chunk only when the buffer empties.
pub struct Lazy<'c> {
    conn: &'c mut Connection,
    query: Builder,
    size: u64,
    mode: LazyMode,
    buffer: VecDeque<Row>,
    finished: bool,
}

impl<'c> Lazy<'c> {
    fn new(conn: &'c mut Connection, query: Builder, size: u64, mode: LazyMode) -> Self {
        Self {
            conn,
            query,
            size,
            mode,
            buffer: VecDeque::new(),
            finished: false,
        }
    }

    fn fill(&mut self) -> Result<()> {
        let expected = usize::try_from(self.size).unwrap_or(usize::MAX);
        let probe = match &mut self.mode {
            LazyMode::ByPage { page } => {
                let current = *page;
                *page += 1;
                self.query.clone().for_page(current, self.size)
            }
            LazyMode::ById {
                column,
                last_id,
                descending,
            } => {
                let query = self.query.clone();
                if *descending {
                    query.for_page_before_id(self.size, last_id.take(), column)
                } else {
                    query.for_page_after_id(self.size, last_id.take(), column)
                }
            }
        };
        let rows = self.conn.get(&probe)?;
        if rows.len() < expected {
            self.finished = true;
        } else if let LazyMode::ById {
            column, last_id, ..
        } = &mut self.mode
        {
            let key = strip_table(column);
            let next = rows
                .last()
                .and_then(|row| row.get(key))
                .filter(|value| !value.is_null())
                .cloned();
            if next.is_none() {
                return Err(Error::MissingChunkColumn(String::from(key)));
            }
            *last_id = next;
        }
        self.buffer.extend(rows);
        Ok(())
    }
}

impl Iterator for Lazy<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(row) = self.buffer.pop_front() {
            return Some(Ok(row));
        }
        if self.finished {
            return None;
        }
        if let Err(error) = self.fill() {
            self.finished = true;
            return Some(Err(error));
        }
        self.buffer.pop_front().map(Ok)
    }
}
