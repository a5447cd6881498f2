use crate::{error::Error, query::Sort, value::Value};
use serde::{Deserialize, Serialize};

///
/// Cursor
///
/// Sort-key values of one element, in sort order.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Cursor(Vec<Value>);

impl Cursor {
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for Cursor {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

///
/// PageMode
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PageMode {
    /// 1-based page number over an offset window.
    Offset { page: u64 },

    /// Elements strictly after the cursor.
    After(Cursor),

    /// Elements strictly before the cursor.
    Before(Cursor),
}

///
/// PageRequest
///
/// Which slice of a result to fetch, plus sort overrides applied after
/// any sorting the repository method already declares.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "PageRequestParts")]
pub struct PageRequest {
    mode: PageMode,
    size: u64,
    sorts: Vec<Sort>,
}

/// Unchecked wire form of a [`PageRequest`].
#[derive(Deserialize)]
struct PageRequestParts {
    mode: PageMode,
    size: u64,
    #[serde(default)]
    sorts: Vec<Sort>,
}

impl TryFrom<PageRequestParts> for PageRequest {
    type Error = Error;

    fn try_from(parts: PageRequestParts) -> Result<Self, Self::Error> {
        let request = match parts.mode {
            PageMode::Offset { page } => Self::of(page, parts.size)?,
            mode => Self::cursor(mode, parts.size)?,
        };

        Ok(request.with_sorts(parts.sorts))
    }
}

impl PageRequest {
    /// Offset request; `page` and `size` are both at least 1.
    pub fn of(page: u64, size: u64) -> Result<Self, Error> {
        if page == 0 {
            return Err(Error::invalid_page("page numbers start at 1"));
        }
        validate_size(size)?;

        Ok(Self {
            mode: PageMode::Offset { page },
            size,
            sorts: Vec::new(),
        })
    }

    /// First page of `size` elements.
    pub fn of_size(size: u64) -> Result<Self, Error> {
        Self::of(1, size)
    }

    pub fn after_cursor(cursor: Cursor, size: u64) -> Result<Self, Error> {
        Self::cursor(PageMode::After(cursor), size)
    }

    pub fn before_cursor(cursor: Cursor, size: u64) -> Result<Self, Error> {
        Self::cursor(PageMode::Before(cursor), size)
    }

    fn cursor(mode: PageMode, size: u64) -> Result<Self, Error> {
        validate_size(size)?;

        Ok(Self {
            mode,
            size,
            sorts: Vec::new(),
        })
    }

    /// Builder-style sort override.
    #[must_use]
    pub fn sort_by(mut self, sort: Sort) -> Self {
        self.sorts.push(sort);
        self
    }

    #[must_use]
    pub fn with_sorts(mut self, sorts: Vec<Sort>) -> Self {
        self.sorts = sorts;
        self
    }

    #[must_use]
    pub const fn mode(&self) -> &PageMode {
        &self.mode
    }

    /// Page number for offset requests.
    #[must_use]
    pub const fn page(&self) -> Option<u64> {
        match self.mode {
            PageMode::Offset { page } => Some(page),
            PageMode::After(_) | PageMode::Before(_) => None,
        }
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }

    #[must_use]
    pub const fn cursor_value(&self) -> Option<&Cursor> {
        match &self.mode {
            PageMode::After(cursor) | PageMode::Before(cursor) => Some(cursor),
            PageMode::Offset { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_cursor(&self) -> bool {
        !matches!(self.mode, PageMode::Offset { .. })
    }

    /// Elements to skip: `size * (page - 1)`; zero for cursor requests.
    #[must_use]
    pub const fn skip(&self) -> u64 {
        match self.mode {
            PageMode::Offset { page } => self.size.saturating_mul(page.saturating_sub(1)),
            PageMode::After(_) | PageMode::Before(_) => 0,
        }
    }

    /// The following offset page, same size and sorts.
    pub fn next(&self) -> Result<Self, Error> {
        let page = self.offset_page("next")?;
        let next = page
            .checked_add(1)
            .ok_or_else(|| Error::invalid_page("page number overflows"))?;

        Ok(self.at_page(next))
    }

    /// The preceding offset page; fails on page 1.
    pub fn previous(&self) -> Result<Self, Error> {
        self.offset_page("previous")?
            .checked_sub(1)
            .filter(|page| *page >= 1)
            .map(|page| self.at_page(page))
            .ok_or_else(|| Error::invalid_page("there is no page before page 1"))
    }

    fn offset_page(&self, direction: &str) -> Result<u64, Error> {
        self.page().ok_or_else(|| {
            Error::invalid_page(format!(
                "a cursor request has no {direction} offset page; navigate from its cursored page"
            ))
        })
    }

    fn at_page(&self, page: u64) -> Self {
        Self {
            mode: PageMode::Offset { page },
            size: self.size,
            sorts: self.sorts.clone(),
        }
    }
}

/// Elements a store skips before serving `request`.
#[must_use]
pub const fn skip(request: &PageRequest) -> u64 {
    request.skip()
}

fn validate_size(size: u64) -> Result<(), Error> {
    if size == 0 {
        return Err(Error::invalid_page("page size must be at least 1"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_page_or_size_is_invalid() {
        assert!(matches!(PageRequest::of(0, 10), Err(Error::InvalidPage { .. })));
        assert!(matches!(PageRequest::of(1, 0), Err(Error::InvalidPage { .. })));
        assert!(matches!(
            PageRequest::after_cursor(Cursor::new(vec![Value::Int(1)]), 0),
            Err(Error::InvalidPage { .. })
        ));
    }

    #[test]
    fn previous_of_first_page_fails() {
        let first = PageRequest::of_size(10).expect("valid");

        assert!(matches!(first.previous(), Err(Error::InvalidPage { .. })));
    }

    #[test]
    fn deserializing_checks_page_and_size() {
        let zero = r#"{"mode":{"Offset":{"page":0}},"size":0,"sorts":[]}"#;
        assert!(serde_json::from_str::<PageRequest>(zero).is_err());

        let empty = r#"{"mode":{"After":[]},"size":0}"#;
        assert!(serde_json::from_str::<PageRequest>(empty).is_err());

        let second = r#"{"mode":{"Offset":{"page":2}},"size":5,"sorts":[]}"#;
        let request = serde_json::from_str::<PageRequest>(second).expect("valid request");
        assert_eq!(request, PageRequest::of(2, 5).expect("valid"));
        assert_eq!(request.previous().expect("previous").page(), Some(1));
    }

    #[test]
    fn navigation_keeps_sorts() {
        let request = PageRequest::of(2, 5)
            .expect("valid")
            .sort_by(Sort::desc("age"));

        assert_eq!(request.next().expect("next").sorts(), request.sorts());
        assert_eq!(request.previous().expect("previous").page(), Some(1));
    }

    #[test]
    fn cursor_requests_do_not_offset() {
        let request = PageRequest::before_cursor(Cursor::new(vec![Value::from("m")]), 3)
            .expect("valid");

        assert!(request.is_cursor());
        assert_eq!(skip(&request), 0);
        assert!(request.next().is_err());
        assert_eq!(request.cursor_value().map(Cursor::len), Some(1));
    }

    proptest! {
        #[test]
        fn skip_is_size_times_preceding_pages(page in 1u64..1_000_000, size in 1u64..10_000) {
            let request = PageRequest::of(page, size).expect("valid");

            prop_assert_eq!(skip(&request), size * (page - 1));
        }

        #[test]
        fn next_then_previous_is_identity(page in 1u64..1_000_000, size in 1u64..10_000) {
            let request = PageRequest::of(page, size).expect("valid");
            let next = request.next().expect("next");

            prop_assert_eq!(next.page(), Some(page + 1));
            prop_assert_eq!(next.size(), size);
            prop_assert_eq!(next.previous().expect("previous"), request);
        }
    }
}
