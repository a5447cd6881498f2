//! Paged results.
//!
//! Pages are served without a count query, so totals and `has_next` /
//! `has_previous` fail with `UnsupportedCapability` instead of guessing.

mod request;

pub use request::{Cursor, PageMode, PageRequest, skip};

use crate::error::Error;

///
/// Page
///
/// One offset window of results together with the request that produced it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page<E> {
    content: Vec<E>,
    request: PageRequest,
}

impl<E> Page<E> {
    /// Wrap `content` fetched for `request`. Cursor requests belong to
    /// [`CursoredPage`] and are rejected here.
    pub fn of(content: Vec<E>, request: PageRequest) -> Result<Self, Error> {
        if request.is_cursor() {
            return Err(Error::invalid_page(
                "a cursor request cannot produce an offset page",
            ));
        }

        Ok(Self { content, request })
    }

    #[must_use]
    pub fn content(&self) -> &[E] {
        &self.content
    }

    #[must_use]
    pub fn into_content(self) -> Vec<E> {
        self.content
    }

    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    #[must_use]
    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    #[must_use]
    pub const fn page_request(&self) -> &PageRequest {
        &self.request
    }

    pub fn next_page_request(&self) -> Result<PageRequest, Error> {
        self.request.next()
    }

    /// Fails with `InvalidPage` on the first page.
    pub fn previous_page_request(&self) -> Result<PageRequest, Error> {
        self.request.previous()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.content.iter()
    }

    pub const fn total_elements(&self) -> Result<u64, Error> {
        Err(Error::unsupported("total_elements"))
    }

    pub const fn total_pages(&self) -> Result<u64, Error> {
        Err(Error::unsupported("total_pages"))
    }

    pub const fn has_next(&self) -> Result<bool, Error> {
        Err(Error::unsupported("has_next"))
    }

    pub const fn has_previous(&self) -> Result<bool, Error> {
        Err(Error::unsupported("has_previous"))
    }

    pub const fn has_totals(&self) -> Result<bool, Error> {
        Err(Error::unsupported("has_totals"))
    }
}

impl<E> IntoIterator for Page<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.content.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a Page<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.content.iter()
    }
}

///
/// CursoredPage
///
/// Results fetched by keyset. Each element carries the cursor (its
/// sort-key values) used to request the neighbouring pages.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CursoredPage<E> {
    content: Vec<E>,
    cursors: Vec<Cursor>,
    request: PageRequest,
}

impl<E> CursoredPage<E> {
    /// `cursors[i]` belongs to `content[i]`.
    pub fn of(content: Vec<E>, cursors: Vec<Cursor>, request: PageRequest) -> Result<Self, Error> {
        if content.len() != cursors.len() {
            return Err(Error::invalid_page(format!(
                "{} elements but {} cursors",
                content.len(),
                cursors.len()
            )));
        }

        Ok(Self {
            content,
            cursors,
            request,
        })
    }

    #[must_use]
    pub fn content(&self) -> &[E] {
        &self.content
    }

    #[must_use]
    pub fn into_content(self) -> Vec<E> {
        self.content
    }

    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    #[must_use]
    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    #[must_use]
    pub fn cursor(&self, index: usize) -> Option<&Cursor> {
        self.cursors.get(index)
    }

    #[must_use]
    pub fn cursors(&self) -> &[Cursor] {
        &self.cursors
    }

    #[must_use]
    pub const fn page_request(&self) -> &PageRequest {
        &self.request
    }

    /// Request for the elements after the last one on this page.
    pub fn next_page_request(&self) -> Result<PageRequest, Error> {
        let last = self
            .cursors
            .last()
            .ok_or_else(|| Error::invalid_page("an empty cursored page has no next page"))?;

        PageRequest::after_cursor(last.clone(), self.request.size())
            .map(|r| r.with_sorts(self.request.sorts().to_vec()))
    }

    /// Request for the elements before the first one on this page.
    pub fn previous_page_request(&self) -> Result<PageRequest, Error> {
        let first = self
            .cursors
            .first()
            .ok_or_else(|| Error::invalid_page("an empty cursored page has no previous page"))?;

        PageRequest::before_cursor(first.clone(), self.request.size())
            .map(|r| r.with_sorts(self.request.sorts().to_vec()))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.content.iter()
    }

    pub const fn total_elements(&self) -> Result<u64, Error> {
        Err(Error::unsupported("total_elements"))
    }

    pub const fn total_pages(&self) -> Result<u64, Error> {
        Err(Error::unsupported("total_pages"))
    }

    pub const fn has_totals(&self) -> Result<bool, Error> {
        Err(Error::unsupported("has_totals"))
    }
}

impl<E> IntoIterator for CursoredPage<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.content.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{query::Sort, value::Value};

    fn page_of(page: u64) -> Page<u32> {
        Page::of(vec![1, 2, 3], PageRequest::of(page, 3).expect("valid")).expect("offset page")
    }

    #[test]
    fn totals_are_unsupported() {
        let page = page_of(1);

        for result in [page.total_elements(), page.total_pages()] {
            assert!(matches!(
                result,
                Err(Error::UnsupportedCapability { .. })
            ));
        }
        for result in [page.has_next(), page.has_previous(), page.has_totals()] {
            assert!(matches!(
                result,
                Err(Error::UnsupportedCapability { .. })
            ));
        }
    }

    #[test]
    fn capability_is_named() {
        let Err(Error::UnsupportedCapability { capability }) = page_of(2).total_pages() else {
            panic!("expected unsupported capability");
        };

        assert_eq!(capability, "total_pages");
    }

    #[test]
    fn navigation_follows_the_request() {
        let page = page_of(2);

        assert_eq!(page.next_page_request().expect("next").page(), Some(3));
        assert_eq!(page.previous_page_request().expect("previous").page(), Some(1));
        assert!(matches!(
            page_of(1).previous_page_request(),
            Err(Error::InvalidPage { .. })
        ));
    }

    #[test]
    fn content_is_borrowed_and_counted() {
        let page = page_of(1);

        assert_eq!(page.content(), &[1, 2, 3]);
        assert!(page.has_content());
        assert_eq!(page.number_of_elements(), 3);
        assert_eq!(page.iter().sum::<u32>(), 6);
        assert_eq!(page.into_iter().count(), 3);
    }

    #[test]
    fn offset_page_rejects_cursor_requests() {
        let request = PageRequest::after_cursor(Cursor::new(vec![Value::Int(1)]), 2)
            .expect("valid");

        assert!(matches!(
            Page::<u32>::of(Vec::new(), request),
            Err(Error::InvalidPage { .. })
        ));
    }

    #[test]
    fn cursored_page_navigates_from_its_edges() {
        let request = PageRequest::of_size(2)
            .expect("valid")
            .sort_by(Sort::asc("name"));
        let page = CursoredPage::of(
            vec!["ana", "bo"],
            vec![
                Cursor::new(vec![Value::from("ana")]),
                Cursor::new(vec![Value::from("bo")]),
            ],
            request,
        )
        .expect("aligned cursors");

        let next = page.next_page_request().expect("next");
        assert_eq!(next.mode(), &PageMode::After(Cursor::new(vec![Value::from("bo")])));
        assert_eq!(next.sorts(), [Sort::asc("name")]);

        let previous = page.previous_page_request().expect("previous");
        assert_eq!(
            previous.mode(),
            &PageMode::Before(Cursor::new(vec![Value::from("ana")]))
        );
    }

    #[test]
    fn empty_cursored_page_cannot_navigate() {
        let page = CursoredPage::<u32>::of(
            Vec::new(),
            Vec::new(),
            PageRequest::of_size(5).expect("valid"),
        )
        .expect("empty page");

        assert!(matches!(page.next_page_request(), Err(Error::InvalidPage { .. })));
        assert!(matches!(page.previous_page_request(), Err(Error::InvalidPage { .. })));
    }
}
