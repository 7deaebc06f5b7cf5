//! Page-number pagination for list responses.
//!
//! Pagination is opt-in: it is active when the request carries a page size
//! or [`QuickConfig::default_page_size`] is set.
//!
//! ```rust
//! use quickview_core::pagination::PageParams;
//! use quickview_core::{QuickConfig, QuickRequest};
//!
//! let config = QuickConfig::default().max_page_size(50);
//! let request = QuickRequest::get()
//!     .with_param("page_size", "100")
//!     .with_param("page", "3");
//!
//! let params = PageParams::from_request(&request, &config).unwrap().unwrap();
//! assert_eq!(params.page_size, 50); // capped
//! assert_eq!(params.offset(), 100);
//! ```

use serde::Serialize;

use crate::config::QuickConfig;
use crate::error::{QuickError, QuickResult};
use crate::request::QuickRequest;

/// Requested page (1-indexed) and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    /// Page number, starting at 1.
    pub page: usize,
    /// Number of items per page.
    pub page_size: usize,
}

impl PageParams {
    /// Create page parameters; zero values are raised to 1.
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Read pagination parameters from a request.
    ///
    /// Returns `Ok(None)` when pagination is not active.
    pub fn from_request(request: &QuickRequest, config: &QuickConfig) -> QuickResult<Option<Self>> {
        let requested = request
            .param(&config.page_size_param)
            .map(|raw| parse_positive(&config.page_size_param, raw))
            .transpose()?;

        let Some(mut page_size) = requested.or(config.default_page_size) else {
            return Ok(None);
        };
        if let Some(max) = config.max_page_size {
            page_size = page_size.min(max);
        }

        let page = request
            .param(&config.page_param)
            .map(|raw| parse_positive(&config.page_param, raw))
            .transpose()?
            .unwrap_or(1);

        Ok(Some(Self { page, page_size }))
    }

    /// Number of items before this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Select this page from `items`.
    ///
    /// A page past the end is a not-found error, except the first page of
    /// an empty collection.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> QuickResult<&'a [T]> {
        let start = self.offset();
        if start >= items.len() && !(self.page == 1 && items.is_empty()) {
            return Err(QuickError::not_found("page")
                .with_context(format!("page {}", self.page))
                .with_suggestion(format!(
                    "there are {} items at {} per page",
                    items.len(),
                    self.page_size
                )));
        }
        let end = start.saturating_add(self.page_size).min(items.len());
        Ok(&items[start.min(end)..end])
    }
}

fn parse_positive(param: &str, raw: &str) -> QuickResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(QuickError::invalid_parameter(
            param,
            format!("expected a positive integer, got {:?}", raw),
        )),
    }
}

/// One page of results, as serialized in a paginated list body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Total number of items across all pages.
    pub count: usize,
    /// The following page number, `null` on the last page.
    pub next: Option<usize>,
    /// The preceding page number, `null` on the first page.
    pub previous: Option<usize>,
    /// This page number.
    pub page: usize,
    /// Page size in effect.
    pub page_size: usize,
    /// The items of this page.
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Wrap `results` as page `params` of a collection of `count` items.
    pub fn new(params: PageParams, count: usize, results: Vec<T>) -> Self {
        let has_next = params.page.saturating_mul(params.page_size) < count;
        Self {
            count,
            next: has_next.then(|| params.page + 1),
            previous: (params.page > 1).then(|| params.page - 1),
            page: params.page,
            page_size: params.page_size,
            results,
        }
    }

    /// Whether there is a page after this one.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Whether there is a page before this one.
    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}
