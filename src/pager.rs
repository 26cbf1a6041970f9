//! Lazy iteration over page-token list endpoints.

use crate::Result;
use futures::future::BoxFuture;
use std::collections::VecDeque;

/// One fetched page: its items plus the token for the following page, if any.
pub(crate) type Page<T> = (Vec<T>, Option<String>);

/// Fetches one page given the resume token (`None` for the first page).
pub(crate) type PageFetcher<T> =
    Box<dyn Fn(Option<String>) -> BoxFuture<'static, Result<Page<T>>> + Send>;

/// Pull-based iterator over a paged listing. Pages are fetched on demand:
/// nothing touches the network until [`Pager::next`] drains the buffered
/// page, and iteration ends when a page arrives without a continuation
/// token.
pub struct Pager<T> {
    items: VecDeque<T>,
    next_token: Option<String>,
    exhausted: bool,
    started: bool,
    fetch: PageFetcher<T>,
}

impl<T> Pager<T> {
    pub(crate) fn new(fetch: PageFetcher<T>, initial_token: Option<String>) -> Self {
        Pager {
            items: VecDeque::new(),
            next_token: initial_token.filter(|t| !t.is_empty()),
            exhausted: false,
            started: false,
            fetch,
        }
    }

    /// Next item, fetching the next page when the current one is drained.
    /// `Ok(None)` means the listing is exhausted.
    pub async fn next(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(item) = self.items.pop_front() {
                return Ok(Some(item));
            }
            if self.started && self.exhausted {
                return Ok(None);
            }
            let (items, token) = (self.fetch)(self.next_token.take()).await?;
            self.started = true;
            self.next_token = token.filter(|t| !t.is_empty());
            self.exhausted = self.next_token.is_none();
            if items.is_empty() && self.exhausted {
                return Ok(None);
            }
            self.items = items.into();
        }
    }
}
