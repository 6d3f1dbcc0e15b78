//! Continuation-token pagination over ListObjectsV2.
//!
//! [`ObjectPager`] walks pages one at a time; [`S3Client::list_all`] flattens them
//! into a lazy stream of objects. Pagination ends when the server stops returning a
//! token or returns an empty page. A token that was already sent once is an error,
//! so a server cycling through tokens cannot keep the listing alive.

use futures::stream::{self, Stream, TryStreamExt};
use std::collections::HashSet;
use tracing::debug;

use crate::s3::client::S3Client;
use crate::s3::error::{Result, S3Error};
use crate::s3::transport::Transport;
use crate::s3::types::{ObjectListingPage, S3Object};

/// Page-at-a-time listing cursor
#[derive(Debug)]
pub struct ObjectPager<'a, T> {
    client: &'a S3Client<T>,
    prefix: String,
    max_keys: i32,
    token: Option<String>,
    /// Every token sent so far
    seen_tokens: HashSet<String>,
    pages_fetched: usize,
    done: bool,
}

impl<'a, T: Transport> ObjectPager<'a, T> {
    pub(crate) fn new(client: &'a S3Client<T>, prefix: &str, max_keys: i32) -> Self {
        Self {
            client,
            prefix: prefix.to_string(),
            max_keys,
            token: None,
            seen_tokens: HashSet::new(),
            pages_fetched: 0,
            done: false,
        }
    }

    /// Listing calls made so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Token the next call will send
    pub fn continuation_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Fetch the next non-empty page, or `None` once the listing is exhausted
    pub async fn next_page(&mut self) -> Result<Option<ObjectListingPage>> {
        if self.done {
            return Ok(None);
        }
        if let Some(limit) = self.client.max_list_pages() {
            if self.pages_fetched >= limit {
                self.done = true;
                return Err(S3Error::PaginationLimit(limit));
            }
        }

        let page = match self
            .client
            .list_objects(&self.prefix, self.max_keys, self.token.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };
        self.pages_fetched += 1;

        match &page.next_continuation_token {
            Some(next) if self.seen_tokens.contains(next) => {
                self.done = true;
                return Err(S3Error::InvalidResponse(format!(
                    "continuation token '{}' was already used",
                    next
                )));
            }
            Some(next) => {
                self.seen_tokens.insert(next.clone());
                self.token = Some(next.clone());
            }
            None => self.done = true,
        }

        if page.is_empty() {
            self.done = true;
            debug!(prefix = %self.prefix, pages = self.pages_fetched, "listing exhausted");
            return Ok(None);
        }

        Ok(Some(page))
    }
}

impl<T: Transport> S3Client<T> {
    /// Page cursor over `prefix` using the client page size
    pub fn pages(&self, prefix: &str) -> ObjectPager<'_, T> {
        ObjectPager::new(self, prefix, self.page_size())
    }

    /// Every object under `prefix`, fetched page by page as the stream is polled
    pub fn list_all<'a>(&'a self, prefix: &str) -> impl Stream<Item = Result<S3Object>> + 'a {
        stream::try_unfold(self.pages(prefix), |mut pager| async move {
            Ok::<_, S3Error>(pager.next_page().await?.map(|page| (page, pager)))
        })
        .map_ok(|page| stream::iter(page.contents.into_iter().map(Ok::<_, S3Error>)))
        .try_flatten()
    }
}
