//! The page sequence returned by [`ListDataProviderView::fetch_first`].
//!
//! Two strategies back the sequence:
//!
//! - **Offset**: when the view starts at a numeric offset, has no `from` key,
//!   and the provider fetches by offset natively, every `next()` is one
//!   `fetch_by_offset` call at a running offset.
//! - **Cached**: otherwise the view opens one provider `fetch_first` stream,
//!   accumulates mapped pages in an [`OffsetCache`], seeks to the `from` key,
//!   and serves `[position, position + size)` slices out of the cache. Rows
//!   are dropped from the cache once they have been handed out.
//!
//! [`ListDataProviderView::fetch_first`]: super::ListDataProviderView

use std::sync::Arc;

use dataview_core::{
    DataMapping, FetchByOffsetParameters, FetchListParameters, FetchListResult, IteratorResult,
    Key, Result,
};
use futures_util::stream::{self, StreamExt};

use super::cache::OffsetCache;
use super::mapping::map_page;
use crate::provider::{DataProvider, FetchListStream};

/// Everything a sequence needs from the view, captured at `fetch_first` time.
pub(crate) struct SequenceContext {
    pub provider: Arc<dyn DataProvider>,
    pub mapping: Option<Arc<dyn DataMapping>>,
    pub from: Option<Key>,
    pub offset: usize,
    /// View-side parameters, echoed back in every page.
    pub params: FetchListParameters,
    /// Provider-side parameters, sort and filter already mapped.
    pub downstream: FetchListParameters,
}

impl SequenceContext {
    fn page(
        &self,
        start_index: usize,
        keys: Vec<Key>,
        data: Vec<dataview_core::Value>,
        done: bool,
    ) -> IteratorResult {
        IteratorResult {
            value: FetchListResult::new(self.params.clone(), keys, data)
                .with_start_index(start_index),
            done,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    /// Pulling and discarding pages until the `from` key shows up.
    Skipping,
    Streaming,
    Done,
}

/// Cached strategy: one provider stream, resumed across `next()` calls.
struct CachedCursor {
    ctx: SequenceContext,
    upstream: Option<FetchListStream>,
    cache: OffsetCache,
    /// Cache index of the next row to hand out.
    position: usize,
    /// Rows handed out so far; the next page's start index.
    returned: usize,
    phase: Phase,
}

impl CachedCursor {
    fn new(ctx: SequenceContext) -> Self {
        Self {
            ctx,
            upstream: None,
            cache: OffsetCache::new(),
            position: 0,
            returned: 0,
            phase: Phase::Init,
        }
    }

    /// Pulls one provider page into the cache, marking the cache done when
    /// the provider sequence is exhausted.
    async fn pull(&mut self) -> Result<()> {
        let provider = &self.ctx.provider;
        let downstream = &self.ctx.downstream;
        let upstream = self
            .upstream
            .get_or_insert_with(|| provider.fetch_first(downstream.clone()));
        match upstream.next().await {
            Some(Ok(page)) => {
                let done = page.done;
                let (keys, data) = page.value.into_parts();
                let (keys, data) = map_page(self.ctx.mapping.as_deref(), keys, data);
                tracing::trace!(rows = keys.len(), done, "pulled provider page");
                self.cache.append(keys, data);
                if done {
                    self.finish_upstream();
                }
                Ok(())
            }
            Some(Err(e)) => Err(e),
            None => {
                self.finish_upstream();
                Ok(())
            }
        }
    }

    fn finish_upstream(&mut self) {
        self.cache.mark_done();
        self.upstream = None;
    }

    /// Drops cached rows before `position`; the sequence never revisits them.
    fn release_consumed(&mut self) {
        let consumed = self.position.min(self.cache.len());
        if consumed > 0 {
            self.cache.discard_before(consumed);
            self.position -= consumed;
        }
    }

    /// Seeks the `from` key. Returns `false` when the key does not exist.
    async fn seek(&mut self, from: &Key) -> Result<bool> {
        loop {
            if let Some(index) = self.cache.index_of(from) {
                tracing::debug!(?from, skipped = index, "located start key");
                self.cache.discard_before(index);
                return Ok(true);
            }
            // Everything cached so far precedes the key.
            self.cache.clear();
            if self.cache.is_done() {
                tracing::debug!(?from, "start key not found; sequence is empty");
                return Ok(false);
            }
            self.pull().await?;
        }
    }

    async fn next_page(&mut self) -> Result<IteratorResult> {
        if self.phase == Phase::Init {
            self.position = self.ctx.offset;
            self.phase = if self.ctx.from.is_some() {
                Phase::Skipping
            } else {
                Phase::Streaming
            };
        }

        if self.phase == Phase::Skipping {
            if let Some(from) = self.ctx.from.clone() {
                if !self.seek(&from).await? {
                    self.phase = Phase::Done;
                    return Ok(self.ctx.page(self.returned, Vec::new(), Vec::new(), true));
                }
            }
            self.phase = Phase::Streaming;
        }

        let page_size = self.ctx.params.page_size();
        loop {
            self.release_consumed();
            let available = self.cache.available_from(self.position);
            let satisfied = match page_size {
                Some(size) => available >= size,
                None => available > 0,
            };
            if satisfied || self.cache.is_done() {
                break;
            }
            self.pull().await?;
        }

        let take = page_size.unwrap_or_else(|| self.cache.available_from(self.position));
        let (keys, data) = self.cache.slice(self.position, take);
        let start_index = self.returned;
        self.position += keys.len();
        self.returned += keys.len();
        self.release_consumed();
        let done = self.cache.is_done() && self.cache.available_from(self.position) == 0;
        if done {
            self.phase = Phase::Done;
        }
        Ok(self.ctx.page(start_index, keys, data, done))
    }
}

/// Offset strategy: direct `fetch_by_offset` calls at a running offset.
struct OffsetCursor {
    ctx: SequenceContext,
    offset: usize,
}

impl OffsetCursor {
    fn new(ctx: SequenceContext) -> Self {
        let offset = ctx.offset;
        Self { ctx, offset }
    }

    fn returned(&self) -> usize {
        self.offset - self.ctx.offset
    }

    async fn next_page(&mut self) -> Result<IteratorResult> {
        let result = self
            .ctx
            .provider
            .fetch_by_offset(FetchByOffsetParameters {
                offset: self.offset,
                size: self.ctx.downstream.size,
                sort_criteria: self.ctx.downstream.sort_criteria.clone(),
                filter_criterion: self.ctx.downstream.filter_criterion.clone(),
            })
            .await?;
        let (keys, data): (Vec<Key>, Vec<_>) = result
            .results
            .into_iter()
            .map(|item| (item.metadata.key, item.data))
            .unzip();
        let (keys, data) = map_page(self.ctx.mapping.as_deref(), keys, data);
        let start_index = self.returned();
        self.offset += keys.len();
        // An empty page can never advance the offset; treat it as the end.
        let done = result.done || keys.is_empty();
        tracing::trace!(offset = self.offset, rows = keys.len(), done, "fetched page by offset");
        Ok(self.ctx.page(start_index, keys, data, done))
    }
}

enum Cursor {
    Offset(OffsetCursor),
    Cached(CachedCursor),
}

impl Cursor {
    async fn next_page(&mut self) -> Result<IteratorResult> {
        match self {
            Cursor::Offset(cursor) => cursor.next_page().await,
            Cursor::Cached(cursor) => cursor.next_page().await,
        }
    }
}

/// Builds the page stream for one `fetch_first` call.
///
/// The stream ends after the first `done` page or the first error.
pub(crate) fn fetch_first(ctx: SequenceContext, by_offset: bool) -> FetchListStream {
    tracing::debug!(
        by_offset,
        from = ?ctx.from,
        offset = ctx.offset,
        size = ctx.params.size,
        "opening fetch-first sequence"
    );
    let cursor = if by_offset {
        Cursor::Offset(OffsetCursor::new(ctx))
    } else {
        Cursor::Cached(CachedCursor::new(ctx))
    };
    stream::unfold(Some(cursor), |state| async move {
        let mut cursor = state?;
        match cursor.next_page().await {
            Ok(result) => {
                let next = if result.done { None } else { Some(cursor) };
                Some((Ok(result), next))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use dataview_core::types::row;
    use dataview_core::Value;

    use super::*;
    use crate::config::ArrayProviderConfig;
    use crate::providers::ArrayDataProvider;

    fn provider(n: i64) -> Arc<dyn DataProvider> {
        let rows = (0..n).map(|i| row([("id", Value::Int(i))])).collect();
        let config = ArrayProviderConfig {
            default_page_size: 4,
            ..ArrayProviderConfig::default()
        };
        Arc::new(ArrayDataProvider::new(rows, config).unwrap())
    }

    fn context(n: i64, from: Option<Key>, offset: usize, size: i64) -> SequenceContext {
        let params = FetchListParameters::with_size(size);
        SequenceContext {
            provider: provider(n),
            mapping: None,
            from,
            offset,
            downstream: FetchListParameters::default(),
            params,
        }
    }

    fn first_key(page: &IteratorResult) -> Option<Key> {
        page.value.metadata.first().map(|m| m.key.clone())
    }

    #[tokio::test]
    async fn cached_cursor_only_holds_unreturned_rows() {
        let mut cursor = CachedCursor::new(context(40, Some(Key::Int(3)), 2, 3));
        let mut seen = Vec::new();
        loop {
            let page = cursor.next_page().await.unwrap();
            // Provider pages are 4 rows, so at most one page is ever buffered.
            assert!(cursor.cache.len() < 4, "cache grew to {}", cursor.cache.len());
            seen.push(page.value.start_index);
            if page.done {
                break;
            }
            if seen.len() == 1 {
                assert_eq!(first_key(&page), Some(Key::Int(5)));
            }
        }
        assert_eq!(seen, (0..35).step_by(3).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn offset_past_the_first_pages_is_skipped_without_buffering() {
        let mut cursor = CachedCursor::new(context(20, None, 9, 2));
        let page = cursor.next_page().await.unwrap();
        assert_eq!(first_key(&page), Some(Key::Int(9)));
        assert_eq!(page.value.start_index, 0);
        assert!(cursor.cache.len() < 4);
    }

    #[tokio::test]
    async fn offset_cursor_start_index_counts_returned_rows() {
        let mut ctx = context(7, None, 2, 2);
        ctx.downstream.size = 2;
        let mut cursor = OffsetCursor::new(ctx);
        let mut starts = Vec::new();
        loop {
            let page = cursor.next_page().await.unwrap();
            starts.push((page.value.start_index, first_key(&page)));
            if page.done {
                break;
            }
        }
        assert_eq!(
            starts,
            vec![
                (0, Some(Key::Int(2))),
                (2, Some(Key::Int(4))),
                (4, Some(Key::Int(6))),
            ]
        );
    }
}
