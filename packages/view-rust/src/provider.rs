//! The data provider contract consumed by views.
//!
//! Defines [`DataProvider`], the asynchronous, paged, key-addressable
//! interface every data source implements, and [`FetchListStream`], the
//! single-consumer page sequence returned by `fetch_first`.

use std::sync::Arc;

use async_trait::async_trait;
use dataview_core::{
    Capabilities, ContainsKeysParameters, ContainsKeysResult, DataProviderError,
    DataProviderListener, Emptiness, EventType, FetchByKeysParameters, FetchByKeysResult,
    FetchByOffsetParameters, FetchByOffsetResult, FetchListParameters, IteratorResult,
    ListenerId, Result,
};
use futures_util::stream::BoxStream;

/// Lazy, pull-based, single-consumer sequence of pages.
///
/// Each item is the resolution of one `next()` call. The stream yields
/// `None` after the page whose `done` flag is set, or after an error.
pub type FetchListStream = BoxStream<'static, Result<IteratorResult>>;

/// Asynchronous data source addressed by key, offset, or sequential paging.
///
/// Only `fetch_first` is mandatory. `fetch_by_offset` and `fetch_by_keys`
/// default to [`DataProviderError::CapabilityNotSupported`]; a provider that
/// overrides one must also advertise it through
/// [`capabilities`](DataProvider::capabilities). `contains_keys` is derived
/// from `fetch_by_keys` unless overridden.
///
/// Used as `Arc<dyn DataProvider>`; a provider may be shared by several
/// views and direct consumers at once.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Optional features this provider supports.
    fn capabilities(&self) -> Capabilities;

    /// Opens a new page sequence from the first row.
    fn fetch_first(&self, params: FetchListParameters) -> FetchListStream;

    /// Fetches rows starting at a numeric offset.
    async fn fetch_by_offset(
        &self,
        params: FetchByOffsetParameters,
    ) -> Result<FetchByOffsetResult> {
        let _ = params;
        Err(DataProviderError::CapabilityNotSupported {
            capability: dataview_core::capability::FETCH_BY_OFFSET,
        })
    }

    /// Fetches rows by key. Keys that do not exist are absent from the result.
    async fn fetch_by_keys(&self, params: FetchByKeysParameters) -> Result<FetchByKeysResult> {
        let _ = params;
        Err(DataProviderError::CapabilityNotSupported {
            capability: dataview_core::capability::FETCH_BY_KEYS,
        })
    }

    /// Reports which of the given keys exist.
    ///
    /// Defaults to a `fetch_by_keys` call, so a provider that only
    /// implements keyed fetches still answers membership queries.
    async fn contains_keys(&self, params: ContainsKeysParameters) -> Result<ContainsKeysResult> {
        let requested = params.keys.clone();
        let fetched = self.fetch_by_keys(params).await?;
        Ok(ContainsKeysResult {
            results: fetched
                .results
                .into_keys()
                .filter(|key| requested.contains(key))
                .collect(),
        })
    }

    /// Total row count, or -1 when unknown.
    async fn get_total_size(&self) -> Result<i64>;

    /// Whether the provider has any rows, if known without fetching.
    fn is_empty(&self) -> Emptiness;

    /// Registers a listener for `Refresh` or `Mutate` events.
    fn add_event_listener(
        &self,
        event_type: EventType,
        listener: Arc<dyn DataProviderListener>,
    ) -> ListenerId;

    /// Removes a listener. Returns `false` if it was not registered.
    fn remove_event_listener(&self, id: ListenerId) -> bool;
}
