//! [`ListDataProviderView`]: a read-only window over another [`DataProvider`].
//!
//! A view adds a start key (`from`), a start offset, default sort and filter
//! criteria, and an optional [`DataMapping`] on top of the provider beneath
//! it, and re-emits the provider's change events as its own. The view is
//! itself a [`DataProvider`], so views can be stacked.

mod cache;
mod mapping;
mod sequence;

pub use cache::OffsetCache;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use dataview_core::capability::FETCH_BY_OFFSET;
use dataview_core::{
    Capabilities, Capability, ContainsKeysParameters, ContainsKeysResult, DataMapping,
    DataProviderError, DataProviderEvent, DataProviderListener, Emptiness, EventDispatcher,
    EventType, FetchByKeysParameters, FetchByKeysResult, FetchByOffsetParameters,
    FetchByOffsetResult, FetchListParameters, FilterCriterion, Item, Key, ListenerId, Result,
    SortCriterion,
};
use futures_util::StreamExt;

use crate::config::ViewConfig;
use crate::provider::{DataProvider, FetchListStream};
use sequence::SequenceContext;

/// Construction options for [`ListDataProviderView`].
///
/// `from` and `offset` combine: the sequence starts `offset` rows after the
/// row keyed `from`. `from` is compared against post-mapping keys.
#[derive(Clone, Default)]
pub struct ViewOptions {
    pub from: Option<Key>,
    pub offset: usize,
    pub sort_criteria: Option<Vec<SortCriterion>>,
    pub filter_criterion: Option<FilterCriterion>,
    pub data_mapping: Option<Arc<dyn DataMapping>>,
}

impl fmt::Debug for ViewOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewOptions")
            .field("from", &self.from)
            .field("offset", &self.offset)
            .field("sort_criteria", &self.sort_criteria)
            .field("filter_criterion", &self.filter_criterion)
            .field("data_mapping", &self.data_mapping.is_some())
            .finish()
    }
}

/// Provider listener that re-dispatches events on a view's dispatcher.
///
/// Holds the dispatcher weakly so the provider never keeps a view alive.
struct EventRelay {
    target: Weak<EventDispatcher>,
}

impl DataProviderListener for EventRelay {
    fn on_event(&self, event: &DataProviderEvent) {
        match self.target.upgrade() {
            Some(target) => target.dispatch(event),
            None => tracing::warn!(
                event_type = ?event.event_type(),
                "provider event arrived after its view was released"
            ),
        }
    }
}

/// Read-only view over a [`DataProvider`].
///
/// Capabilities are read from the provider once, at construction. A view
/// with a start position (`from` or `offset`) does not report
/// `fetchByOffset`, since provider offsets do not count from that position.
/// Two relay listeners (`Refresh` and `Mutate`) are registered on the
/// provider for the lifetime of the view and removed when it is dropped.
pub struct ListDataProviderView {
    provider: Arc<dyn DataProvider>,
    options: ViewOptions,
    config: ViewConfig,
    /// What the provider advertises.
    provider_capabilities: Capabilities,
    /// What this view advertises.
    capabilities: Capabilities,
    events: Arc<EventDispatcher>,
    relays: Vec<ListenerId>,
}

impl ListDataProviderView {
    #[must_use]
    pub fn new(provider: Arc<dyn DataProvider>, options: ViewOptions) -> Self {
        Self::with_config(provider, options, ViewConfig::default())
    }

    #[must_use]
    pub fn with_config(
        provider: Arc<dyn DataProvider>,
        options: ViewOptions,
        config: ViewConfig,
    ) -> Self {
        let provider_capabilities = provider.capabilities();
        let capabilities = if options.from.is_some() || options.offset > 0 {
            Capabilities {
                fetch_by_offset: None,
                ..provider_capabilities.clone()
            }
        } else {
            provider_capabilities.clone()
        };
        let events = Arc::new(EventDispatcher::new());
        let relays = [EventType::Refresh, EventType::Mutate]
            .into_iter()
            .map(|event_type| {
                let relay: Arc<dyn DataProviderListener> = Arc::new(EventRelay {
                    target: Arc::downgrade(&events),
                });
                provider.add_event_listener(event_type, relay)
            })
            .collect();
        tracing::debug!(
            fetch_by_keys = provider_capabilities.fetch_by_keys.is_some(),
            fetch_by_offset = provider_capabilities.fetch_by_offset.is_some(),
            ?options,
            "list data provider view created"
        );
        Self {
            provider,
            options,
            config,
            provider_capabilities,
            capabilities,
            events,
            relays,
        }
    }

    /// Looks up one of the view's capabilities by name.
    #[must_use]
    pub fn get_capability(&self, name: &str) -> Option<Capability> {
        self.capabilities.get(name)
    }

    #[must_use]
    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    fn mapping(&self) -> Option<&dyn DataMapping> {
        self.options.data_mapping.as_deref()
    }

    fn effective_sort(&self, explicit: Option<Vec<SortCriterion>>) -> Option<Vec<SortCriterion>> {
        explicit.or_else(|| self.options.sort_criteria.clone())
    }

    fn effective_filter(&self, explicit: Option<FilterCriterion>) -> Option<FilterCriterion> {
        explicit.or_else(|| self.options.filter_criterion.clone())
    }

    fn downstream_sort(&self, criteria: Option<Vec<SortCriterion>>) -> Option<Vec<SortCriterion>> {
        match self.mapping() {
            Some(mapping) => criteria.map(|c| mapping.map_sort_criteria(c)),
            None => criteria,
        }
    }

    fn downstream_filter(&self, criterion: Option<FilterCriterion>) -> Option<FilterCriterion> {
        match self.mapping() {
            Some(mapping) => criterion.map(|c| mapping.map_filter_criterion(c)),
            None => criterion,
        }
    }

    /// Finds `wanted` keys by paging through the provider's sequence.
    ///
    /// Stops pulling as soon as every key has been seen.
    async fn scan_for_keys(&self, wanted: &HashSet<Key>) -> Result<HashMap<Key, Item>> {
        let mut found = HashMap::with_capacity(wanted.len());
        if wanted.is_empty() {
            return Ok(found);
        }
        let page_size = i64::try_from(self.config.fetch_by_keys_page_size).unwrap_or(i64::MAX);
        let mut pages = self
            .provider
            .fetch_first(FetchListParameters::with_size(page_size));
        let mut pulled = 0_usize;
        while let Some(page) = pages.next().await {
            let page = page?;
            pulled += 1;
            let done = page.done;
            let (keys, data) = page.value.into_parts();
            let (keys, data) = mapping::map_page(self.mapping(), keys, data);
            for (key, data) in keys.into_iter().zip(data) {
                if wanted.contains(&key) {
                    found
                        .entry(key.clone())
                        .or_insert_with(|| Item::new(key, data));
                }
            }
            if done || found.len() == wanted.len() {
                break;
            }
        }
        tracing::debug!(
            requested = wanted.len(),
            found = found.len(),
            pages = pulled,
            "fetch by keys scan finished"
        );
        Ok(found)
    }
}

impl Drop for ListDataProviderView {
    fn drop(&mut self) {
        for id in self.relays.drain(..) {
            self.provider.remove_event_listener(id);
        }
    }
}

#[async_trait]
impl DataProvider for ListDataProviderView {
    fn capabilities(&self) -> Capabilities {
        self.capabilities.clone()
    }

    fn fetch_first(&self, params: FetchListParameters) -> FetchListStream {
        let sort_criteria = self.effective_sort(params.sort_criteria);
        let filter_criterion = self.effective_filter(params.filter_criterion);
        let downstream = FetchListParameters {
            size: params.size,
            sort_criteria: self.downstream_sort(sort_criteria.clone()),
            filter_criterion: self.downstream_filter(filter_criterion.clone()),
        };
        let by_offset = self.options.from.is_none()
            && self.options.offset > 0
            && self.provider_capabilities.fetch_by_offset.is_some();
        sequence::fetch_first(
            SequenceContext {
                provider: Arc::clone(&self.provider),
                mapping: self.options.data_mapping.clone(),
                from: self.options.from.clone(),
                offset: self.options.offset,
                params: FetchListParameters {
                    size: params.size,
                    sort_criteria,
                    filter_criterion,
                },
                downstream,
            },
            by_offset,
        )
    }

    async fn fetch_by_offset(
        &self,
        params: FetchByOffsetParameters,
    ) -> Result<FetchByOffsetResult> {
        if self.capabilities.fetch_by_offset.is_none() {
            return Err(DataProviderError::CapabilityNotSupported {
                capability: FETCH_BY_OFFSET,
            });
        }
        let sort_criteria = self.effective_sort(params.sort_criteria);
        let filter_criterion = self.effective_filter(params.filter_criterion);
        let result = self
            .provider
            .fetch_by_offset(FetchByOffsetParameters {
                offset: params.offset,
                size: params.size,
                sort_criteria: self.downstream_sort(sort_criteria),
                filter_criterion: self.downstream_filter(filter_criterion.clone()),
            })
            .await?;

        let mut fetch_parameters = result.fetch_parameters;
        if let Some(mapping) = self.mapping() {
            fetch_parameters.sort_criteria = fetch_parameters
                .sort_criteria
                .map(|criteria| mapping.unmap_sort_criteria(criteria));
        }
        // Reported in view terms.
        fetch_parameters.filter_criterion = filter_criterion;
        let results = result
            .results
            .into_iter()
            .map(|item| mapping::map_item(self.mapping(), item))
            .collect();
        Ok(FetchByOffsetResult {
            fetch_parameters,
            results,
            done: result.done,
        })
    }

    async fn fetch_by_keys(&self, params: FetchByKeysParameters) -> Result<FetchByKeysResult> {
        if self.provider_capabilities.fetch_by_keys.is_none() {
            tracing::debug!(keys = params.keys.len(), "provider cannot fetch by keys; scanning");
            let results = self.scan_for_keys(&params.keys).await?;
            return Ok(FetchByKeysResult { results });
        }
        let fetched = self.provider.fetch_by_keys(params).await?;
        let results = fetched
            .results
            .into_values()
            .map(|item| {
                let item = mapping::map_item(self.mapping(), item);
                (item.key().clone(), item)
            })
            .collect();
        Ok(FetchByKeysResult { results })
    }

    async fn contains_keys(&self, params: ContainsKeysParameters) -> Result<ContainsKeysResult> {
        if self.provider_capabilities.fetch_by_keys.is_some() && self.options.data_mapping.is_none() {
            return self.provider.contains_keys(params).await;
        }
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

    async fn get_total_size(&self) -> Result<i64> {
        self.provider.get_total_size().await
    }

    fn is_empty(&self) -> Emptiness {
        self.provider.is_empty()
    }

    fn add_event_listener(
        &self,
        event_type: EventType,
        listener: Arc<dyn DataProviderListener>,
    ) -> ListenerId {
        self.events.add_listener(event_type, listener)
    }

    fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }
}
