//! In-memory [`DataProvider`] backed by an ordered array of rows.
//!
//! Keys are derived from each row once, when the row enters the provider,
//! according to [`KeyAttributes`]. A row that cannot produce a key is
//! rejected with a typed error; there is no fallback to whole-row identity.

use std::sync::Arc;

use ahash::AHashMap;
use async_trait::async_trait;
use dataview_core::capability::{
    FetchByKeysCapability, FetchByOffsetCapability, FilterCapability, SortAttributes,
    SortCapability, FETCH_BY_KEYS, FETCH_BY_OFFSET,
};
use dataview_core::criteria::compare_rows;
use dataview_core::{
    Capabilities, ContainsKeysParameters, ContainsKeysResult, DataProviderError,
    DataProviderEvent, DataProviderListener, Emptiness, EventDispatcher, EventType,
    FetchByKeysParameters, FetchByKeysResult, FetchByOffsetParameters, FetchByOffsetResult,
    FetchListParameters, FetchListResult, FilterCriterion, FilterOp, Item, ItemMetadata,
    IteratorResult, Key, ListenerId, MutationDetail, MutationOperation, Result, SortCriterion,
    Value,
};
use futures_util::stream::{self, StreamExt};
use parking_lot::RwLock;

use crate::config::{ArrayProviderConfig, KeyAttributes};
use crate::provider::{DataProvider, FetchListStream};

struct ArrayState {
    rows: Vec<(Key, Value)>,
    positions: AHashMap<Key, usize>,
    /// Next key handed out under [`KeyAttributes::Index`].
    next_index_key: i64,
}

impl ArrayState {
    fn reindex(&mut self) {
        self.positions = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (key.clone(), i))
            .collect();
    }
}

/// In-memory provider over a `Vec` of rows.
///
/// Supports sorting and filtering on every fetch, native fetch-by-offset and
/// fetch-by-keys (each can be hidden through [`ArrayProviderConfig`]), and
/// mutation methods that notify listeners with `Mutate` and `Refresh` events.
pub struct ArrayDataProvider {
    state: RwLock<ArrayState>,
    config: ArrayProviderConfig,
    events: EventDispatcher,
}

impl ArrayDataProvider {
    /// Creates a provider over `rows`.
    ///
    /// # Errors
    ///
    /// Returns [`DataProviderError::MissingKeyAttribute`] if a row lacks a
    /// usable key value and [`DataProviderError::DuplicateKey`] if two rows
    /// share a key.
    pub fn new(rows: Vec<Value>, config: ArrayProviderConfig) -> Result<Self> {
        let provider = Self {
            state: RwLock::new(ArrayState {
                rows: Vec::new(),
                positions: AHashMap::new(),
                next_index_key: 0,
            }),
            config,
            events: EventDispatcher::new(),
        };
        {
            let mut state = provider.state.write();
            let keyed = provider.key_rows(&mut state, rows)?;
            state.rows = keyed;
            state.reindex();
        }
        tracing::debug!(
            rows = provider.state.read().rows.len(),
            key_attributes = ?provider.config.key_attributes,
            "array data provider created"
        );
        Ok(provider)
    }

    /// Creates a provider with the default configuration (`id` keys).
    ///
    /// # Errors
    ///
    /// See [`ArrayDataProvider::new`].
    pub fn from_rows(rows: Vec<Value>) -> Result<Self> {
        Self::new(rows, ArrayProviderConfig::default())
    }

    fn extract_key(&self, row: &Value, index: usize, state: &mut ArrayState) -> Result<Key> {
        let missing = |attribute: &str| DataProviderError::MissingKeyAttribute {
            attribute: attribute.to_string(),
            index,
        };
        match &self.config.key_attributes {
            KeyAttributes::Default => row
                .get(KeyAttributes::DEFAULT_ATTRIBUTE)
                .and_then(Key::from_value)
                .ok_or_else(|| missing(KeyAttributes::DEFAULT_ATTRIBUTE)),
            KeyAttributes::Attribute(attribute) => row
                .get(attribute)
                .and_then(Key::from_value)
                .ok_or_else(|| missing(attribute)),
            KeyAttributes::Composite(attributes) => attributes
                .iter()
                .map(|attribute| {
                    row.get(attribute)
                        .and_then(Key::from_value)
                        .ok_or_else(|| missing(attribute))
                })
                .collect::<Result<Vec<_>>>()
                .map(Key::Composite),
            KeyAttributes::Index => {
                let key = Key::Int(state.next_index_key);
                state.next_index_key += 1;
                Ok(key)
            }
        }
    }

    /// Derives keys for incoming rows, rejecting duplicates against the
    /// current contents and within the batch.
    fn key_rows(&self, state: &mut ArrayState, rows: Vec<Value>) -> Result<Vec<(Key, Value)>> {
        let mut seen = ahash::AHashSet::with_capacity(rows.len());
        let mut keyed = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let key = self.extract_key(&row, index, state)?;
            if state.positions.contains_key(&key) || !seen.insert(key.clone()) {
                return Err(DataProviderError::DuplicateKey { key, index });
            }
            keyed.push((key, row));
        }
        Ok(keyed)
    }

    /// Filtered and sorted copy of the current rows.
    fn snapshot(
        &self,
        sort_criteria: Option<&[SortCriterion]>,
        filter_criterion: Option<&FilterCriterion>,
    ) -> Result<Vec<(Key, Value)>> {
        let filter = filter_criterion.map(FilterCriterion::compile).transpose()?;
        let mut rows: Vec<(Key, Value)> = self
            .state
            .read()
            .rows
            .iter()
            .filter(|(_, row)| filter.as_ref().map_or(true, |f| f.matches(row)))
            .cloned()
            .collect();
        if let Some(criteria) = sort_criteria.filter(|c| !c.is_empty()) {
            rows.sort_by(|(_, a), (_, b)| compare_rows(a, b, criteria));
        }
        Ok(rows)
    }

    /// Inserts rows at `index` (appends when `None` or past the end).
    ///
    /// Returns the keys of the inserted rows and fires a `Mutate` event with
    /// an `add` operation.
    ///
    /// # Errors
    ///
    /// Fails without modifying the provider if any row lacks a key or
    /// duplicates an existing key.
    pub fn add(&self, rows: Vec<Value>, index: Option<usize>) -> Result<Vec<Key>> {
        let operation = {
            let mut state = self.state.write();
            let keyed = self.key_rows(&mut state, rows)?;
            let at = index.map_or(state.rows.len(), |i| i.min(state.rows.len()));
            let keys: Vec<Key> = keyed.iter().map(|(k, _)| k.clone()).collect();
            let data: Vec<Value> = keyed.iter().map(|(_, v)| v.clone()).collect();
            let indexes: Vec<usize> = (at..at + keyed.len()).collect();
            let tail = state.rows.split_off(at);
            state.rows.extend(keyed);
            state.rows.extend(tail);
            state.reindex();
            MutationOperation {
                metadata: Some(keys.iter().cloned().map(ItemMetadata::new).collect()),
                keys,
                data: Some(data),
                indexes: Some(indexes),
            }
        };
        let keys = operation.keys.clone();
        tracing::debug!(added = keys.len(), "array data provider rows added");
        self.events.dispatch(&DataProviderEvent::Mutate(MutationDetail {
            add: Some(operation),
            ..MutationDetail::default()
        }));
        Ok(keys)
    }

    /// Removes the rows with the given keys. Unknown keys are ignored.
    ///
    /// Returns the keys actually removed; fires a `Mutate` event with a
    /// `remove` operation when at least one row was removed.
    pub fn remove(&self, keys: &[Key]) -> Vec<Key> {
        let operation = {
            let mut state = self.state.write();
            let mut found: Vec<(usize, Key)> = keys
                .iter()
                .filter_map(|k| state.positions.get(k).map(|i| (*i, k.clone())))
                .collect();
            found.sort_by_key(|(i, _)| *i);
            found.dedup_by_key(|(i, _)| *i);
            if found.is_empty() {
                return Vec::new();
            }
            let mut data = Vec::with_capacity(found.len());
            for (i, _) in found.iter().rev() {
                data.push(state.rows.remove(*i).1);
            }
            data.reverse();
            state.reindex();
            let (indexes, keys): (Vec<usize>, Vec<Key>) = found.into_iter().unzip();
            MutationOperation {
                metadata: Some(keys.iter().cloned().map(ItemMetadata::new).collect()),
                keys,
                data: Some(data),
                indexes: Some(indexes),
            }
        };
        let keys = operation.keys.clone();
        tracing::debug!(removed = keys.len(), "array data provider rows removed");
        self.events.dispatch(&DataProviderEvent::Mutate(MutationDetail {
            remove: Some(operation),
            ..MutationDetail::default()
        }));
        keys
    }

    /// Replaces the data of existing rows, matched by item key. Items whose
    /// key is unknown are ignored.
    ///
    /// Returns the keys actually updated; fires a `Mutate` event with an
    /// `update` operation when at least one row changed.
    pub fn update(&self, items: Vec<Item>) -> Vec<Key> {
        let operation = {
            let mut state = self.state.write();
            let mut keys = Vec::new();
            let mut data = Vec::new();
            let mut indexes = Vec::new();
            for item in items {
                let Some(&i) = state.positions.get(item.key()) else {
                    continue;
                };
                state.rows[i].1 = item.data.clone();
                indexes.push(i);
                data.push(item.data);
                keys.push(item.metadata.key);
            }
            if keys.is_empty() {
                return Vec::new();
            }
            MutationOperation {
                metadata: Some(keys.iter().cloned().map(ItemMetadata::new).collect()),
                keys,
                data: Some(data),
                indexes: Some(indexes),
            }
        };
        let keys = operation.keys.clone();
        self.events.dispatch(&DataProviderEvent::Mutate(MutationDetail {
            update: Some(operation),
            ..MutationDetail::default()
        }));
        keys
    }

    /// Replaces every row and fires a `Refresh` event.
    ///
    /// # Errors
    ///
    /// Fails without modifying the provider if any row lacks a key or two
    /// rows share one.
    pub fn reset(&self, rows: Vec<Value>) -> Result<()> {
        {
            let mut state = self.state.write();
            let mut fresh = ArrayState {
                rows: Vec::new(),
                positions: AHashMap::new(),
                next_index_key: 0,
            };
            fresh.rows = self.key_rows(&mut fresh, rows)?;
            fresh.reindex();
            *state = fresh;
        }
        tracing::debug!("array data provider reset");
        self.events.dispatch(&DataProviderEvent::Refresh);
        Ok(())
    }

    /// Number of registered event listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }

    fn page_size(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.config.default_page_size).max(1)
    }
}

/// Position of an in-flight `fetch_first` sequence over a snapshot.
struct PageCursor {
    rows: Vec<(Key, Value)>,
    offset: usize,
    page_size: usize,
    params: FetchListParameters,
    finished: bool,
}

impl PageCursor {
    fn next_page(&mut self) -> IteratorResult {
        let end = (self.offset + self.page_size).min(self.rows.len());
        let (keys, data): (Vec<Key>, Vec<Value>) = self.rows[self.offset..end].iter().cloned().unzip();
        let start_index = self.offset;
        self.offset = end;
        self.finished = self.offset >= self.rows.len();
        IteratorResult {
            value: FetchListResult::new(self.params.clone(), keys, data).with_start_index(start_index),
            done: self.finished,
        }
    }
}

#[async_trait]
impl DataProvider for ArrayDataProvider {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            fetch_by_keys: self
                .config
                .fetch_by_keys
                .map(|implementation| FetchByKeysCapability { implementation }),
            fetch_by_offset: self
                .config
                .fetch_by_offset
                .map(|implementation| FetchByOffsetCapability { implementation }),
            sort: Some(SortCapability {
                attributes: SortAttributes::Multiple,
            }),
            filter: Some(FilterCapability {
                operators: FilterOp::ALL.to_vec(),
            }),
        }
    }

    fn fetch_first(&self, params: FetchListParameters) -> FetchListStream {
        let rows = match self.snapshot(params.sort_criteria.as_deref(), params.filter_criterion.as_ref()) {
            Ok(rows) => rows,
            Err(e) => return stream::once(async move { Err::<IteratorResult, _>(e) }).boxed(),
        };
        let cursor = PageCursor {
            rows,
            offset: 0,
            page_size: self.page_size(params.page_size()),
            params,
            finished: false,
        };
        stream::unfold(cursor, |mut cursor| async move {
            if cursor.finished {
                return None;
            }
            let page = cursor.next_page();
            Some((Ok::<_, DataProviderError>(page), cursor))
        })
        .boxed()
    }

    async fn fetch_by_offset(
        &self,
        params: FetchByOffsetParameters,
    ) -> Result<FetchByOffsetResult> {
        if self.config.fetch_by_offset.is_none() {
            return Err(DataProviderError::CapabilityNotSupported {
                capability: FETCH_BY_OFFSET,
            });
        }
        let rows = self.snapshot(params.sort_criteria.as_deref(), params.filter_criterion.as_ref())?;
        let total = rows.len();
        let size = self.page_size(params.page_size());
        let results: Vec<Item> = rows
            .into_iter()
            .skip(params.offset)
            .take(size)
            .map(|(key, data)| Item::new(key, data))
            .collect();
        let done = params.offset + results.len() >= total;
        Ok(FetchByOffsetResult {
            fetch_parameters: params,
            results,
            done,
        })
    }

    async fn fetch_by_keys(&self, params: FetchByKeysParameters) -> Result<FetchByKeysResult> {
        if self.config.fetch_by_keys.is_none() {
            return Err(DataProviderError::CapabilityNotSupported {
                capability: FETCH_BY_KEYS,
            });
        }
        let results = {
            let state = self.state.read();
            params
                .keys
                .into_iter()
                .filter_map(|key| {
                    let &i = state.positions.get(&key)?;
                    Some((key.clone(), Item::new(key, state.rows[i].1.clone())))
                })
                .collect()
        };
        Ok(FetchByKeysResult { results })
    }

    async fn contains_keys(&self, params: ContainsKeysParameters) -> Result<ContainsKeysResult> {
        if self.config.fetch_by_keys.is_none() {
            return Err(DataProviderError::CapabilityNotSupported {
                capability: FETCH_BY_KEYS,
            });
        }
        let results = {
            let state = self.state.read();
            params
                .keys
                .into_iter()
                .filter(|key| state.positions.contains_key(key))
                .collect()
        };
        Ok(ContainsKeysResult { results })
    }

    async fn get_total_size(&self) -> Result<i64> {
        Ok(i64::try_from(self.state.read().rows.len()).unwrap_or(i64::MAX))
    }

    fn is_empty(&self) -> Emptiness {
        if self.state.read().rows.is_empty() {
            Emptiness::Yes
        } else {
            Emptiness::No
        }
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

#[cfg(test)]
mod tests {
    use dataview_core::capability::FetchByKeysImplementation;
    use dataview_core::types::row;

    use super::*;

    fn letters() -> Vec<Value> {
        vec![
            row([("id", Value::Int(1)), ("name", Value::from("a"))]),
            row([("id", Value::Int(2)), ("name", Value::from("b"))]),
            row([("id", Value::Int(3)), ("name", Value::from("c"))]),
        ]
    }

    fn numbered(n: i64) -> Vec<Value> {
        (0..n)
            .map(|i| row([("id", Value::Int(i)), ("n", Value::Int(i % 3))]))
            .collect()
    }

    async fn collect_pages(stream: FetchListStream) -> Vec<IteratorResult> {
        stream.map(|r| r.unwrap()).collect().await
    }

    #[test]
    fn default_key_attribute_is_id() {
        let provider = ArrayDataProvider::from_rows(letters()).unwrap();
        let state = provider.state.read();
        let keys: Vec<&Key> = state.rows.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![&Key::Int(1), &Key::Int(2), &Key::Int(3)]);
    }

    #[test]
    fn rows_without_id_are_rejected_not_keyed_by_all_fields() {
        let rows = vec![row([("name", "a"), ("kind", "x")])];
        let err = ArrayDataProvider::from_rows(rows).err().unwrap();
        assert!(matches!(
            err,
            DataProviderError::MissingKeyAttribute { ref attribute, index: 0 } if attribute == "id"
        ));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let rows = vec![row([("id", 1_i64)]), row([("id", 1_i64)])];
        let err = ArrayDataProvider::from_rows(rows).err().unwrap();
        assert!(matches!(err, DataProviderError::DuplicateKey { key: Key::Int(1), index: 1 }));
    }

    #[test]
    fn composite_and_index_keys() {
        let composite = ArrayDataProvider::new(
            vec![row([("a", Value::Int(1)), ("b", Value::from("x"))])],
            ArrayProviderConfig {
                key_attributes: KeyAttributes::Composite(vec!["a".into(), "b".into()]),
                ..ArrayProviderConfig::default()
            },
        )
        .unwrap();
        assert_eq!(
            composite.state.read().rows[0].0,
            Key::Composite(vec![Key::Int(1), Key::from("x")])
        );

        let indexed = ArrayDataProvider::new(
            vec![row([("v", "p")]), row([("v", "q")])],
            ArrayProviderConfig {
                key_attributes: KeyAttributes::Index,
                ..ArrayProviderConfig::default()
            },
        )
        .unwrap();
        let keys = indexed.add(vec![row([("v", "r")])], Some(0)).unwrap();
        assert_eq!(keys, vec![Key::Int(2)]);
    }

    #[tokio::test]
    async fn fetch_first_pages_until_done() {
        let provider = ArrayDataProvider::from_rows(numbered(5)).unwrap();
        let pages = collect_pages(provider.fetch_first(FetchListParameters::with_size(2))).await;

        let sizes: Vec<usize> = pages.iter().map(|p| p.value.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(
            pages.iter().map(|p| p.done).collect::<Vec<_>>(),
            vec![false, false, true]
        );
        assert_eq!(
            pages.iter().map(|p| p.value.start_index).collect::<Vec<_>>(),
            vec![0, 2, 4]
        );
    }

    #[tokio::test]
    async fn fetch_first_without_size_uses_default_page_size() {
        let provider = ArrayDataProvider::from_rows(numbered(30)).unwrap();
        let pages = collect_pages(provider.fetch_first(FetchListParameters::default())).await;
        assert_eq!(pages[0].value.len(), 25);
        assert_eq!(pages[1].value.len(), 5);
    }

    #[tokio::test]
    async fn fetch_first_on_empty_provider_yields_one_done_page() {
        let provider = ArrayDataProvider::from_rows(Vec::new()).unwrap();
        let pages = collect_pages(provider.fetch_first(FetchListParameters::with_size(10))).await;
        assert_eq!(pages.len(), 1);
        assert!(pages[0].done);
        assert!(pages[0].value.is_empty());
    }

    #[tokio::test]
    async fn fetch_first_sorts_and_filters() {
        let provider = ArrayDataProvider::from_rows(numbered(6)).unwrap();
        let params = FetchListParameters {
            size: 10,
            sort_criteria: Some(vec![SortCriterion::descending("n"), SortCriterion::ascending("id")]),
            filter_criterion: Some(FilterCriterion::attribute(FilterOp::Ne, "n", 0_i64)),
        };
        let pages = collect_pages(provider.fetch_first(params)).await;
        let (keys, _) = pages[0].value.clone().into_parts();
        assert_eq!(keys, vec![Key::Int(2), Key::Int(5), Key::Int(1), Key::Int(4)]);
    }

    #[tokio::test]
    async fn invalid_filter_surfaces_as_stream_error() {
        let provider = ArrayDataProvider::from_rows(letters()).unwrap();
        let params = FetchListParameters {
            filter_criterion: Some(FilterCriterion::attribute(FilterOp::Regex, "name", "[")),
            ..FetchListParameters::default()
        };
        let mut stream = provider.fetch_first(params);
        assert!(matches!(stream.next().await, Some(Err(DataProviderError::InvalidFilter(_)))));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn fetch_by_offset_slices_and_reports_done() {
        let provider = ArrayDataProvider::from_rows(numbered(5)).unwrap();
        let result = provider
            .fetch_by_offset(FetchByOffsetParameters {
                offset: 3,
                size: 10,
                ..FetchByOffsetParameters::default()
            })
            .await
            .unwrap();
        let keys: Vec<&Key> = result.results.iter().map(Item::key).collect();
        assert_eq!(keys, vec![&Key::Int(3), &Key::Int(4)]);
        assert!(result.done);

        let partial = provider
            .fetch_by_offset(FetchByOffsetParameters {
                offset: 1,
                size: 2,
                ..FetchByOffsetParameters::default()
            })
            .await
            .unwrap();
        assert_eq!(partial.results.len(), 2);
        assert!(!partial.done);
    }

    #[tokio::test]
    async fn hidden_capabilities_are_not_supported() {
        let provider = ArrayDataProvider::new(
            letters(),
            ArrayProviderConfig {
                fetch_by_keys: None,
                fetch_by_offset: None,
                ..ArrayProviderConfig::default()
            },
        )
        .unwrap();
        let caps = provider.capabilities();
        assert!(caps.fetch_by_keys.is_none());
        assert!(caps.fetch_by_offset.is_none());
        assert!(matches!(
            provider.fetch_by_offset(FetchByOffsetParameters::default()).await,
            Err(DataProviderError::CapabilityNotSupported { capability: "fetchByOffset" })
        ));
        assert!(matches!(
            provider.fetch_by_keys(FetchByKeysParameters::default()).await,
            Err(DataProviderError::CapabilityNotSupported { capability: "fetchByKeys" })
        ));
    }

    #[tokio::test]
    async fn lookup_by_keys() {
        let provider = ArrayDataProvider::from_rows(letters()).unwrap();
        assert_eq!(
            provider.capabilities().fetch_by_keys.unwrap().implementation,
            FetchByKeysImplementation::Lookup
        );

        let fetched = provider
            .fetch_by_keys(FetchByKeysParameters::new([Key::Int(2), Key::Int(4)]))
            .await
            .unwrap();
        assert_eq!(fetched.results.len(), 1);
        assert_eq!(fetched.results[&Key::Int(2)].data.get("name"), Some(&Value::from("b")));

        let contained = provider
            .contains_keys(ContainsKeysParameters::new([Key::Int(2), Key::Int(4)]))
            .await
            .unwrap();
        assert_eq!(contained.results, [Key::Int(2)].into_iter().collect());
    }

    #[tokio::test]
    async fn size_and_emptiness() {
        let provider = ArrayDataProvider::from_rows(letters()).unwrap();
        assert_eq!(provider.get_total_size().await.unwrap(), 3);
        assert_eq!(provider.is_empty(), Emptiness::No);

        provider.reset(Vec::new()).unwrap();
        assert_eq!(provider.get_total_size().await.unwrap(), 0);
        assert_eq!(provider.is_empty(), Emptiness::Yes);
    }

    #[test]
    fn mutations_fire_events() {
        let provider = ArrayDataProvider::from_rows(letters()).unwrap();
        let seen = Arc::new(RwLock::new(Vec::new()));
        for event_type in [EventType::Mutate, EventType::Refresh] {
            let sink = Arc::clone(&seen);
            provider.add_event_listener(
                event_type,
                Arc::new(move |event: &DataProviderEvent| sink.write().push(event.clone())),
            );
        }

        provider.add(vec![row([("id", 4_i64)])], Some(1)).unwrap();
        provider.remove(&[Key::Int(1), Key::Int(99)]);
        provider.update(vec![Item::new(Key::Int(3), row([("id", Value::Int(3)), ("name", Value::from("z"))]))]);
        provider.reset(letters()).unwrap();

        let events = seen.read();
        assert_eq!(events.len(), 4);
        match &events[0] {
            DataProviderEvent::Mutate(detail) => {
                let add = detail.add.as_ref().unwrap();
                assert_eq!(add.keys, vec![Key::Int(4)]);
                assert_eq!(add.indexes, Some(vec![1]));
            }
            other => panic!("expected add mutation, got {other:?}"),
        }
        match &events[1] {
            DataProviderEvent::Mutate(detail) => {
                let remove = detail.remove.as_ref().unwrap();
                assert_eq!(remove.keys, vec![Key::Int(1)]);
                assert_eq!(remove.indexes, Some(vec![0]));
            }
            other => panic!("expected remove mutation, got {other:?}"),
        }
        match &events[2] {
            DataProviderEvent::Mutate(detail) => {
                let update = detail.update.as_ref().unwrap();
                assert_eq!(update.keys, vec![Key::Int(3)]);
                assert_eq!(update.indexes, Some(vec![2]));
            }
            other => panic!("expected update mutation, got {other:?}"),
        }
        assert_eq!(events[3], DataProviderEvent::Refresh);
    }

    #[test]
    fn failed_add_leaves_rows_untouched() {
        let provider = ArrayDataProvider::from_rows(letters()).unwrap();
        let err = provider.add(vec![row([("id", 5_i64)]), row([("id", 2_i64)])], None).err().unwrap();
        assert!(matches!(err, DataProviderError::DuplicateKey { key: Key::Int(2), index: 1 }));
        assert_eq!(provider.state.read().rows.len(), 3);
    }

    #[test]
    fn noop_mutations_fire_nothing() {
        let provider = ArrayDataProvider::from_rows(letters()).unwrap();
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        provider.add_event_listener(
            EventType::Mutate,
            Arc::new(move |_: &DataProviderEvent| {
                counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }),
        );
        assert!(provider.remove(&[Key::Int(42)]).is_empty());
        assert!(provider.update(vec![Item::new(Key::Int(42), Value::Null)]).is_empty());
        assert_eq!(count.load(std::sync::atomic::Ordering::Relaxed), 0);
    }
}
