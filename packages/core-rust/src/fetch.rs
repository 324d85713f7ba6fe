//! Request descriptors and result envelopes for the fetch operations.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::criteria::{FilterCriterion, SortCriterion};
use crate::types::{Item, ItemMetadata, Key, Value};

/// Parameters for `fetch_first`.
///
/// `size <= 0` means "no limit hint": the provider picks its own page size.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchListParameters {
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sort_criteria: Option<Vec<SortCriterion>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filter_criterion: Option<FilterCriterion>,
}

impl FetchListParameters {
    #[must_use]
    pub fn with_size(size: i64) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// The size as a row count, or `None` when no limit hint was given.
    #[must_use]
    pub fn page_size(&self) -> Option<usize> {
        usize::try_from(self.size).ok().filter(|s| *s > 0)
    }
}

/// Parameters for `fetch_by_offset`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchByOffsetParameters {
    pub offset: usize,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sort_criteria: Option<Vec<SortCriterion>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filter_criterion: Option<FilterCriterion>,
}

impl FetchByOffsetParameters {
    #[must_use]
    pub fn page_size(&self) -> Option<usize> {
        usize::try_from(self.size).ok().filter(|s| *s > 0)
    }
}

/// Parameters for `fetch_by_keys`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FetchByKeysParameters {
    pub keys: HashSet<Key>,
}

impl FetchByKeysParameters {
    #[must_use]
    pub fn new<I: IntoIterator<Item = Key>>(keys: I) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }
}

/// Parameters for `contains_keys`.
pub type ContainsKeysParameters = FetchByKeysParameters;

/// One page of a `fetch_first` sequence.
///
/// `data` and `metadata` are parallel: `metadata[i]` identifies `data[i]`.
/// `start_index` is the sequence position of `data[0]`: 0 on the first
/// page, then advanced by the rows every earlier page returned.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchListResult {
    pub fetch_parameters: FetchListParameters,
    pub data: Vec<Value>,
    pub metadata: Vec<ItemMetadata>,
    #[serde(default)]
    pub start_index: usize,
}

impl FetchListResult {
    /// Builds a page from parallel key and data vectors.
    #[must_use]
    pub fn new(fetch_parameters: FetchListParameters, keys: Vec<Key>, data: Vec<Value>) -> Self {
        Self {
            fetch_parameters,
            data,
            metadata: keys.into_iter().map(ItemMetadata::new).collect(),
            start_index: 0,
        }
    }

    #[must_use]
    pub fn with_start_index(mut self, start_index: usize) -> Self {
        self.start_index = start_index;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Splits the page into its keys and rows.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Key>, Vec<Value>) {
        let keys = self.metadata.into_iter().map(|m| m.key).collect();
        (keys, self.data)
    }
}

/// Resolution of one `next()` call on a fetch-first sequence.
///
/// The sequence ends after the result whose `done` flag is set; that last
/// result may still carry rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IteratorResult {
    pub value: FetchListResult,
    pub done: bool,
}

/// Result of `fetch_by_offset`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchByOffsetResult {
    pub fetch_parameters: FetchByOffsetParameters,
    pub results: Vec<Item>,
    /// True when no rows exist past this result.
    pub done: bool,
}

/// Result of `fetch_by_keys`. Keys that were not found are absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchByKeysResult {
    pub results: HashMap<Key, Item>,
}

/// Result of `contains_keys`. Keys that were not found are absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainsKeysResult {
    pub results: HashSet<Key>,
}

/// Answer to `is_empty`, which a provider may not know without fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emptiness {
    Yes,
    No,
    Unknown,
}
