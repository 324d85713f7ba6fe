//! Capability descriptors advertised by data providers.
//!
//! A provider describes its optional features once through [`Capabilities`];
//! consumers read the descriptor instead of probing for methods.

use serde::{Deserialize, Serialize};

use crate::criteria::FilterOp;

pub const FETCH_BY_KEYS: &str = "fetchByKeys";
pub const FETCH_BY_OFFSET: &str = "fetchByOffset";
pub const SORT: &str = "sort";
pub const FILTER: &str = "filter";

/// How a provider answers `fetch_by_keys`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchByKeysImplementation {
    /// Keys are located by scanning the sequence.
    Iteration,
    /// Keys are looked up directly.
    Lookup,
}

/// How a provider answers `fetch_by_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FetchByOffsetImplementation {
    Iteration,
    RandomAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortAttributes {
    Single,
    Multiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchByKeysCapability {
    pub implementation: FetchByKeysImplementation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchByOffsetCapability {
    pub implementation: FetchByOffsetImplementation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortCapability {
    pub attributes: SortAttributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterCapability {
    pub operators: Vec<FilterOp>,
}

/// A single named capability, as returned by a capability lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    FetchByKeys(FetchByKeysCapability),
    FetchByOffset(FetchByOffsetCapability),
    Sort(SortCapability),
    Filter(FilterCapability),
}

/// Every optional feature a provider supports. `None` means unsupported.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub fetch_by_keys: Option<FetchByKeysCapability>,
    pub fetch_by_offset: Option<FetchByOffsetCapability>,
    pub sort: Option<SortCapability>,
    pub filter: Option<FilterCapability>,
}

impl Capabilities {
    /// Looks up a capability by its wire name (`"fetchByKeys"`, `"fetchByOffset"`,
    /// `"sort"`, `"filter"`). Unknown names resolve to `None`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Capability> {
        match name {
            FETCH_BY_KEYS => self.fetch_by_keys.map(Capability::FetchByKeys),
            FETCH_BY_OFFSET => self.fetch_by_offset.map(Capability::FetchByOffset),
            SORT => self.sort.map(Capability::Sort),
            FILTER => self.filter.clone().map(Capability::Filter),
            _ => None,
        }
    }
}
