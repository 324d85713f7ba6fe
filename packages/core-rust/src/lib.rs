//! `dataview` core: row values, keys, fetch descriptors, capabilities,
//! schema mapping, and change events shared by data providers and views.

pub mod capability;
pub mod criteria;
pub mod error;
pub mod events;
pub mod fetch;
pub mod mapping;
pub mod types;

pub use capability::{Capabilities, Capability};
pub use criteria::{FilterCriterion, FilterOp, RowFilter, SortCriterion, SortDirection};
pub use error::{DataProviderError, Result};
pub use events::{
    DataProviderEvent, DataProviderListener, EventDispatcher, EventType, ListenerId,
    MutationDetail, MutationOperation,
};
pub use fetch::{
    ContainsKeysParameters, ContainsKeysResult, Emptiness, FetchByKeysParameters,
    FetchByKeysResult, FetchByOffsetParameters, FetchByOffsetResult, FetchListParameters,
    FetchListResult, IteratorResult,
};
pub use mapping::{DataMapping, FieldRenameMapping};
pub use types::{Item, ItemMetadata, Key, Value};
