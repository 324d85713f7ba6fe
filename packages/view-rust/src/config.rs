//! Configuration types for views and the in-memory provider.

use dataview_core::capability::{FetchByKeysImplementation, FetchByOffsetImplementation};

/// Page size used when a view scans a provider for requested keys.
pub const DEFAULT_FETCH_BY_KEYS_PAGE_SIZE: usize = 25;

/// Page size the array provider uses when a request carries no size hint.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// View-level tuning knobs.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Page size for the `fetch_by_keys` scan fallback.
    pub fetch_by_keys_page_size: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            fetch_by_keys_page_size: DEFAULT_FETCH_BY_KEYS_PAGE_SIZE,
        }
    }
}

/// How the array provider derives a key from each row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyAttributes {
    /// The `id` field.
    #[default]
    Default,
    /// A single named field.
    Attribute(String),
    /// Several fields, combined into a [`Key::Composite`](dataview_core::Key::Composite).
    Composite(Vec<String>),
    /// The row's position in the backing array at the time it was added.
    Index,
}

impl KeyAttributes {
    /// Field name used by [`KeyAttributes::Default`].
    pub const DEFAULT_ATTRIBUTE: &'static str = "id";
}

/// Configuration for [`ArrayDataProvider`](crate::providers::ArrayDataProvider).
#[derive(Debug, Clone)]
pub struct ArrayProviderConfig {
    pub key_attributes: KeyAttributes,
    /// Page size when `FetchListParameters::size <= 0`.
    pub default_page_size: usize,
    /// Advertised fetch-by-keys implementation; `None` hides the capability.
    pub fetch_by_keys: Option<FetchByKeysImplementation>,
    /// Advertised fetch-by-offset implementation; `None` hides the capability.
    pub fetch_by_offset: Option<FetchByOffsetImplementation>,
}

impl Default for ArrayProviderConfig {
    fn default() -> Self {
        Self {
            key_attributes: KeyAttributes::Default,
            default_page_size: DEFAULT_PAGE_SIZE,
            fetch_by_keys: Some(FetchByKeysImplementation::Lookup),
            fetch_by_offset: Some(FetchByOffsetImplementation::RandomAccess),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_config_defaults() {
        assert_eq!(ViewConfig::default().fetch_by_keys_page_size, 25);
    }

    #[test]
    fn array_provider_config_defaults() {
        let config = ArrayProviderConfig::default();
        assert_eq!(config.key_attributes, KeyAttributes::Default);
        assert_eq!(config.default_page_size, 25);
        assert_eq!(config.fetch_by_keys, Some(FetchByKeysImplementation::Lookup));
        assert_eq!(
            config.fetch_by_offset,
            Some(FetchByOffsetImplementation::RandomAccess)
        );
    }
}
