//! Schema mapping between a view and the provider beneath it.

use std::collections::BTreeMap;

use crate::criteria::{FilterCriterion, SortCriterion};
use crate::types::{Item, Key, Value};

/// Caller-supplied transform between the provider schema and a view schema.
///
/// `map_fields` turns provider rows into view rows and may substitute the
/// key. The criteria hooks translate view-side attribute names into
/// provider-side names (`map_*`) and back (`unmap_*`). Implementations must
/// be pure: the same input always yields the same output.
pub trait DataMapping: Send + Sync {
    /// Maps one provider item into the view schema.
    fn map_fields(&self, item: Item) -> Item;

    /// Maps view sort criteria into provider sort criteria.
    fn map_sort_criteria(&self, criteria: Vec<SortCriterion>) -> Vec<SortCriterion> {
        criteria
    }

    /// Maps provider sort criteria back into view sort criteria.
    fn unmap_sort_criteria(&self, criteria: Vec<SortCriterion>) -> Vec<SortCriterion> {
        criteria
    }

    /// Maps a view filter criterion into a provider filter criterion.
    fn map_filter_criterion(&self, criterion: FilterCriterion) -> FilterCriterion {
        criterion
    }
}

/// Renames row fields from provider names to view names.
///
/// Fields without a rename rule pass through unchanged. Sort and filter
/// attributes are translated in the opposite direction. When a key field is
/// configured, the item key is re-derived from that (view-side) field after
/// renaming.
#[derive(Debug, Clone, Default)]
pub struct FieldRenameMapping {
    /// provider field -> view field
    to_view: BTreeMap<String, String>,
    /// view field -> provider field
    to_provider: BTreeMap<String, String>,
    key_field: Option<String>,
}

impl FieldRenameMapping {
    /// Creates a mapping from `(provider_field, view_field)` pairs.
    #[must_use]
    pub fn new<I, A, B>(renames: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut mapping = Self::default();
        for (provider, view) in renames {
            let (provider, view) = (provider.into(), view.into());
            mapping.to_provider.insert(view.clone(), provider.clone());
            mapping.to_view.insert(provider, view);
        }
        mapping
    }

    /// Substitutes each item's key with the value of the given view field.
    #[must_use]
    pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = Some(field.into());
        self
    }

    fn view_name(&self, provider_field: String) -> String {
        match self.to_view.get(&provider_field) {
            Some(view) => view.clone(),
            None => provider_field,
        }
    }

    fn provider_name(&self, view_field: String) -> String {
        match self.to_provider.get(&view_field) {
            Some(provider) => provider.clone(),
            None => view_field,
        }
    }

    fn rename_row(&self, data: Value) -> Value {
        match data {
            Value::Map(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(name, value)| (self.view_name(name), value))
                    .collect(),
            ),
            other => other,
        }
    }
}

impl DataMapping for FieldRenameMapping {
    fn map_fields(&self, item: Item) -> Item {
        let Item { data, metadata } = item;
        let data = self.rename_row(data);
        let key = self
            .key_field
            .as_deref()
            .and_then(|field| data.get(field))
            .and_then(Key::from_value)
            .unwrap_or(metadata.key);
        Item::new(key, data)
    }

    fn map_sort_criteria(&self, criteria: Vec<SortCriterion>) -> Vec<SortCriterion> {
        criteria
            .into_iter()
            .map(|c| SortCriterion {
                attribute: self.provider_name(c.attribute),
                direction: c.direction,
            })
            .collect()
    }

    fn unmap_sort_criteria(&self, criteria: Vec<SortCriterion>) -> Vec<SortCriterion> {
        criteria
            .into_iter()
            .map(|c| SortCriterion {
                attribute: self.view_name(c.attribute),
                direction: c.direction,
            })
            .collect()
    }

    fn map_filter_criterion(&self, criterion: FilterCriterion) -> FilterCriterion {
        criterion.map_attributes(&|attribute| self.provider_name(attribute))
    }
}
