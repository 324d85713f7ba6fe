use dataview_core::{DataMapping, Item, Key, Value};

/// Applies `mapping` to one page of parallel keys and rows.
///
/// The key of each output row is the key the mapping assigns, which may
/// differ from the provider key.
pub(crate) fn map_page(
    mapping: Option<&dyn DataMapping>,
    keys: Vec<Key>,
    data: Vec<Value>,
) -> (Vec<Key>, Vec<Value>) {
    let Some(mapping) = mapping else {
        return (keys, data);
    };
    keys.into_iter()
        .zip(data)
        .map(|(key, data)| {
            let item = mapping.map_fields(Item::new(key, data));
            (item.metadata.key, item.data)
        })
        .unzip()
}

/// Applies `mapping` to a single item.
pub(crate) fn map_item(mapping: Option<&dyn DataMapping>, item: Item) -> Item {
    match mapping {
        Some(mapping) => mapping.map_fields(item),
        None => item,
    }
}
