use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct ItemData {
    pub id: i32,
    pub name: String,
    pub display_name: String,
    pub stack_size: i32,
}

#[derive(Debug, Deserialize)]
struct ItemDataRaw {
    id: i32,
    name: String,
    #[serde(rename = "displayName")]
    display_name: String,
    #[serde(rename = "stackSize")]
    stack_size: i32,
}

/// Loads `items.json` into a name-keyed map, following the same
/// open/parse/required-field degrade-to-empty discipline as [`crate::block::load_blocks`].
pub fn load_items(path: impl AsRef<Path>) -> HashMap<String, ItemData> {
    load_items_raw(path)
        .into_iter()
        .map(|item| (item.name.clone(), item))
        .collect()
}

/// Same data, keyed by numeric ID instead of name.
pub fn load_item_ids(path: impl AsRef<Path>) -> HashMap<i32, ItemData> {
    load_items_raw(path)
        .into_iter()
        .map(|item| (item.id, item))
        .collect()
}

fn load_items_raw(path: impl AsRef<Path>) -> Vec<ItemData> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to open items.json at {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let raw: serde_json::Value = match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("failed to parse items.json: {}", e);
            return Vec::new();
        }
    };

    let Some(entries) = raw.as_array() else {
        tracing::error!("items.json root is not an array");
        return Vec::new();
    };

    let mut items = Vec::new();
    for entry in entries {
        match serde_json::from_value::<ItemDataRaw>(entry.clone()) {
            Ok(raw) => items.push(ItemData {
                id: raw.id,
                name: raw.name,
                display_name: raw.display_name,
                stack_size: raw.stack_size,
            }),
            Err(_) => {
                tracing::error!("item entry missing 'id', 'name', 'displayName' or 'stackSize'");
            }
        }
    }
    items
}
