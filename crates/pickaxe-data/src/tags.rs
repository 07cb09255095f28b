use crate::block::BlockData;
use crate::item::ItemData;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Loads a `{tagName: [entryName, ...]}` tag file, resolving each entry name
/// against an already-loaded id map. Unresolvable names are logged and
/// dropped rather than failing the whole tag.
fn load_tags_generic(path: impl AsRef<Path>, resolve: impl Fn(&str) -> Option<i32>) -> HashMap<String, Vec<i32>> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to open tags JSON file: {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    let raw: serde_json::Value = match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("JSON parse error in {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    let Some(obj) = raw.as_object() else {
        return HashMap::new();
    };

    let mut tags = HashMap::new();
    for (tag, value) in obj {
        let Some(arr) = value.as_array() else { continue };
        let mut ids = Vec::new();
        for entry in arr {
            let Some(name) = entry.as_str() else { continue };
            match resolve(name) {
                Some(id) => ids.push(id),
                None => tracing::error!("entry not found for tag {}: {}", tag, name),
            }
        }
        tags.insert(tag.clone(), ids);
    }
    tags
}

pub fn load_block_tags(blocks: &HashMap<String, BlockData>, path: impl AsRef<Path>) -> HashMap<String, Vec<i32>> {
    load_tags_generic(path, |name| blocks.get(name).map(|b| b.id))
}

pub fn load_item_tags(items: &HashMap<String, ItemData>, path: impl AsRef<Path>) -> HashMap<String, Vec<i32>> {
    load_tags_generic(path, |name| items.get(name).map(|i| i.id))
}
