use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct BlockData {
    pub id: i32,
    pub display_name: String,
    pub hardness: f32,
    pub resistance: f32,
    pub stack_size: i32,
    pub diggable: bool,
    pub material: String,
    pub transparent: bool,
    pub emit_light: u8,
    pub filter_light: u8,
    pub default_state: i32,
    pub min_state_id: i32,
    pub max_state_id: i32,
    pub harvest_tools: Option<Vec<i32>>,
    pub bounding_box: String,
    pub drops: Vec<u16>,
}

fn default_stack_size() -> i32 {
    64
}
fn default_true() -> bool {
    true
}
fn default_material() -> String {
    "rock".to_string()
}
fn default_bounding_box() -> String {
    "block".to_string()
}

/// Loads `blocks.json` into a name-keyed map. Missing file, bad JSON, or an
/// entry missing its required fields are logged and skipped rather than
/// treated as fatal — the server starts with whatever it could load.
pub fn load_blocks(path: impl AsRef<Path>) -> HashMap<String, BlockData> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to open blocks.json at {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    let raw: serde_json::Value = match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("failed to parse blocks.json: {}", e);
            return HashMap::new();
        }
    };

    let Some(entries) = raw.as_array() else {
        tracing::error!("blocks.json root is not an array");
        return HashMap::new();
    };

    let mut blocks = HashMap::new();
    for entry in entries {
        let Some(name) = entry.get("name").and_then(|v| v.as_str()) else {
            tracing::error!("block entry missing 'name'");
            continue;
        };
        if entry.get("defaultState").is_none() {
            tracing::error!("block entry '{}' missing 'defaultState'", name);
            continue;
        }
        match serde_json::from_value::<BlockDataRaw>(entry.clone()) {
            Ok(raw) => {
                blocks.insert(name.to_string(), raw.into_block_data(name));
            }
            Err(e) => tracing::error!("block entry '{}' malformed: {}", name, e),
        }
    }
    blocks
}

#[derive(Debug, Deserialize)]
struct BlockDataRaw {
    #[serde(default)]
    id: i32,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    #[serde(default)]
    hardness: f32,
    #[serde(default)]
    resistance: f32,
    #[serde(default = "default_stack_size", rename = "stackSize")]
    stack_size: i32,
    #[serde(default = "default_true")]
    diggable: bool,
    #[serde(default = "default_material")]
    material: String,
    #[serde(default)]
    transparent: bool,
    #[serde(default, rename = "emitLight")]
    emit_light: u8,
    #[serde(default, rename = "filterLight")]
    filter_light: u8,
    #[serde(rename = "defaultState")]
    default_state: i32,
    #[serde(default, rename = "minStateId")]
    min_state_id: i32,
    #[serde(default, rename = "maxStateId")]
    max_state_id: i32,
    #[serde(default, rename = "harvestTools")]
    harvest_tools: Option<HashMap<String, bool>>,
    #[serde(default = "default_bounding_box", rename = "boundingBox")]
    bounding_box: String,
    #[serde(default)]
    drops: Vec<u16>,
}

impl BlockDataRaw {
    fn into_block_data(self, name: &str) -> BlockData {
        BlockData {
            id: self.id,
            display_name: self.display_name.unwrap_or_else(|| name.to_string()),
            hardness: self.hardness,
            resistance: self.resistance,
            stack_size: self.stack_size,
            diggable: self.diggable,
            material: self.material,
            transparent: self.transparent,
            emit_light: self.emit_light,
            filter_light: self.filter_light,
            default_state: self.default_state,
            min_state_id: self.min_state_id,
            max_state_id: self.max_state_id,
            harvest_tools: self.harvest_tools.map(|map| {
                map.keys()
                    .filter_map(|tool_id| tool_id.parse::<i32>().ok())
                    .collect()
            }),
            bounding_box: self.bounding_box,
            drops: self.drops,
        }
    }
}
