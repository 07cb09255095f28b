use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Simple world/chunk biome assignment data, loaded from `biomes.json`. This
/// is distinct from the registry-sync payload in [`crate::registry_data`]:
/// this one is what a chunk generator consults to pick a biome id, the other
/// is what gets shipped to the client as NBT during configuration.
#[derive(Debug, Clone)]
pub struct BiomeData {
    pub id: i32,
    pub category: String,
    pub temperature: f32,
    pub has_precipitation: bool,
    pub dimension: String,
    pub display_name: String,
    pub color: i32,
}

pub fn load_biomes(path: impl AsRef<Path>) -> HashMap<String, BiomeData> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to open biomes.json at {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    let raw: serde_json::Value = match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("failed to parse biomes.json: {}", e);
            return HashMap::new();
        }
    };

    let Some(entries) = raw.as_array() else {
        tracing::error!("biomes.json root is not an array");
        return HashMap::new();
    };

    let mut biomes = HashMap::new();
    for entry in entries {
        let (Some(name), Some(id)) = (
            entry.get("name").and_then(|v| v.as_str()),
            entry.get("id").and_then(|v| v.as_i64()),
        ) else {
            tracing::error!("biome entry missing 'name' or 'id'");
            continue;
        };

        let data = BiomeData {
            id: id as i32,
            category: entry
                .get("category")
                .and_then(|v| v.as_str())
                .unwrap_or("none")
                .to_string(),
            temperature: entry
                .get("temperature")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.5) as f32,
            has_precipitation: entry
                .get("precipitation")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            dimension: entry
                .get("dimension")
                .and_then(|v| v.as_str())
                .unwrap_or("overworld")
                .to_string(),
            display_name: entry
                .get("display_name")
                .and_then(|v| v.as_str())
                .unwrap_or(name)
                .to_string(),
            color: entry.get("color").and_then(|v| v.as_i64()).unwrap_or(0) as i32,
        };
        biomes.insert(name.to_string(), data);
    }
    biomes
}
