use std::fs;
use std::path::Path;

/// One registry entry as it appears in `registry_data.json`: an identifier
/// and its NBT-shaped payload, still as plain JSON — conversion to NBT
/// happens at the packet-building layer via `pickaxe_nbt::json_to_nbt`.
#[derive(Debug, Clone)]
pub struct RawRegistryEntry {
    pub identifier: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiomeEntryType {
    Biome,
    Tag,
}

/// The biome registry's entries carry an extra type discriminator: a `Tag`
/// entry groups other biomes under a `#minecraft:...` identifier instead of
/// describing a biome itself, and has no `data` payload of its own — instead
/// it carries `members`, the biome identifiers the tag groups together.
#[derive(Debug, Clone)]
pub struct RawBiomeEntry {
    pub identifier: String,
    pub entry_type: BiomeEntryType,
    pub data: Option<serde_json::Value>,
    pub members: Vec<String>,
}

fn read_registry_file(path: impl AsRef<Path>) -> Option<serde_json::Value> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to open registry_data.json at {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::error!("failed to parse registry_data.json: {}", e);
            None
        }
    }
}

/// Loads the entries under `registry_key` (e.g. `minecraft:dimension_type`)
/// from `registry_data.json`. Each entry is `{"name": "...", "element": {...}}`.
pub fn load_registry_entries(path: impl AsRef<Path>, registry_key: &str) -> Vec<RawRegistryEntry> {
    let Some(root) = read_registry_file(path) else {
        return Vec::new();
    };
    let Some(entries) = root.get(registry_key).and_then(|v| v.as_array()) else {
        tracing::error!("registry_data.json missing section '{}'", registry_key);
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let identifier = entry.get("name")?.as_str()?.to_string();
            let data = entry.get("element").cloned().unwrap_or(serde_json::Value::Null);
            Some(RawRegistryEntry { identifier, data })
        })
        .collect()
}

/// Loads `minecraft:worldgen/biome` entries, which mix actual biome
/// definitions with tag groupings distinguished by a `type` field.
pub fn load_biome_entries(path: impl AsRef<Path>) -> Vec<RawBiomeEntry> {
    let Some(root) = read_registry_file(path) else {
        return Vec::new();
    };
    let Some(entries) = root.get("minecraft:worldgen/biome").and_then(|v| v.as_array()) else {
        tracing::error!("registry_data.json missing section 'minecraft:worldgen/biome'");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let identifier = entry.get("name")?.as_str()?.to_string();
            let entry_type = match entry.get("type").and_then(|v| v.as_str()) {
                Some("tag") => BiomeEntryType::Tag,
                _ => BiomeEntryType::Biome,
            };
            let data = entry.get("element").cloned();
            let members = entry
                .get("values")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(|m| m.as_str().map(String::from)).collect())
                .unwrap_or_default();
            Some(RawBiomeEntry { identifier, entry_type, data, members })
        })
        .collect()
}
