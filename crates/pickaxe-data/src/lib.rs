pub mod biome;
pub mod block;
pub mod collisions;
pub mod item;
pub mod registry_data;
pub mod tags;

pub use biome::{load_biomes, BiomeData};
pub use block::{load_blocks, BlockData};
pub use collisions::{load_collisions, BoundingBox, Collisions};
pub use item::{load_item_ids, load_items, ItemData};
pub use registry_data::{load_biome_entries, load_registry_entries, BiomeEntryType, RawBiomeEntry, RawRegistryEntry};
pub use tags::{load_block_tags, load_item_tags};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("pickaxe-data-test-{}-{}", std::process::id(), name));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    use std::fs;

    #[test]
    fn test_missing_blocks_file_returns_empty() {
        let blocks = load_blocks("/nonexistent/blocks.json");
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_load_blocks_basic() {
        let path = write_temp(
            "blocks.json",
            r#"[{"name":"stone","id":1,"defaultState":1,"hardness":1.5,"drops":[35]}]"#,
        );
        let blocks = load_blocks(&path);
        let stone = blocks.get("stone").unwrap();
        assert_eq!(stone.id, 1);
        assert_eq!(stone.default_state, 1);
        assert_eq!(stone.drops, vec![35]);
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_blocks_skips_missing_required_field() {
        let path = write_temp("blocks_bad.json", r#"[{"name":"stone"}]"#);
        let blocks = load_blocks(&path);
        assert!(blocks.is_empty());
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_items_by_name_and_id() {
        let path = write_temp(
            "items.json",
            r#"[{"id":1,"name":"stone","displayName":"Stone","stackSize":64}]"#,
        );
        let by_name = load_items(&path);
        assert_eq!(by_name.get("stone").unwrap().id, 1);
        let by_id = load_item_ids(&path);
        assert_eq!(by_id.get(&1).unwrap().name, "stone");
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_biomes_basic() {
        let path = write_temp(
            "biomes.json",
            r#"[{"name":"plains","id":1,"temperature":0.8,"precipitation":true}]"#,
        );
        let biomes = load_biomes(&path);
        let plains = biomes.get("plains").unwrap();
        assert_eq!(plains.id, 1);
        assert!(plains.has_precipitation);
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_collisions() {
        let path = write_temp(
            "collisions.json",
            r#"{"blocks":{"stone":1},"shapes":{"1":[[0,0,0,1,1,1]]}}"#,
        );
        let c = load_collisions(&path);
        assert_eq!(c.block_name_to_shape_ids.get("stone"), Some(&vec![1]));
        let shapes = c.shape_id_to_shapes.get(&1).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].max_x, 1.0);
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_block_tags_resolves_against_blocks() {
        let blocks_path = write_temp(
            "tagblocks.json",
            r#"[{"name":"stone","id":1,"defaultState":1}]"#,
        );
        let blocks = load_blocks(&blocks_path);
        let tags_path = write_temp("blocktags.json", r#"{"mineable/pickaxe":["stone","unknown_block"]}"#);
        let tags = load_block_tags(&blocks, &tags_path);
        assert_eq!(tags.get("mineable/pickaxe"), Some(&vec![1]));
        fs::remove_file(blocks_path).ok();
        fs::remove_file(tags_path).ok();
    }

    #[test]
    fn test_load_registry_entries() {
        let path = write_temp(
            "registry_data.json",
            r#"{"minecraft:dimension_type":[{"name":"minecraft:overworld","element":{"natural":true}}]}"#,
        );
        let entries = load_registry_entries(&path, "minecraft:dimension_type");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].identifier, "minecraft:overworld");
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_biome_entries_distinguishes_tag() {
        let path = write_temp(
            "registry_data_biomes.json",
            r#"{"minecraft:worldgen/biome":[
                {"name":"minecraft:plains","type":"biome","element":{"temperature":0.8}},
                {"name":"minecraft:is_forest","type":"tag","values":["minecraft:forest","minecraft:taiga"]}
            ]}"#,
        );
        let entries = load_biome_entries(&path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_type, BiomeEntryType::Biome);
        assert_eq!(entries[1].entry_type, BiomeEntryType::Tag);
        assert!(entries[1].data.is_none());
        assert_eq!(entries[1].members, vec!["minecraft:forest".to_string(), "minecraft:taiga".to_string()]);
        fs::remove_file(path).ok();
    }
}
