use pickaxe_data::{load_biome_entries, load_registry_entries, BiomeEntryType};
use pickaxe_nbt::{json_to_nbt, nbt_compound, nbt_list, NbtValue};
use pickaxe_protocol_core::{InternalPacket, RegistryEntry};

use crate::registry_manager::RegistryManager;

/// The six registries this protocol version syncs during Configuration.
/// Anything beyond these (trim patterns, banner patterns, enchantments,
/// jukebox songs) is vanilla data-pack content this server never generates
/// and is left out rather than shipped empty.
pub const REGISTRY_KEYS: &[&str] = &[
    "minecraft:dimension_type",
    "minecraft:worldgen/biome",
    "minecraft:painting_variant",
    "minecraft:wolf_variant",
    "minecraft:damage_type",
    "minecraft:chat_type",
];

/// Build all registry data packets for Configuration state, registering
/// every shipped identifier into `registry_manager` so later packets
/// (chat type index, etc.) can resolve it back to an index.
pub fn build_registry_packets(data_dir: &std::path::Path, registry_manager: &mut RegistryManager) -> Vec<InternalPacket> {
    vec![
        build_dimension_type_registry(data_dir, registry_manager),
        build_biome_registry(data_dir, registry_manager),
        build_painting_variant_registry(data_dir, registry_manager),
        build_wolf_variant_registry(data_dir, registry_manager),
        build_damage_type_registry(data_dir, registry_manager),
        build_chat_type_registry(registry_manager),
    ]
}

fn registry_data_path(data_dir: &std::path::Path) -> std::path::PathBuf {
    data_dir.join("registry_data.json")
}

fn build_dimension_type_registry(data_dir: &std::path::Path, registry_manager: &mut RegistryManager) -> InternalPacket {
    let raw = load_registry_entries(registry_data_path(data_dir), "minecraft:dimension_type");
    if raw.is_empty() {
        registry_manager.add_entry("minecraft:dimension_type", "minecraft:overworld");
        return InternalPacket::RegistryData {
            registry_id: "minecraft:dimension_type".into(),
            entries: vec![RegistryEntry {
                id: "minecraft:overworld".into(),
                data: Some(default_overworld_dimension()),
            }],
        };
    }

    let entries = raw
        .into_iter()
        .map(|entry| {
            registry_manager.add_entry("minecraft:dimension_type", &entry.identifier);
            RegistryEntry {
                id: entry.identifier,
                data: Some(json_to_nbt(&entry.data)),
            }
        })
        .collect();

    InternalPacket::RegistryData {
        registry_id: "minecraft:dimension_type".into(),
        entries,
    }
}

fn default_overworld_dimension() -> NbtValue {
    nbt_compound! {
        "fixed_time" => NbtValue::Long(-1),
        "has_skylight" => NbtValue::Byte(1),
        "has_ceiling" => NbtValue::Byte(0),
        "ultrawarm" => NbtValue::Byte(0),
        "natural" => NbtValue::Byte(1),
        "coordinate_scale" => NbtValue::Double(1.0),
        "bed_works" => NbtValue::Byte(1),
        "respawn_anchor_works" => NbtValue::Byte(0),
        "min_y" => NbtValue::Int(-64),
        "height" => NbtValue::Int(384),
        "logical_height" => NbtValue::Int(384),
        "infiniburn" => NbtValue::String("#minecraft:infiniburn_overworld".into()),
        "effects" => NbtValue::String("minecraft:overworld".into()),
        "ambient_light" => NbtValue::Float(0.0),
        "piglin_safe" => NbtValue::Byte(0),
        "has_raids" => NbtValue::Byte(1),
        "monster_spawn_light_level" => NbtValue::Int(0),
        "monster_spawn_block_light_limit" => NbtValue::Int(0)
    }
}

/// Biomes mix real entries with tag groupings. Tags have no NBT payload of
/// their own — the registry packet only ever carries `Biome` entries with
/// data, matching the split the original performs when it walks
/// `BiomeRegistryEntry::Type` before building this packet.
fn build_biome_registry(data_dir: &std::path::Path, registry_manager: &mut RegistryManager) -> InternalPacket {
    let raw = load_biome_entries(&registry_data_path(data_dir));
    let biome_entries: Vec<RegistryEntry> = raw
        .into_iter()
        .filter(|entry| entry.entry_type == BiomeEntryType::Biome)
        .map(|entry| {
            registry_manager.add_entry("minecraft:worldgen/biome", &entry.identifier);
            RegistryEntry {
                id: entry.identifier,
                data: entry.data.as_ref().map(json_to_nbt),
            }
        })
        .collect();

    if biome_entries.is_empty() {
        registry_manager.add_entry("minecraft:worldgen/biome", "minecraft:plains");
        return InternalPacket::RegistryData {
            registry_id: "minecraft:worldgen/biome".into(),
            entries: vec![RegistryEntry {
                id: "minecraft:plains".into(),
                data: Some(default_plains_biome()),
            }],
        };
    }

    InternalPacket::RegistryData {
        registry_id: "minecraft:worldgen/biome".into(),
        entries: biome_entries,
    }
}

/// Resolves the biome registry's `Tag` entries to the numeric indices
/// `build_biome_registry` assigned their members, for the `UpdateTags`
/// `minecraft:worldgen/biome` group (spec.md §4.5 item 3; grounded on
/// `sendUpdateTagsPacket`'s separate walk over the same biome array).
/// Must be called after `build_biome_registry` has populated
/// `registry_manager`, since a tag can only resolve members already
/// registered there.
pub fn build_biome_tag_group(
    data_dir: &std::path::Path,
    registry_manager: &RegistryManager,
) -> Vec<(String, Vec<i32>)> {
    let raw = load_biome_entries(&registry_data_path(data_dir));
    raw.into_iter()
        .filter(|entry| entry.entry_type == BiomeEntryType::Tag)
        .map(|entry| {
            let ids = entry
                .members
                .iter()
                .filter_map(|name| registry_manager.get_registry_id("minecraft:worldgen/biome", name))
                .collect();
            (entry.identifier, ids)
        })
        .collect()
}

fn default_plains_biome() -> NbtValue {
    nbt_compound! {
        "has_precipitation" => NbtValue::Byte(1),
        "temperature" => NbtValue::Float(0.8),
        "downfall" => NbtValue::Float(0.4),
        "effects" => NbtValue::Compound(vec![
            ("fog_color".into(), NbtValue::Int(12638463)),
            ("water_color".into(), NbtValue::Int(4159204)),
            ("water_fog_color".into(), NbtValue::Int(329011)),
            ("sky_color".into(), NbtValue::Int(7907327)),
            ("mood_sound".into(), NbtValue::Compound(vec![
                ("sound".into(), NbtValue::String("minecraft:ambient.cave".into())),
                ("tick_delay".into(), NbtValue::Int(6000)),
                ("offset".into(), NbtValue::Double(2.0)),
                ("block_search_extent".into(), NbtValue::Int(8)),
            ])),
        ])
    }
}

/// Chat types are never read from a data file: there are exactly three
/// vanilla kinds in use (chat, system, announcement) and this server builds
/// them inline, registering each into `registry_manager` so
/// `PlayerChatMessage` can resolve `minecraft:chat`'s index later.
fn build_chat_type_registry(registry_manager: &mut RegistryManager) -> InternalPacket {
    let chat_params = || {
        nbt_list![
            NbtValue::String("sender".into()),
            NbtValue::String("content".into())
        ]
    };

    let make = |translation_key: &str, narrate_key: &str| {
        nbt_compound! {
            "chat" => NbtValue::Compound(vec![
                ("translation_key".into(), NbtValue::String(translation_key.into())),
                ("parameters".into(), chat_params()),
            ]),
            "narration" => NbtValue::Compound(vec![
                ("translation_key".into(), NbtValue::String(narrate_key.into())),
                ("parameters".into(), chat_params()),
            ])
        }
    };

    let entries = vec![
        ("minecraft:chat", make("chat.type.text", "chat.type.text.narrate")),
        ("minecraft:system", make("chat.type.text", "chat.type.text.narrate")),
        (
            "minecraft:announcement",
            make("chat.type.announcement", "chat.type.text.narrate"),
        ),
    ];

    let entries = entries
        .into_iter()
        .map(|(id, data)| {
            registry_manager.add_entry("minecraft:chat_type", id);
            RegistryEntry { id: id.into(), data: Some(data) }
        })
        .collect();

    InternalPacket::RegistryData {
        registry_id: "minecraft:chat_type".into(),
        entries,
    }
}

fn build_damage_type_registry(data_dir: &std::path::Path, registry_manager: &mut RegistryManager) -> InternalPacket {
    let raw = load_registry_entries(registry_data_path(data_dir), "minecraft:damage_type");
    if raw.is_empty() {
        let defaults = [
            (
                "minecraft:generic",
                nbt_compound! {
                    "message_id" => NbtValue::String("generic".into()),
                    "scaling" => NbtValue::String("never".into()),
                    "exhaustion" => NbtValue::Float(0.0)
                },
            ),
            (
                "minecraft:generic_kill",
                nbt_compound! {
                    "message_id" => NbtValue::String("genericKill".into()),
                    "scaling" => NbtValue::String("never".into()),
                    "exhaustion" => NbtValue::Float(0.0)
                },
            ),
        ];
        let entries = defaults
            .into_iter()
            .map(|(id, data)| {
                registry_manager.add_entry("minecraft:damage_type", id);
                RegistryEntry { id: id.into(), data: Some(data) }
            })
            .collect();
        return InternalPacket::RegistryData {
            registry_id: "minecraft:damage_type".into(),
            entries,
        };
    }

    let entries = raw
        .into_iter()
        .map(|entry| {
            registry_manager.add_entry("minecraft:damage_type", &entry.identifier);
            RegistryEntry { id: entry.identifier, data: Some(json_to_nbt(&entry.data)) }
        })
        .collect();

    InternalPacket::RegistryData {
        registry_id: "minecraft:damage_type".into(),
        entries,
    }
}

fn build_wolf_variant_registry(data_dir: &std::path::Path, registry_manager: &mut RegistryManager) -> InternalPacket {
    let raw = load_registry_entries(registry_data_path(data_dir), "minecraft:wolf_variant");
    if raw.is_empty() {
        registry_manager.add_entry("minecraft:wolf_variant", "minecraft:pale");
        return InternalPacket::RegistryData {
            registry_id: "minecraft:wolf_variant".into(),
            entries: vec![RegistryEntry {
                id: "minecraft:pale".into(),
                data: Some(nbt_compound! {
                    "wild_texture" => NbtValue::String("minecraft:textures/entity/wolf/wolf.png".into()),
                    "tame_texture" => NbtValue::String("minecraft:textures/entity/wolf/wolf_tame.png".into()),
                    "angry_texture" => NbtValue::String("minecraft:textures/entity/wolf/wolf_angry.png".into()),
                    "biomes" => NbtValue::String("minecraft:plains".into())
                }),
            }],
        };
    }

    let entries = raw
        .into_iter()
        .map(|entry| {
            registry_manager.add_entry("minecraft:wolf_variant", &entry.identifier);
            RegistryEntry { id: entry.identifier, data: Some(json_to_nbt(&entry.data)) }
        })
        .collect();

    InternalPacket::RegistryData {
        registry_id: "minecraft:wolf_variant".into(),
        entries,
    }
}

fn build_painting_variant_registry(data_dir: &std::path::Path, registry_manager: &mut RegistryManager) -> InternalPacket {
    let raw = load_registry_entries(registry_data_path(data_dir), "minecraft:painting_variant");
    if raw.is_empty() {
        registry_manager.add_entry("minecraft:painting_variant", "minecraft:kebab");
        return InternalPacket::RegistryData {
            registry_id: "minecraft:painting_variant".into(),
            entries: vec![RegistryEntry {
                id: "minecraft:kebab".into(),
                data: Some(nbt_compound! {
                    "asset_id" => NbtValue::String("minecraft:kebab".into()),
                    "width" => NbtValue::Int(1),
                    "height" => NbtValue::Int(1)
                }),
            }],
        };
    }

    let entries = raw
        .into_iter()
        .map(|entry| {
            registry_manager.add_entry("minecraft:painting_variant", &entry.identifier);
            RegistryEntry { id: entry.identifier, data: Some(json_to_nbt(&entry.data)) }
        })
        .collect();

    InternalPacket::RegistryData {
        registry_id: "minecraft:painting_variant".into(),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_keys_match_spec() {
        assert_eq!(REGISTRY_KEYS.len(), 6);
    }

    #[test]
    fn test_build_registry_packets_falls_back_without_data_dir() {
        let mut mgr = RegistryManager::new();
        let packets = build_registry_packets(std::path::Path::new("/nonexistent"), &mut mgr);
        assert_eq!(packets.len(), 6);
        assert_eq!(mgr.get_registry_id("minecraft:chat_type", "minecraft:chat"), Some(0));
        assert_eq!(mgr.get_registry_id("minecraft:worldgen/biome", "minecraft:plains"), Some(0));
    }

    #[test]
    fn test_build_registry_packets_order_matches_registry_keys() {
        let mut mgr = RegistryManager::new();
        let packets = build_registry_packets(std::path::Path::new("/nonexistent"), &mut mgr);
        let ids: Vec<&str> = packets
            .iter()
            .map(|p| match p {
                InternalPacket::RegistryData { registry_id, .. } => registry_id.as_str(),
                _ => panic!("expected RegistryData"),
            })
            .collect();
        assert_eq!(ids, REGISTRY_KEYS);
    }

    #[test]
    fn test_build_biome_tag_group_resolves_members_to_indices() {
        use std::io::Write;
        let mut dir = std::env::temp_dir();
        dir.push(format!("pickaxe-registries-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("registry_data.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"{{"minecraft:worldgen/biome":[
                {{"name":"minecraft:plains","type":"biome","element":{{"temperature":0.8}}}},
                {{"name":"minecraft:forest","type":"biome","element":{{"temperature":0.7}}}},
                {{"name":"minecraft:is_overworld","type":"tag","values":["minecraft:plains","minecraft:forest","minecraft:unknown"]}}
            ]}}"#
        )
        .unwrap();
        drop(f);

        let mut mgr = RegistryManager::new();
        build_biome_registry(&dir, &mut mgr);
        let group = build_biome_tag_group(&dir, &mgr);

        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(group.len(), 1);
        assert_eq!(group[0].0, "minecraft:is_overworld");
        // "minecraft:unknown" isn't a registered biome and is dropped.
        assert_eq!(group[0].1, vec![0, 1]);
    }
}
