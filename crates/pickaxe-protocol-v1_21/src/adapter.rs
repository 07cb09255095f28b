use anyhow::{bail, Result};
use bytes::{Buf, BufMut, BytesMut};
use pickaxe_nbt::NbtValue;
use pickaxe_protocol_core::*;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::packet_ids::*;
use crate::registries;
use crate::registry_manager::RegistryManager;

/// Protocol 767 (1.21.1) adapter. Holds the registry manager because
/// `registry_data()` both builds the Configuration-phase packets and
/// assigns the indices later packets (chat type, etc.) reference.
pub struct V1_21Adapter {
    data_dir: PathBuf,
    registry_manager: Mutex<RegistryManager>,
}

impl V1_21Adapter {
    pub fn new() -> Self {
        Self::with_data_dir(PathBuf::from("resources"))
    }

    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            registry_manager: Mutex::new(RegistryManager::new()),
        }
    }

    pub fn registry_id(&self, registry: &str, identifier: &str) -> Option<i32> {
        self.registry_manager.lock().unwrap().get_registry_id(registry, identifier)
    }

    /// The `minecraft:worldgen/biome` tag group for `UpdateTags` (spec.md
    /// §4.5 item 3). Must be called after `registry_data()` has populated
    /// the registry manager's biome entries for this adapter.
    pub fn biome_tag_group(&self) -> Vec<(String, Vec<i32>)> {
        let mgr = self.registry_manager.lock().unwrap();
        registries::build_biome_tag_group(&self.data_dir, &mgr)
    }
}

impl Default for V1_21Adapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolAdapter for V1_21Adapter {
    fn protocol_version(&self) -> i32 {
        767
    }

    fn decode_packet(
        &self,
        state: ConnectionState,
        id: i32,
        data: &mut BytesMut,
    ) -> Result<InternalPacket> {
        match state {
            ConnectionState::Handshaking => decode_handshaking(id, data),
            ConnectionState::Status => decode_status(id, data),
            ConnectionState::Login => decode_login(id, data),
            ConnectionState::Configuration => decode_configuration(id, data),
            ConnectionState::Play => decode_play(id, data),
        }
    }

    fn encode_packet(
        &self,
        state: ConnectionState,
        packet: &InternalPacket,
    ) -> Result<BytesMut> {
        match state {
            ConnectionState::Status => encode_status(packet),
            ConnectionState::Login => encode_login(packet),
            ConnectionState::Configuration => encode_configuration(packet),
            ConnectionState::Play => encode_play(packet),
            _ => bail!("Cannot encode packets in {:?} state", state),
        }
    }

    fn registry_data(&self) -> Vec<InternalPacket> {
        let mut mgr = self.registry_manager.lock().unwrap();
        registries::build_registry_packets(&self.data_dir, &mut mgr)
    }
}

// === Decode functions ===

fn decode_handshaking(id: i32, data: &mut BytesMut) -> Result<InternalPacket> {
    match id {
        0x00 => {
            let protocol_version = read_varint(data)?;
            let server_address = read_string(data, 255)?;
            let server_port = data.get_u16();
            let next_state = read_varint(data)?;
            Ok(InternalPacket::Handshake {
                protocol_version,
                server_address,
                server_port,
                next_state,
            })
        }
        _ => Ok(InternalPacket::Unknown {
            packet_id: id,
            data: data.to_vec(),
        }),
    }
}

fn decode_status(id: i32, data: &mut BytesMut) -> Result<InternalPacket> {
    match id {
        0x00 => Ok(InternalPacket::StatusRequest),
        0x01 => {
            let payload = data.get_i64();
            Ok(InternalPacket::PingRequest { payload })
        }
        _ => Ok(InternalPacket::Unknown {
            packet_id: id,
            data: data.to_vec(),
        }),
    }
}

fn decode_login(id: i32, data: &mut BytesMut) -> Result<InternalPacket> {
    match id {
        0x00 => {
            let name = read_string(data, 16)?;
            let uuid = read_uuid(data)?;
            Ok(InternalPacket::LoginStart { name, uuid })
        }
        0x01 => {
            let shared_secret = read_byte_array(data)?;
            let verify_token = read_byte_array(data)?;
            Ok(InternalPacket::EncryptionResponse {
                shared_secret,
                verify_token,
            })
        }
        0x03 => Ok(InternalPacket::LoginAcknowledged),
        _ => Ok(InternalPacket::Unknown {
            packet_id: id,
            data: data.to_vec(),
        }),
    }
}

fn decode_configuration(id: i32, data: &mut BytesMut) -> Result<InternalPacket> {
    match id {
        0x00 => {
            let locale = read_string(data, 16)?;
            let view_distance = data.get_i8();
            let chat_mode = read_varint(data)?;
            let chat_colors = data.get_u8() != 0;
            let skin_parts = data.get_u8();
            let main_hand = read_varint(data)?;
            let text_filtering = data.get_u8() != 0;
            let allow_listing = data.get_u8() != 0;
            Ok(InternalPacket::ClientInformation {
                locale,
                view_distance,
                chat_mode,
                chat_colors,
                skin_parts,
                main_hand,
                text_filtering,
                allow_listing,
            })
        }
        0x02 => {
            let channel = read_string(data, 32767)?;
            let remaining = data.to_vec();
            data.advance(remaining.len());
            Ok(InternalPacket::PluginMessage {
                channel,
                data: remaining,
            })
        }
        0x03 => Ok(InternalPacket::FinishConfigurationAck),
        0x07 => {
            let count = read_varint(data)? as usize;
            let mut packs = Vec::with_capacity(count);
            for _ in 0..count {
                let namespace = read_string(data, 32767)?;
                let id = read_string(data, 32767)?;
                let version = read_string(data, 32767)?;
                packs.push(KnownPack {
                    namespace,
                    id,
                    version,
                });
            }
            Ok(InternalPacket::KnownPacksResponse { packs })
        }
        _ => Ok(InternalPacket::Unknown {
            packet_id: id,
            data: data.to_vec(),
        }),
    }
}

fn decode_play(id: i32, data: &mut BytesMut) -> Result<InternalPacket> {
    match id {
        PLAY_SB_CONFIRM_TELEPORT => {
            let teleport_id = read_varint(data)?;
            Ok(InternalPacket::ConfirmTeleportation { teleport_id })
        }
        0x08 => {
            // Chunk Batch Received, informational only; read and discard the rate.
            let _chunks_per_tick = data.get_f32();
            Ok(InternalPacket::Unknown {
                packet_id: id,
                data: vec![],
            })
        }
        PLAY_SB_CHAT_MESSAGE => {
            let message = read_string(data, 256)?;
            let timestamp = data.get_i64();
            let salt = data.get_i64();
            let has_signature = data.get_u8() != 0;
            let signature = if has_signature {
                let mut sig = vec![0u8; 256];
                data.copy_to_slice(&mut sig);
                Some(sig)
            } else {
                None
            };
            let offset = read_varint(data)?;
            let ack_count = offset as usize;
            let mut acknowledged = [0u8; 3];
            if ack_count <= 20 {
                let byte_len = (ack_count + 7) / 8;
                for b in acknowledged.iter_mut().take(byte_len.min(3)) {
                    *b = data.get_u8();
                }
            }
            Ok(InternalPacket::ChatMessage {
                message,
                timestamp,
                salt,
                has_signature,
                signature,
                offset,
                acknowledged,
            })
        }
        PLAY_SB_PLAYER_SESSION => {
            let session_id = read_uuid(data)?;
            let expires_at = data.get_i64();
            let public_key = read_byte_array(data)?;
            let key_signature = read_byte_array(data)?;
            Ok(InternalPacket::PlayerSession {
                session_id,
                expires_at,
                public_key,
                key_signature,
            })
        }
        PLAY_SB_PLUGIN_MESSAGE => {
            let channel = read_string(data, 32767)?;
            let remaining = data.to_vec();
            data.advance(remaining.len());
            Ok(InternalPacket::PluginMessage {
                channel,
                data: remaining,
            })
        }
        PLAY_SB_KEEP_ALIVE => {
            let id = data.get_i64();
            Ok(InternalPacket::KeepAliveServerbound { id })
        }
        PLAY_SB_SET_PLAYER_POSITION => {
            let x = data.get_f64();
            let y = data.get_f64();
            let z = data.get_f64();
            let on_ground = data.get_u8() != 0;
            Ok(InternalPacket::PlayerPosition { x, y, z, on_ground })
        }
        PLAY_SB_SET_PLAYER_POSITION_AND_ROTATION => {
            let x = data.get_f64();
            let y = data.get_f64();
            let z = data.get_f64();
            let yaw = data.get_f32();
            let pitch = data.get_f32();
            let on_ground = data.get_u8() != 0;
            Ok(InternalPacket::PlayerPositionAndRotation {
                x,
                y,
                z,
                yaw,
                pitch,
                on_ground,
            })
        }
        PLAY_SB_SET_PLAYER_ROTATION => {
            let yaw = data.get_f32();
            let pitch = data.get_f32();
            let on_ground = data.get_u8() != 0;
            Ok(InternalPacket::PlayerRotation {
                yaw,
                pitch,
                on_ground,
            })
        }
        PLAY_SB_PLAYER_ON_GROUND => {
            let on_ground = data.get_u8() != 0;
            Ok(InternalPacket::PlayerOnGround { on_ground })
        }
        PLAY_SB_CHAT_COMMAND => {
            let command = read_string(data, 256)?;
            Ok(InternalPacket::ChatCommand { command })
        }
        PLAY_SB_HELD_ITEM_CHANGE => {
            let slot = data.get_i16();
            Ok(InternalPacket::HeldItemChange { slot })
        }
        PLAY_SB_CREATIVE_INVENTORY_ACTION => {
            let slot = data.get_i16();
            let item = read_slot(data)?;
            Ok(InternalPacket::CreativeInventoryAction { slot, item })
        }
        PLAY_SB_PLAYER_DIGGING => {
            let status = read_varint(data)?;
            let position_raw = data.get_u64();
            let position = decode_block_pos(position_raw);
            let face = data.get_u8();
            let sequence = read_varint(data)?;
            Ok(InternalPacket::BlockDig {
                status,
                position,
                face,
                sequence,
            })
        }
        PLAY_SB_PLAYER_BLOCK_PLACEMENT => {
            let hand = read_varint(data)?;
            let position_raw = data.get_u64();
            let position = decode_block_pos(position_raw);
            let face = read_varint(data)? as u8;
            let cursor_x = data.get_f32();
            let cursor_y = data.get_f32();
            let cursor_z = data.get_f32();
            let inside_block = data.get_u8() != 0;
            let sequence = read_varint(data)?;
            Ok(InternalPacket::BlockPlace {
                hand,
                position,
                face,
                cursor_x,
                cursor_y,
                cursor_z,
                inside_block,
                sequence,
            })
        }
        _ => Ok(InternalPacket::Unknown {
            packet_id: id,
            data: data.to_vec(),
        }),
    }
}

/// Decode a block position packed the way `BlockPos::encode` packs one.
fn decode_block_pos(raw: u64) -> pickaxe_types::BlockPos {
    let mut x = (raw >> 38) as i64;
    let mut y = (raw & 0xFFF) as i64;
    let mut z = ((raw << 26) >> 38) as i64;
    if x >= 1 << 25 {
        x -= 1 << 26;
    }
    if y >= 1 << 11 {
        y -= 1 << 12;
    }
    if z >= 1 << 25 {
        z -= 1 << 26;
    }
    pickaxe_types::BlockPos::new(x as i32, y as i32, z as i32)
}

// === Encode functions ===

fn encode_status(packet: &InternalPacket) -> Result<BytesMut> {
    let mut buf = BytesMut::new();
    match packet {
        InternalPacket::StatusResponse { json } => {
            write_varint(&mut buf, STATUS_RESPONSE);
            write_string(&mut buf, json);
        }
        InternalPacket::PongResponse { payload } => {
            write_varint(&mut buf, PONG_RESPONSE);
            buf.put_i64(*payload);
        }
        _ => bail!("Cannot encode {:?} in Status state", std::mem::discriminant(packet)),
    }
    Ok(buf)
}

fn encode_login(packet: &InternalPacket) -> Result<BytesMut> {
    let mut buf = BytesMut::new();
    match packet {
        InternalPacket::Disconnect { reason } => {
            write_varint(&mut buf, LOGIN_DISCONNECT);
            write_string(&mut buf, &reason.to_json());
        }
        InternalPacket::EncryptionRequest {
            server_id,
            public_key,
            verify_token,
        } => {
            write_varint(&mut buf, ENCRYPTION_REQUEST);
            write_string(&mut buf, server_id);
            write_byte_array(&mut buf, public_key);
            write_byte_array(&mut buf, verify_token);
            buf.put_u8(1); // should authenticate
        }
        InternalPacket::LoginSuccess { profile } => {
            write_varint(&mut buf, LOGIN_SUCCESS);
            write_uuid(&mut buf, &profile.uuid);
            write_string(&mut buf, &profile.name);
            write_varint(&mut buf, profile.properties.len() as i32);
            for prop in &profile.properties {
                write_string(&mut buf, &prop.name);
                write_string(&mut buf, &prop.value);
                if let Some(ref sig) = prop.signature {
                    buf.put_u8(1);
                    write_string(&mut buf, sig);
                } else {
                    buf.put_u8(0);
                }
            }
            buf.put_u8(0); // strict error handling = false
        }
        InternalPacket::SetCompression { threshold } => {
            write_varint(&mut buf, LOGIN_SET_COMPRESSION);
            write_varint(&mut buf, *threshold);
        }
        _ => bail!("Cannot encode {:?} in Login state", std::mem::discriminant(packet)),
    }
    Ok(buf)
}

fn encode_configuration(packet: &InternalPacket) -> Result<BytesMut> {
    let mut buf = BytesMut::new();
    match packet {
        InternalPacket::RegistryData { registry_id, entries } => {
            write_varint(&mut buf, CONFIG_REGISTRY_DATA);
            write_string(&mut buf, registry_id);
            write_varint(&mut buf, entries.len() as i32);
            for entry in entries {
                write_string(&mut buf, &entry.id);
                if let Some(ref nbt_data) = entry.data {
                    buf.put_u8(1);
                    let mut nbt_buf = BytesMut::new();
                    nbt_data.write_root_network(&mut nbt_buf);
                    buf.extend_from_slice(&nbt_buf);
                } else {
                    buf.put_u8(0);
                }
            }
        }
        InternalPacket::FinishConfiguration => {
            write_varint(&mut buf, CONFIG_FINISH);
        }
        InternalPacket::KnownPacksRequest { packs } => {
            write_varint(&mut buf, CONFIG_KNOWN_PACKS);
            write_varint(&mut buf, packs.len() as i32);
            for pack in packs {
                write_string(&mut buf, &pack.namespace);
                write_string(&mut buf, &pack.id);
                write_string(&mut buf, &pack.version);
            }
        }
        InternalPacket::ClientboundPluginMessage { channel, data } => {
            write_varint(&mut buf, CONFIG_PLUGIN_MESSAGE);
            write_string(&mut buf, channel);
            buf.extend_from_slice(data);
        }
        InternalPacket::FeatureFlags { flags } => {
            write_varint(&mut buf, CONFIG_FEATURE_FLAGS);
            write_varint(&mut buf, flags.len() as i32);
            for flag in flags {
                write_string(&mut buf, flag);
            }
        }
        InternalPacket::UpdateTags { tags } => {
            write_varint(&mut buf, CONFIG_UPDATE_TAGS);
            write_varint(&mut buf, tags.len() as i32);
            for (registry, entries) in tags {
                write_string(&mut buf, registry);
                write_varint(&mut buf, entries.len() as i32);
                for (tag_name, ids) in entries {
                    write_string(&mut buf, tag_name);
                    write_varint(&mut buf, ids.len() as i32);
                    for id in ids {
                        write_varint(&mut buf, *id);
                    }
                }
            }
        }
        InternalPacket::ServerLinks { links } => {
            write_varint(&mut buf, CONFIG_SERVER_LINKS);
            write_varint(&mut buf, links.len() as i32);
            for (label, url) in links {
                buf.put_u8(0); // label is a raw string, not a builtin link type
                write_string(&mut buf, label);
                write_string(&mut buf, url);
            }
        }
        InternalPacket::AddResourcePack {
            uuid,
            url,
            hash,
            forced,
            prompt_message,
        } => {
            write_varint(&mut buf, CONFIG_ADD_RESOURCE_PACK);
            write_uuid(&mut buf, uuid);
            write_string(&mut buf, url);
            write_string(&mut buf, hash);
            buf.put_u8(*forced as u8);
            match prompt_message {
                Some(msg) => {
                    buf.put_u8(1);
                    write_string(&mut buf, &msg.to_json());
                }
                None => buf.put_u8(0),
            }
        }
        InternalPacket::RemoveResourcePack { uuid } => {
            write_varint(&mut buf, CONFIG_REMOVE_RESOURCE_PACK);
            match uuid {
                Some(u) => {
                    buf.put_u8(1);
                    write_uuid(&mut buf, u);
                }
                None => buf.put_u8(0),
            }
        }
        InternalPacket::Disconnect { reason } => {
            write_varint(&mut buf, CONFIG_DISCONNECT);
            let nbt = NbtValue::Compound(vec![("text".into(), NbtValue::String(reason.text.clone()))]);
            let mut nbt_buf = BytesMut::new();
            nbt.write_root_network(&mut nbt_buf);
            buf.extend_from_slice(&nbt_buf);
        }
        _ => bail!(
            "Cannot encode {:?} in Configuration state",
            std::mem::discriminant(packet)
        ),
    }
    Ok(buf)
}

fn encode_play(packet: &InternalPacket) -> Result<BytesMut> {
    let mut buf = BytesMut::new();
    match packet {
        InternalPacket::JoinGame {
            entity_id,
            is_hardcore,
            dimension_names,
            max_players,
            view_distance,
            simulation_distance,
            reduced_debug_info,
            enable_respawn_screen,
            do_limited_crafting,
            dimension_type,
            dimension_name,
            hashed_seed,
            game_mode,
            previous_game_mode,
            is_debug,
            is_flat,
            portal_cooldown,
            enforces_secure_chat,
        } => {
            write_varint(&mut buf, PLAY_LOGIN);
            buf.put_i32(*entity_id);
            buf.put_u8(*is_hardcore as u8);
            write_varint(&mut buf, dimension_names.len() as i32);
            for dim in dimension_names {
                write_string(&mut buf, dim);
            }
            write_varint(&mut buf, *max_players);
            write_varint(&mut buf, *view_distance);
            write_varint(&mut buf, *simulation_distance);
            buf.put_u8(*reduced_debug_info as u8);
            buf.put_u8(*enable_respawn_screen as u8);
            buf.put_u8(*do_limited_crafting as u8);
            write_varint(&mut buf, *dimension_type);
            write_string(&mut buf, dimension_name);
            buf.put_i64(*hashed_seed);
            buf.put_u8(game_mode.id());
            buf.put_i8(*previous_game_mode);
            buf.put_u8(*is_debug as u8);
            buf.put_u8(*is_flat as u8);
            buf.put_u8(0); // death location absent
            write_varint(&mut buf, *portal_cooldown);
            buf.put_u8(*enforces_secure_chat as u8);
        }
        InternalPacket::SynchronizePlayerPosition {
            position,
            yaw,
            pitch,
            flags,
            teleport_id,
        } => {
            write_varint(&mut buf, PLAY_SYNC_PLAYER_POS);
            buf.put_f64(position.x);
            buf.put_f64(position.y);
            buf.put_f64(position.z);
            buf.put_f32(*yaw);
            buf.put_f32(*pitch);
            buf.put_u8(*flags);
            write_varint(&mut buf, *teleport_id);
        }
        InternalPacket::SetCenterChunk { chunk_x, chunk_z } => {
            write_varint(&mut buf, PLAY_SET_CENTER_CHUNK);
            write_varint(&mut buf, *chunk_x);
            write_varint(&mut buf, *chunk_z);
        }
        InternalPacket::ChunkDataAndUpdateLight {
            chunk_x,
            chunk_z,
            heightmaps,
            data,
            block_entities,
            light_data,
        } => {
            write_varint(&mut buf, PLAY_CHUNK_DATA);
            buf.put_i32(*chunk_x);
            buf.put_i32(*chunk_z);
            let mut nbt_buf = BytesMut::new();
            heightmaps.write_root_network(&mut nbt_buf);
            buf.extend_from_slice(&nbt_buf);
            write_varint(&mut buf, data.len() as i32);
            buf.extend_from_slice(data);
            write_varint(&mut buf, 0); // no block entities
            let _ = block_entities;
            encode_light_data(&mut buf, light_data);
        }
        InternalPacket::UnloadChunk { chunk_x, chunk_z } => {
            write_varint(&mut buf, PLAY_UNLOAD_CHUNK);
            buf.put_i32(*chunk_z);
            buf.put_i32(*chunk_x);
        }
        InternalPacket::KeepAliveClientbound { id } => {
            write_varint(&mut buf, PLAY_KEEP_ALIVE);
            buf.put_i64(*id);
        }
        InternalPacket::GameEvent { event, value } => {
            write_varint(&mut buf, PLAY_GAME_EVENT);
            buf.put_u8(*event);
            buf.put_f32(*value);
        }
        InternalPacket::SetDefaultSpawnPosition { position, angle } => {
            write_varint(&mut buf, PLAY_SET_DEFAULT_SPAWN);
            buf.put_u64(position.encode());
            buf.put_f32(*angle);
        }
        InternalPacket::SpawnEntity {
            entity_id,
            entity_uuid,
            entity_type,
            x,
            y,
            z,
            pitch,
            yaw,
            head_yaw,
            data,
            velocity_x,
            velocity_y,
            velocity_z,
        } => {
            write_varint(&mut buf, PLAY_SPAWN_ENTITY);
            write_varint(&mut buf, *entity_id);
            write_uuid(&mut buf, entity_uuid);
            write_varint(&mut buf, *entity_type);
            buf.put_f64(*x);
            buf.put_f64(*y);
            buf.put_f64(*z);
            buf.put_u8(*pitch);
            buf.put_u8(*yaw);
            buf.put_u8(*head_yaw);
            write_varint(&mut buf, *data);
            buf.put_i16(*velocity_x);
            buf.put_i16(*velocity_y);
            buf.put_i16(*velocity_z);
        }
        InternalPacket::RemoveEntities { entity_ids } => {
            write_varint(&mut buf, PLAY_REMOVE_ENTITIES);
            write_varint(&mut buf, entity_ids.len() as i32);
            for id in entity_ids {
                write_varint(&mut buf, *id);
            }
        }
        InternalPacket::UpdateEntityPosition {
            entity_id,
            delta_x,
            delta_y,
            delta_z,
            on_ground,
        } => {
            write_varint(&mut buf, PLAY_UPDATE_ENTITY_POSITION);
            write_varint(&mut buf, *entity_id);
            buf.put_i16(*delta_x);
            buf.put_i16(*delta_y);
            buf.put_i16(*delta_z);
            buf.put_u8(*on_ground as u8);
        }
        InternalPacket::UpdateEntityPositionAndRotation {
            entity_id,
            delta_x,
            delta_y,
            delta_z,
            yaw,
            pitch,
            on_ground,
        } => {
            write_varint(&mut buf, PLAY_UPDATE_ENTITY_POSITION_AND_ROTATION);
            write_varint(&mut buf, *entity_id);
            buf.put_i16(*delta_x);
            buf.put_i16(*delta_y);
            buf.put_i16(*delta_z);
            buf.put_u8(*yaw);
            buf.put_u8(*pitch);
            buf.put_u8(*on_ground as u8);
        }
        InternalPacket::UpdateEntityRotation {
            entity_id,
            yaw,
            pitch,
            on_ground,
        } => {
            write_varint(&mut buf, PLAY_UPDATE_ENTITY_ROTATION);
            write_varint(&mut buf, *entity_id);
            buf.put_u8(*yaw);
            buf.put_u8(*pitch);
            buf.put_u8(*on_ground as u8);
        }
        InternalPacket::SetHeadRotation { entity_id, head_yaw } => {
            write_varint(&mut buf, PLAY_SET_HEAD_ROTATION);
            write_varint(&mut buf, *entity_id);
            buf.put_u8(*head_yaw);
        }
        InternalPacket::TeleportEntity {
            entity_id,
            x,
            y,
            z,
            yaw,
            pitch,
            on_ground,
        } => {
            write_varint(&mut buf, PLAY_TELEPORT_ENTITY);
            write_varint(&mut buf, *entity_id);
            buf.put_f64(*x);
            buf.put_f64(*y);
            buf.put_f64(*z);
            buf.put_u8(*yaw);
            buf.put_u8(*pitch);
            buf.put_u8(*on_ground as u8);
        }
        InternalPacket::DeclareCommands { nodes, root_index } => {
            write_varint(&mut buf, PLAY_COMMANDS);
            write_varint(&mut buf, nodes.len() as i32);
            for node in nodes {
                buf.put_u8(node.flags);
                write_varint(&mut buf, node.children.len() as i32);
                for child in &node.children {
                    write_varint(&mut buf, *child);
                }
                if node.flags & 0x08 != 0 {
                    write_varint(&mut buf, 0); // redirect node index, unused
                }
                if let Some(name) = &node.name {
                    write_string(&mut buf, name);
                }
                if let Some(parser) = &node.parser {
                    write_string(&mut buf, parser);
                    if let Some(props) = &node.parser_properties {
                        buf.extend_from_slice(props);
                    }
                }
                if node.flags & 0x10 != 0 {
                    write_string(&mut buf, "minecraft:ask_server");
                }
            }
            write_varint(&mut buf, *root_index);
        }
        InternalPacket::SetContainerContent {
            window_id,
            state_id,
            slots,
            carried_item,
        } => {
            write_varint(&mut buf, PLAY_SET_CONTAINER_CONTENT);
            buf.put_u8(*window_id);
            write_varint(&mut buf, *state_id);
            write_varint(&mut buf, slots.len() as i32);
            for slot in slots {
                write_slot(&mut buf, slot);
            }
            write_slot(&mut buf, carried_item);
        }
        InternalPacket::SetContainerSlot {
            window_id,
            state_id,
            slot,
            item,
        } => {
            write_varint(&mut buf, PLAY_SET_CONTAINER_SLOT);
            buf.put_i8(*window_id);
            write_varint(&mut buf, *state_id);
            buf.put_i16(*slot);
            write_slot(&mut buf, item);
        }
        InternalPacket::SetHeldItem { slot } => {
            write_varint(&mut buf, PLAY_SET_HELD_ITEM);
            buf.put_i8(*slot);
        }
        InternalPacket::SetEntityMetadata { entity_id, metadata } => {
            write_varint(&mut buf, PLAY_SET_ENTITY_METADATA);
            write_varint(&mut buf, *entity_id);
            for entry in metadata {
                buf.put_u8(entry.index);
                write_varint(&mut buf, entry.type_id);
                buf.extend_from_slice(&entry.data);
            }
            buf.put_u8(0xFF); // terminator
        }
        InternalPacket::SetEntityVelocity {
            entity_id,
            velocity_x,
            velocity_y,
            velocity_z,
        } => {
            write_varint(&mut buf, PLAY_SET_ENTITY_VELOCITY);
            write_varint(&mut buf, *entity_id);
            buf.put_i16(*velocity_x);
            buf.put_i16(*velocity_y);
            buf.put_i16(*velocity_z);
        }
        InternalPacket::SystemChatMessage { content, overlay } => {
            write_varint(&mut buf, PLAY_SYSTEM_CHAT_MESSAGE);
            let mut nbt_buf = BytesMut::new();
            content.to_nbt().write_root_network(&mut nbt_buf);
            buf.extend_from_slice(&nbt_buf);
            buf.put_u8(*overlay as u8);
        }
        InternalPacket::PlayerInfoUpdate { actions, players } => {
            write_varint(&mut buf, PLAY_PLAYER_INFO_UPDATE);
            buf.put_u8(*actions);
            write_varint(&mut buf, players.len() as i32);
            for p in players {
                write_uuid(&mut buf, &p.uuid);
                encode_player_info_entry(&mut buf, *actions, p)?;
            }
        }
        InternalPacket::PlayerInfoRemove { uuids } => {
            write_varint(&mut buf, PLAY_PLAYER_INFO_REMOVE);
            write_varint(&mut buf, uuids.len() as i32);
            for uuid in uuids {
                write_uuid(&mut buf, uuid);
            }
        }
        InternalPacket::BlockUpdate { position, block_id } => {
            write_varint(&mut buf, PLAY_BLOCK_UPDATE);
            buf.put_u64(position.encode());
            write_varint(&mut buf, *block_id);
        }
        InternalPacket::AcknowledgeBlockChange { sequence } => {
            write_varint(&mut buf, PLAY_ACKNOWLEDGE_BLOCK_CHANGE);
            write_varint(&mut buf, *sequence);
        }
        InternalPacket::SetBlockDestroyStage {
            entity_id,
            position,
            destroy_stage,
        } => {
            write_varint(&mut buf, PLAY_SET_BLOCK_DESTROY_STAGE);
            write_varint(&mut buf, *entity_id);
            buf.put_u64(position.encode());
            buf.put_i8(*destroy_stage);
        }
        InternalPacket::ChunkBatchStart => {
            write_varint(&mut buf, PLAY_CHUNK_BATCH_START);
        }
        InternalPacket::ChunkBatchFinished { batch_size } => {
            write_varint(&mut buf, PLAY_CHUNK_BATCH_FINISHED);
            write_varint(&mut buf, *batch_size);
        }
        InternalPacket::UpdateTime { world_age, time_of_day } => {
            write_varint(&mut buf, PLAY_UPDATE_TIME);
            buf.put_i64(*world_age);
            buf.put_i64(*time_of_day);
        }
        InternalPacket::PlayerChatMessage {
            sender,
            signature,
            body,
            timestamp,
            salt,
            chat_type_index,
            sender_name,
            target_name,
        } => {
            write_varint(&mut buf, PLAY_PLAYER_CHAT_MESSAGE);
            write_uuid(&mut buf, sender);
            write_varint(&mut buf, 0); // index
            match signature {
                Some(sig) => {
                    buf.put_u8(1);
                    buf.extend_from_slice(sig);
                }
                None => buf.put_u8(0),
            }
            write_string(&mut buf, body);
            buf.put_i64(*timestamp);
            buf.put_i64(*salt);
            write_varint(&mut buf, 0); // no previously-acknowledged messages
            buf.put_u8(0); // no unsigned content
            write_varint(&mut buf, 0); // filter type = PASS_THROUGH
            write_varint(&mut buf, chat_type_index + 1);
            let mut name_nbt = BytesMut::new();
            sender_name.to_nbt().write_root_network(&mut name_nbt);
            buf.extend_from_slice(&name_nbt);
            match target_name {
                Some(target) => {
                    buf.put_u8(1);
                    let mut target_nbt = BytesMut::new();
                    target.to_nbt().write_root_network(&mut target_nbt);
                    buf.extend_from_slice(&target_nbt);
                }
                None => buf.put_u8(0),
            }
        }
        InternalPacket::BossBarAdd {
            bar_id,
            title,
            health,
            color,
            division,
            flags,
        } => {
            write_varint(&mut buf, PLAY_BOSS_BAR);
            write_uuid(&mut buf, bar_id);
            write_varint(&mut buf, 0); // action: add
            write_string(&mut buf, &title.to_json());
            buf.put_f32(*health);
            write_varint(&mut buf, *color);
            write_varint(&mut buf, *division);
            buf.put_u8(*flags);
        }
        InternalPacket::BossBarRemove { bar_id } => {
            write_varint(&mut buf, PLAY_BOSS_BAR);
            write_uuid(&mut buf, bar_id);
            write_varint(&mut buf, 1); // action: remove
        }
        InternalPacket::BossBarUpdateHealth { bar_id, health } => {
            write_varint(&mut buf, PLAY_BOSS_BAR);
            write_uuid(&mut buf, bar_id);
            write_varint(&mut buf, 2);
            buf.put_f32(*health);
        }
        InternalPacket::BossBarUpdateTitle { bar_id, title } => {
            write_varint(&mut buf, PLAY_BOSS_BAR);
            write_uuid(&mut buf, bar_id);
            write_varint(&mut buf, 3);
            write_string(&mut buf, &title.to_json());
        }
        InternalPacket::BossBarUpdateStyle { bar_id, color, division } => {
            write_varint(&mut buf, PLAY_BOSS_BAR);
            write_uuid(&mut buf, bar_id);
            write_varint(&mut buf, 4);
            write_varint(&mut buf, *color);
            write_varint(&mut buf, *division);
        }
        InternalPacket::BossBarUpdateFlags { bar_id, flags } => {
            write_varint(&mut buf, PLAY_BOSS_BAR);
            write_uuid(&mut buf, bar_id);
            write_varint(&mut buf, 5);
            buf.put_u8(*flags);
        }
        InternalPacket::InitializeWorldBorder {
            x,
            z,
            old_diameter,
            new_diameter,
            speed,
            portal_teleport_boundary,
            warning_blocks,
            warning_time,
        } => {
            write_varint(&mut buf, PLAY_INITIALIZE_WORLD_BORDER);
            buf.put_f64(*x);
            buf.put_f64(*z);
            buf.put_f64(*old_diameter);
            buf.put_f64(*new_diameter);
            write_varlong(&mut buf, *speed);
            write_varint(&mut buf, *portal_teleport_boundary);
            write_varint(&mut buf, *warning_blocks);
            write_varint(&mut buf, *warning_time);
        }
        InternalPacket::SetBorderCenter { x, z } => {
            write_varint(&mut buf, PLAY_SET_BORDER_CENTER);
            buf.put_f64(*x);
            buf.put_f64(*z);
        }
        InternalPacket::SetBorderLerpSize {
            old_diameter,
            new_diameter,
            speed,
        } => {
            write_varint(&mut buf, PLAY_SET_BORDER_LERP_SIZE);
            buf.put_f64(*old_diameter);
            buf.put_f64(*new_diameter);
            write_varlong(&mut buf, *speed);
        }
        InternalPacket::SetBorderSize { diameter } => {
            write_varint(&mut buf, PLAY_SET_BORDER_SIZE);
            buf.put_f64(*diameter);
        }
        InternalPacket::SetBorderWarningDelay { warning_time } => {
            write_varint(&mut buf, PLAY_SET_BORDER_WARNING_DELAY);
            write_varint(&mut buf, *warning_time);
        }
        InternalPacket::SetBorderWarningDistance { warning_blocks } => {
            write_varint(&mut buf, PLAY_SET_BORDER_WARNING_DISTANCE);
            write_varint(&mut buf, *warning_blocks);
        }
        InternalPacket::EntityAnimation { entity_id, animation } => {
            write_varint(&mut buf, PLAY_ENTITY_ANIMATION);
            write_varint(&mut buf, *entity_id);
            buf.put_u8(*animation);
        }
        InternalPacket::EntityEvent { entity_id, event } => {
            write_varint(&mut buf, PLAY_ENTITY_EVENT);
            buf.put_i32(*entity_id);
            buf.put_u8(*event);
        }
        InternalPacket::WorldEvent {
            event,
            position,
            data,
            disable_relative_volume,
        } => {
            write_varint(&mut buf, PLAY_WORLD_EVENT);
            buf.put_i32(*event);
            buf.put_u64(position.encode());
            buf.put_i32(*data);
            buf.put_u8(*disable_relative_volume as u8);
        }
        InternalPacket::SetEquipment { entity_id, equipment } => {
            write_varint(&mut buf, PLAY_SET_EQUIPMENT);
            write_varint(&mut buf, *entity_id);
            for (i, (slot, item)) in equipment.iter().enumerate() {
                let is_last = i + 1 == equipment.len();
                let slot_byte = if is_last { *slot } else { *slot | 0x80 };
                buf.put_u8(slot_byte);
                write_slot(&mut buf, item);
            }
        }
        InternalPacket::UpdateAttributes { entity_id, attributes } => {
            write_varint(&mut buf, PLAY_UPDATE_ATTRIBUTES);
            write_varint(&mut buf, *entity_id);
            write_varint(&mut buf, attributes.len() as i32);
            for (key, value) in attributes {
                write_string(&mut buf, key);
                buf.put_f64(*value);
                write_varint(&mut buf, 0); // no modifiers
            }
        }
        InternalPacket::PlayerAbilities {
            flags,
            flying_speed,
            field_of_view_modifier,
        } => {
            write_varint(&mut buf, PLAY_PLAYER_ABILITIES);
            buf.put_u8(*flags);
            buf.put_f32(*flying_speed);
            buf.put_f32(*field_of_view_modifier);
        }
        InternalPacket::OpenScreen {
            window_id,
            window_type,
            title,
        } => {
            write_varint(&mut buf, PLAY_OPEN_SCREEN);
            write_varint(&mut buf, *window_id as i32);
            write_varint(&mut buf, *window_type);
            let mut nbt_buf = BytesMut::new();
            title.to_nbt().write_root_network(&mut nbt_buf);
            buf.extend_from_slice(&nbt_buf);
        }
        InternalPacket::CommandSuggestionsResponse {
            transaction_id,
            start,
            length,
            matches,
        } => {
            write_varint(&mut buf, PLAY_COMMAND_SUGGESTIONS_RESPONSE);
            write_varint(&mut buf, *transaction_id);
            write_varint(&mut buf, *start);
            write_varint(&mut buf, *length);
            write_varint(&mut buf, matches.len() as i32);
            for m in matches {
                write_string(&mut buf, m);
                buf.put_u8(0); // no tooltip
            }
        }
        InternalPacket::AddResourcePack {
            uuid,
            url,
            hash,
            forced,
            prompt_message,
        } => {
            // Play-phase resource pack push shares the Configuration layout.
            write_varint(&mut buf, PLAY_ADD_RESOURCE_PACK);
            write_uuid(&mut buf, uuid);
            write_string(&mut buf, url);
            write_string(&mut buf, hash);
            buf.put_u8(*forced as u8);
            match prompt_message {
                Some(msg) => {
                    buf.put_u8(1);
                    write_string(&mut buf, &msg.to_json());
                }
                None => buf.put_u8(0),
            }
        }
        InternalPacket::RemoveResourcePack { uuid } => {
            write_varint(&mut buf, PLAY_REMOVE_RESOURCE_PACK);
            match uuid {
                Some(u) => {
                    buf.put_u8(1);
                    write_uuid(&mut buf, u);
                }
                None => buf.put_u8(0),
            }
        }
        InternalPacket::PickUpItem {
            collected_entity_id,
            collector_entity_id,
            pickup_item_count,
        } => {
            write_varint(&mut buf, PLAY_PICK_UP_ITEM);
            write_varint(&mut buf, *collected_entity_id);
            write_varint(&mut buf, *collector_entity_id);
            write_varint(&mut buf, *pickup_item_count);
        }
        InternalPacket::ClientboundPluginMessage { channel, data } => {
            write_varint(&mut buf, PLAY_PLUGIN_MESSAGE);
            write_string(&mut buf, channel);
            buf.extend_from_slice(data);
        }
        InternalPacket::Disconnect { reason } => {
            write_varint(&mut buf, PLAY_DISCONNECT);
            let nbt = NbtValue::Compound(vec![("text".into(), NbtValue::String(reason.text.clone()))]);
            let mut nbt_buf = BytesMut::new();
            nbt.write_root_network(&mut nbt_buf);
            buf.extend_from_slice(&nbt_buf);
        }
        _ => bail!("Cannot encode {:?} in Play state", std::mem::discriminant(packet)),
    }
    Ok(buf)
}

/// Player Info Update sub-blocks are written in strict ascending bit order
/// of the actions mask (Add, Initialize Chat, Game Mode, Listed, Latency,
/// Display Name), regardless of which bits are actually set.
fn encode_player_info_entry(buf: &mut BytesMut, actions: u8, entry: &PlayerInfoEntry) -> Result<()> {
    if actions & player_info_actions::ADD_PLAYER != 0 {
        write_string(buf, entry.name.as_deref().unwrap_or_default());
        write_varint(buf, entry.properties.len() as i32);
        for (name, value, signature) in &entry.properties {
            write_string(buf, name);
            write_string(buf, value);
            match signature {
                Some(sig) => {
                    buf.put_u8(1);
                    write_string(buf, sig);
                }
                None => buf.put_u8(0),
            }
        }
    }
    if actions & player_info_actions::INITIALIZE_CHAT != 0 {
        // No chat session established for this entry; absent.
        buf.put_u8(0);
    }
    if actions & player_info_actions::UPDATE_GAME_MODE != 0 {
        write_varint(buf, entry.game_mode.unwrap_or(0));
    }
    if actions & player_info_actions::UPDATE_LISTED != 0 {
        buf.put_u8(entry.listed.unwrap_or(true) as u8);
    }
    if actions & player_info_actions::UPDATE_LATENCY != 0 {
        write_varint(buf, entry.ping.unwrap_or(0));
    }
    if actions & player_info_actions::UPDATE_DISPLAY_NAME != 0 {
        // Never populated: vanilla leaves custom tab-list names unset.
        buf.put_u8(0);
    }
    Ok(())
}

fn encode_light_data(buf: &mut BytesMut, light: &ChunkLightData) {
    write_varint(buf, light.sky_light_mask.len() as i32);
    for v in &light.sky_light_mask {
        buf.put_i64(*v);
    }
    write_varint(buf, light.block_light_mask.len() as i32);
    for v in &light.block_light_mask {
        buf.put_i64(*v);
    }
    write_varint(buf, light.empty_sky_light_mask.len() as i32);
    for v in &light.empty_sky_light_mask {
        buf.put_i64(*v);
    }
    write_varint(buf, light.empty_block_light_mask.len() as i32);
    for v in &light.empty_block_light_mask {
        buf.put_i64(*v);
    }
    write_varint(buf, light.sky_light_arrays.len() as i32);
    for arr in &light.sky_light_arrays {
        write_varint(buf, arr.len() as i32);
        buf.extend_from_slice(arr);
    }
    write_varint(buf, light.block_light_arrays.len() as i32);
    for arr in &light.block_light_arrays {
        write_varint(buf, arr.len() as i32);
        buf.extend_from_slice(arr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pickaxe_types::TextComponent;

    #[test]
    fn test_encode_decode_keep_alive() {
        let packet = InternalPacket::KeepAliveClientbound { id: 42 };
        let encoded = encode_play(&packet).unwrap();
        let id = i32::from_be_bytes([0, 0, 0, encoded[0]]);
        assert_eq!(id, PLAY_KEEP_ALIVE);
    }

    #[test]
    fn test_encode_disconnect_uses_nbt() {
        let packet = InternalPacket::Disconnect {
            reason: TextComponent::text("bye"),
        };
        let encoded = encode_play(&packet).unwrap();
        assert!(!encoded.is_empty());
    }

    #[test]
    fn test_decode_confirm_teleport() {
        let mut data = BytesMut::new();
        write_varint(&mut data, 7);
        let packet = decode_play(PLAY_SB_CONFIRM_TELEPORT, &mut data).unwrap();
        match packet {
            InternalPacket::ConfirmTeleportation { teleport_id } => assert_eq!(teleport_id, 7),
            _ => panic!("wrong variant"),
        }
    }
}
