//! Entity/world event emitters (spec.md §4.8 C8). Each function here builds
//! the `InternalPacket` spec.md names and sends or broadcasts it through the
//! fabric in `broadcast.rs`; several also own a small state machine embedded
//! in the emission itself (teleport IDs, world border mutate+broadcast,
//! chat-type registry resolution).

use anyhow::Result;
use pickaxe_protocol_core::{player_info_actions, ConnectionState, InternalPacket, PlayerInfoEntry};
use pickaxe_types::{BlockPos, GameMode, TextComponent, Vec3d};
use uuid::Uuid;

use crate::broadcast::{broadcast_to_all, broadcast_to_others, send_packet, send_packet_in_state, send_to_subset};
use crate::context::{Bossbar, ClientHandle, Phase, Player, ServerContext};

/// Angle byte: `round(degrees * 256 / 360) mod 256` (spec.md §4.8).
pub fn encode_angle(degrees: f32) -> u8 {
    ((degrees * 256.0 / 360.0).round() as i32 & 0xFF) as u8
}

/// Relative-move delta in 1/4096ths of a block (spec.md §4.8). Caller
/// pre-scales; this just clamps to the wire's i16 range.
pub fn position_delta(new: f64, old: f64) -> i16 {
    (((new - old) * 4096.0).round().clamp(i16::MIN as f64, i16::MAX as f64)) as i16
}

/// Velocity component in 1/8000ths of a block/tick, clamped to i16 range
/// (spec.md §4.8).
pub fn encode_velocity(component: f64) -> i16 {
    (component * 8000.0).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

// === Entity spawn / despawn / movement ===

pub fn spawn_player_entity(ctx: &ServerContext, to: &ClientHandle, player: &Player) -> Result<()> {
    send_packet(
        ctx,
        to,
        &InternalPacket::SpawnEntity {
            entity_id: player.entity_id,
            entity_uuid: player.uuid,
            entity_type: 128, // player
            x: player.position.x,
            y: player.position.y,
            z: player.position.z,
            pitch: encode_angle(player.pitch),
            yaw: encode_angle(player.yaw),
            head_yaw: encode_angle(player.head_yaw),
            data: 0,
            velocity_x: 0,
            velocity_y: 0,
            velocity_z: 0,
        },
    )
}

pub fn remove_entities(ctx: &ServerContext, entity_ids: Vec<i32>) -> Result<()> {
    broadcast_to_all(ctx, &InternalPacket::RemoveEntities { entity_ids })
}

pub fn update_entity_position(
    ctx: &ServerContext,
    exclude: Uuid,
    entity_id: i32,
    new: Vec3d,
    old: Vec3d,
    on_ground: bool,
) -> Result<()> {
    broadcast_to_others(
        ctx,
        &InternalPacket::UpdateEntityPosition {
            entity_id,
            delta_x: position_delta(new.x, old.x),
            delta_y: position_delta(new.y, old.y),
            delta_z: position_delta(new.z, old.z),
            on_ground,
        },
        Some(exclude),
    )
}

pub fn update_entity_position_and_rotation(
    ctx: &ServerContext,
    exclude: Uuid,
    entity_id: i32,
    new: Vec3d,
    old: Vec3d,
    yaw: f32,
    pitch: f32,
    on_ground: bool,
) -> Result<()> {
    broadcast_to_others(
        ctx,
        &InternalPacket::UpdateEntityPositionAndRotation {
            entity_id,
            delta_x: position_delta(new.x, old.x),
            delta_y: position_delta(new.y, old.y),
            delta_z: position_delta(new.z, old.z),
            yaw: encode_angle(yaw),
            pitch: encode_angle(pitch),
            on_ground,
        },
        Some(exclude),
    )?;
    broadcast_to_others(
        ctx,
        &InternalPacket::SetHeadRotation { entity_id, head_yaw: encode_angle(yaw) },
        Some(exclude),
    )
}

pub fn update_entity_rotation(
    ctx: &ServerContext,
    exclude: Uuid,
    entity_id: i32,
    yaw: f32,
    pitch: f32,
    on_ground: bool,
) -> Result<()> {
    broadcast_to_others(
        ctx,
        &InternalPacket::UpdateEntityRotation { entity_id, yaw: encode_angle(yaw), pitch: encode_angle(pitch), on_ground },
        Some(exclude),
    )?;
    broadcast_to_others(
        ctx,
        &InternalPacket::SetHeadRotation { entity_id, head_yaw: encode_angle(yaw) },
        Some(exclude),
    )
}

pub fn teleport_entity(ctx: &ServerContext, exclude: Uuid, entity_id: i32, pos: Vec3d, yaw: f32, pitch: f32, on_ground: bool) -> Result<()> {
    broadcast_to_others(
        ctx,
        &InternalPacket::TeleportEntity {
            entity_id,
            x: pos.x,
            y: pos.y,
            z: pos.z,
            yaw: encode_angle(yaw),
            pitch: encode_angle(pitch),
            on_ground,
        },
        Some(exclude),
    )
}

pub fn set_entity_velocity(ctx: &ServerContext, entity_id: i32, vx: f64, vy: f64, vz: f64) -> Result<()> {
    broadcast_to_all(
        ctx,
        &InternalPacket::SetEntityVelocity {
            entity_id,
            velocity_x: encode_velocity(vx),
            velocity_y: encode_velocity(vy),
            velocity_z: encode_velocity(vz),
        },
    )
}

pub fn entity_animation(ctx: &ServerContext, entity_id: i32, animation: u8) -> Result<()> {
    broadcast_to_all(ctx, &InternalPacket::EntityAnimation { entity_id, animation })
}

pub fn entity_event(ctx: &ServerContext, entity_id: i32, event: u8) -> Result<()> {
    broadcast_to_all(ctx, &InternalPacket::EntityEvent { entity_id, event })
}

/// World Event IDs whose "disable relative volume" flag is hard-coded true
/// (spec.md §4.8): 1023 (play wither spawn), 1028 (play ender dragon death),
/// 1038 (play end portal / respawn anchor charge).
const FULL_VOLUME_WORLD_EVENTS: [i32; 3] = [1023, 1028, 1038];

pub fn world_event(ctx: &ServerContext, event: i32, position: BlockPos, data: i32) -> Result<()> {
    let disable_relative_volume = FULL_VOLUME_WORLD_EVENTS.contains(&event);
    broadcast_to_all(ctx, &InternalPacket::WorldEvent { event, position, data, disable_relative_volume })
}

pub fn game_event(ctx: &ServerContext, to: &ClientHandle, event: u8, value: f32) -> Result<()> {
    send_packet(ctx, to, &InternalPacket::GameEvent { event, value })
}

// === Teleport state machine (spec.md §4.8, §4.4) ===

/// Synchronize Player Position: issues a fresh monotonic teleport ID, records
/// it into the connection's pending set, and flips the connection to
/// AwaitingTeleportConfirm — all before the frame is written, so the
/// "teleport ID recorded before the packet is observed" property holds
/// (spec.md §8). Also resolves Open Question (a): yaw/pitch are written as
/// given by the caller (0.0/0.0 on the initial join teleport, per
/// SPEC_FULL.md §D) and then mirrored onto `Player::rotation`.
pub fn synchronize_player_position(
    ctx: &ServerContext,
    client: &ClientHandle,
    player: &mut Player,
    position: Vec3d,
    yaw: f32,
    pitch: f32,
    flags: u8,
) -> Result<i32> {
    let teleport_id = {
        let mut state = client.state.lock().unwrap();
        let id = state.next_teleport_id;
        state.next_teleport_id = state.next_teleport_id.wrapping_add(1);
        state.pending_teleport_ids.insert(id);
        client.set_phase(Phase::AwaitingTeleportConfirm);
        id
    };

    player.position = position;
    player.yaw = yaw;
    player.pitch = pitch;

    send_packet(
        ctx,
        client,
        &InternalPacket::SynchronizePlayerPosition { position, yaw, pitch, flags, teleport_id },
    )?;
    Ok(teleport_id)
}

/// Outcome of a client's Confirm Teleport packet (spec.md §4.4, §8 scenario 4).
pub enum TeleportConfirmResult {
    /// The ID matched a pending one; if the pending set is now empty the
    /// connection returns to Play.
    Confirmed,
    /// Unknown ID — caller must disconnect with ProtocolViolation.
    Unknown,
}

pub fn confirm_teleport(client: &ClientHandle, teleport_id: i32) -> TeleportConfirmResult {
    let mut state = client.state.lock().unwrap();
    if !state.pending_teleport_ids.remove(&teleport_id) {
        return TeleportConfirmResult::Unknown;
    }
    if state.pending_teleport_ids.is_empty() {
        client.set_phase(Phase::Play);
    }
    TeleportConfirmResult::Confirmed
}

// === Player info / chat ===

/// Player Info Update secure-chat validation (spec.md §4.8): session id must
/// be 16 bytes (guaranteed by `Uuid`), pubkey ≤ 512 B, keysig ≤ 4096 B.
/// Checked while building the packet, before any bytes are written for that
/// player (SPEC_FULL.md §C.1).
pub fn validate_chat_session(player: &Player) -> bool {
    player.chat_session.as_ref().map(|s| s.is_valid()).unwrap_or(true)
}

pub fn player_info_add_entry(player: &Player) -> PlayerInfoEntry {
    PlayerInfoEntry {
        uuid: player.uuid,
        name: Some(player.display_name.clone()),
        properties: player
            .properties
            .iter()
            .map(|p| (p.name.clone(), p.value.clone(), p.signature.clone()))
            .collect(),
        game_mode: Some(player.game_mode.id() as i32),
        listed: Some(player.listed),
        ping: Some(player.ping),
        display_name: None,
    }
}

/// Build and broadcast a Player Info Update carrying ADD_PLAYER for one
/// newly-joined player, gated by the secure-chat validity check (spec.md
/// §4.8 "Chat session"); the connection is rejected before any entry is
/// built if the session key exceeds the bounds `ChatSessionKey::is_valid`
/// checks (SPEC_FULL.md §C.1).
pub fn broadcast_player_info_add(ctx: &ServerContext, player: &Player) -> Result<()> {
    if !validate_chat_session(player) {
        anyhow::bail!("chat session key exceeds bounds for {}", player.uuid);
    }
    let actions = player_info_actions::ADD_PLAYER
        | player_info_actions::UPDATE_GAME_MODE
        | player_info_actions::UPDATE_LISTED
        | player_info_actions::UPDATE_LATENCY;
    let entry = player_info_add_entry(player);
    broadcast_to_all(ctx, &InternalPacket::PlayerInfoUpdate { actions, players: vec![entry] })
}

/// Send the existing roster to a newly-joined client (one entry per
/// already-connected player), so the new client's tab list matches state.
pub fn send_player_info_roster(ctx: &ServerContext, to: &ClientHandle) -> Result<()> {
    let actions = player_info_actions::ADD_PLAYER
        | player_info_actions::UPDATE_GAME_MODE
        | player_info_actions::UPDATE_LISTED
        | player_info_actions::UPDATE_LATENCY;
    let entries: Vec<PlayerInfoEntry> = {
        let players = ctx.global_players.read().unwrap();
        players.values().map(|p| player_info_add_entry(&p.lock().unwrap())).collect()
    };
    if entries.is_empty() {
        return Ok(());
    }
    send_packet(ctx, to, &InternalPacket::PlayerInfoUpdate { actions, players: entries })
}

pub fn player_info_remove(ctx: &ServerContext, uuid: Uuid) -> Result<()> {
    broadcast_to_all(ctx, &InternalPacket::PlayerInfoRemove { uuids: vec![uuid] })
}

pub fn system_chat_message(ctx: &ServerContext, to: &ClientHandle, content: TextComponent, overlay: bool) -> Result<()> {
    send_packet(ctx, to, &InternalPacket::SystemChatMessage { content, overlay })
}

pub fn broadcast_system_chat_message(ctx: &ServerContext, content: TextComponent, overlay: bool) -> Result<()> {
    broadcast_to_all(ctx, &InternalPacket::SystemChatMessage { content, overlay })
}

/// Player Chat Message (spec.md §8 scenario 5): resolves `minecraft:chat`
/// through the registry manager so `chatTypeIndex = registryIndex + 1` on
/// the wire.
pub fn broadcast_player_chat_message(
    ctx: &ServerContext,
    sender: Uuid,
    sender_name: TextComponent,
    body: String,
    timestamp: i64,
    salt: i64,
    signature: Option<Vec<u8>>,
) -> Result<()> {
    let chat_type_index = ctx.adapter.registry_id("minecraft:chat_type", "minecraft:chat").unwrap_or(0);
    broadcast_to_all(
        ctx,
        &InternalPacket::PlayerChatMessage {
            sender,
            signature: if ctx.config.enable_secure_chat { signature } else { None },
            body,
            timestamp,
            salt,
            chat_type_index,
            sender_name,
            target_name: None,
        },
    )
}

// === World time / border ===

pub fn broadcast_update_time(ctx: &ServerContext) -> Result<()> {
    let (world_age, time_of_day) = {
        let time = ctx.world_time.lock().unwrap();
        (time.world_age, time.time_of_day)
    };
    broadcast_to_all(ctx, &InternalPacket::UpdateTime { world_age, time_of_day })
}

pub fn send_initialize_world_border(ctx: &ServerContext, to: &ClientHandle) -> Result<()> {
    let border = ctx.world_border.lock().unwrap().clone();
    send_packet(
        ctx,
        to,
        &InternalPacket::InitializeWorldBorder {
            x: border.center_x,
            z: border.center_z,
            old_diameter: border.size,
            new_diameter: border.size,
            speed: 0,
            portal_teleport_boundary: border.portal_teleport_boundary,
            warning_blocks: border.warning_blocks,
            warning_time: border.warning_time,
        },
    )
}

/// Mutates `worldBorder` and broadcasts in the same call, never one without
/// the other (spec.md §4.6, §8 scenario 6; SPEC_FULL.md §C.3).
pub fn set_border_center(ctx: &ServerContext, x: f64, z: f64) -> Result<()> {
    ctx.world_border.lock().unwrap().update_center(x, z);
    broadcast_to_all(ctx, &InternalPacket::SetBorderCenter { x, z })
}

pub fn set_border_lerp_size(ctx: &ServerContext, new_diameter: f64, speed: i64) -> Result<()> {
    let old_diameter = ctx.world_border.lock().unwrap().update_size(new_diameter);
    broadcast_to_all(ctx, &InternalPacket::SetBorderLerpSize { old_diameter, new_diameter, speed })
}

pub fn set_border_size(ctx: &ServerContext, diameter: f64) -> Result<()> {
    ctx.world_border.lock().unwrap().update_size(diameter);
    broadcast_to_all(ctx, &InternalPacket::SetBorderSize { diameter })
}

pub fn set_border_warning_delay(ctx: &ServerContext, warning_time: i32) -> Result<()> {
    ctx.world_border.lock().unwrap().update_warning_time(warning_time);
    broadcast_to_all(ctx, &InternalPacket::SetBorderWarningDelay { warning_time })
}

pub fn set_border_warning_distance(ctx: &ServerContext, warning_blocks: i32) -> Result<()> {
    ctx.world_border.lock().unwrap().update_warning_blocks(warning_blocks);
    broadcast_to_all(ctx, &InternalPacket::SetBorderWarningDistance { warning_blocks })
}

// === Boss bar (spec.md §4.8; targets the bar's player set, not a broadcast) ===

pub fn boss_bar_add(ctx: &ServerContext, bar: &Bossbar) -> Result<()> {
    let targets: Vec<Uuid> = bar.players.iter().copied().collect();
    send_to_subset(
        ctx,
        &targets,
        &InternalPacket::BossBarAdd {
            bar_id: bar.uuid,
            title: bar.title.clone(),
            health: bar.health,
            color: bar.color,
            division: bar.division,
            flags: bar.flags,
        },
    )
}

pub fn boss_bar_remove(ctx: &ServerContext, bar: &Bossbar) -> Result<()> {
    let targets: Vec<Uuid> = bar.players.iter().copied().collect();
    send_to_subset(ctx, &targets, &InternalPacket::BossBarRemove { bar_id: bar.uuid })
}

pub fn boss_bar_update_health(ctx: &ServerContext, bar: &Bossbar) -> Result<()> {
    let targets: Vec<Uuid> = bar.players.iter().copied().collect();
    send_to_subset(ctx, &targets, &InternalPacket::BossBarUpdateHealth { bar_id: bar.uuid, health: bar.health })
}

pub fn boss_bar_update_title(ctx: &ServerContext, bar: &Bossbar) -> Result<()> {
    let targets: Vec<Uuid> = bar.players.iter().copied().collect();
    send_to_subset(ctx, &targets, &InternalPacket::BossBarUpdateTitle { bar_id: bar.uuid, title: bar.title.clone() })
}

pub fn boss_bar_update_style(ctx: &ServerContext, bar: &Bossbar) -> Result<()> {
    let targets: Vec<Uuid> = bar.players.iter().copied().collect();
    send_to_subset(ctx, &targets, &InternalPacket::BossBarUpdateStyle { bar_id: bar.uuid, color: bar.color, division: bar.division })
}

pub fn boss_bar_update_flags(ctx: &ServerContext, bar: &Bossbar) -> Result<()> {
    let targets: Vec<Uuid> = bar.players.iter().copied().collect();
    send_to_subset(ctx, &targets, &InternalPacket::BossBarUpdateFlags { bar_id: bar.uuid, flags: bar.flags })
}

// === Misc protocol-level emitters ===

pub fn set_center_chunk(ctx: &ServerContext, to: &ClientHandle, chunk_x: i32, chunk_z: i32) -> Result<()> {
    send_packet(ctx, to, &InternalPacket::SetCenterChunk { chunk_x, chunk_z })
}

pub fn keep_alive(ctx: &ServerContext, to: &ClientHandle) -> Result<i64> {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0);
    {
        let mut state = to.state.lock().unwrap();
        state.last_keep_alive_id = id;
        state.last_keep_alive_sent = std::time::Instant::now();
    }
    send_packet(ctx, to, &InternalPacket::KeepAliveClientbound { id })?;
    Ok(id)
}

/// Returns true iff `id` matches the last-issued keep-alive (spec.md §4.8
/// "Keep-Alive" state machine).
pub fn acknowledge_keep_alive(client: &ClientHandle, id: i64) -> bool {
    let mut state = client.state.lock().unwrap();
    if state.last_keep_alive_id == id {
        state.last_keep_alive_received = std::time::Instant::now();
        true
    } else {
        false
    }
}

pub fn disconnect(ctx: &ServerContext, to: &ClientHandle, state: ConnectionState, reason: &str) -> Result<()> {
    if to.is_closed() {
        return Ok(());
    }
    send_packet_in_state(ctx, to, state, &InternalPacket::Disconnect { reason: TextComponent::plain(reason) })?;
    to.set_phase(Phase::Closed);
    Ok(())
}

pub fn clientbound_brand(ctx: &ServerContext, to: &ClientHandle) -> Result<()> {
    send_packet(
        ctx,
        to,
        &InternalPacket::ClientboundPluginMessage { channel: "minecraft:brand".into(), data: b"MCpp".to_vec() },
    )
}

pub fn feature_flags(ctx: &ServerContext, to: &ClientHandle) -> Result<()> {
    send_packet_in_state(
        ctx,
        to,
        ConnectionState::Configuration,
        &InternalPacket::FeatureFlags { flags: vec!["minecraft:vanilla".into()] },
    )
}

pub fn server_links(ctx: &ServerContext, to: &ClientHandle) -> Result<()> {
    let links: Vec<(String, String)> = ctx
        .config
        .server_links
        .iter()
        .map(|l| (l.label.clone(), l.url.clone()))
        .collect();
    if links.is_empty() {
        return Ok(());
    }
    send_packet_in_state(ctx, to, ConnectionState::Configuration, &InternalPacket::ServerLinks { links })
}

pub fn add_resource_packs(ctx: &ServerContext, to: &ClientHandle) -> Result<()> {
    for pack in &ctx.config.resource_packs {
        send_packet(
            ctx,
            to,
            &InternalPacket::AddResourcePack {
                uuid: pack.uuid,
                url: pack.url.clone(),
                hash: pack.hash.clone(),
                forced: pack.forced,
                prompt_message: pack.prompt_message.as_ref().map(|m| TextComponent::plain(m.clone())),
            },
        )?;
    }
    Ok(())
}

pub fn remove_resource_pack(ctx: &ServerContext, to: &ClientHandle, uuid: Option<Uuid>) -> Result<()> {
    send_packet(ctx, to, &InternalPacket::RemoveResourcePack { uuid })
}

pub fn command_suggestions_response(
    ctx: &ServerContext,
    to: &ClientHandle,
    transaction_id: i32,
    start: i32,
    length: i32,
    matches: Vec<String>,
) -> Result<()> {
    send_packet(ctx, to, &InternalPacket::CommandSuggestionsResponse { transaction_id, start, length, matches })
}

pub fn open_screen(ctx: &ServerContext, to: &ClientHandle, window_id: u8, window_type: i32, title: TextComponent) -> Result<()> {
    send_packet(ctx, to, &InternalPacket::OpenScreen { window_id, window_type, title })
}

pub fn set_container_content(
    ctx: &ServerContext,
    to: &ClientHandle,
    window_id: u8,
    state_id: i32,
    slots: Vec<Option<pickaxe_types::ItemStack>>,
    carried_item: Option<pickaxe_types::ItemStack>,
) -> Result<()> {
    send_packet(ctx, to, &InternalPacket::SetContainerContent { window_id, state_id, slots, carried_item })
}

pub fn set_container_slot(
    ctx: &ServerContext,
    to: &ClientHandle,
    window_id: i8,
    state_id: i32,
    slot: i16,
    item: Option<pickaxe_types::ItemStack>,
) -> Result<()> {
    send_packet(ctx, to, &InternalPacket::SetContainerSlot { window_id, state_id, slot, item })
}

pub fn player_abilities(ctx: &ServerContext, to: &ClientHandle, game_mode: GameMode) -> Result<()> {
    let (flags, flying_speed) = match game_mode {
        GameMode::Creative | GameMode::Spectator => (0x0C, 0.05),
        _ => (0x00, 0.05),
    };
    send_packet(ctx, to, &InternalPacket::PlayerAbilities { flags, flying_speed, field_of_view_modifier: 0.1 })
}

pub fn set_held_item(ctx: &ServerContext, to: &ClientHandle, slot: i8) -> Result<()> {
    send_packet(ctx, to, &InternalPacket::SetHeldItem { slot })
}

pub fn acknowledge_block_change(ctx: &ServerContext, to: &ClientHandle, sequence: i32) -> Result<()> {
    send_packet(ctx, to, &InternalPacket::AcknowledgeBlockChange { sequence })
}

pub fn set_block_destroy_stage(ctx: &ServerContext, entity_id: i32, position: BlockPos, destroy_stage: i8) -> Result<()> {
    broadcast_to_all(ctx, &InternalPacket::SetBlockDestroyStage { entity_id, position, destroy_stage })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_angle_round_trips_within_quantization() {
        for deg in [0.0, 45.0, 90.0, 179.0, -90.0, 359.0] {
            let byte = encode_angle(deg);
            let decoded = byte as f32 * 360.0 / 256.0;
            let mut diff = (decoded - deg).rem_euclid(360.0);
            if diff > 180.0 {
                diff = 360.0 - diff;
            }
            assert!(diff <= 360.0 / 256.0 + 1e-3, "deg={} decoded={} diff={}", deg, decoded, diff);
        }
    }

    #[test]
    fn test_position_delta_scales_and_clamps() {
        assert_eq!(position_delta(1.0, 0.0), 4096);
        assert_eq!(position_delta(-1.0, 0.0), -4096);
        assert_eq!(position_delta(1000.0, 0.0), i16::MAX);
    }

    #[test]
    fn test_velocity_clamps() {
        assert_eq!(encode_velocity(1.0), 8000);
        assert_eq!(encode_velocity(100.0), i16::MAX);
    }

    #[test]
    fn test_full_volume_world_events() {
        assert!(FULL_VOLUME_WORLD_EVENTS.contains(&1023));
        assert!(FULL_VOLUME_WORLD_EVENTS.contains(&1028));
        assert!(FULL_VOLUME_WORLD_EVENTS.contains(&1038));
        assert!(!FULL_VOLUME_WORLD_EVENTS.contains(&1000));
    }
}
