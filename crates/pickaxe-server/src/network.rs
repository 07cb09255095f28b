//! Per-connection lifecycle (spec.md §4.3 C3, §4.4 C4): Handshake through
//! Login/Configuration on the unsplit `Connection`, then a split
//! reader/writer pair for Play. Compression and encryption are negotiated
//! here, before the split, because `Connection::into_split` fixes both for
//! the lifetime of the halves it returns.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use pickaxe_protocol_core::{
    Connection, ConnectionState, InternalPacket, KnownPack, ProtocolAdapter,
};
use pickaxe_protocol_v1_21::V1_21Adapter;
use pickaxe_types::{ChunkPos, GameMode, GameProfile, TextComponent, Vec3d};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::broadcast::send_packet;
use crate::context::{ClientHandle, Phase, Player, ServerContext};
use crate::events;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(10);
const KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(30);
const OUTBOUND_QUEUE_DEPTH: usize = 256;

/// Entry point spawned by the accept loop for each incoming socket.
pub async fn handle_connection(ctx: Arc<ServerContext>, stream: TcpStream) {
    let peer = stream.peer_addr().unwrap_or_else(|_| "0.0.0.0:0".parse().unwrap());
    let mut conn = Connection::new(stream);

    if let Err(e) = handle_connection_inner(&mut conn, &ctx, peer).await {
        debug!("connection {} ended: {}", peer, e);
    }
}

async fn handle_connection_inner(conn: &mut Connection, ctx: &ServerContext, peer: SocketAddr) -> Result<()> {
    let adapter = &ctx.adapter;

    let (id, mut data) = conn.read_packet().await?;
    let packet = adapter.decode_packet(ConnectionState::Handshaking, id, &mut data)?;

    let next_state = match packet {
        InternalPacket::Handshake { protocol_version, next_state, .. } => {
            if protocol_version != adapter.protocol_version() {
                warn!(
                    "{} requested protocol {}, this server speaks {}",
                    peer,
                    protocol_version,
                    adapter.protocol_version()
                );
            }
            next_state
        }
        _ => return Err(anyhow!("expected Handshake packet")),
    };

    match ConnectionState::from_handshake_next(next_state) {
        Some(ConnectionState::Status) => handle_status(conn, adapter, ctx).await,
        Some(ConnectionState::Login) => {
            let profile = handle_login(conn, adapter, ctx, peer).await?;
            let view_distance = handle_configuration(conn, adapter, ctx).await?;
            run_play(conn, ctx, profile, view_distance, peer).await
        }
        _ => Err(anyhow!("invalid handshake next_state: {}", next_state)),
    }
}

async fn handle_status(conn: &mut Connection, adapter: &V1_21Adapter, ctx: &ServerContext) -> Result<()> {
    loop {
        let (id, mut data) = conn.read_packet().await?;
        let packet = adapter.decode_packet(ConnectionState::Status, id, &mut data)?;
        match packet {
            InternalPacket::StatusRequest => {
                let json = format!(
                    r#"{{"version":{{"name":"1.21.1","protocol":{}}},"players":{{"max":{},"online":{}}},"description":{{"text":"{}"}}}}"#,
                    adapter.protocol_version(),
                    ctx.config.max_players,
                    ctx.player_count(),
                    ctx.config.motd,
                );
                write_packet(conn, adapter, ConnectionState::Status, &InternalPacket::StatusResponse { json }).await?;
            }
            InternalPacket::PingRequest { payload } => {
                write_packet(conn, adapter, ConnectionState::Status, &InternalPacket::PongResponse { payload }).await?;
                return Ok(());
            }
            _ => {}
        }
    }
}

async fn handle_login(
    conn: &mut Connection,
    adapter: &V1_21Adapter,
    ctx: &ServerContext,
    peer: SocketAddr,
) -> Result<GameProfile> {
    let (id, mut data) = conn.read_packet().await?;
    let packet = adapter.decode_packet(ConnectionState::Login, id, &mut data)?;
    let (name, client_uuid) = match packet {
        InternalPacket::LoginStart { name, uuid } => {
            info!("login start from {} ({}) at {}", name, uuid, peer);
            (name, uuid)
        }
        _ => return Err(anyhow!("expected Login Start")),
    };

    let uuid = if ctx.config.online_mode {
        negotiate_encryption(conn, adapter, &client_uuid).await?;
        client_uuid
    } else {
        offline_uuid(&name)
    };

    let threshold = 256;
    write_packet(conn, adapter, ConnectionState::Login, &InternalPacket::SetCompression { threshold }).await?;
    conn.enable_compression(threshold);

    let profile = GameProfile { uuid, name, properties: Vec::new() };
    write_packet(
        conn,
        adapter,
        ConnectionState::Login,
        &InternalPacket::LoginSuccess { profile: profile.clone() },
    )
    .await?;

    let (id, mut data) = conn.read_packet().await?;
    match adapter.decode_packet(ConnectionState::Login, id, &mut data)? {
        InternalPacket::LoginAcknowledged => {}
        _ => return Err(anyhow!("expected Login Acknowledged")),
    }

    Ok(profile)
}

/// Dormant encryption handshake (SPEC_FULL.md §C.7): session-server
/// verification against Mojang is out of scope, so this only proves the
/// client holds the private key matching the shared secret it sends back,
/// then enables the wire cipher. `_client_uuid` is unused until that
/// verification is implemented.
async fn negotiate_encryption(conn: &mut Connection, adapter: &V1_21Adapter, _client_uuid: &Uuid) -> Result<()> {
    use rand::rngs::OsRng;
    use rsa::pkcs8::EncodePublicKey;
    use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

    let private_key = RsaPrivateKey::new(&mut OsRng, 1024)?;
    let public_key = RsaPublicKey::from(&private_key);
    let public_key_der = public_key.to_public_key_der()?.as_bytes().to_vec();

    let verify_token: [u8; 4] = rand::random();

    write_packet(
        conn,
        adapter,
        ConnectionState::Login,
        &InternalPacket::EncryptionRequest {
            server_id: String::new(),
            public_key: public_key_der,
            verify_token: verify_token.to_vec(),
        },
    )
    .await?;

    let (id, mut data) = conn.read_packet().await?;
    let (shared_secret_enc, verify_token_enc) = match adapter.decode_packet(ConnectionState::Login, id, &mut data)? {
        InternalPacket::EncryptionResponse { shared_secret, verify_token } => (shared_secret, verify_token),
        _ => return Err(anyhow!("expected Encryption Response")),
    };

    let decrypted_token = private_key.decrypt(Pkcs1v15Encrypt, &verify_token_enc)?;
    if decrypted_token != verify_token {
        bail!("verify token mismatch during encryption handshake");
    }

    let shared_secret = private_key.decrypt(Pkcs1v15Encrypt, &shared_secret_enc)?;
    conn.enable_encryption(&shared_secret);
    Ok(())
}

/// Configuration phase (spec.md §4.5 C5): negotiate known packs, push the six
/// registries plus tags, then drain client config packets until it
/// acknowledges Finish Configuration. Returns the view distance the client
/// reported via Client Information (falling back to the configured default).
async fn handle_configuration(conn: &mut Connection, adapter: &V1_21Adapter, ctx: &ServerContext) -> Result<i32> {
    write_packet(
        conn,
        adapter,
        ConnectionState::Configuration,
        &InternalPacket::KnownPacksRequest {
            packs: vec![KnownPack { namespace: "minecraft".into(), id: "core".into(), version: "1.21".into() }],
        },
    )
    .await?;

    write_packet(
        conn,
        adapter,
        ConnectionState::Configuration,
        &InternalPacket::FeatureFlags { flags: vec!["minecraft:vanilla".into()] },
    )
    .await?;

    if !ctx.config.server_links.is_empty() {
        let links = ctx.config.server_links.iter().map(|l| (l.label.clone(), l.url.clone())).collect();
        write_packet(conn, adapter, ConnectionState::Configuration, &InternalPacket::ServerLinks { links }).await?;
    }

    for pack in &ctx.config.resource_packs {
        write_packet(
            conn,
            adapter,
            ConnectionState::Configuration,
            &InternalPacket::AddResourcePack {
                uuid: pack.uuid,
                url: pack.url.clone(),
                hash: pack.hash.clone(),
                forced: pack.forced,
                prompt_message: pack.prompt_message.as_ref().map(|m| TextComponent::plain(m.clone())),
            },
        )
        .await?;
    }

    for registry_packet in adapter.registry_data() {
        write_packet(conn, adapter, ConnectionState::Configuration, &registry_packet).await?;
    }
    write_packet(conn, adapter, ConnectionState::Configuration, &InternalPacket::UpdateTags { tags: build_tags(ctx) }).await?;

    write_packet(conn, adapter, ConnectionState::Configuration, &InternalPacket::FinishConfiguration).await?;

    let mut view_distance = ctx.config.view_distance as i32;
    loop {
        let (id, mut data) = conn.read_packet().await?;
        match adapter.decode_packet(ConnectionState::Configuration, id, &mut data)? {
            InternalPacket::FinishConfigurationAck => return Ok(view_distance),
            InternalPacket::ClientInformation { view_distance: vd, .. } => {
                view_distance = (vd as i32).clamp(2, ctx.config.view_distance as i32);
            }
            InternalPacket::PluginMessage { channel, .. } => {
                debug!("plugin message on channel {} during configuration", channel);
            }
            _ => {}
        }
    }
}

/// Two tag groups (spec.md §4.5 item 3, `sendUpdateTagsPacket`): the biome
/// registry's `Tag` entries resolved to biome registry indices, then
/// `minecraft:block` from `ServerContext::block_tags`. Must run after the
/// registry packets have been sent so the adapter's registry manager holds
/// every biome identifier's index.
fn build_tags(ctx: &ServerContext) -> Vec<(String, Vec<(String, Vec<i32>)>)> {
    let block_tags: Vec<(String, Vec<i32>)> =
        ctx.block_tags.iter().map(|(name, ids)| (name.clone(), ids.clone())).collect();
    vec![
        ("minecraft:worldgen/biome".to_string(), ctx.adapter.biome_tag_group()),
        ("minecraft:block".to_string(), block_tags),
    ]
}

async fn run_play(
    conn: &mut Connection,
    ctx: &ServerContext,
    profile: GameProfile,
    view_distance: i32,
    peer: SocketAddr,
) -> Result<()> {
    let entity_id = ctx.next_entity_id();
    let spawn = ctx.spawn_position;
    let spawn_pos = Vec3d::new(spawn.x as f64 + 0.5, spawn.y as f64, spawn.z as f64 + 0.5);
    let center_cx = spawn.x >> 4;
    let center_cz = spawn.z >> 4;

    write_packet(
        conn,
        &ctx.adapter,
        ConnectionState::Play,
        &InternalPacket::JoinGame {
            entity_id,
            is_hardcore: false,
            dimension_names: vec!["minecraft:overworld".into()],
            max_players: ctx.config.max_players as i32,
            view_distance,
            simulation_distance: view_distance,
            reduced_debug_info: false,
            enable_respawn_screen: true,
            do_limited_crafting: false,
            dimension_type: 0,
            dimension_name: "minecraft:overworld".into(),
            hashed_seed: 0,
            game_mode: GameMode::Survival,
            previous_game_mode: -1,
            is_debug: false,
            is_flat: true,
            portal_cooldown: 0,
            enforces_secure_chat: ctx.config.enable_secure_chat,
        },
    )
    .await?;

    write_packet(
        conn,
        &ctx.adapter,
        ConnectionState::Play,
        &InternalPacket::SetCenterChunk { chunk_x: center_cx, chunk_z: center_cz },
    )
    .await?;
    send_chunks_around(conn, ctx, center_cx, center_cz, view_distance).await?;

    write_packet(conn, &ctx.adapter, ConnectionState::Play, &InternalPacket::GameEvent { event: 13, value: 0.0 }).await?;
    write_packet(
        conn,
        &ctx.adapter,
        ConnectionState::Play,
        &InternalPacket::SetDefaultSpawnPosition { position: spawn, angle: 0.0 },
    )
    .await?;

    let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
    let client = Arc::new(ClientHandle::new(profile.uuid, peer, entity_id, tx));

    let player = Arc::new(Mutex::new(Player {
        uuid: profile.uuid,
        uuid_string: profile.uuid.to_string(),
        entity_id,
        display_name: profile.name.clone(),
        position: spawn_pos,
        yaw: 0.0,
        pitch: 0.0,
        head_yaw: 0.0,
        chunk_pos: ChunkPos::new(center_cx, center_cz),
        on_ground: true,
        game_mode: GameMode::Survival,
        ping: 0,
        listed: true,
        properties: profile.properties.clone(),
        chat_session: None,
        language: "en_us".into(),
        connection: Arc::downgrade(&client),
        new_spawn: true,
        view_distance,
    }));

    // Existing roster + entities to the new client, then the new client's own
    // entity/info to everyone already connected (spec.md §8 scenario 2).
    events::send_player_info_roster(ctx, &client)?;
    {
        let existing = ctx.global_players.read().unwrap();
        for other in existing.values() {
            let other = other.lock().unwrap();
            events::spawn_player_entity(ctx, &client, &other)?;
        }
    }
    // Phase must reach {Play, AwaitingTeleportConfirm} before the player is
    // registered, not after (spec.md §8: P ∈ globalPlayers ⇔ phase ∈
    // {Play, AwaitingTeleportConfirm}); `synchronize_player_position` below
    // advances it again to AwaitingTeleportConfirm, still inside that set.
    client.set_phase(Phase::Play);
    ctx.register_player(client.clone(), player.clone());
    events::broadcast_player_info_add(ctx, &player.lock().unwrap())?;
    {
        let guard = player.lock().unwrap();
        for entry in ctx.connected_clients.read().unwrap().values() {
            if entry.uuid != client.uuid {
                events::spawn_player_entity(ctx, entry, &guard)?;
            }
        }
    }
    events::send_initialize_world_border(ctx, &client)?;

    // Initial teleport (SPEC_FULL.md §D(a)): yaw/pitch hard-coded 0.0/0.0, the
    // connection moves to AwaitingTeleportConfirm until the client echoes
    // this ID back via Confirm Teleportation.
    events::synchronize_player_position(ctx, &client, &mut player.lock().unwrap(), spawn_pos, 0.0, 0.0, 0)?;

    let (reader, mut writer) = std::mem::replace(conn, Connection::new_dummy()).into_split();

    let writer_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if writer.write_packet(frame.packet_id, &frame.payload).await.is_err() {
                break;
            }
        }
    });

    let result = play_loop(reader, ctx, &client, &player).await;

    writer_task.abort();
    ctx.remove_player(client.uuid);
    events::player_info_remove(ctx, client.uuid).ok();
    events::remove_entities(ctx, vec![entity_id]).ok();
    client.set_phase(Phase::Closed);
    info!("{} ({}) disconnected", profile.name, peer);
    result
}

async fn play_loop(
    mut reader: pickaxe_protocol_core::ConnectionReader,
    ctx: &ServerContext,
    client: &Arc<ClientHandle>,
    player: &Arc<Mutex<Player>>,
) -> Result<()> {
    let mut keep_alive_ticker = tokio::time::interval(KEEP_ALIVE_INTERVAL);
    keep_alive_ticker.tick().await; // first tick fires immediately; consume it

    loop {
        tokio::select! {
            packet = reader.read_packet() => {
                let (id, mut data) = packet?;
                let internal = ctx.adapter.decode_packet(ConnectionState::Play, id, &mut data)?;
                handle_play_packet(ctx, client, player, internal)?;
            }
            _ = keep_alive_ticker.tick() => {
                let since_response = {
                    let state = client.state.lock().unwrap();
                    state.last_keep_alive_sent.duration_since(state.last_keep_alive_received)
                };
                if since_response > KEEP_ALIVE_TIMEOUT {
                    events::disconnect(ctx, client, ConnectionState::Play, "Timed out")?;
                    return Err(anyhow!("keep-alive timeout for {}", client.peer));
                }
                events::keep_alive(ctx, client)?;
            }
        }
        if client.is_closed() {
            return Ok(());
        }
    }
}

fn handle_play_packet(
    ctx: &ServerContext,
    client: &Arc<ClientHandle>,
    player: &Arc<Mutex<Player>>,
    packet: InternalPacket,
) -> Result<()> {
    match packet {
        InternalPacket::ConfirmTeleportation { teleport_id } => {
            if let events::TeleportConfirmResult::Unknown = events::confirm_teleport(client, teleport_id) {
                events::disconnect(ctx, client, ConnectionState::Play, "Unexpected teleport confirmation")?;
            }
        }
        InternalPacket::PlayerPosition { x, y, z, on_ground } => {
            move_player(ctx, client, player, Vec3d::new(x, y, z), None, on_ground)?;
        }
        InternalPacket::PlayerPositionAndRotation { x, y, z, yaw, pitch, on_ground } => {
            move_player(ctx, client, player, Vec3d::new(x, y, z), Some((yaw, pitch)), on_ground)?;
        }
        InternalPacket::PlayerRotation { yaw, pitch, on_ground } => {
            let entity_id = {
                let mut p = player.lock().unwrap();
                p.yaw = yaw;
                p.pitch = pitch;
                p.on_ground = on_ground;
                p.entity_id
            };
            events::update_entity_rotation(ctx, client.uuid, entity_id, yaw, pitch, on_ground)?;
        }
        InternalPacket::PlayerOnGround { on_ground } => {
            player.lock().unwrap().on_ground = on_ground;
        }
        InternalPacket::KeepAliveServerbound { id } => {
            if !events::acknowledge_keep_alive(client, id) {
                warn!("unsolicited keep-alive id from {}", client.peer);
            }
        }
        InternalPacket::ChatMessage { message, timestamp, salt, signature, .. } => {
            let (uuid, name) = {
                let p = player.lock().unwrap();
                (p.uuid, p.display_name_component())
            };
            events::broadcast_player_chat_message(ctx, uuid, name, message, timestamp, salt, signature)?;
        }
        InternalPacket::ChatCommand { command } => {
            debug!("{} ran command /{}", client.peer, command);
        }
        InternalPacket::BlockDig { status, position, sequence, .. } => {
            if status == 0 {
                events::acknowledge_block_change(ctx, client, sequence)?;
                let _ = position;
            }
        }
        InternalPacket::BlockPlace { sequence, .. } => {
            events::acknowledge_block_change(ctx, client, sequence)?;
        }
        InternalPacket::PluginMessage { .. } | InternalPacket::Unknown { .. } => {}
        _ => {}
    }
    Ok(())
}

fn move_player(
    ctx: &ServerContext,
    client: &Arc<ClientHandle>,
    player: &Arc<Mutex<Player>>,
    new_pos: Vec3d,
    rotation: Option<(f32, f32)>,
    on_ground: bool,
) -> Result<()> {
    let (entity_id, old_pos, yaw, pitch) = {
        let mut p = player.lock().unwrap();
        let old_pos = p.position;
        p.position = new_pos;
        p.on_ground = on_ground;
        if let Some((yaw, pitch)) = rotation {
            p.yaw = yaw;
            p.pitch = pitch;
        }
        (p.entity_id, old_pos, p.yaw, p.pitch)
    };
    match rotation {
        Some((yaw, pitch)) => {
            events::update_entity_position_and_rotation(ctx, client.uuid, entity_id, new_pos, old_pos, yaw, pitch, on_ground)
        }
        None => events::update_entity_position(ctx, client.uuid, entity_id, new_pos, old_pos, on_ground),
    }
}

async fn send_chunks_around(
    conn: &mut Connection,
    ctx: &ServerContext,
    center_cx: i32,
    center_cz: i32,
    view_distance: i32,
) -> Result<()> {
    write_packet(conn, &ctx.adapter, ConnectionState::Play, &InternalPacket::ChunkBatchStart).await?;
    let mut batch_size = 0i32;
    for cx in (center_cx - view_distance)..=(center_cx + view_distance) {
        for cz in (center_cz - view_distance)..=(center_cz + view_distance) {
            let chunk_packet = ctx.get_chunk_packet(cx, cz);
            write_packet(conn, &ctx.adapter, ConnectionState::Play, &chunk_packet).await?;
            batch_size += 1;
        }
    }
    write_packet(
        conn,
        &ctx.adapter,
        ConnectionState::Play,
        &InternalPacket::ChunkBatchFinished { batch_size },
    )
    .await?;
    Ok(())
}

/// Write one packet directly to the still-unsplit `Connection` (spec.md
/// §4.3, before a `ClientHandle`/outbound channel exists). Only used during
/// Handshake/Status/Login/Configuration; Play-phase sends go through
/// `broadcast.rs` once the connection is split and registered.
async fn write_packet(conn: &mut Connection, adapter: &V1_21Adapter, state: ConnectionState, packet: &InternalPacket) -> Result<()> {
    let mut encoded = adapter.encode_packet(state, packet)?;
    let packet_id = pickaxe_protocol_core::read_varint(&mut encoded)?;
    conn.write_packet(packet_id, &encoded).await
}

/// Offline-mode UUID (SPEC_FULL.md §C.7): used whenever `online_mode` is
/// false, this server's default and only fully-supported login path.
fn offline_uuid(name: &str) -> Uuid {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let input = format!("OfflinePlayer:{}", name);
    let mut hasher = DefaultHasher::new();
    input.hash(&mut hasher);
    let h1 = hasher.finish();
    input.len().hash(&mut hasher);
    let h2 = hasher.finish();
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&h1.to_be_bytes());
    bytes[8..].copy_from_slice(&h2.to_be_bytes());
    bytes[6] = (bytes[6] & 0x0f) | 0x30;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    Uuid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_uuid_is_deterministic_per_name() {
        assert_eq!(offline_uuid("Notch"), offline_uuid("Notch"));
        assert_ne!(offline_uuid("Notch"), offline_uuid("jeb_"));
    }

    #[test]
    fn test_build_tags_has_biome_and_block_groups() {
        let ctx = ServerContext::new(crate::config::ServerConfig::default());
        // Registry indices are only populated once `registry_data()` has run.
        ctx.adapter.registry_data();
        let tags = build_tags(&ctx);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].0, "minecraft:worldgen/biome");
        assert_eq!(tags[1].0, "minecraft:block");
    }
}
