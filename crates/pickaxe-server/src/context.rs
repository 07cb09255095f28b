//! Shared mutable world state (spec.md §3, §4.6): the `ServerContext` bundles
//! every table `spec.md` calls out as process-wide — `connectedClients`,
//! `globalPlayers`, `entityRegistry`, the read-mostly data registries, the
//! world border/time, and the bossbar table — behind their own locks, and is
//! handed to every connection task by reference rather than reached for as a
//! process-global (spec.md §9 "Global mutable tables").

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Instant;

use bytes::Bytes;
use pickaxe_data::{BiomeData, BlockData, Collisions, ItemData};
use pickaxe_protocol_v1_21::V1_21Adapter;
use pickaxe_types::{ChatSessionKey, ChunkPos, GameMode, ProfileProperty, TextComponent, Vec3d};
use pickaxe_world::{Chunk, WorldBorder, WorldTime};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::ServerConfig;

/// A pre-encoded frame queued on a client's outbound channel. Encoding
/// happens once per recipient set (broadcast) rather than once per
/// recipient, matching spec.md §9's reference-counted-frame design note.
#[derive(Clone)]
pub struct OutboundFrame {
    pub packet_id: i32,
    pub payload: Bytes,
}

/// Connection lifecycle phase (spec.md §3, §4.4). Stored as an atomic so it
/// can be read without the connection lock; every write still happens while
/// holding `ClientHandle::state` so it never races with the fields that
/// change alongside it (pending teleport IDs in particular).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Handshake = 0,
    Status = 1,
    Login = 2,
    Configuration = 3,
    Play = 4,
    AwaitingTeleportConfirm = 5,
    Closed = 6,
}

impl Phase {
    fn from_u8(v: u8) -> Phase {
        match v {
            0 => Phase::Handshake,
            1 => Phase::Status,
            2 => Phase::Login,
            3 => Phase::Configuration,
            4 => Phase::Play,
            5 => Phase::AwaitingTeleportConfirm,
            _ => Phase::Closed,
        }
    }
}

/// Fields of a connection mutated only under `ClientHandle::state`'s lock:
/// pending teleport IDs, the last-issued keep-alive ID and its timestamps,
/// and the compression threshold negotiated at login (spec.md §3).
pub struct ClientMutableState {
    pub pending_teleport_ids: HashSet<i32>,
    pub next_teleport_id: i32,
    pub last_keep_alive_id: i64,
    pub last_keep_alive_sent: Instant,
    pub last_keep_alive_received: Instant,
    pub compression_threshold: Option<i32>,
}

impl Default for ClientMutableState {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            pending_teleport_ids: HashSet::new(),
            next_teleport_id: 1,
            last_keep_alive_id: 0,
            last_keep_alive_sent: now,
            last_keep_alive_received: now,
            compression_threshold: None,
        }
    }
}

/// Per-client connection object (spec.md §3 ClientConnection, §4.3 C3).
/// The socket itself lives on the writer task; this handle is what the rest
/// of the server holds to reach a client — an outbound channel plus the
/// mutex-guarded mutable fields.
pub struct ClientHandle {
    pub uuid: Uuid,
    pub peer: SocketAddr,
    pub entity_id: i32,
    phase: AtomicU8,
    pub tx: mpsc::Sender<OutboundFrame>,
    pub state: Mutex<ClientMutableState>,
}

impl ClientHandle {
    pub fn new(uuid: Uuid, peer: SocketAddr, entity_id: i32, tx: mpsc::Sender<OutboundFrame>) -> Self {
        Self {
            uuid,
            peer,
            entity_id,
            phase: AtomicU8::new(Phase::Handshake as u8),
            tx,
            state: Mutex::new(ClientMutableState::default()),
        }
    }

    /// Lock-free read, per spec.md §4.3.
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Write the phase. Callers holding `self.state`'s lock get atomicity
    /// with the fields that change alongside a phase transition (teleport
    /// IDs in particular); callers without the lock (e.g. marking a socket
    /// Closed from the broadcast fabric) still get a well-defined value.
    pub fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.phase() == Phase::Closed
    }

    /// Queue a frame for this client. Returns `false` (and marks the
    /// connection Closed) if the outbound queue is full — spec.md §5's
    /// backpressure policy: broadcasts must not block on one slow client.
    pub fn try_send(&self, frame: OutboundFrame) -> bool {
        if self.is_closed() {
            return false;
        }
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("outbound queue overflow or closed for {}, disconnecting", self.peer);
                self.set_phase(Phase::Closed);
                false
            }
        }
    }
}

/// Player data (spec.md §3). Held strongly by `ServerContext::global_players`
/// and by the owning `ClientHandle`'s connection task; `connection` is a
/// weak back-reference so the Player/ClientConnection cycle the source has
/// is broken the way spec.md §9 calls for.
pub struct Player {
    pub uuid: Uuid,
    pub uuid_string: String,
    pub entity_id: i32,
    pub display_name: String,
    pub position: Vec3d,
    pub yaw: f32,
    pub pitch: f32,
    pub head_yaw: f32,
    pub chunk_pos: ChunkPos,
    pub on_ground: bool,
    pub game_mode: GameMode,
    pub ping: i32,
    pub listed: bool,
    pub properties: Vec<ProfileProperty>,
    pub chat_session: Option<ChatSessionKey>,
    pub language: String,
    pub connection: Weak<ClientHandle>,
    pub new_spawn: bool,
    pub view_distance: i32,
}

pub type PlayerRef = Arc<Mutex<Player>>;

impl Player {
    pub fn display_name_component(&self) -> TextComponent {
        TextComponent::plain(self.display_name.clone())
    }
}

/// A boss bar (spec.md §3). `players` is the exact set the bar's packets
/// are sent to — boss bar sends target this set directly, never a full
/// broadcast (SPEC_FULL.md §C.4).
pub struct Bossbar {
    pub uuid: Uuid,
    pub title: TextComponent,
    pub health: f32,
    pub color: i32,
    pub division: i32,
    pub flags: u8,
    pub players: HashSet<Uuid>,
}

/// The shared mutable world state (spec.md §4.6 C6). Every connection task
/// receives this by reference (an `Arc<ServerContext>`); there is no
/// process-global table anywhere else in this crate (spec.md §9).
pub struct ServerContext {
    pub config: ServerConfig,
    pub adapter: V1_21Adapter,
    pub connected_clients: RwLock<HashMap<Uuid, Arc<ClientHandle>>>,
    pub global_players: RwLock<HashMap<Uuid, PlayerRef>>,
    pub entity_registry: RwLock<HashMap<i32, Uuid>>,
    next_entity_id: AtomicI32,
    pub blocks: HashMap<String, BlockData>,
    pub items: HashMap<String, ItemData>,
    pub biomes: HashMap<String, BiomeData>,
    pub block_tags: HashMap<String, Vec<i32>>,
    pub item_tags: HashMap<String, Vec<i32>>,
    pub collisions: Collisions,
    pub world_border: Mutex<WorldBorder>,
    pub world_time: Mutex<WorldTime>,
    pub bossbars: Mutex<HashMap<Uuid, Bossbar>>,
    pub chunk_template: Chunk,
    pub spawn_position: pickaxe_types::BlockPos,
}

impl ServerContext {
    pub fn new(config: ServerConfig) -> Self {
        let data_dir = std::path::PathBuf::from(&config.data_dir);
        let blocks = pickaxe_data::load_blocks(data_dir.join("blocks.json"));
        let items = pickaxe_data::load_items(data_dir.join("items.json"));
        let biomes = pickaxe_data::load_biomes(data_dir.join("biomes.json"));
        let block_tags = pickaxe_data::load_block_tags(&blocks, data_dir.join("block_tags.json"));
        let item_tags = pickaxe_data::load_item_tags(&items, data_dir.join("item_tags.json"));
        let collisions = pickaxe_data::load_collisions(data_dir.join("collisions.json"));

        Self {
            adapter: V1_21Adapter::with_data_dir(data_dir),
            connected_clients: RwLock::new(HashMap::new()),
            global_players: RwLock::new(HashMap::new()),
            entity_registry: RwLock::new(HashMap::new()),
            next_entity_id: AtomicI32::new(1),
            blocks,
            items,
            biomes,
            block_tags,
            item_tags,
            collisions,
            world_border: Mutex::new(WorldBorder::default()),
            world_time: Mutex::new(WorldTime::default()),
            bossbars: Mutex::new(HashMap::new()),
            chunk_template: pickaxe_world::generator::generate_flat_chunk(),
            spawn_position: pickaxe_types::BlockPos::new(0, pickaxe_world::generator::SURFACE_Y, 0),
            config,
        }
    }

    pub fn next_entity_id(&self) -> i32 {
        self.next_entity_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Insert a client + player pair atomically from the caller's point of
    /// view: both tables gain the entry together, satisfying spec.md §4.6's
    /// invariant that a player is in `globalPlayers` iff its connection's
    /// phase is ≥ Play.
    pub fn register_player(&self, client: Arc<ClientHandle>, player: PlayerRef) {
        let uuid = client.uuid;
        let entity_id = client.entity_id;
        self.connected_clients.write().unwrap().insert(uuid, client);
        self.entity_registry.write().unwrap().insert(entity_id, uuid);
        self.global_players.write().unwrap().insert(uuid, player);
    }

    /// Remove a client/player pair. Safe to call more than once (e.g. from
    /// both the reader and writer task's cleanup path).
    pub fn remove_player(&self, uuid: Uuid) {
        let client = self.connected_clients.write().unwrap().remove(&uuid);
        if let Some(client) = &client {
            self.entity_registry.write().unwrap().remove(&client.entity_id);
        }
        self.global_players.write().unwrap().remove(&uuid);
        let mut bars = self.bossbars.lock().unwrap();
        for bar in bars.values_mut() {
            bar.players.remove(&uuid);
        }
    }

    pub fn player_count(&self) -> usize {
        self.global_players.read().unwrap().len()
    }

    pub fn get_chunk_packet(&self, chunk_x: i32, chunk_z: i32) -> pickaxe_protocol_core::InternalPacket {
        use pickaxe_protocol_core::InternalPacket;
        match self.chunk_template.to_packet(0, 0) {
            InternalPacket::ChunkDataAndUpdateLight {
                heightmaps,
                data,
                block_entities,
                light_data,
                ..
            } => InternalPacket::ChunkDataAndUpdateLight {
                chunk_x,
                chunk_z,
                heightmaps,
                data,
                block_entities,
                light_data,
            },
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_ctx() -> ServerContext {
        ServerContext::new(ServerConfig::default())
    }

    #[test]
    fn test_register_and_remove_player_keeps_tables_in_sync() {
        let ctx = dummy_ctx();
        let uuid = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(8);
        let client = Arc::new(ClientHandle::new(uuid, "127.0.0.1:1".parse().unwrap(), 1, tx));
        let player = Arc::new(Mutex::new(Player {
            uuid,
            uuid_string: uuid.to_string(),
            entity_id: 1,
            display_name: "Notch".into(),
            position: Vec3d::new(0.0, 0.0, 0.0),
            yaw: 0.0,
            pitch: 0.0,
            head_yaw: 0.0,
            chunk_pos: ChunkPos::new(0, 0),
            on_ground: true,
            game_mode: GameMode::Survival,
            ping: 0,
            listed: true,
            properties: Vec::new(),
            chat_session: None,
            language: "en_us".into(),
            connection: Arc::downgrade(&client),
            new_spawn: true,
            view_distance: 8,
        }));

        ctx.register_player(client, player);
        assert_eq!(ctx.player_count(), 1);
        assert!(ctx.connected_clients.read().unwrap().contains_key(&uuid));
        assert!(ctx.entity_registry.read().unwrap().contains_key(&1));

        ctx.remove_player(uuid);
        assert_eq!(ctx.player_count(), 0);
        assert!(!ctx.connected_clients.read().unwrap().contains_key(&uuid));
        assert!(!ctx.entity_registry.read().unwrap().contains_key(&1));
    }

    #[test]
    fn test_phase_readable_without_lock() {
        let (tx, _rx) = mpsc::channel(8);
        let client = ClientHandle::new(Uuid::new_v4(), "127.0.0.1:1".parse().unwrap(), 1, tx);
        assert_eq!(client.phase(), Phase::Handshake);
        client.set_phase(Phase::Play);
        assert_eq!(client.phase(), Phase::Play);
    }

    #[test]
    fn test_try_send_closes_connection_on_overflow() {
        let (tx, _rx) = mpsc::channel(1);
        let client = ClientHandle::new(Uuid::new_v4(), "127.0.0.1:1".parse().unwrap(), 1, tx);
        let frame = OutboundFrame { packet_id: 0, payload: Bytes::new() };
        assert!(client.try_send(frame.clone()));
        // Second send overflows the depth-1 channel (first frame unread).
        assert!(!client.try_send(frame));
        assert!(client.is_closed());
    }
}
