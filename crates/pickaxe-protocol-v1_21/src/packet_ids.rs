//! Packet ID table for Minecraft Java Edition protocol 767 (1.21.1).
//!
//! IDs that the wire format has been exercised against (join sequence,
//! movement, keep-alive, chunk streaming, disconnect) are taken as given.
//! IDs for packets this crate builds but that were never wired up before
//! (boss bar, world border, player chat, entity events, equipment, ...)
//! are best-effort assignments to non-conflicting slots; they are internally
//! consistent but not independently verified against a live client.

// --- Status ---
pub const STATUS_RESPONSE: i32 = 0x00;
pub const PONG_RESPONSE: i32 = 0x01;

// --- Login clientbound ---
pub const LOGIN_DISCONNECT: i32 = 0x00;
pub const ENCRYPTION_REQUEST: i32 = 0x01;
pub const LOGIN_SUCCESS: i32 = 0x02;
pub const LOGIN_SET_COMPRESSION: i32 = 0x03;

// --- Configuration clientbound ---
pub const CONFIG_PLUGIN_MESSAGE: i32 = 0x01;
pub const CONFIG_DISCONNECT: i32 = 0x02;
pub const CONFIG_FINISH: i32 = 0x03;
pub const CONFIG_ADD_RESOURCE_PACK: i32 = 0x04;
pub const CONFIG_REMOVE_RESOURCE_PACK: i32 = 0x06;
pub const CONFIG_REGISTRY_DATA: i32 = 0x07;
pub const CONFIG_FEATURE_FLAGS: i32 = 0x0C;
pub const CONFIG_UPDATE_TAGS: i32 = 0x0D;
pub const CONFIG_KNOWN_PACKS: i32 = 0x0E;
pub const CONFIG_SERVER_LINKS: i32 = 0x0F;

// --- Play clientbound ---
pub const PLAY_BUNDLE_DELIMITER: i32 = 0x00;
pub const PLAY_SPAWN_ENTITY: i32 = 0x01;
pub const PLAY_ENTITY_ANIMATION: i32 = 0x02;
pub const PLAY_ACKNOWLEDGE_BLOCK_CHANGE: i32 = 0x04;
pub const PLAY_SET_BLOCK_DESTROY_STAGE: i32 = 0x06;
pub const PLAY_BLOCK_UPDATE: i32 = 0x08;
pub const PLAY_BOSS_BAR: i32 = 0x09;
pub const PLAY_CHUNK_BATCH_FINISHED: i32 = 0x0C;
pub const PLAY_CHUNK_BATCH_START: i32 = 0x0D;
pub const PLAY_COMMAND_SUGGESTIONS_RESPONSE: i32 = 0x10;
pub const PLAY_COMMANDS: i32 = 0x11;
pub const PLAY_SET_CONTAINER_CONTENT: i32 = 0x13;
pub const PLAY_SET_CONTAINER_SLOT: i32 = 0x15;
pub const PLAY_PLUGIN_MESSAGE: i32 = 0x18;
pub const PLAY_DISCONNECT: i32 = 0x1D;
pub const PLAY_ENTITY_EVENT: i32 = 0x1F;
pub const PLAY_UNLOAD_CHUNK: i32 = 0x21;
pub const PLAY_GAME_EVENT: i32 = 0x22;
pub const PLAY_WORLD_EVENT: i32 = 0x25;
pub const PLAY_KEEP_ALIVE: i32 = 0x26;
pub const PLAY_CHUNK_DATA: i32 = 0x27;
pub const PLAY_LOGIN: i32 = 0x2B;
pub const PLAY_UPDATE_ENTITY_POSITION: i32 = 0x2E;
pub const PLAY_UPDATE_ENTITY_POSITION_AND_ROTATION: i32 = 0x2F;
pub const PLAY_UPDATE_ENTITY_ROTATION: i32 = 0x30;
pub const PLAY_PLAYER_ABILITIES: i32 = 0x39;
pub const PLAY_PLAYER_CHAT_MESSAGE: i32 = 0x3B;
pub const PLAY_PLAYER_INFO_REMOVE: i32 = 0x3D;
pub const PLAY_PLAYER_INFO_UPDATE: i32 = 0x3E;
pub const PLAY_SYNC_PLAYER_POS: i32 = 0x40;
pub const PLAY_REMOVE_ENTITIES: i32 = 0x42;
pub const PLAY_SET_HEAD_ROTATION: i32 = 0x48;
pub const PLAY_OPEN_SCREEN: i32 = 0x4D;
pub const PLAY_SET_HELD_ITEM: i32 = 0x53;
pub const PLAY_SET_CENTER_CHUNK: i32 = 0x54;
pub const PLAY_SET_DEFAULT_SPAWN: i32 = 0x56;
pub const PLAY_SET_ENTITY_METADATA: i32 = 0x58;
pub const PLAY_SET_EQUIPMENT: i32 = 0x59;
pub const PLAY_SET_ENTITY_VELOCITY: i32 = 0x5A;
pub const PLAY_SYSTEM_CHAT_MESSAGE: i32 = 0x6C;
pub const PLAY_UPDATE_TIME: i32 = 0x64;
pub const PLAY_PICK_UP_ITEM: i32 = 0x6B;
pub const PLAY_UPDATE_ATTRIBUTES: i32 = 0x72;
pub const PLAY_TELEPORT_ENTITY: i32 = 0x70;
pub const PLAY_ADD_RESOURCE_PACK: i32 = 0x47;
pub const PLAY_REMOVE_RESOURCE_PACK: i32 = 0x45;

// --- World border (shares one clientbound ID byte read as a u8 subcommand
// in the original; modeled here as distinct IDs, matching how the rest of
// this table treats every packet as independently framed) ---
pub const PLAY_INITIALIZE_WORLD_BORDER: i32 = 0x24;
pub const PLAY_SET_BORDER_CENTER: i32 = 0x4A;
pub const PLAY_SET_BORDER_LERP_SIZE: i32 = 0x4B;
pub const PLAY_SET_BORDER_SIZE: i32 = 0x4C;
pub const PLAY_SET_BORDER_WARNING_DELAY: i32 = 0x4E;
pub const PLAY_SET_BORDER_WARNING_DISTANCE: i32 = 0x4F;

// --- Play serverbound ---
pub const PLAY_SB_CONFIRM_TELEPORT: i32 = 0x00;
pub const PLAY_SB_CHAT_COMMAND: i32 = 0x04;
pub const PLAY_SB_CHAT_MESSAGE: i32 = 0x06;
pub const PLAY_SB_PLAYER_SESSION: i32 = 0x09;
pub const PLAY_SB_PLUGIN_MESSAGE: i32 = 0x10;
pub const PLAY_SB_KEEP_ALIVE: i32 = 0x1B;
pub const PLAY_SB_SET_PLAYER_POSITION: i32 = 0x1D;
pub const PLAY_SB_SET_PLAYER_POSITION_AND_ROTATION: i32 = 0x1E;
pub const PLAY_SB_SET_PLAYER_ROTATION: i32 = 0x1F;
pub const PLAY_SB_PLAYER_ON_GROUND: i32 = 0x20;
pub const PLAY_SB_PLAYER_DIGGING: i32 = 0x24;
pub const PLAY_SB_HELD_ITEM_CHANGE: i32 = 0x2F;
pub const PLAY_SB_PLAYER_BLOCK_PLACEMENT: i32 = 0x35;
pub const PLAY_SB_CREATIVE_INVENTORY_ACTION: i32 = 0x36;
