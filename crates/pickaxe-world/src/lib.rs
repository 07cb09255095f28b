pub mod chunk;
pub mod generator;
pub mod world_border;

pub use chunk::{Chunk, ChunkSection, MIN_Y, SECTION_COUNT};
pub use world_border::{WorldBorder, WorldTime};
