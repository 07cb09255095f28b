use crate::chunk::{Chunk, ChunkSection};

/// Block state IDs used by the flat placeholder world. Terrain generation
/// proper is an external collaborator; this module only gives the chunk
/// streaming path something structurally valid to send.
pub const AIR: i32 = 0;
pub const STONE: i32 = 1;
pub const GRASS_BLOCK: i32 = 9;
pub const DIRT: i32 = 10;
pub const BEDROCK: i32 = 79;

/// Surface Y level (grass_block). Players spawn one block above this.
pub const SURFACE_Y: i32 = -51;

/// A single flat chunk: bedrock, stone fill, dirt, grass. No ores, no
/// biome variation, no per-coordinate seeding — a stand-in for a real
/// generator plugged in at the `ChunkSource` boundary.
pub fn generate_flat_chunk() -> Chunk {
    let mut chunk = Chunk::new();
    let mut blocks = [AIR; 4096];
    for x in 0..16 {
        for z in 0..16 {
            let idx = |y: usize| y * 256 + z * 16 + x;
            blocks[idx(0)] = BEDROCK; // y = -64
            for ly in 1..=10 {
                blocks[idx(ly)] = STONE; // y = -63..-54
            }
            blocks[idx(11)] = DIRT; // y = -53
            blocks[idx(12)] = DIRT; // y = -52
            blocks[idx(13)] = GRASS_BLOCK; // y = -51
        }
    }
    chunk.sections[0] = ChunkSection::from_blocks(&blocks);
    chunk
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_chunk_generation() {
        let chunk = generate_flat_chunk();
        assert_eq!(chunk.sections.len(), 24);
        assert!(chunk.sections[0].block_count > 0);
        assert_eq!(chunk.sections[1].block_count, 0);
    }

    #[test]
    fn test_flat_chunk_serializes() {
        let chunk = generate_flat_chunk();
        let data = chunk.serialize_sections();
        assert!(!data.is_empty());
    }

    #[test]
    fn test_flat_chunk_heightmap() {
        let chunk = generate_flat_chunk();
        let heightmap = chunk.compute_heightmap();
        let first_value = heightmap[0] & 0x1FF;
        assert_eq!(first_value, 14, "expected heightmap value 14 for grass at y=-51");
    }
}
