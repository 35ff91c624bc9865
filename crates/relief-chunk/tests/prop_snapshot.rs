use proptest::prelude::*;
use relief_blocks::Block;
use relief_chunk::{CHUNK_SIZE, SnapshotBuilder, WORLD_HEIGHT};
use relief_world::{ChunkCoord, DimensionId};

const SECTION_VOLUME: usize = 16 * 16 * 16;

proptest! {
    // A block written into any section reads back at the same coordinates,
    // and light nibbles mask to 0..=15.
    #[test]
    fn section_reads_match_writes(
        x in 0usize..CHUNK_SIZE,
        z in 0usize..CHUNK_SIZE,
        y in 0i32..WORLD_HEIGHT,
        id in 1u16..1000,
        raw_light in 0u8..=255,
    ) {
        let section = (y as usize) / 16;
        let mut blocks = vec![Block::AIR; SECTION_VOLUME];
        let mut light = vec![0u8; SECTION_VOLUME];
        let idx = (((y as usize) % 16) * CHUNK_SIZE + z) * CHUNK_SIZE + x;
        blocks[idx] = Block { id, state: 0 };
        light[idx] = raw_light;
        let snap = SnapshotBuilder::new(ChunkCoord::new(0, 0), DimensionId::OVERWORLD, 0)
            .section(section, blocks, light)
            .build();
        prop_assert_eq!(snap.block(x, y, z), Block { id, state: 0 });
        prop_assert_eq!(snap.light(x, y, z), raw_light & 0x0f);
    }

    // Short height/biome vectors are padded, never a panic.
    #[test]
    fn truncated_inputs_are_padded(len in 0usize..256) {
        let snap = SnapshotBuilder::new(ChunkCoord::new(1, -1), DimensionId::OVERWORLD, 0)
            .heights(vec![7; len])
            .biomes(vec![3; len])
            .build();
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let i = z * CHUNK_SIZE + x;
                prop_assert_eq!(snap.height(x, z), if i < len { 7 } else { 0 });
                prop_assert_eq!(snap.biome(x, z), if i < len { 3 } else { 0 });
            }
        }
    }
}
