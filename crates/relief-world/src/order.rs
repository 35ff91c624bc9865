use crate::{ChunkCoord, RegionCoord};

/// Sort chunk coordinates by ascending Euclidean distance from `reference`,
/// breaking ties on x then z so scheduling order is reproducible.
pub fn sort_chunks_by_distance(coords: &mut [ChunkCoord], reference: ChunkCoord) {
    coords.sort_by(|a, b| {
        reference
            .distance_sq(*a)
            .cmp(&reference.distance_sq(*b))
            .then(a.cx.cmp(&b.cx))
            .then(a.cz.cmp(&b.cz))
    });
}

/// Same ordering for regions, measured center-to-center.
pub fn sort_regions_by_distance(regions: &mut [RegionCoord], reference: ChunkCoord) {
    regions.sort_by(|a, b| {
        reference
            .distance_sq(a.center_chunk())
            .cmp(&reference.distance_sq(b.center_chunk()))
            .then(a.rx.cmp(&b.rx))
            .then(a.rz.cmp(&b.rz))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_sort_is_ascending_with_deterministic_ties() {
        let reference = ChunkCoord::new(0, 0);
        let mut coords = vec![
            ChunkCoord::new(1, 0),
            ChunkCoord::new(0, -1),
            ChunkCoord::new(0, 0),
            ChunkCoord::new(-1, 0),
            ChunkCoord::new(0, 1),
        ];
        sort_chunks_by_distance(&mut coords, reference);
        assert_eq!(coords[0], ChunkCoord::new(0, 0));
        // The four distance-1 neighbors tie; x breaks first, then z.
        assert_eq!(
            &coords[1..],
            &[
                ChunkCoord::new(-1, 0),
                ChunkCoord::new(0, -1),
                ChunkCoord::new(0, 1),
                ChunkCoord::new(1, 0),
            ]
        );
    }

    #[test]
    fn chunk_sort_is_euclidean_not_manhattan() {
        // (3,4) has Manhattan distance 7 but Euclidean 5; (6,0) has both 6.
        let reference = ChunkCoord::new(0, 0);
        let mut coords = vec![ChunkCoord::new(6, 0), ChunkCoord::new(3, 4)];
        sort_chunks_by_distance(&mut coords, reference);
        assert_eq!(coords[0], ChunkCoord::new(3, 4));
    }

    #[test]
    fn region_sort_measures_from_centers() {
        let reference = ChunkCoord::new(0, 0);
        let mut regions = vec![RegionCoord::new(2, 0), RegionCoord::new(0, 0), RegionCoord::new(-1, 0)];
        sort_regions_by_distance(&mut regions, reference);
        // Centers of (-1,0) and (0,0) are equidistant from the origin chunk;
        // the x tie-break puts (-1,0) first.
        assert_eq!(regions[0], RegionCoord::new(-1, 0));
        assert_eq!(regions[1], RegionCoord::new(0, 0));
        assert_eq!(regions[2], RegionCoord::new(2, 0));
    }
}
