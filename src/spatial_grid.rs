/*
 * Spatial Grid Module
 *
 * This module defines the SpatialGrid struct for efficient neighbor lookups.
 * Space is divided into an unbounded uniform grid of cubical cells keyed by
 * their integer coordinate, so boids can be bucketed without knowing the
 * volume size up front.
 *
 * The flock update looks at the 3x3x3 block of cells around a boid. With the
 * cell edge equal to the largest interaction radius, every neighbor within
 * that radius lies inside the block; candidates further away are rejected by
 * the caller's distance check.
 *
 * Optimized for performance by:
 * - Rebuilding from scratch every tick instead of tracking moves
 * - Reusing the index buffers of cells that were occupied last tick
 * - Visiting candidates through a callback instead of collecting them
 */

use std::collections::HashMap;

use glam::{DVec3, IVec3};

pub type CellCoord = IVec3;

/// Offsets of the 27 cells making up a neighborhood block.
pub const NEIGHBOR_OFFSETS: [IVec3; 27] = neighbor_offsets();

const fn neighbor_offsets() -> [IVec3; 27] {
    let mut offsets = [IVec3::ZERO; 27];
    let mut i = 0;
    while i < 27 {
        offsets[i] = IVec3::new((i / 9) as i32 - 1, ((i / 3) % 3) as i32 - 1, (i % 3) as i32 - 1);
        i += 1;
    }
    offsets
}

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f64,
    cells: HashMap<CellCoord, Vec<usize>>,
    len: usize,
}

impl SpatialGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    // Number of indexed agents
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // Convert a world position to the coordinate of the cell containing it
    #[inline]
    pub fn cell_of(&self, position: DVec3) -> CellCoord {
        (position / self.cell_size).floor().as_ivec3()
    }

    /// Clear the grid and insert every position under its array index.
    pub fn rebuild<I>(&mut self, positions: I, cell_size: f64)
    where
        I: IntoIterator<Item = DVec3>,
    {
        if cell_size != self.cell_size {
            // Cell coordinates are meaningless under a different cell size
            self.cells.clear();
            self.cell_size = cell_size;
        } else {
            // Drop cells left empty by the previous rebuild, keep the rest allocated
            self.cells.retain(|_, indices| !indices.is_empty());
            for indices in self.cells.values_mut() {
                indices.clear();
            }
        }

        self.len = 0;
        for (index, position) in positions.into_iter().enumerate() {
            let cell = self.cell_of(position);
            self.cells.entry(cell).or_default().push(index);
            self.len += 1;
        }
    }

    /// Indices stored in exactly this cell; absent cells are empty.
    #[inline]
    pub fn query(&self, cell: CellCoord) -> &[usize] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Visit every index in the 27-cell block around `position`.
    ///
    /// The visitor also sees the index of the agent at `position` itself, if
    /// it is indexed; callers skip it. Cell coordinates wrap at the edge of
    /// the i32 range instead of overflowing.
    pub fn for_each_candidate<F>(&self, position: DVec3, mut visit: F)
    where
        F: FnMut(usize),
    {
        let center = self.cell_of(position);
        for offset in NEIGHBOR_OFFSETS {
            for &index in self.query(center.wrapping_add(offset)) {
                visit(index);
            }
        }
    }

    // Number of cells holding at least one agent
    pub fn occupied_cells(&self) -> usize {
        self.cells.values().filter(|indices| !indices.is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_positions(count: usize, half_extent: f64, seed: u64) -> Vec<DVec3> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                DVec3::new(
                    rng.gen_range(-half_extent..half_extent),
                    rng.gen_range(-half_extent..half_extent),
                    rng.gen_range(-half_extent..half_extent),
                )
            })
            .collect()
    }

    #[test]
    fn offsets_cover_the_block_once() {
        let mut seen = NEIGHBOR_OFFSETS.to_vec();
        seen.sort_by_key(|o| (o.x, o.y, o.z));
        seen.dedup();
        assert_eq!(seen.len(), 27);
        assert!(NEIGHBOR_OFFSETS.iter().all(|o| o.abs().max_element() <= 1));
    }

    #[test]
    fn every_index_lands_in_its_floor_cell() {
        let positions = random_positions(400, 120.0, 11);
        let mut grid = SpatialGrid::new(10.0);
        grid.rebuild(positions.iter().copied(), 10.0);

        assert_eq!(grid.len(), positions.len());
        for (index, position) in positions.iter().enumerate() {
            let expected = IVec3::new(
                (position.x / 10.0).floor() as i32,
                (position.y / 10.0).floor() as i32,
                (position.z / 10.0).floor() as i32,
            );
            assert_eq!(grid.cell_of(*position), expected);
            assert_eq!(grid.query(expected).iter().filter(|&&i| i == index).count(), 1);
        }

        let total: usize = grid.cells.values().map(Vec::len).sum();
        assert_eq!(total, positions.len());
    }

    #[test]
    fn negative_coordinates_floor_downwards() {
        let mut grid = SpatialGrid::new(4.0);
        grid.rebuild([DVec3::new(-0.5, -4.0, 3.9)], 4.0);
        assert_eq!(grid.query(IVec3::new(-1, -1, 0)), &[0]);
        assert!(grid.query(IVec3::ZERO).is_empty());
    }

    #[test]
    fn block_query_never_misses_pairs_within_cell_size() {
        let radius = 8.0;
        let positions = random_positions(300, 40.0, 5);
        let mut grid = SpatialGrid::new(radius);
        grid.rebuild(positions.iter().copied(), radius);

        for (i, a) in positions.iter().enumerate() {
            let mut candidates = Vec::new();
            grid.for_each_candidate(*a, |j| candidates.push(j));
            assert!(candidates.contains(&i));

            for (j, b) in positions.iter().enumerate() {
                if i != j && a.distance_squared(*b) < radius * radius {
                    assert!(candidates.contains(&j), "pair ({i}, {j}) missed");
                }
            }
        }
    }

    #[test]
    fn rebuild_forgets_previous_positions() {
        let mut grid = SpatialGrid::new(5.0);
        grid.rebuild([DVec3::new(1.0, 1.0, 1.0), DVec3::new(30.0, 0.0, 0.0)], 5.0);
        grid.rebuild([DVec3::new(-12.0, 0.0, 0.0)], 5.0);

        assert_eq!(grid.len(), 1);
        assert!(grid.query(IVec3::ZERO).is_empty());
        assert_eq!(grid.query(IVec3::new(-3, 0, 0)), &[0]);
        assert_eq!(grid.occupied_cells(), 1);
    }

    #[test]
    fn changing_cell_size_rebuckets() {
        let mut grid = SpatialGrid::new(5.0);
        grid.rebuild([DVec3::new(7.0, 0.0, 0.0)], 5.0);
        assert_eq!(grid.query(IVec3::new(1, 0, 0)), &[0]);

        grid.rebuild([DVec3::new(7.0, 0.0, 0.0)], 10.0);
        assert_eq!(grid.cell_size(), 10.0);
        assert_eq!(grid.query(IVec3::ZERO), &[0]);
        assert!(grid.query(IVec3::new(1, 0, 0)).is_empty());
    }

    #[test]
    fn saturated_cells_do_not_overflow() {
        // Positions far beyond i32::MAX cells saturate in cell_of
        let mut grid = SpatialGrid::new(1e-7);
        let positions = [DVec3::new(1000.0, -1000.0, 0.0), DVec3::new(1000.0, -1000.0, 1e-8)];
        grid.rebuild(positions, 1e-7);
        assert_eq!(grid.cell_of(positions[0]), IVec3::new(i32::MAX, i32::MIN, 0));

        let mut candidates = Vec::new();
        grid.for_each_candidate(positions[0], |j| candidates.push(j));
        candidates.sort_unstable();
        assert_eq!(candidates, vec![0, 1]);
    }

    #[test]
    fn empty_input_gives_empty_grid() {
        let mut grid = SpatialGrid::new(3.0);
        grid.rebuild(std::iter::empty(), 3.0);
        assert!(grid.is_empty());
        assert_eq!(grid.occupied_cells(), 0);
        let mut visited = 0;
        grid.for_each_candidate(DVec3::ZERO, |_| visited += 1);
        assert_eq!(visited, 0);
    }
}
