use crate::{
    particle::Particle,
    types::{CellKey, ParticleId},
};
use glam::Vec2;
use std::collections::HashMap;

/// Uniform bucket index over particle positions.
///
/// The grid is rebuilt from scratch every frame via [`SpatialGrid::rebuild`];
/// nothing carries over between frames, so a grid consulted after particles
/// have moved is stale by contract.
#[derive(Debug, Default)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<CellKey, Vec<ParticleId>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    /// Clears every bucket and re-bins all particles by `floor(pos / cell_size)`.
    ///
    /// Particles with non-finite positions are left out of the index.
    pub fn rebuild(&mut self, particles: &[Particle], cell_size: f32) {
        self.cell_size = cell_size;
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }

        for (id, p) in particles.iter().enumerate() {
            if !p.pos.is_finite() {
                continue;
            }
            let key = self.cell_of(p.pos);
            self.cells.entry(key).or_default().push(id);
        }

        self.cells.retain(|_, bucket| !bucket.is_empty());
    }

    /// Returns the cell containing `pos`.
    #[inline]
    pub fn cell_of(&self, pos: Vec2) -> CellKey {
        let cell = (pos / self.cell_size).floor();
        (cell.x as i32, cell.y as i32)
    }

    /// Ids in the single bucket `key`.
    pub fn bucket(&self, key: CellKey) -> &[ParticleId] {
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterates the union of the 3×3 block of buckets centered on `center`.
    ///
    /// Order is deterministic: x offset outer (-1..=1), y offset inner,
    /// bucket insertion order within a cell.
    pub fn neighbors_of(&self, center: CellKey) -> impl Iterator<Item = ParticleId> + '_ {
        let (cx, cy) = center;
        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| (cx + dx, cy + dy)))
            .flat_map(move |key| self.bucket(key).iter().copied())
    }

    /// Number of non-empty buckets.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn particles_at(points: &[Vec2]) -> Vec<Particle> {
        let mut rng = StdRng::seed_from_u64(7);
        points.iter().map(|&p| Particle::spawn(p, &mut rng)).collect()
    }

    #[test]
    fn rebuild_bins_by_floor() {
        let particles = particles_at(&[
            Vec2::new(10.0, 10.0),
            Vec2::new(49.9, 0.0),
            Vec2::new(50.0, 0.0),
            Vec2::new(-0.1, -0.1),
        ]);
        let mut grid = SpatialGrid::new(50.0);
        grid.rebuild(&particles, 50.0);

        assert_eq!(grid.bucket((0, 0)), &[0, 1]);
        assert_eq!(grid.bucket((1, 0)), &[2]);
        assert_eq!(grid.bucket((-1, -1)), &[3]);
        assert_eq!(grid.cell_count(), 3);
    }

    #[test]
    fn neighbors_cover_three_by_three_only() {
        let particles = particles_at(&[
            Vec2::new(125.0, 125.0), // (2, 2) center
            Vec2::new(75.0, 75.0),   // (1, 1) corner
            Vec2::new(175.0, 125.0), // (3, 2) edge
            Vec2::new(225.0, 125.0), // (4, 2) outside
            Vec2::new(125.0, 25.0),  // (2, 0) outside
        ]);
        let mut grid = SpatialGrid::new(50.0);
        grid.rebuild(&particles, 50.0);

        let mut ids: Vec<_> = grid.neighbors_of((2, 2)).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn rebuild_forgets_previous_frame() {
        let mut particles = particles_at(&[Vec2::new(10.0, 10.0)]);
        let mut grid = SpatialGrid::new(50.0);
        grid.rebuild(&particles, 50.0);
        assert_eq!(grid.bucket((0, 0)), &[0]);

        particles[0].pos = Vec2::new(510.0, 10.0);
        grid.rebuild(&particles, 50.0);
        assert!(grid.bucket((0, 0)).is_empty());
        assert_eq!(grid.bucket((10, 0)), &[0]);
        assert_eq!(grid.cell_count(), 1);
    }

    #[test]
    fn non_finite_positions_are_not_indexed() {
        let mut particles = particles_at(&[Vec2::new(10.0, 10.0), Vec2::new(20.0, 20.0)]);
        particles[1].pos = Vec2::new(f32::NAN, 0.0);
        let mut grid = SpatialGrid::new(50.0);
        grid.rebuild(&particles, 50.0);
        assert_eq!(grid.neighbors_of((0, 0)).count(), 1);
    }
}
