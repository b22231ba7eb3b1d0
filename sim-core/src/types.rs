/// Identifier for a particle in a [`crate::simulator::FieldSimulator`].
///
/// This is an index into the live particle array, and is only meaningful
/// until the next population regeneration.
pub type ParticleId = usize;

/// Discretized `(cell_x, cell_y)` key of a [`crate::grid::SpatialGrid`] bucket.
pub type CellKey = (i32, i32);
