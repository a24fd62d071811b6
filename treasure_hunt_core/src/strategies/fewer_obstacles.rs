use tracing::trace;

use crate::{Position, environment::Environment, strategy::Strategy};

/// Greedy strategy: steps onto the candidate with the fewest occupied cells around it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FewerObstacles;

impl FewerObstacles {
    /// Number of occupied cells in the 8-neighbourhood of `position`, clipped to the grid.
    pub fn count_adjacent_obstacles(position: Position, env: &dyn Environment) -> usize {
        let (width, height) = env.scenario_size();
        position
            .neighbors(width, height)
            .filter(|neighbor| env.get(*neighbor).is_some_and(|marker| marker.is_occupied()))
            .count()
    }
}

impl Strategy for FewerObstacles {
    fn decide(&mut self, candidates: &[Position], env: &dyn Environment) -> Option<Position> {
        // Every candidate is scored. Equal counts prefer a chest, then the earliest candidate.
        let best = candidates.iter().copied().min_by_key(|candidate| {
            let not_chest = !env.get(*candidate).is_some_and(|marker| marker.is_chest());
            (Self::count_adjacent_obstacles(*candidate, env), not_chest)
        });
        trace!(?best, "fewer obstacles");
        best
    }
}
