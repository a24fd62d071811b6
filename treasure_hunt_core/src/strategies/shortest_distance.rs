use tracing::trace;

use crate::{Position, environment::Environment, strategies::grid_center, strategy::Strategy};

/// Greedy strategy: steps onto the candidate closest to any unopened chest.
///
/// Chests are visible on the grid even though their contents are not. Once no
/// chest is left the robot drifts towards the centre of the grid instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestDistance;

impl ShortestDistance {
    fn chest_positions(env: &dyn Environment) -> Vec<Position> {
        let (width, height) = env.scenario_size();
        (0..height)
            .flat_map(|y| (0..width).map(move |x| Position::new(x, y)))
            .filter(|position| env.get(*position).is_some_and(|marker| marker.is_chest()))
            .collect()
    }
}

impl Strategy for ShortestDistance {
    fn decide(&mut self, candidates: &[Position], env: &dyn Environment) -> Option<Position> {
        let mut targets = Self::chest_positions(env);
        if targets.is_empty() {
            targets.push(grid_center(env));
        }

        let cost = |candidate: &Position| {
            targets
                .iter()
                .map(|target| candidate.distance(target))
                .fold(f64::INFINITY, f64::min)
        };

        let best = candidates
            .iter()
            .copied()
            .min_by(|a, b| cost(a).total_cmp(&cost(b)));
        trace!(?best, targets = targets.len(), "shortest distance");
        best
    }
}
