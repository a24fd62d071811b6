//! The decision strategies available to the robot.

mod binary_tree_dfs;
mod fewer_obstacles;
mod rollback;
mod shortest_distance;
mod sort;
mod votacao;

pub use binary_tree_dfs::BinaryTreeDfs;
pub use fewer_obstacles::FewerObstacles;
pub use rollback::{MAX_CONSECUTIVE_ROLLBACKS, Rollback, VisitHistory};
pub use shortest_distance::ShortestDistance;
pub use sort::Sort;
pub use votacao::{Votacao, tally_votes};

use crate::{Position, environment::Environment};

/// Geometric centre of the grid, rounded down.
pub(crate) fn grid_center(env: &dyn Environment) -> Position {
    let (width, height) = env.scenario_size();
    Position::new(width / 2, height / 2)
}

/// First candidate whose cell holds an unopened chest.
pub(crate) fn find_chest(candidates: &[Position], env: &dyn Environment) -> Option<Position> {
    candidates
        .iter()
        .copied()
        .find(|candidate| env.get(*candidate).is_some_and(|marker| marker.is_chest()))
}
