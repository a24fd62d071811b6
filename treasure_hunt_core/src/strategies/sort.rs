use tracing::trace;

use crate::{Marker, Position, environment::Environment, strategy::Strategy};

/// Orders the candidates and takes the first one: chests before free floor
/// before occupied cells, then by `x` and `y`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sort;

fn class(marker: Option<Marker>) -> u8 {
    match marker {
        Some(Marker::Chest) => 0,
        Some(Marker::Empty) => 1,
        _ => 2,
    }
}

impl Strategy for Sort {
    fn decide(&mut self, candidates: &[Position], env: &dyn Environment) -> Option<Position> {
        let mut sorted = candidates.to_vec();
        sorted.sort_by_key(|candidate| (class(env.get(*candidate)), candidate.x, candidate.y));
        let best = sorted.first().copied();
        trace!(?best, "sort");
        best
    }
}
