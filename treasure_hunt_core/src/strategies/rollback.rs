use std::collections::HashSet;

use tracing::trace;

use crate::{Position, environment::Environment, strategies::find_chest, strategy::Strategy};

/// Number of rollbacks allowed in a row before the strategy is forced forward.
pub const MAX_CONSECUTIVE_ROLLBACKS: usize = 3;

const VISITED_WEIGHT: f64 = 10.0;
const OCCUPIED_WEIGHT: f64 = 20.0;

/// Ordered record of visited positions.
///
/// The stack keeps the visiting order (most recent last) and the set answers
/// membership queries. Both are only ever changed together through
/// [`VisitHistory::visit`] and [`VisitHistory::rewind_to`], so the set always
/// holds exactly the positions on the stack.
#[derive(Debug, Clone, Default)]
pub struct VisitHistory {
    stack: Vec<Position>,
    visited: HashSet<Position>,
}

impl VisitHistory {
    /// Records `position` unless it is already on the stack. Returns whether it was new.
    pub fn visit(&mut self, position: Position) -> bool {
        let inserted = self.visited.insert(position);
        if inserted {
            self.stack.push(position);
        }
        inserted
    }

    pub fn contains(&self, position: Position) -> bool {
        self.visited.contains(&position)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Visiting order, oldest first.
    pub fn stack(&self) -> &[Position] {
        &self.stack
    }

    /// Most recent entry that is also one of `candidates`.
    pub fn most_recent_in(&self, candidates: &[Position]) -> Option<Position> {
        self.stack
            .iter()
            .rev()
            .copied()
            .find(|entry| candidates.contains(entry))
    }

    /// Pops every entry above `target`, forgetting them so they can be explored
    /// again. Leaves the history untouched and returns `false` if `target` is
    /// not on the stack.
    pub fn rewind_to(&mut self, target: Position) -> bool {
        let Some(index) = self.stack.iter().rposition(|entry| *entry == target) else {
            return false;
        };
        for removed in self.stack.drain(index + 1..) {
            self.visited.remove(&removed);
        }
        true
    }
}

/// Depth-first explorer that backtracks along its own trail when it runs out
/// of unvisited neighbours.
#[derive(Debug, Clone, Default)]
pub struct Rollback {
    history: VisitHistory,
    consecutive_rollbacks: usize,
}

impl Rollback {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn history(&self) -> &VisitHistory {
        &self.history
    }

    #[cfg(test)]
    pub(crate) fn consecutive_rollbacks(&self) -> usize {
        self.consecutive_rollbacks
    }

    fn closest_unvisited(&self, candidates: &[Position], from: Position) -> Option<Position> {
        candidates
            .iter()
            .copied()
            .filter(|candidate| !self.history.contains(*candidate))
            .min_by(|a, b| from.distance(a).total_cmp(&from.distance(b)))
    }

    fn weight(&self, position: Position, env: &dyn Environment) -> f64 {
        let mut weight = 0.0;
        if self.history.contains(position) {
            weight += VISITED_WEIGHT;
        }
        if env.get(position).is_some_and(|marker| marker.is_occupied()) {
            weight += OCCUPIED_WEIGHT;
        }
        weight
    }

    fn lowest_weight(&self, candidates: &[Position], env: &dyn Environment) -> Option<Position> {
        candidates
            .iter()
            .copied()
            .min_by(|a, b| self.weight(*a, env).total_cmp(&self.weight(*b, env)))
    }
}

impl Strategy for Rollback {
    fn decide(&mut self, candidates: &[Position], env: &dyn Environment) -> Option<Position> {
        if candidates.is_empty() {
            return None;
        }

        let current = env.robot_location();
        self.history.visit(current);

        // 1. A chest next to the robot ends the search.
        if let Some(chest) = find_chest(candidates, env) {
            trace!(?chest, "rollback: chest adjacent");
            return Some(chest);
        }

        // 2. Expand the frontier.
        if let Some(next) = self.closest_unvisited(candidates, current) {
            self.consecutive_rollbacks = 0;
            trace!(?next, "rollback: frontier");
            return Some(next);
        }

        // 3. Backtrack along the trail.
        if self.consecutive_rollbacks < MAX_CONSECUTIVE_ROLLBACKS
            && let Some(target) = self.history.most_recent_in(candidates)
        {
            self.history.rewind_to(target);
            self.consecutive_rollbacks += 1;
            trace!(?target, count = self.consecutive_rollbacks, "rollback: backtrack");
            return Some(target);
        }

        // 4. Forced move.
        self.consecutive_rollbacks = 0;
        let fallback = self.lowest_weight(candidates, env);
        trace!(?fallback, "rollback: forced");
        fallback
    }
}
