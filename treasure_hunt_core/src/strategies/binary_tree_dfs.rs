use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::trace;

use crate::{Position, environment::Environment, strategies::grid_center, strategy::Strategy};

const CHEST_BONUS: f64 = 100.0;
const OCCUPIED_PENALTY: f64 = 50.0;
const CENTER_DISTANCE_WEIGHT: f64 = 2.0;
/// Upper bound (exclusive) of the random jitter added to every score.
const JITTER: f64 = 1.0;

/// Scores the candidates, arranges them in a binary tree pivoted on the best
/// score of each subset, and walks the whole tree depth-first for the maximum.
#[derive(Debug, Clone)]
pub struct BinaryTreeDfs {
    rng: StdRng,
}

#[derive(Debug)]
struct Node {
    position: Position,
    score: f64,
    left: Option<usize>,
    right: Option<usize>,
}

/// Tree for a single decision. Nodes live in a flat arena and refer to their
/// children by index.
#[derive(Debug, Default)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn build(scored: Vec<(Position, f64)>) -> (Self, Option<usize>) {
        let mut tree = Tree {
            nodes: Vec::with_capacity(scored.len()),
        };
        let root = tree.insert_subset(scored);
        (tree, root)
    }

    fn insert_subset(&mut self, mut subset: Vec<(Position, f64)>) -> Option<usize> {
        let pivot_index = subset
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)?;
        let (pivot, score) = subset.swap_remove(pivot_index);

        let (left, right): (Vec<_>, Vec<_>) = subset
            .into_iter()
            .partition(|(position, _)| (position.x, position.y) < (pivot.x, pivot.y));

        let id = self.nodes.len();
        self.nodes.push(Node {
            position: pivot,
            score,
            left: None,
            right: None,
        });
        self.nodes[id].left = self.insert_subset(left);
        self.nodes[id].right = self.insert_subset(right);
        Some(id)
    }

    /// Depth-first search over every node below `id`, returning the best node.
    fn best_below(&self, id: usize) -> &Node {
        let node = &self.nodes[id];
        [node.left, node.right]
            .into_iter()
            .flatten()
            .map(|child| self.best_below(child))
            .fold(node, |best, candidate| {
                if candidate.score > best.score {
                    candidate
                } else {
                    best
                }
            })
    }

    fn depth(&self, id: Option<usize>) -> usize {
        id.map_or(0, |id| {
            1 + self
                .depth(self.nodes[id].left)
                .max(self.depth(self.nodes[id].right))
        })
    }
}

impl BinaryTreeDfs {
    pub fn new(seed: u64) -> Self {
        BinaryTreeDfs {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Deterministic part of the score of stepping onto `position`.
    pub fn base_score(position: Position, env: &dyn Environment) -> f64 {
        let mut score = 0.0;
        match env.get(position) {
            Some(marker) if marker.is_chest() => score += CHEST_BONUS,
            Some(marker) if marker.is_occupied() => score -= OCCUPIED_PENALTY,
            _ => {}
        }
        score - CENTER_DISTANCE_WEIGHT * position.distance(&grid_center(env))
    }

    fn score(&mut self, position: Position, env: &dyn Environment) -> f64 {
        Self::base_score(position, env) + self.rng.random_range(0.0..JITTER)
    }
}

impl Strategy for BinaryTreeDfs {
    fn decide(&mut self, candidates: &[Position], env: &dyn Environment) -> Option<Position> {
        let scored: Vec<(Position, f64)> = candidates
            .iter()
            .map(|&candidate| (candidate, self.score(candidate, env)))
            .collect();

        let (tree, root) = Tree::build(scored);
        let best = tree.best_below(root?);
        trace!(
            position = ?best.position,
            score = best.score,
            depth = tree.depth(root),
            "binary tree dfs"
        );
        Some(best.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::reachable_steps;
    use crate::test_support::scenario;

    #[test]
    fn single_candidate_is_returned() {
        let env = scenario("ST BL");
        let mut strategy = BinaryTreeDfs::new(5);
        assert_eq!(
            strategy.decide(&[Position::new(1, 0)], &env),
            Some(Position::new(1, 0))
        );
    }

    #[test]
    fn chest_outranks_everything_regardless_of_jitter() {
        let env = scenario(
            "CH BL BL BL BL
             BL ST BL BL BL
             BL BL BL BL BL
             BL BL BL BL BL
             BL BL BL BL BL",
        );
        let candidates = reachable_steps(&env);
        for seed in 0..50 {
            let mut strategy = BinaryTreeDfs::new(seed);
            assert_eq!(
                strategy.decide(&candidates, &env),
                Some(Position::new(0, 0))
            );
        }
    }

    #[test]
    fn search_visits_every_subtree() {
        let scored = vec![
            (Position::new(3, 3), 1.0),
            (Position::new(0, 0), 5.0),
            (Position::new(4, 4), 3.0),
            (Position::new(1, 1), 2.0),
        ];
        let (tree, root) = Tree::build(scored);
        let root = root.expect("non-empty");

        assert_eq!(tree.nodes.len(), 4);
        assert_eq!(tree.best_below(root).position, Position::new(0, 0));

        let right = tree.nodes[root].right.expect("right subtree");
        assert_eq!(tree.best_below(right).position, Position::new(4, 4));
        assert_eq!(tree.depth(Some(root)), 4);
    }

    #[test]
    fn partition_orders_by_x_then_y() {
        let scored = vec![
            (Position::new(2, 2), 10.0),
            (Position::new(2, 1), 1.0),
            (Position::new(1, 3), 2.0),
            (Position::new(2, 3), 3.0),
            (Position::new(3, 0), 4.0),
        ];
        let (tree, root) = Tree::build(scored);
        let root = &tree.nodes[root.expect("non-empty")];

        let left = &tree.nodes[root.left.expect("left subtree")];
        let right = &tree.nodes[root.right.expect("right subtree")];
        assert_eq!(left.position, Position::new(1, 3));
        assert_eq!(right.position, Position::new(3, 0));
    }

    #[test]
    fn occupied_cells_are_penalised() {
        let open = scenario("ST BL");
        let walled = scenario("ST WL");
        let target = Position::new(1, 0);

        let difference =
            BinaryTreeDfs::base_score(target, &open) - BinaryTreeDfs::base_score(target, &walled);
        assert!((difference - OCCUPIED_PENALTY).abs() < 1e-9);
    }
}
