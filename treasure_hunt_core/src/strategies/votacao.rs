use tracing::trace;

use crate::{
    Position,
    environment::Environment,
    strategy::{Strategy, StrategyKind},
};

/// Strategies polled by [`Votacao`], in voting order.
const VOTERS: [StrategyKind; 5] = [
    StrategyKind::FewerObstacles,
    StrategyKind::ShortestDistance,
    StrategyKind::BinaryTreeDfs,
    StrategyKind::Sort,
    StrategyKind::Rollback,
];

/// Ensemble that asks every other strategy for a recommendation and follows
/// the plurality.
pub struct Votacao {
    voters: Vec<(StrategyKind, Box<dyn Strategy>)>,
}

impl Votacao {
    /// Creates fresh voters. Each voter gets its own seed derived from `seed`.
    pub fn new(seed: u64) -> Self {
        let voters = VOTERS
            .into_iter()
            .enumerate()
            .map(|(index, kind)| (kind, kind.build(seed.wrapping_add(index as u64 + 1))))
            .collect();
        Votacao { voters }
    }

    #[cfg(test)]
    pub(crate) fn voters(&self) -> impl Iterator<Item = StrategyKind> + '_ {
        self.voters.iter().map(|(kind, _)| *kind)
    }
}

/// Counts one vote per recommendation, per candidate index. Recommendations
/// that are `None` or not among `candidates` are dropped.
pub fn tally_votes(
    candidates: &[Position],
    votes: impl IntoIterator<Item = Option<Position>>,
) -> Vec<usize> {
    let mut tally = vec![0; candidates.len()];
    for vote in votes.into_iter().flatten() {
        if let Some(index) = candidates.iter().position(|candidate| *candidate == vote) {
            tally[index] += 1;
        }
    }
    tally
}

impl Strategy for Votacao {
    fn decide(&mut self, candidates: &[Position], env: &dyn Environment) -> Option<Position> {
        let first = *candidates.first()?;

        let votes: Vec<Option<Position>> = self
            .voters
            .iter_mut()
            .map(|(_, voter)| voter.decide(candidates, env))
            .collect();
        let tally = tally_votes(candidates, votes);

        // Strictly greater keeps the first candidate on ties.
        let mut winner = None;
        let mut max_votes = 0;
        for (candidate, count) in candidates.iter().zip(&tally) {
            if *count > max_votes {
                max_votes = *count;
                winner = Some(*candidate);
            }
        }

        trace!(?tally, ?winner, "votacao");
        Some(winner.unwrap_or(first))
    }
}
