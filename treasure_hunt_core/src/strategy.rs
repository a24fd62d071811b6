use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Position,
    environment::Environment,
    strategies::{BinaryTreeDfs, FewerObstacles, Rollback, ShortestDistance, Sort, Votacao},
};

/// Trait defining how the robot picks its next step.
pub trait Strategy {
    /// Chooses one of `candidates` as the robot's next position, or `None`
    /// when `candidates` is empty.
    ///
    /// `&mut self` allows a strategy to keep state between steps of one trial.
    fn decide(&mut self, candidates: &[Position], env: &dyn Environment) -> Option<Position>;
}

/// The fixed set of available strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrategyKind {
    FewerObstacles,
    ShortestDistance,
    Sort,
    BinaryTreeDfs,
    Rollback,
    Votacao,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::FewerObstacles,
        StrategyKind::ShortestDistance,
        StrategyKind::Sort,
        StrategyKind::BinaryTreeDfs,
        StrategyKind::Rollback,
        StrategyKind::Votacao,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::FewerObstacles => "FewerObstacles",
            StrategyKind::ShortestDistance => "ShortestDistance",
            StrategyKind::Sort => "Sort",
            StrategyKind::BinaryTreeDfs => "BinaryTreeDFS",
            StrategyKind::Rollback => "Rollback",
            StrategyKind::Votacao => "Votacao",
        }
    }

    /// Creates a fresh instance. `seed` feeds strategies that draw random numbers.
    pub fn build(self, seed: u64) -> Box<dyn Strategy> {
        match self {
            StrategyKind::FewerObstacles => Box::new(FewerObstacles),
            StrategyKind::ShortestDistance => Box::new(ShortestDistance),
            StrategyKind::Sort => Box::new(Sort),
            StrategyKind::BinaryTreeDfs => Box::new(BinaryTreeDfs::new(seed)),
            StrategyKind::Rollback => Box::new(Rollback::new()),
            StrategyKind::Votacao => Box::new(Votacao::new(seed)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown strategy '{0}'")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    /// Case-insensitive lookup by strategy name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}
