use std::collections::{HashMap, HashSet, VecDeque};

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{ChestContents, Marker, Position, map::Grid};

/// The view of the world a strategy and the simulation driver work against.
pub trait Environment {
    /// Reads the content of a cell. Returns `None` outside the grid.
    fn get(&self, position: Position) -> Option<Marker>;

    /// Current location of the robot.
    fn robot_location(&self) -> Position;

    /// Grid dimensions as `(width, height)`.
    fn scenario_size(&self) -> (usize, usize);

    /// Relocates the robot. The caller is responsible for the move being legal.
    fn move_robot(&mut self, position: Position);

    /// Opens the chest at `position`, permanently replacing it with the
    /// revealed marker. Returns `true` when the chest held the treasure.
    fn open_treasure_chest(&mut self, position: Position) -> bool;
}

/// Errors raised while building a scenario.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScenarioError {
    #[error("Layout is empty")]
    EmptyLayout,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    InconsistentWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown layout code '{code}' at position ({x}, {y})")]
    UnknownCode { code: String, x: usize, y: usize },
    #[error("No start position ('ST') found in layout")]
    MissingStart,
    #[error("Multiple start positions ('ST') found in layout")]
    MultipleStarts,
    #[error("A {width}x{height} grid cannot hold the robot, {chests} chest(s) and {obstacles} obstacle(s)")]
    Overcrowded {
        width: usize,
        height: usize,
        chests: usize,
        obstacles: usize,
    },
    #[error("Trap probability {0} is outside [0, 1]")]
    InvalidTrapProbability(f64),
}

/// Parameters for randomly generated scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub width: usize,
    pub height: usize,
    /// Share of the cells turned into obstacles.
    pub obstacle_ratio: f64,
    pub chests: usize,
    /// Probability that a chest holds a trap instead of the treasure.
    pub trap_probability: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            width: 8,
            height: 8,
            obstacle_ratio: 0.15,
            chests: 1,
            trap_probability: 0.5,
        }
    }
}

pub(crate) fn check_trap_probability(probability: f64) -> Result<(), ScenarioError> {
    if (0.0..=1.0).contains(&probability) {
        Ok(())
    } else {
        Err(ScenarioError::InvalidTrapProbability(probability))
    }
}

/// The concrete environment: visible markers, hidden chest contents and the robot.
#[derive(Debug, Clone)]
pub struct Scenario {
    cells: Grid<Marker>,
    chests: HashMap<Position, ChestContents>,
    robot: Position,
}

impl Scenario {
    /// Builds a scenario from its parts. Every chest position is marked on the grid.
    pub fn new(
        mut cells: Grid<Marker>,
        chests: HashMap<Position, ChestContents>,
        robot: Position,
    ) -> Self {
        for position in chests.keys() {
            if let Some(cell) = cells.get_mut(*position) {
                *cell = Marker::Chest;
            }
        }
        Scenario {
            cells,
            chests,
            robot,
        }
    }

    /// Randomly places the robot, the chests and the obstacles on an empty grid.
    pub fn generate<R: Rng + ?Sized>(
        config: &ScenarioConfig,
        rng: &mut R,
    ) -> Result<Self, ScenarioError> {
        check_trap_probability(config.trap_probability)?;

        let overcrowded = |obstacles: usize| ScenarioError::Overcrowded {
            width: config.width,
            height: config.height,
            chests: config.chests,
            obstacles,
        };

        let cell_count = config
            .width
            .checked_mul(config.height)
            .ok_or_else(|| overcrowded(0))?;
        let obstacles = (cell_count as f64 * config.obstacle_ratio.clamp(0.0, 1.0)).round() as usize;
        let occupants = config
            .chests
            .checked_add(obstacles)
            .and_then(|count| count.checked_add(1));
        if cell_count == 0 || occupants.is_none_or(|count| count > cell_count) {
            return Err(overcrowded(obstacles));
        }

        let mut cells: Grid<Marker> = Grid::new(config.width, config.height);
        let mut free: Vec<Position> = cells.positions().collect();
        free.shuffle(rng);
        let mut free = free.into_iter();

        let robot = free.next().ok_or_else(|| overcrowded(obstacles))?;

        let mut chests = HashMap::with_capacity(config.chests);
        for position in free.by_ref().take(config.chests) {
            let contents = if rng.random_bool(config.trap_probability) {
                ChestContents::Trap
            } else {
                ChestContents::Treasure
            };
            chests.insert(position, contents);
        }

        for position in free.take(obstacles) {
            cells[position] = Marker::Obstacle;
        }

        Ok(Scenario::new(cells, chests, robot))
    }

    pub fn cells(&self) -> &Grid<Marker> {
        &self.cells
    }

    /// Hidden contents of the still unopened chest at `position`.
    pub fn chest_contents(&self, position: Position) -> Option<ChestContents> {
        match self.cells.get(position) {
            Some(Marker::Chest) => self.chests.get(&position).copied(),
            _ => None,
        }
    }

    /// Whether a path of legal moves leads from the robot to an unopened chest
    /// holding the treasure.
    pub fn treasure_reachable(&self) -> bool {
        let (width, height) = self.cells.size();
        let mut seen = HashSet::from([self.robot]);
        let mut frontier = VecDeque::from([self.robot]);

        while let Some(current) = frontier.pop_front() {
            for next in current.neighbors(width, height) {
                if !is_walkable(self.cells[next]) || !seen.insert(next) {
                    continue;
                }
                if self.chest_contents(next) == Some(ChestContents::Treasure) {
                    return true;
                }
                // Opening a chest ends the game, so paths never lead through one.
                if !self.cells[next].is_chest() {
                    frontier.push_back(next);
                }
            }
        }
        false
    }
}

impl Environment for Scenario {
    fn get(&self, position: Position) -> Option<Marker> {
        self.cells.get(position).copied()
    }

    fn robot_location(&self) -> Position {
        self.robot
    }

    fn scenario_size(&self) -> (usize, usize) {
        self.cells.size()
    }

    fn move_robot(&mut self, position: Position) {
        self.robot = position;
    }

    fn open_treasure_chest(&mut self, position: Position) -> bool {
        let Some(contents) = self.chest_contents(position) else {
            return false;
        };
        self.cells[position] = contents.revealed();
        contents == ChestContents::Treasure
    }
}

#[inline]
fn is_walkable(marker: Marker) -> bool {
    marker != Marker::Obstacle
}

/// Coordinates the robot may legally move to this turn: the in-bounds
/// 8-neighbourhood of the robot, minus obstacles.
pub fn reachable_steps(env: &dyn Environment) -> Vec<Position> {
    let (width, height) = env.scenario_size();
    env.robot_location()
        .neighbors(width, height)
        .filter(|position| env.get(*position).is_some_and(is_walkable))
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use rstest::rstest;

    use super::*;
    use crate::test_support::scenario;

    #[test]
    fn opening_a_chest_is_irreversible() {
        let mut env = scenario(
            "ST CT
             BL BL",
        );
        let chest = Position::new(1, 0);

        assert_eq!(env.get(chest), Some(Marker::Chest));
        assert!(env.open_treasure_chest(chest));
        assert_eq!(env.get(chest), Some(Marker::Treasure));

        // A second open finds no chest left.
        assert!(!env.open_treasure_chest(chest));
        assert_eq!(env.get(chest), Some(Marker::Treasure));
    }

    #[test]
    fn trap_chest_does_not_end_the_game() {
        let mut env = scenario("ST CX");
        assert!(!env.open_treasure_chest(Position::new(1, 0)));
        assert_eq!(env.get(Position::new(1, 0)), Some(Marker::Trap));
    }

    #[test]
    fn reachable_steps_skip_obstacles_and_bounds() {
        let env = scenario(
            "ST WL BL
             CH BL BL",
        );
        assert_eq!(
            reachable_steps(&env),
            vec![Position::new(0, 1), Position::new(1, 1)]
        );
    }

    #[test]
    fn treasure_behind_a_wall_is_unreachable() {
        let walled = scenario(
            "ST WL BL
             WL WL BL
             BL BL CT",
        );
        assert!(!walled.treasure_reachable());

        let open = scenario(
            "ST BL BL
             WL WL BL
             BL BL CT",
        );
        assert!(open.treasure_reachable());
    }

    #[test]
    fn trap_only_scenario_has_no_reachable_treasure() {
        assert!(!scenario("ST CX").treasure_reachable());
    }

    #[test]
    fn generation_respects_config() {
        let config = ScenarioConfig::default();
        let env = Scenario::generate(&config, &mut StdRng::seed_from_u64(7)).expect("fits");

        let obstacles = env
            .cells()
            .enumerate()
            .filter(|(_, marker)| **marker == Marker::Obstacle)
            .count();
        let chests = env.cells().enumerate().filter(|(_, m)| m.is_chest()).count();

        assert_eq!(env.scenario_size(), (8, 8));
        assert_eq!(obstacles, 10);
        assert_eq!(chests, 1);
        assert_eq!(env.get(env.robot_location()), Some(Marker::Empty));
    }

    #[rstest]
    #[case::huge_grid(ScenarioConfig { width: usize::MAX, height: 2, ..ScenarioConfig::default() })]
    #[case::huge_chest_count(ScenarioConfig { chests: usize::MAX, ..ScenarioConfig::default() })]
    #[case::empty_grid(ScenarioConfig { width: 0, ..ScenarioConfig::default() })]
    fn generation_rejects_impossible_sizes(#[case] config: ScenarioConfig) {
        assert!(matches!(
            Scenario::generate(&config, &mut StdRng::seed_from_u64(0)),
            Err(ScenarioError::Overcrowded { .. })
        ));
    }

    #[test]
    fn generation_rejects_overcrowded_grids() {
        let config = ScenarioConfig {
            width: 2,
            height: 2,
            obstacle_ratio: 0.5,
            chests: 2,
            ..ScenarioConfig::default()
        };
        assert!(matches!(
            Scenario::generate(&config, &mut StdRng::seed_from_u64(0)),
            Err(ScenarioError::Overcrowded { .. })
        ));
    }
}
