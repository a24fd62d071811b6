use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Marker, Position,
    environment::{Environment, Scenario, reachable_steps},
    strategy::Strategy,
};

/// Hard ceiling on the number of moves in one trial.
pub const DEFAULT_MAX_STEPS: usize = 100;

/// How a single trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialOutcome {
    /// Marker revealed by the opened chest, or `None` if no chest was opened.
    pub final_state: Option<Marker>,
    pub steps: usize,
    /// Whether the treasure could be reached when the trial started.
    pub was_reachable: bool,
}

/// Classification of a trial for the precision/recall metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrialClass {
    /// The treasure was found.
    Victory,
    /// A trap chest was opened.
    FalsePositive,
    /// Nothing was opened although the treasure was reachable.
    FalseNegative,
    /// Nothing was opened and there was nothing to find.
    Unclassified,
}

impl TrialOutcome {
    pub fn classify(&self) -> TrialClass {
        match self.final_state {
            Some(Marker::Treasure) => TrialClass::Victory,
            Some(Marker::Trap) => TrialClass::FalsePositive,
            _ if self.was_reachable => TrialClass::FalseNegative,
            _ => TrialClass::Unclassified,
        }
    }
}

/// What happened during a single [`Simulation::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    Moved(Position),
    /// A chest was opened, revealing the given marker.
    Opened(Position, Marker),
    /// The strategy had no move to offer.
    Stuck,
    /// The step ceiling was reached.
    OutOfSteps,
    /// The trial had already finished.
    Finished,
}

/// What opening a trap chest does to the trial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrapRule {
    /// Any opened chest ends the trial. Used by the analyzer.
    #[default]
    EndTrial,
    /// The robot steps onto the sprung trap and keeps searching; only the
    /// treasure ends the game.
    KeepPlaying,
}

/// One strategy playing on one scenario until the trial ends.
pub struct Simulation {
    scenario: Scenario,
    strategy: Box<dyn Strategy>,
    steps: usize,
    max_steps: usize,
    trap_rule: TrapRule,
    was_reachable: bool,
    /// Marker revealed by the most recently opened chest.
    last_opened: Option<Marker>,
    outcome: Option<TrialOutcome>,
}

impl Simulation {
    pub fn new(scenario: Scenario, strategy: Box<dyn Strategy>, max_steps: usize) -> Self {
        let was_reachable = scenario.treasure_reachable();
        Simulation {
            scenario,
            strategy,
            steps: 0,
            max_steps,
            trap_rule: TrapRule::default(),
            was_reachable,
            last_opened: None,
            outcome: None,
        }
    }

    pub fn with_trap_rule(mut self, trap_rule: TrapRule) -> Self {
        self.trap_rule = trap_rule;
        self
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn outcome(&self) -> Option<&TrialOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    fn finish(&mut self, final_state: Option<Marker>) {
        let outcome = TrialOutcome {
            final_state,
            steps: self.steps,
            was_reachable: self.was_reachable,
        };
        debug!(?outcome, "trial finished");
        self.outcome = Some(outcome);
    }

    /// Asks the strategy for one move and applies it.
    pub fn step(&mut self) -> StepEvent {
        if self.is_finished() {
            return StepEvent::Finished;
        }
        if self.steps >= self.max_steps {
            self.finish(self.last_opened);
            return StepEvent::OutOfSteps;
        }

        let candidates = reachable_steps(&self.scenario);
        let Some(next) = self.strategy.decide(&candidates, &self.scenario) else {
            self.finish(self.last_opened);
            return StepEvent::Stuck;
        };

        self.steps += 1;
        let event = if self.scenario.get(next) == Some(Marker::Chest) {
            let found_treasure = self.scenario.open_treasure_chest(next);
            let revealed = self.scenario.get(next).unwrap_or(Marker::Empty);
            self.last_opened = Some(revealed);
            if found_treasure || self.trap_rule == TrapRule::EndTrial {
                self.finish(Some(revealed));
                return StepEvent::Opened(next, revealed);
            }
            debug!(?next, "trap sprung, searching on");
            StepEvent::Opened(next, revealed)
        } else {
            StepEvent::Moved(next)
        };

        self.scenario.move_robot(next);
        if self.steps >= self.max_steps {
            self.finish(self.last_opened);
            return StepEvent::OutOfSteps;
        }
        event
    }

    /// Steps until the trial ends.
    pub fn run(mut self) -> TrialOutcome {
        loop {
            if let Some(outcome) = self.outcome {
                return outcome;
            }
            self.step();
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{strategy::StrategyKind, test_support::scenario};

    #[rstest]
    #[case::fewer_obstacles(StrategyKind::FewerObstacles)]
    #[case::shortest_distance(StrategyKind::ShortestDistance)]
    #[case::sort(StrategyKind::Sort)]
    #[case::binary_tree_dfs(StrategyKind::BinaryTreeDfs)]
    #[case::rollback(StrategyKind::Rollback)]
    #[case::votacao(StrategyKind::Votacao)]
    fn boxed_in_robot_ends_without_moving(#[case] kind: StrategyKind) {
        let env = scenario(
            "ST WL CT
             WL WL BL",
        );
        let outcome = Simulation::new(env, kind.build(3), DEFAULT_MAX_STEPS).run();

        assert_eq!(
            outcome,
            TrialOutcome {
                final_state: None,
                steps: 0,
                was_reachable: false,
            }
        );
    }

    #[rstest]
    #[case::fewer_obstacles(StrategyKind::FewerObstacles)]
    #[case::shortest_distance(StrategyKind::ShortestDistance)]
    #[case::sort(StrategyKind::Sort)]
    #[case::binary_tree_dfs(StrategyKind::BinaryTreeDfs)]
    #[case::rollback(StrategyKind::Rollback)]
    #[case::votacao(StrategyKind::Votacao)]
    fn adjacent_treasure_is_opened_first(#[case] kind: StrategyKind) {
        let env = scenario(
            "BL BL BL BL BL BL BL BL
             BL BL BL BL BL BL BL BL
             BL BL BL BL BL BL BL BL
             BL BL BL ST CT BL BL BL
             BL BL BL BL BL BL BL BL
             BL BL BL BL BL BL BL BL
             BL BL BL BL BL BL BL BL
             BL BL BL BL BL BL BL BL",
        );
        let outcome = Simulation::new(env, kind.build(9), DEFAULT_MAX_STEPS).run();

        assert_eq!(outcome.final_state, Some(Marker::Treasure));
        assert_eq!(outcome.steps, 1);
        assert_eq!(outcome.classify(), TrialClass::Victory);
    }

    #[test]
    fn opening_a_trap_ends_the_trial() {
        let env = scenario("ST CX");
        let mut simulation = Simulation::new(env, StrategyKind::Sort.build(0), DEFAULT_MAX_STEPS);

        assert_eq!(
            simulation.step(),
            StepEvent::Opened(Position::new(1, 0), Marker::Trap)
        );
        assert_eq!(simulation.step(), StepEvent::Finished);
        assert_eq!(
            simulation.outcome().map(TrialOutcome::classify),
            Some(TrialClass::FalsePositive)
        );
    }

    #[test]
    fn step_ceiling_stops_a_wandering_strategy() {
        // No chest at all: FewerObstacles never stops on its own.
        let env = scenario(
            "ST BL BL
             BL BL BL",
        );
        let outcome = Simulation::new(env, StrategyKind::FewerObstacles.build(0), 25).run();

        assert_eq!(outcome.final_state, None);
        assert_eq!(outcome.steps, 25);
        assert_eq!(outcome.classify(), TrialClass::Unclassified);
    }

    #[test]
    fn zero_step_ceiling_never_consults_the_strategy() {
        let env = scenario("ST CT");
        let mut simulation = Simulation::new(env, StrategyKind::Sort.build(0), 0);

        assert_eq!(simulation.step(), StepEvent::OutOfSteps);
        assert_eq!(simulation.scenario().get(Position::new(1, 0)), Some(Marker::Chest));
        assert_eq!(
            simulation.outcome(),
            Some(&TrialOutcome {
                final_state: None,
                steps: 0,
                was_reachable: true,
            })
        );
    }

    #[rstest]
    #[case::end_trial(
        TrapRule::EndTrial,
        vec![StepEvent::Opened(Position::new(0, 0), Marker::Trap)],
        TrialClass::FalsePositive
    )]
    #[case::keep_playing(
        TrapRule::KeepPlaying,
        vec![
            StepEvent::Opened(Position::new(0, 0), Marker::Trap),
            StepEvent::Moved(Position::new(1, 0)),
            StepEvent::Opened(Position::new(2, 0), Marker::Treasure),
        ],
        TrialClass::Victory
    )]
    fn trap_rule_decides_whether_a_trap_ends_the_game(
        #[case] rule: TrapRule,
        #[case] expected: Vec<StepEvent>,
        #[case] class: TrialClass,
    ) {
        let env = scenario("CX ST CT");
        let mut simulation =
            Simulation::new(env, StrategyKind::Sort.build(0), DEFAULT_MAX_STEPS).with_trap_rule(rule);

        let mut events = Vec::new();
        while !simulation.is_finished() {
            events.push(simulation.step());
        }

        assert_eq!(events, expected);
        assert_eq!(simulation.steps(), expected.len());
        assert_eq!(simulation.outcome().map(TrialOutcome::classify), Some(class));
    }

    #[test]
    fn sprung_trap_is_remembered_at_the_step_ceiling() {
        let env = scenario("ST CX");
        let outcome = Simulation::new(env, StrategyKind::Sort.build(0), 3)
            .with_trap_rule(TrapRule::KeepPlaying)
            .run();

        assert_eq!(outcome.final_state, Some(Marker::Trap));
        assert_eq!(outcome.steps, 3);
        assert_eq!(outcome.classify(), TrialClass::FalsePositive);
    }

    #[test]
    fn unreached_treasure_counts_as_false_negative() {
        let outcome = TrialOutcome {
            final_state: None,
            steps: DEFAULT_MAX_STEPS,
            was_reachable: true,
        };
        assert_eq!(outcome.classify(), TrialClass::FalseNegative);
    }
}
