//! Monte-Carlo evaluation of the strategies.
//!
//! Every strategy plays the same number of independent trials. Each trial gets
//! a fresh scenario and a fresh strategy instance; the outcomes are folded into
//! [`StrategyMetrics`].

use std::{collections::BTreeMap, fmt};

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    environment::{Scenario, ScenarioConfig, ScenarioError},
    layout::Layout,
    simulation::{DEFAULT_MAX_STEPS, Simulation, TrialClass, TrialOutcome},
    strategy::StrategyKind,
};

pub const DEFAULT_TRIALS: usize = 100;

/// Where the scenario of each trial comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScenarioSource {
    /// A new random grid per trial.
    Generated(ScenarioConfig),
    /// The same layout every trial; `CH` chests are redrawn each time.
    Layout {
        layout: Layout,
        trap_probability: f64,
    },
}

impl Default for ScenarioSource {
    fn default() -> Self {
        ScenarioSource::Generated(ScenarioConfig::default())
    }
}

impl ScenarioSource {
    pub fn build(&self, rng: &mut StdRng) -> Result<Scenario, ScenarioError> {
        match self {
            ScenarioSource::Generated(config) => Scenario::generate(config, rng),
            ScenarioSource::Layout {
                layout,
                trap_probability,
            } => layout.instantiate(rng, *trap_probability),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub trials: usize,
    pub max_steps: usize,
    /// Base seed for every random draw. `None` picks one at random.
    pub seed: Option<u64>,
    pub source: ScenarioSource,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            trials: DEFAULT_TRIALS,
            max_steps: DEFAULT_MAX_STEPS,
            seed: None,
            source: ScenarioSource::default(),
        }
    }
}

/// Accumulated results of one strategy. Ratios are derived on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyMetrics {
    pub trials: usize,
    pub total_steps: usize,
    pub victories: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    /// Trials that opened nothing and had nothing to find.
    pub unclassified: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl StrategyMetrics {
    pub fn record(&mut self, outcome: &TrialOutcome) {
        self.trials += 1;
        self.total_steps += outcome.steps;
        match outcome.classify() {
            TrialClass::Victory => {
                self.victories += 1;
                self.true_positives += 1;
            }
            TrialClass::FalsePositive => self.false_positives += 1,
            TrialClass::FalseNegative => self.false_negatives += 1,
            TrialClass::Unclassified => self.unclassified += 1,
        }
    }

    pub fn average_steps(&self) -> f64 {
        ratio(self.total_steps, self.trials)
    }

    pub fn victory_rate(&self) -> f64 {
        ratio(self.victories, self.trials)
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }
}

/// Metrics of every analysed strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub trials: usize,
    pub results: BTreeMap<StrategyKind, StrategyMetrics>,
}

impl AnalysisReport {
    pub fn get(&self, kind: StrategyKind) -> Option<&StrategyMetrics> {
        self.results.get(&kind)
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Strategy Performance Analysis ({} games per strategy):",
            self.trials
        )?;
        writeln!(f)?;
        for (kind, metrics) in &self.results {
            writeln!(f, "Strategy: {kind}")?;
            writeln!(f, "Average Steps: {:.2}", metrics.average_steps())?;
            writeln!(f, "Victory Rate: {:.2}%", metrics.victory_rate() * 100.0)?;
            writeln!(f, "Precision: {:.2}%", metrics.precision() * 100.0)?;
            writeln!(f, "Recall: {:.2}%", metrics.recall() * 100.0)?;
            writeln!(f, "Total Victories: {}", metrics.victories)?;
            writeln!(f, "----------------------------------------")?;
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Mixes the base seed with a stream index (splitmix64 finaliser).
fn derive_seed(base: u64, stream: u64) -> u64 {
    let mut z = base ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub struct Analyzer {
    config: AnalyzerConfig,
    base_seed: u64,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let base_seed = config.seed.unwrap_or_else(rand::random);
        Analyzer { config, base_seed }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Seed of the scenario for `trial`. Shared by all strategies so they are
    /// compared on identical grids.
    fn scenario_seed(&self, trial: usize) -> u64 {
        derive_seed(self.base_seed, trial as u64)
    }

    fn strategy_seed(&self, kind: StrategyKind, trial: usize) -> u64 {
        derive_seed(self.scenario_seed(trial), kind as u64 + 1)
    }

    /// Plays a single trial of `kind`.
    pub fn play_trial(&self, kind: StrategyKind, trial: usize) -> Result<TrialOutcome, ScenarioError> {
        let mut rng = StdRng::seed_from_u64(self.scenario_seed(trial));
        let scenario = self.config.source.build(&mut rng)?;
        let strategy = kind.build(self.strategy_seed(kind, trial));
        Ok(Simulation::new(scenario, strategy, self.config.max_steps).run())
    }

    /// Runs every trial of one strategy.
    pub fn analyze_strategy(&self, kind: StrategyKind) -> Result<StrategyMetrics, ScenarioError> {
        let mut metrics = StrategyMetrics::default();
        for trial in 0..self.config.trials {
            let outcome = self.play_trial(kind, trial)?;
            debug!(strategy = %kind, trial, ?outcome, "trial played");
            metrics.record(&outcome);
        }
        info!(
            strategy = %kind,
            victories = metrics.victories,
            average_steps = metrics.average_steps(),
            "strategy analysed"
        );
        Ok(metrics)
    }

    /// Runs every trial of each strategy in `kinds`.
    pub fn analyze(&self, kinds: &[StrategyKind]) -> Result<AnalysisReport, ScenarioError> {
        info!(
            trials = self.config.trials,
            seed = self.base_seed,
            strategies = kinds.len(),
            "starting analysis"
        );
        let mut report = AnalysisReport {
            trials: self.config.trials,
            results: BTreeMap::new(),
        };
        for &kind in kinds {
            report.results.insert(kind, self.analyze_strategy(kind)?);
        }
        Ok(report)
    }

    /// Runs every trial of every strategy.
    pub fn analyze_strategies(&self) -> Result<AnalysisReport, ScenarioError> {
        self.analyze(&StrategyKind::ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Marker;

    fn outcome(final_state: Option<Marker>, steps: usize, was_reachable: bool) -> TrialOutcome {
        TrialOutcome {
            final_state,
            steps,
            was_reachable,
        }
    }

    #[test]
    fn metrics_classify_every_outcome() {
        let mut metrics = StrategyMetrics::default();
        metrics.record(&outcome(Some(Marker::Treasure), 3, true));
        metrics.record(&outcome(Some(Marker::Treasure), 5, true));
        metrics.record(&outcome(Some(Marker::Trap), 2, false));
        metrics.record(&outcome(None, 100, true));
        metrics.record(&outcome(None, 10, false));

        assert_eq!(metrics.trials, 5);
        assert_eq!(metrics.total_steps, 120);
        assert_eq!(metrics.victories, 2);
        assert_eq!(metrics.false_positives, 1);
        assert_eq!(metrics.false_negatives, 1);
        assert_eq!(metrics.unclassified, 1);

        assert!((metrics.average_steps() - 24.0).abs() < 1e-9);
        assert!((metrics.victory_rate() - 0.4).abs() < 1e-9);
        assert!((metrics.precision() - 2.0 / 3.0).abs() < 1e-9);
        assert!((metrics.recall() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_denominators_yield_zero() {
        let metrics = StrategyMetrics::default();
        assert_eq!(metrics.average_steps(), 0.0);
        assert_eq!(metrics.precision(), 0.0);
        assert_eq!(metrics.recall(), 0.0);
    }

    #[test]
    fn report_prints_two_decimals() {
        let mut metrics = StrategyMetrics::default();
        metrics.record(&outcome(Some(Marker::Treasure), 1, true));
        metrics.record(&outcome(Some(Marker::Trap), 2, true));
        metrics.record(&outcome(None, 4, true));

        let report = AnalysisReport {
            trials: 3,
            results: BTreeMap::from([(StrategyKind::Rollback, metrics)]),
        };
        let text = report.to_string();

        assert!(text.contains("(3 games per strategy)"));
        assert!(text.contains("Strategy: Rollback"));
        assert!(text.contains("Average Steps: 2.33"));
        assert!(text.contains("Victory Rate: 33.33%"));
        assert!(text.contains("Precision: 50.00%"));
        assert!(text.contains("Recall: 50.00%"));
        assert!(text.contains("Total Victories: 1"));
    }

    #[test]
    fn derived_seeds_differ_per_stream() {
        assert_ne!(derive_seed(1, 0), derive_seed(1, 1));
        assert_ne!(derive_seed(1, 0), derive_seed(2, 0));
        assert_eq!(derive_seed(7, 3), derive_seed(7, 3));
    }

    #[test]
    fn fixed_seed_reproduces_the_report() {
        let config = AnalyzerConfig {
            trials: 10,
            seed: Some(1234),
            ..AnalyzerConfig::default()
        };
        let first = Analyzer::new(config.clone())
            .analyze_strategies()
            .expect("default scenarios fit");
        let second = Analyzer::new(config)
            .analyze_strategies()
            .expect("default scenarios fit");
        assert_eq!(first, second);
    }
}
