//! Runs the six tests over one sequence and collects a report.

use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_APEN_ORDER, TestError, TestResult, approximate_entropy_with_order,
    chi_square_frequency, correlation, kolmogorov_smirnov, runs_above_mean, spectral,
};

const CONFIG: &str = "Battery Config";

/// Tunables for [`run_battery`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    /// Pattern length for approximate entropy.
    pub apen_order: usize,
    /// Threshold used by the report helpers. The tests themselves ignore it.
    pub significance: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            apen_order: DEFAULT_APEN_ORDER,
            significance: 0.01,
        }
    }
}

impl BatteryConfig {
    pub fn validate(&self) -> Result<(), TestError> {
        if self.apen_order == 0 {
            return Err(TestError::InvalidParameter {
                test: CONFIG,
                reason: "apen_order must be at least 1".to_string(),
            });
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(TestError::InvalidParameter {
                test: CONFIG,
                reason: format!("significance {} outside (0, 1)", self.significance),
            });
        }
        Ok(())
    }
}

/// Outcome of one test within a battery run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryEntry {
    pub name: &'static str,
    pub result: Result<TestResult, TestError>,
}

/// Every test's outcome for one sequence, in battery order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryReport {
    pub sample_size: usize,
    pub config: BatteryConfig,
    pub entries: Vec<BatteryEntry>,
}

impl BatteryReport {
    pub fn get(&self, name: &str) -> Option<&BatteryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// p-value tests at or above the configured significance.
    pub fn passed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(&e.result, Ok(r) if r.passes(self.config.significance) == Some(true)))
            .count()
    }

    /// p-value tests below the configured significance.
    pub fn failed(&self) -> Vec<&TestResult> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().ok())
            .filter(|r| r.passes(self.config.significance) == Some(false))
            .collect()
    }

    /// Tests that refused to run.
    pub fn errors(&self) -> Vec<&TestError> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().err())
            .collect()
    }

    /// Share of p-value tests that passed, 0-100.
    ///
    /// A p-value test that errored counts as a failure. Approximate entropy
    /// reports a score, so it is never graded, whether it ran or errored.
    pub fn quality_score(&self) -> f64 {
        let graded = self
            .entries
            .iter()
            .filter(|e| e.name != crate::APPROXIMATE_ENTROPY)
            .count();
        if graded == 0 {
            return 0.0;
        }
        100.0 * self.passed_count() as f64 / graded as f64
    }
}

type TestFn = Box<dyn Fn(&[f64]) -> Result<TestResult, TestError> + Send + Sync>;

/// The six tests in report order.
fn suite(config: &BatteryConfig) -> Vec<(&'static str, TestFn)> {
    let order = config.apen_order;
    vec![
        (crate::FREQUENCY, Box::new(chi_square_frequency) as TestFn),
        (crate::KOLMOGOROV_SMIRNOV, Box::new(kolmogorov_smirnov)),
        (crate::RUNS, Box::new(runs_above_mean)),
        (crate::SPECTRAL, Box::new(spectral)),
        (
            crate::APPROXIMATE_ENTROPY,
            Box::new(move |seq: &[f64]| approximate_entropy_with_order(seq, order)),
        ),
        (crate::CORRELATION, Box::new(correlation)),
    ]
}

fn record(name: &'static str, result: Result<TestResult, TestError>) -> BatteryEntry {
    match &result {
        Ok(r) => log::debug!("{name}: {} (statistic={:.6}, {})", r.outcome, r.statistic, r.details),
        Err(e) => log::warn!("{e}"),
    }
    BatteryEntry { name, result }
}

/// Run the complete battery on one sequence.
pub fn run_battery(seq: &[f64], config: &BatteryConfig) -> Result<BatteryReport, TestError> {
    config.validate()?;
    let entries = suite(config)
        .into_iter()
        .map(|(name, test)| record(name, test(seq)))
        .collect();
    Ok(BatteryReport {
        sample_size: seq.len(),
        config: *config,
        entries,
    })
}

/// Same report as [`run_battery`], with every test on its own scoped thread.
pub fn run_battery_parallel(
    seq: &[f64],
    config: &BatteryConfig,
) -> Result<BatteryReport, TestError> {
    config.validate()?;
    let tests = suite(config);
    let entries = std::thread::scope(|s| {
        let handles: Vec<_> = tests
            .iter()
            .map(|(name, test)| (*name, s.spawn(move || test(seq))))
            .collect();
        handles
            .into_iter()
            .map(|(name, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                record(name, result)
            })
            .collect()
    });
    Ok(BatteryReport {
        sample_size: seq.len(),
        config: *config,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Outcome;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| ((i * 7919) % n) as f64 / n as f64).collect()
    }

    #[test]
    fn report_keeps_battery_order() {
        let report = run_battery(&ramp(256), &BatteryConfig::default()).unwrap();
        let names: Vec<&str> = report.entries.iter().map(|e| e.name).collect();
        assert_eq!(
            names,
            vec![
                crate::FREQUENCY,
                crate::KOLMOGOROV_SMIRNOV,
                crate::RUNS,
                crate::SPECTRAL,
                crate::APPROXIMATE_ENTROPY,
                crate::CORRELATION,
            ]
        );
        assert_eq!(report.sample_size, 256);
    }

    #[test]
    fn apen_order_is_forwarded() {
        let config = BatteryConfig {
            apen_order: 3,
            ..BatteryConfig::default()
        };
        let report = run_battery(&ramp(64), &config).unwrap();
        let entry = report.get(crate::APPROXIMATE_ENTROPY).unwrap();
        let result = entry.result.as_ref().unwrap();
        assert!(result.details.ends_with("m=3"));
        assert!(matches!(result.outcome, Outcome::Score(_)));
    }

    #[test]
    fn errors_are_captured_per_test() {
        let report = run_battery(&[0.5, 0.5], &BatteryConfig::default()).unwrap();
        // Correlation needs 3 values, approximate entropy needs m + 1 = 3.
        assert_eq!(report.errors().len(), 2);
        assert!(report.get(crate::FREQUENCY).unwrap().result.is_ok());
    }

    #[test]
    fn invalid_config_rejected() {
        let zero_order = BatteryConfig {
            apen_order: 0,
            ..BatteryConfig::default()
        };
        assert!(run_battery(&ramp(16), &zero_order).is_err());

        let bad_alpha = BatteryConfig {
            significance: 1.5,
            ..BatteryConfig::default()
        };
        assert!(matches!(
            bad_alpha.validate(),
            Err(TestError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn parallel_matches_sequential() {
        let seq = ramp(1024);
        let config = BatteryConfig::default();
        assert_eq!(
            run_battery(&seq, &config).unwrap(),
            run_battery_parallel(&seq, &config).unwrap()
        );
    }

    #[test]
    fn quality_score_counts_errors_as_failures() {
        // Approximate entropy and correlation both error on two values.
        let report = run_battery(&[0.6, 0.4], &BatteryConfig::default()).unwrap();
        let expected = 100.0 * report.passed_count() as f64 / 5.0;
        assert!((report.quality_score() - expected).abs() < 1e-12);
        assert_eq!(
            report.passed_count() + report.failed().len() + report.errors().len(),
            report.entries.len()
        );
    }

    #[test]
    fn quality_score_skips_entropy_score() {
        let report = run_battery(&ramp(256), &BatteryConfig::default()).unwrap();
        assert!(report.errors().is_empty());
        assert_eq!(report.passed_count() + report.failed().len(), 5);
        let expected = 100.0 * report.passed_count() as f64 / 5.0;
        assert!((report.quality_score() - expected).abs() < 1e-12);
    }

    #[test]
    fn entropy_error_does_not_move_denominator() {
        let seq = ramp(256);
        let ran = run_battery(&seq, &BatteryConfig::default()).unwrap();
        let errored = run_battery(
            &seq,
            &BatteryConfig {
                apen_order: 256,
                ..BatteryConfig::default()
            },
        )
        .unwrap();
        assert!(ran.get(crate::APPROXIMATE_ENTROPY).unwrap().result.is_ok());
        assert!(errored.get(crate::APPROXIMATE_ENTROPY).unwrap().result.is_err());
        assert_eq!(ran.passed_count(), errored.passed_count());
        assert_eq!(ran.quality_score(), errored.quality_score());
    }

    #[test]
    fn empty_report_scores_zero() {
        let report = BatteryReport {
            sample_size: 0,
            config: BatteryConfig::default(),
            entries: Vec::new(),
        };
        assert_eq!(report.quality_score(), 0.0);
    }
}
