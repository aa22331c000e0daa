//! Statistical randomness test battery for real-valued sequences.
//!
//! Six independent tests score a sequence for uniformity, independence,
//! periodicity and unpredictability. Each test is a pure function of a borrowed
//! `&[f64]` and returns a [`TestResult`] holding either a p-value or, for
//! approximate entropy, a raw score. No test decides pass/fail; callers pick
//! the significance threshold.
//!
//! ```
//! use randaudit_tests::{chi_square_frequency, Outcome};
//!
//! let result = chi_square_frequency(&[0.1, 0.1, 0.1, 0.9, 0.9, 0.9]).unwrap();
//! assert_eq!(result.outcome, Outcome::PValue(1.0));
//! ```

mod battery;
mod kolmogorov;

use rustfft::{FftPlanner, num_complex::Complex};
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};
use std::collections::HashMap;
use thiserror::Error;

pub use battery::{BatteryConfig, BatteryEntry, BatteryReport, run_battery, run_battery_parallel};

// ═══════════════════════════════════════════════════════════════════════════════
// Core types
// ═══════════════════════════════════════════════════════════════════════════════

pub const FREQUENCY: &str = "Chi-Square Frequency";
pub const KOLMOGOROV_SMIRNOV: &str = "Kolmogorov-Smirnov";
pub const RUNS: &str = "Runs Above/Below Mean";
pub const SPECTRAL: &str = "Spectral (DFT)";
pub const APPROXIMATE_ENTROPY: &str = "Approximate Entropy";
pub const CORRELATION: &str = "Lag-1 Correlation";

/// Pattern length used by [`approximate_entropy`].
pub const DEFAULT_APEN_ORDER: usize = 2;

/// What a test reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    /// Probability in `[0, 1]` of a statistic at least this extreme under the null.
    PValue(f64),
    /// Unbounded score with no probability attached.
    Score(f64),
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PValue(p) => write!(f, "p={p:.6}"),
            Self::Score(s) => write!(f, "score={s:.6}"),
        }
    }
}

/// Result of a single randomness test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub name: &'static str,
    pub outcome: Outcome,
    /// The test statistic the outcome was derived from.
    pub statistic: f64,
    pub details: String,
}

impl TestResult {
    fn p_value_result(name: &'static str, p: f64, statistic: f64, details: String) -> Self {
        Self {
            name,
            outcome: Outcome::PValue(p),
            statistic,
            details,
        }
    }

    pub fn p_value(&self) -> Option<f64> {
        match self.outcome {
            Outcome::PValue(p) => Some(p),
            Outcome::Score(_) => None,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self.outcome {
            Outcome::Score(s) => Some(s),
            Outcome::PValue(_) => None,
        }
    }

    /// `Some(p >= threshold)` for p-value tests, `None` for scores.
    pub fn passes(&self, threshold: f64) -> Option<bool> {
        self.p_value().map(|p| p >= threshold)
    }
}

/// Why a test refused to produce a result.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum TestError {
    #[error("{test}: insufficient data, need at least {needed} values, got {got}")]
    InsufficientData {
        test: &'static str,
        needed: usize,
        got: usize,
    },
    #[error("{test}: degenerate input, {reason}")]
    DegenerateInput {
        test: &'static str,
        reason: &'static str,
    },
    #[error("{test}: non-finite value {value} at index {index}")]
    NumericDomain {
        test: &'static str,
        index: usize,
        value: f64,
    },
    #[error("{test}: invalid parameter, {reason}")]
    InvalidParameter { test: &'static str, reason: String },
    #[error("{test}: {message}")]
    Distribution { test: &'static str, message: String },
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Reject undersized or non-finite input before any statistic is computed.
fn validate(test: &'static str, seq: &[f64], needed: usize) -> Result<(), TestError> {
    if seq.len() < needed {
        return Err(TestError::InsufficientData {
            test,
            needed,
            got: seq.len(),
        });
    }
    if let Some((index, &value)) = seq.iter().enumerate().find(|(_, x)| !x.is_finite()) {
        return Err(TestError::NumericDomain { test, index, value });
    }
    Ok(())
}

/// Arithmetic mean. Falls back to summing `x / n` when the plain sum
/// overflows, so large finite inputs still get a finite mean.
fn mean(seq: &[f64]) -> f64 {
    let n = seq.len() as f64;
    let sum = seq.iter().sum::<f64>();
    if sum.is_finite() {
        sum / n
    } else {
        seq.iter().map(|x| x / n).sum()
    }
}

/// Deviations from the mean, rescaled so the largest has magnitude 1.
///
/// The series is first divided by its largest magnitude, which keeps both the
/// centring and the later products inside the normal `f64` range.
fn standardized_deviations(series: &[f64]) -> Vec<f64> {
    let peak = series.iter().fold(0.0f64, |m, x| m.max(x.abs()));
    let unit: Vec<f64> = series.iter().map(|x| x / peak).collect();
    let centre = mean(&unit);
    let deviations: Vec<f64> = unit.iter().map(|x| x - centre).collect();
    let spread = deviations.iter().fold(0.0f64, |m, d| m.max(d.abs()));
    deviations.iter().map(|d| d / spread).collect()
}

/// Map a statrs constructor error into [`TestError::Distribution`].
fn distribution_error<E: std::fmt::Display>(test: &'static str) -> impl Fn(E) -> TestError {
    move |e| TestError::Distribution {
        test,
        message: e.to_string(),
    }
}

/// `2 · P(Z > |z|)` for a standard normal `Z`.
fn two_tailed_normal(z: f64) -> f64 {
    (2.0 * Normal::standard().sf(z.abs())).min(1.0)
}

// ═══════════════════════════════════════════════════════════════════════════════
// 1. FREQUENCY
// ═══════════════════════════════════════════════════════════════════════════════

/// Chi-square frequency test on the sequence binarized at 0.5.
///
/// Values `> 0.5` count as ones, everything else as zeros. With `n/2` expected
/// per symbol the statistic has one degree of freedom.
pub fn chi_square_frequency(seq: &[f64]) -> Result<TestResult, TestError> {
    let name = FREQUENCY;
    validate(name, seq, 2)?;
    let n = seq.len();
    let ones = seq.iter().filter(|&&x| x > 0.5).count();
    let zeros = n - ones;
    let expected = n as f64 / 2.0;
    let chi2 = [zeros, ones]
        .iter()
        .map(|&observed| {
            let diff = observed as f64 - expected;
            diff * diff / expected
        })
        .sum::<f64>();

    let dist = ChiSquared::new(1.0).map_err(distribution_error(name))?;
    let p = if chi2 > 0.0 { dist.sf(chi2) } else { 1.0 };
    Ok(TestResult::p_value_result(
        name,
        p,
        chi2,
        format!("zeros={zeros}, ones={ones}, n={n}"),
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// 2. UNIFORMITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Two-sided one-sample Kolmogorov-Smirnov test against U[0, 1).
pub fn kolmogorov_smirnov(seq: &[f64]) -> Result<TestResult, TestError> {
    let name = KOLMOGOROV_SMIRNOV;
    validate(name, seq, 2)?;
    let n = seq.len();
    let mut sorted = seq.to_vec();
    sorted.sort_by(f64::total_cmp);

    // D = max |F_n(x) - F(x)|, checked on both sides of each step.
    let nf = n as f64;
    let d_max = sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let f_x = x.clamp(0.0, 1.0);
            let above = (i + 1) as f64 / nf - f_x;
            let below = f_x - i as f64 / nf;
            above.max(below)
        })
        .fold(0.0f64, f64::max);

    let p = kolmogorov::two_sided_sf(n, d_max);
    Ok(TestResult::p_value_result(
        name,
        p,
        d_max,
        format!("D={d_max:.6}, n={n}"),
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// 3. INDEPENDENCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Number of maximal blocks on the same side of `reference`.
///
/// A value is "below" when `x < reference`; a value equal to the reference sits
/// with the values above it.
fn count_runs(seq: &[f64], reference: f64) -> usize {
    1 + seq
        .windows(2)
        .filter(|w| (w[0] < reference) != (w[1] < reference))
        .count()
}

/// Runs above and below the sample mean.
///
/// Expected runs `(2n - 1) / 3`, variance `(16n - 29) / 90`; two-tailed normal.
pub fn runs_above_mean(seq: &[f64]) -> Result<TestResult, TestError> {
    let name = RUNS;
    validate(name, seq, 2)?;
    let n = seq.len() as f64;
    let runs = count_runs(seq, mean(seq));
    let expected = (2.0 * n - 1.0) / 3.0;
    let variance = (16.0 * n - 29.0) / 90.0;
    let z = (runs as f64 - expected) / variance.sqrt();
    let p = two_tailed_normal(z);
    Ok(TestResult::p_value_result(
        name,
        p,
        z,
        format!("runs={runs}, expected={expected:.2}"),
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// 4. PERIODICITY
// ═══════════════════════════════════════════════════════════════════════════════

/// DFT peak-count test on the mean-centred sequence.
///
/// Counts bins among the first `n/2` whose magnitude exceeds the 95th
/// percentile of the standard normal, and compares the count with
/// `0.05 · n/2` under a binomial-normal approximation.
pub fn spectral(seq: &[f64]) -> Result<TestResult, TestError> {
    let name = SPECTRAL;
    validate(name, seq, 2)?;
    let n = seq.len();
    let centre = mean(seq);
    let mut buffer: Vec<Complex<f64>> = seq
        .iter()
        .map(|&x| Complex {
            re: x - centre,
            im: 0.0,
        })
        .collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let half = n / 2;
    let threshold = Normal::standard().inverse_cdf(0.95);
    let peaks = buffer[..half]
        .iter()
        .filter(|c| c.norm() > threshold)
        .count();

    let expected = 0.05 * (n as f64 / 2.0);
    let variance = expected * 0.95;
    let z = (peaks as f64 - expected) / variance.sqrt();
    let p = two_tailed_normal(z);
    Ok(TestResult::p_value_result(
        name,
        p,
        z,
        format!("peaks={peaks}/{half}, expected={expected:.2}, threshold={threshold:.4}"),
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// 5. COMPLEXITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Hash key for a value: its bit pattern, with `-0.0` folded into `0.0`.
fn pattern_key(x: f64) -> u64 {
    if x == 0.0 { 0 } else { x.to_bits() }
}

/// `Σ -p ln p` over the distinct overlapping windows of length `len`.
fn phi(keys: &[u64], len: usize) -> f64 {
    let mut counts: HashMap<&[u64], usize> = HashMap::new();
    for window in keys.windows(len) {
        *counts.entry(window).or_insert(0) += 1;
    }
    let total = (keys.len() - len + 1) as f64;
    counts
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.ln()
        })
        .sum()
}

/// Approximate entropy with the default pattern length of 2.
pub fn approximate_entropy(seq: &[f64]) -> Result<TestResult, TestError> {
    approximate_entropy_with_order(seq, DEFAULT_APEN_ORDER)
}

/// Approximate entropy `φ(m) - φ(m+1)` for pattern length `m`.
///
/// Windows are compared by exact value. Lower scores mean more regularity.
/// The score is not clamped: finite samples of perfectly regular input can
/// land slightly below zero.
pub fn approximate_entropy_with_order(seq: &[f64], m: usize) -> Result<TestResult, TestError> {
    let name = APPROXIMATE_ENTROPY;
    if m == 0 {
        return Err(TestError::InvalidParameter {
            test: name,
            reason: "pattern length must be at least 1".to_string(),
        });
    }
    validate(name, seq, m + 1)?;
    let keys: Vec<u64> = seq.iter().map(|&x| pattern_key(x)).collect();
    let phi_m = phi(&keys, m);
    let phi_m1 = phi(&keys, m + 1);
    let apen = phi_m - phi_m1;
    Ok(TestResult {
        name,
        outcome: Outcome::Score(apen),
        statistic: apen,
        details: format!("phi(m)={phi_m:.6}, phi(m+1)={phi_m1:.6}, m={m}"),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// 6. CORRELATION
// ═══════════════════════════════════════════════════════════════════════════════

/// `|r|` within this distance of 1 is treated as perfect dependence.
const PERFECT_CORRELATION_TOLERANCE: f64 = 16.0 * f64::EPSILON;

/// Lag-1 Pearson correlation with a Student-t significance test.
///
/// `t = r · sqrt((n-2) / (1-r²))` with `n - 2` degrees of freedom. Perfect
/// linear dependence (`|r| = 1` up to rounding) reports `p = 0` with an
/// infinite statistic.
///
/// At the minimum length of 3 both lag-1 series hold two points, so `|r|` is
/// always 1 and the result is always `p = 0`, `t = ±∞`. Useful significance
/// needs considerably longer input.
///
/// `r` is computed on standardized deviations, so it does not depend on the
/// magnitude of the input.
pub fn correlation(seq: &[f64]) -> Result<TestResult, TestError> {
    let name = CORRELATION;
    validate(name, seq, 3)?;
    let n = seq.len();
    let x = &seq[..n - 1];
    let y = &seq[1..];
    if x.iter().all(|&v| v == x[0]) || y.iter().all(|&v| v == y[0]) {
        return Err(TestError::DegenerateInput {
            test: name,
            reason: "lag-1 series has zero variance",
        });
    }

    let dev_x = standardized_deviations(x);
    let dev_y = standardized_deviations(y);
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&dx, &dy) in dev_x.iter().zip(&dev_y) {
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    let r = cov / (var_x * var_y).sqrt();
    if !r.is_finite() {
        return Err(TestError::DegenerateInput {
            test: name,
            reason: "lag-1 correlation is not representable",
        });
    }
    let r = r.clamp(-1.0, 1.0);
    let df = (n - 2) as f64;
    let residual = 1.0 - r * r;

    let (t, p) = if 1.0 - r.abs() <= PERFECT_CORRELATION_TOLERANCE {
        (r.signum() * f64::INFINITY, 0.0)
    } else {
        let t = r * (df / residual).sqrt();
        let dist = StudentsT::new(0.0, 1.0, df).map_err(distribution_error(name))?;
        (t, (2.0 * dist.sf(t.abs())).min(1.0))
    };
    Ok(TestResult::p_value_result(
        name,
        p,
        t,
        format!("r={r:.6}, df={df}"),
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
