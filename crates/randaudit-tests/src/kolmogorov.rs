//! Null distribution of the two-sided one-sample Kolmogorov-Smirnov statistic.
//!
//! Small and moderate `n·d` use the exact Durbin matrix method as computed by
//! Marsaglia, Tsang & Wang (2003). Large samples and far tails fall back to
//! their closed-form tail approximation or to the limiting Kolmogorov
//! distribution with Stephens' small-sample correction.

use std::f64::consts::PI;

/// Largest sample handled by the exact matrix method.
const EXACT_MAX_N: usize = 100_000;
/// Largest `n·d` handled by the exact matrix method (matrix side `2k - 1`).
const EXACT_MAX_ND: f64 = 100.0;

const RESCALE: f64 = 1e140;
const RESCALE_EXP: i32 = 140;

/// `P(D_n >= d)` for a sample of `n` values under the null hypothesis.
pub(crate) fn two_sided_sf(n: usize, d: f64) -> f64 {
    let nf = n as f64;
    if n == 0 || d.is_nan() {
        return f64::NAN;
    }
    // D_n can never fall below 1/(2n).
    if d <= 0.5 / nf {
        return 1.0;
    }
    if d >= 1.0 {
        return 0.0;
    }
    // Closed form in the extreme upper range.
    if d >= 1.0 - 1.0 / nf {
        return (2.0 * (1.0 - d).powi(n as i32)).min(1.0);
    }

    let s = d * d * nf;
    if s > 7.24 || (s > 3.76 && n > 99) {
        let tail = 2.0 * (-(2.000071 + 0.331 / nf.sqrt() + 1.409 / nf) * s).exp();
        return tail.clamp(0.0, 1.0);
    }

    if n <= EXACT_MAX_N && nf * d < EXACT_MAX_ND {
        (1.0 - durbin_cdf(n, d)).clamp(0.0, 1.0)
    } else {
        let sqrt_n = nf.sqrt();
        limiting_sf((sqrt_n + 0.12 + 0.11 / sqrt_n) * d)
    }
}

/// Survival function of the limiting Kolmogorov distribution.
fn limiting_sf(z: f64) -> f64 {
    if z < 0.042 {
        return 1.0;
    }
    if z < 1.18 {
        // Theta-function form: sqrt(2π)/z · Σ exp(-(2k-1)²π²/(8z²)).
        let y = (-PI * PI / (8.0 * z * z)).exp();
        let cdf = (2.0 * PI).sqrt() / z * (y + y.powi(9) + y.powi(25) + y.powi(49));
        (1.0 - cdf).clamp(0.0, 1.0)
    } else {
        let x = (-2.0 * z * z).exp();
        (2.0 * (x - x.powi(4) + x.powi(9) - x.powi(16))).clamp(0.0, 1.0)
    }
}

/// Exact `P(D_n < d)` via the `k·k` power of Durbin's `(2k-1)` square matrix.
fn durbin_cdf(n: usize, d: f64) -> f64 {
    let nd = n as f64 * d;
    let k = nd as usize + 1;
    let m = 2 * k - 1;
    let h = k as f64 - nd;

    let mut hm = vec![0.0; m * m];
    for i in 0..m {
        for j in 0..m {
            if i + 1 >= j {
                hm[i * m + j] = 1.0;
            }
        }
    }
    for i in 0..m {
        hm[i * m] -= h.powi(i as i32 + 1);
        hm[(m - 1) * m + i] -= h.powi((m - i) as i32);
    }
    if 2.0 * h - 1.0 > 0.0 {
        hm[(m - 1) * m] += (2.0 * h - 1.0).powi(m as i32);
    }
    for i in 0..m {
        for j in 0..m {
            if i + 1 > j {
                for g in 1..=(i + 1 - j) {
                    hm[i * m + j] /= g as f64;
                }
            }
        }
    }

    let (q, mut exponent) = matrix_power(&hm, 0, n, m);
    let mut s = q[(k - 1) * m + k - 1];
    let nf = n as f64;
    for i in 1..=n {
        s = s * i as f64 / nf;
        if s < 1.0 / RESCALE {
            s *= RESCALE;
            exponent -= RESCALE_EXP;
        }
    }
    s * 10f64.powi(exponent)
}

fn matrix_multiply(a: &[f64], b: &[f64], m: usize) -> Vec<f64> {
    let mut c = vec![0.0; m * m];
    for i in 0..m {
        for l in 0..m {
            let a_il = a[i * m + l];
            if a_il == 0.0 {
                continue;
            }
            let row = &b[l * m..(l + 1) * m];
            for (c_ij, &b_lj) in c[i * m..(i + 1) * m].iter_mut().zip(row) {
                *c_ij += a_il * b_lj;
            }
        }
    }
    c
}

/// `h^n`, returned as a mantissa matrix plus a decimal exponent so that the
/// entries never overflow.
fn matrix_power(h: &[f64], h_exp: i32, n: usize, m: usize) -> (Vec<f64>, i32) {
    if n == 1 {
        return (h.to_vec(), h_exp);
    }
    let (half, half_exp) = matrix_power(h, h_exp, n / 2, m);
    let mut out = matrix_multiply(&half, &half, m);
    let mut out_exp = 2 * half_exp;
    if n % 2 == 1 {
        out = matrix_multiply(h, &out, m);
        out_exp += h_exp;
    }
    if out[(m / 2) * m + m / 2] > RESCALE {
        for v in out.iter_mut() {
            *v /= RESCALE;
        }
        out_exp += RESCALE_EXP;
    }
    (out, out_exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn lower_bound_is_certain() {
        assert_eq!(two_sided_sf(10, 0.05), 1.0);
        assert_eq!(two_sided_sf(2, 0.25), 1.0);
    }

    #[test]
    fn beyond_one_is_impossible() {
        assert_eq!(two_sided_sf(10, 1.0), 0.0);
    }

    #[test]
    fn upper_closed_form() {
        // 2 (1 - d)^n
        assert!(close(two_sided_sf(2, 0.99), 2.0 * 0.01f64.powi(2), 1e-15));
        assert!(close(two_sided_sf(2, 0.5), 0.5, 1e-12));
    }

    #[test]
    fn exact_small_sample() {
        // n!(2ε)^n just above the 1/(2n) floor: P(D_2 < 0.3) = 2 * 0.1^2.
        assert!(close(two_sided_sf(2, 0.3), 0.98, 1e-12));
        assert!(close(two_sided_sf(5, 0.3), 0.664, 1e-9));
    }

    #[test]
    fn exact_and_limiting_agree_for_moderate_n() {
        for &(n, d) in &[(1000usize, 0.03), (500, 0.05), (2000, 0.01)] {
            let exact = 1.0 - durbin_cdf(n, d);
            let sqrt_n = (n as f64).sqrt();
            let limit = limiting_sf((sqrt_n + 0.12 + 0.11 / sqrt_n) * d);
            assert!(
                close(exact, limit, 0.01),
                "n={n}, d={d}: exact={exact}, limiting={limit}"
            );
        }
    }

    #[test]
    fn monotone_in_d() {
        let mut last = 1.0;
        for i in 1..60 {
            let d = i as f64 / 100.0;
            let p = two_sided_sf(40, d);
            assert!(p <= last + 1e-12, "sf increased at d={d}");
            last = p;
        }
    }
}
