//! Exact probability that at least `k` of the sensors detect an event, by
//! inclusion–exclusion over "exactly j detections" terms, plus its analytic
//! derivative with respect to a single sensor's detection probability.
//!
//! One generic implementation parameterized by `k` replaces the per-k
//! expansions that tend to accumulate in this kind of code; the expanded
//! forms survive only as regression tests against the generic version.

use itertools::Itertools;

/// P(exactly `j` of the sensors detect), summing over all size-`j` subsets
/// the product of member probabilities times the complement product of the
/// rest. O(C(n, j)·n); n is small (<= 20).
pub fn p_exactly(probs: &[f64], j: usize) -> f64 {
    let n = probs.len();
    if j > n {
        return 0.;
    }
    let mut total = 0.;
    for subset in (0..n).combinations(j) {
        let mut members = subset.iter().copied().peekable();
        let mut prod = 1.;
        for (i, &p) in probs.iter().enumerate() {
            if members.peek() == Some(&i) {
                members.next();
                prod *= p;
            } else {
                prod *= 1. - p;
            }
        }
        total += prod;
    }
    total
}

/// P(at least `k` of the sensors detect): `1 - Σ_{j<k} P(exactly j)`.
/// `k = 0` is trivially 1; `k > probs.len()` is 0.
pub fn p_at_least(probs: &[f64], k: usize) -> f64 {
    if k == 0 {
        return 1.;
    }
    if k > probs.len() {
        return 0.;
    }
    let mut p = 1.;
    for j in 0..k {
        p -= p_exactly(probs, j);
    }
    p
}

/// Clamp a confidence level to the sensor count, so a 4-of-R target degrades
/// to 3-of-3 (and to 1-of-1 for a single recorder) instead of becoming
/// combinatorially impossible.
pub fn effective_level(k: usize, num_sensors: usize) -> usize {
    k.min(num_sensors).max(1)
}

/// P(exactly `j` detections among the sensors other than `skip`).
pub fn p_exactly_excluding(probs: &[f64], skip: usize, j: usize) -> f64 {
    let n = probs.len();
    if n == 0 {
        return if j == 0 { 1. } else { 0. };
    }
    if j > n - 1 {
        return 0.;
    }
    let mut total = 0.;
    for subset in (0..n).filter(|&i| i != skip).combinations(j) {
        let mut members = subset.iter().copied().peekable();
        let mut prod = 1.;
        for (i, &p) in probs.iter().enumerate() {
            if i == skip {
                continue;
            }
            if members.peek() == Some(&i) {
                members.next();
                prod *= p;
            } else {
                prod *= 1. - p;
            }
        }
        total += prod;
    }
    total
}

/// Analytic ∂P(≥k)/∂p_a.
///
/// Differentiating `1 - Σ_{j<k} P(exactly j)` term by term splits each
/// subset sum by whether sensor `a` is a member; the signed sub-terms
/// telescope, leaving exactly P(k−1 detections among the other sensors).
pub fn at_least_grad(probs: &[f64], a: usize, k: usize) -> f64 {
    if k == 0 || k > probs.len() {
        return 0.;
    }
    p_exactly_excluding(probs, a, k - 1)
}
