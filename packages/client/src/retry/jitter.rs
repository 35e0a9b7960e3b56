//! Bounded jitter for backoff delays and submission desynchronization.

/// Draw a jitter sample in `[-max, max]` seconds.
///
/// The sign is fair; the magnitude follows a log-normal whose median sits
/// near 5% of `max` and whose spread widens with `max`, clipped at the
/// bound. Sampling runs on `fastrand`'s per-thread generator, which is
/// seeded from system entropy for each thread, so concurrent submitters do
/// not share a jitter stream.
#[must_use]
pub fn jitter(max: f64) -> f64 {
    let max = max.max(0.0);
    if max == 0.0 {
        return 0.0;
    }

    // Spread scales with the bound, referenced against 1 ms.
    let sigma = (0.4 + 0.3 * (max / 1e-3).ln_1p()).clamp(0.3, 1.5);
    // Median at roughly 5% of the bound.
    let mu = (0.05 * max + 1e-12).ln();

    let mut magnitude = (mu + sigma * standard_normal()).exp();
    if magnitude > max {
        magnitude = max;
    }

    if fastrand::bool() {
        magnitude
    } else {
        -magnitude
    }
}

/// One standard-normal sample via the Box-Muller transform.
fn standard_normal() -> f64 {
    let u1 = fastrand::f64().max(f64::MIN_POSITIVE);
    let u2 = fastrand::f64();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bound_yields_zero() {
        assert_eq!(jitter(0.0), 0.0);
        assert_eq!(jitter(-3.0), 0.0);
    }

    #[test]
    fn samples_stay_within_the_bound() {
        for _ in 0..10_000 {
            let j = jitter(2.5);
            assert!(j.abs() <= 2.5, "sample escaped the bound: {j}");
        }
    }

    #[test]
    fn both_signs_occur() {
        let mut pos = 0usize;
        let mut neg = 0usize;
        for _ in 0..2_000 {
            if jitter(1.0) >= 0.0 {
                pos += 1;
            } else {
                neg += 1;
            }
        }
        assert!(pos > 200, "positive samples too rare: {pos}");
        assert!(neg > 200, "negative samples too rare: {neg}");
    }

    #[test]
    fn magnitudes_skew_small_relative_to_the_bound() {
        let mut samples: Vec<f64> = (0..4_001).map(|_| jitter(10.0).abs()).collect();
        samples.sort_by(|a, b| a.total_cmp(b));
        let median = samples[samples.len() / 2];
        // Median sits near 5% of the bound; allow a generous band.
        assert!(median < 5.0, "median unexpectedly large: {median}");
        assert!(median > 0.0);
    }
}
