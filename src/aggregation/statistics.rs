use crate::models::{GlucoseSample, GlucoseStatistics};

/// Mean, population SD and CV over `samples`.
///
/// Mean needs one sample and SD needs two; CV needs both plus a positive mean.
pub fn compute_statistics(samples: &[GlucoseSample]) -> GlucoseStatistics {
    let Some(first) = samples.first().map(|s| s.value_mgdl) else {
        return GlucoseStatistics::EMPTY;
    };
    // Summing and dividing a repeated fraction does not round-trip exactly.
    if samples.iter().all(|s| s.value_mgdl == first) {
        let sd = (samples.len() >= 2).then_some(0.0);
        return GlucoseStatistics::from_mean_sd(Some(first), sd);
    }

    let n = samples.len() as f64;
    let mean = samples.iter().map(|s| s.value_mgdl).sum::<f64>() / n;

    let sd = if samples.len() >= 2 {
        let variance = samples
            .iter()
            .map(|s| {
                let delta = s.value_mgdl - mean;
                delta * delta
            })
            .sum::<f64>()
            / n;
        Some(variance.sqrt())
    } else {
        None
    };

    GlucoseStatistics::from_mean_sd(Some(mean), sd)
}
