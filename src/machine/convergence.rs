/// One step of rate-limited approach toward `target`, bounded to
/// `[floor, ceiling]`.
///
/// The upper bound is applied before the lower one, so a `floor` above
/// `ceiling` wins rather than panicking.
pub fn converge(value: f64, floor: f64, ceiling: f64, target: f64, rate: f64) -> f64 {
    let delta = (target - value) * rate;
    (value + delta).min(ceiling).max(floor)
}

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
