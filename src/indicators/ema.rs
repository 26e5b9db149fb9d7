// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Formula:
//   alpha = 2 / (span + 1)
//   EMA_t = alpha * price_t + (1 - alpha) * EMA_{t-1}
//
// The recurrence is seeded with the first price (no SMA warm-up), so the
// output has exactly one value per input and is order-sensitive.
// =============================================================================

/// Smoothing factor for a given span.
pub fn smoothing_factor(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Compute the EMA series for `values` with the given `span`.
///
/// Returns an empty `Vec` when `values` is empty or `span == 0`.  If a
/// non-finite value is produced the series stops there.
pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    let Some(&seed) = values.first() else {
        return Vec::new();
    };
    if span == 0 || !seed.is_finite() {
        return Vec::new();
    }

    let alpha = smoothing_factor(span);
    let mut result = Vec::with_capacity(values.len());
    result.push(seed);

    let mut prev = seed;
    for &value in &values[1..] {
        let ema = alpha * value + (1.0 - alpha) * prev;
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev = ema;
    }

    result
}
