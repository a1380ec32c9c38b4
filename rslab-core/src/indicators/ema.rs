//! Exponentially weighted moving averages.
//!
//! Recursive: y[t] = alpha * x[t] + (1 - alpha) * y[t-1], seeded with the
//! first defined input (y[t0] = x[t0]). No SMA seed and no warmup beyond
//! leading NaNs. A NaN input yields a NaN output at that row only; the state
//! carries over to the next defined input.

/// EWMA with an explicit smoothing factor in (0, 1].
pub fn ewm(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    let mut prev: Option<f64> = None;
    for (out, &x) in result.iter_mut().zip(values) {
        if x.is_nan() {
            continue;
        }
        let y = match prev {
            None => x,
            Some(p) => alpha * x + (1.0 - alpha) * p,
        };
        *out = y;
        prev = Some(y);
    }
    result
}

/// EMA by span: alpha = 2 / (span + 1).
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    ewm(values, 2.0 / (span as f64 + 1.0))
}
