//! Serialization of possibly undefined numbers.
//!
//! Internally an undefined value is `f64::NAN`. At the serialization boundary
//! every non-finite number (NaN, +/-inf) is written as `null`.

use serde::ser::{SerializeSeq, Serializer};

/// `Some(x)` when `x` is finite.
pub fn finite(x: f64) -> Option<f64> {
    x.is_finite().then_some(x)
}

/// Round half away from zero to `decimals` places; non-finite input passes through.
pub fn round_to(x: f64, decimals: u32) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let factor = 10f64.powi(decimals as i32);
    (x * factor).round() / factor
}

pub fn serialize_f64<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    match finite(*value) {
        Some(x) => serializer.serialize_f64(x),
        None => serializer.serialize_none(),
    }
}

pub fn serialize_f64_rows<S: Serializer>(
    rows: &[Vec<f64>],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(rows.len()))?;
    for row in rows {
        let row: Vec<Option<f64>> = row.iter().map(|v| finite(*v)).collect();
        seq.serialize_element(&row)?;
    }
    seq.end()
}
