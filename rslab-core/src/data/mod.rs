//! Turning per-ticker bar histories into a Panel.

pub mod align;

pub use align::{align_bars, AlignedBars};
