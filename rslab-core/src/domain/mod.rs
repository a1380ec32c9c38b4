//! Domain types: field keys, bars and the (Field, Ticker) panel.

pub mod bar;
pub mod field;
pub mod panel;

pub use bar::PriceBar;
pub use field::{Field, ParseFieldError};
pub use panel::{ColumnKey, Panel};
