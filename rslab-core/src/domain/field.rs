//! Panel field keys.
//!
//! A `Field` is the first level of the (Field, Ticker) column key. Raw price
//! fields come from the market-data collaborator; indicator fields embed their
//! parameters so two configurations of the same indicator never collide.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
    Sma { window: usize },
    BbMid { window: usize },
    BbUpper { window: usize },
    BbLower { window: usize },
    Macd { fast: usize, slow: usize },
    MacdSignal { signal: usize },
    MacdHist { fast: usize, slow: usize, signal: usize },
    Atr { window: usize },
    StopAtr { window: usize, multiplier: OrderedFloat<f64> },
}

impl Field {
    /// Raw OHLCV fields in canonical order.
    pub const PRICE_FIELDS: [Field; 6] = [
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::AdjClose,
        Field::Volume,
    ];

    pub fn stop_atr(window: usize, multiplier: f64) -> Self {
        Field::StopAtr {
            window,
            multiplier: OrderedFloat(multiplier),
        }
    }

    /// True for fields produced by an indicator rather than the data provider.
    pub fn is_indicator(&self) -> bool {
        !Self::PRICE_FIELDS.contains(self)
    }

    pub fn is_stop_atr(&self) -> bool {
        matches!(self, Field::StopAtr { .. })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Open => write!(f, "Open"),
            Field::High => write!(f, "High"),
            Field::Low => write!(f, "Low"),
            Field::Close => write!(f, "Close"),
            Field::AdjClose => write!(f, "Adj Close"),
            Field::Volume => write!(f, "Volume"),
            Field::Sma { window } => write!(f, "SMA_{window}"),
            Field::BbMid { window } => write!(f, "BB_MID_{window}"),
            Field::BbUpper { window } => write!(f, "BB_UPPER_{window}"),
            Field::BbLower { window } => write!(f, "BB_LOWER_{window}"),
            Field::Macd { fast, slow } => write!(f, "MACD_{fast}_{slow}"),
            Field::MacdSignal { signal } => write!(f, "MACD_SIGNAL_{signal}"),
            Field::MacdHist { fast, slow, signal } => write!(f, "MACD_HIST_{fast}_{slow}_{signal}"),
            Field::Atr { window } => write!(f, "ATR_{window}"),
            Field::StopAtr { window, multiplier } => {
                write!(f, "STOP_ATR_{window}_{}", multiplier.into_inner())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field name: {0}")]
pub struct ParseFieldError(pub String);

fn parse_usize(part: &str, raw: &str) -> Result<usize, ParseFieldError> {
    part.parse::<usize>()
        .map_err(|_| ParseFieldError(raw.to_string()))
}

impl FromStr for Field {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        match raw {
            "Open" => return Ok(Field::Open),
            "High" => return Ok(Field::High),
            "Low" => return Ok(Field::Low),
            "Close" => return Ok(Field::Close),
            "Adj Close" | "AdjClose" | "adj_close" => return Ok(Field::AdjClose),
            "Volume" => return Ok(Field::Volume),
            _ => {}
        }

        let err = || ParseFieldError(raw.to_string());

        // Longest prefixes first: MACD_SIGNAL_ and MACD_HIST_ also start with MACD_.
        if let Some(rest) = raw.strip_prefix("STOP_ATR_") {
            let (window, multiplier) = rest.split_once('_').ok_or_else(err)?;
            let multiplier: f64 = multiplier.parse().map_err(|_| err())?;
            return Ok(Field::stop_atr(parse_usize(window, raw)?, multiplier));
        }
        if let Some(rest) = raw.strip_prefix("MACD_SIGNAL_") {
            return Ok(Field::MacdSignal {
                signal: parse_usize(rest, raw)?,
            });
        }
        if let Some(rest) = raw.strip_prefix("MACD_HIST_") {
            let parts: Vec<&str> = rest.split('_').collect();
            if parts.len() != 3 {
                return Err(err());
            }
            return Ok(Field::MacdHist {
                fast: parse_usize(parts[0], raw)?,
                slow: parse_usize(parts[1], raw)?,
                signal: parse_usize(parts[2], raw)?,
            });
        }
        if let Some(rest) = raw.strip_prefix("MACD_") {
            let (fast, slow) = rest.split_once('_').ok_or_else(err)?;
            return Ok(Field::Macd {
                fast: parse_usize(fast, raw)?,
                slow: parse_usize(slow, raw)?,
            });
        }
        if let Some(rest) = raw.strip_prefix("BB_MID_") {
            return Ok(Field::BbMid {
                window: parse_usize(rest, raw)?,
            });
        }
        if let Some(rest) = raw.strip_prefix("BB_UPPER_") {
            return Ok(Field::BbUpper {
                window: parse_usize(rest, raw)?,
            });
        }
        if let Some(rest) = raw.strip_prefix("BB_LOWER_") {
            return Ok(Field::BbLower {
                window: parse_usize(rest, raw)?,
            });
        }
        if let Some(rest) = raw.strip_prefix("SMA_") {
            return Ok(Field::Sma {
                window: parse_usize(rest, raw)?,
            });
        }
        if let Some(rest) = raw.strip_prefix("ATR_") {
            return Ok(Field::Atr {
                window: parse_usize(rest, raw)?,
            });
        }

        Err(err())
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
