//! Focus minutes value object backed by exact decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use super::Timestamp;

/// An amount of focus time, in minutes.
///
/// Stored with two fractional digits, matching the `NUMERIC(10,2)` columns
/// that persist it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FocusMinutes(Decimal);

impl FocusMinutes {
    pub const SCALE: u32 = 2;

    pub const ZERO: FocusMinutes = FocusMinutes(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Builds minutes from an integer number of hundredths (`12000` is 120.00).
    pub fn from_hundredths(hundredths: i64) -> Self {
        Self(Decimal::new(hundredths, Self::SCALE))
    }

    /// Elapsed minutes between two instants, rounded to two decimals.
    ///
    /// Zero when `end` is absent.
    pub fn between(start: &Timestamp, end: Option<&Timestamp>) -> Self {
        match end {
            Some(end) => {
                let millis = end.duration_since(start).num_milliseconds();
                let minutes = Decimal::from(millis) / Decimal::from(60_000);
                Self(minutes.round_dp(Self::SCALE))
            }
            None => Self::ZERO,
        }
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl Add for FocusMinutes {
    type Output = FocusMinutes;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for FocusMinutes {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for FocusMinutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
