//! Fixed-point USD amounts
//!
//! Budget comparisons must be exact (0.90 + 0.15 is over a 1.00 ceiling, 0.90 + 0.10
//! is not), so costs are carried as integer micro-dollars rather than floats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use crate::{KeystoneError, Result};

/// Micro-dollars per dollar
pub const MICROS_PER_USD: i64 = 1_000_000;

/// A USD amount in micro-dollars
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsdAmount(i64);

impl UsdAmount {
    /// Zero dollars
    pub const ZERO: UsdAmount = UsdAmount(0);

    /// Create from raw micro-dollars
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Create from whole cents
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents.saturating_mul(10_000))
    }

    /// Create from a human-readable dollar value (e.g. 0.25), rounded to the nearest micro-dollar
    pub fn from_dollars(dollars: f64) -> Self {
        if !dollars.is_finite() {
            return Self::ZERO;
        }
        Self((dollars * MICROS_PER_USD as f64).round() as i64)
    }

    /// Raw micro-dollars
    pub fn micros(&self) -> i64 {
        self.0
    }

    /// Human-readable dollar value
    pub fn to_dollars(&self) -> f64 {
        self.0 as f64 / MICROS_PER_USD as f64
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Checked addition
    pub fn checked_add(&self, other: UsdAmount) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(KeystoneError::AmountOverflow)
    }

    /// Checked subtraction
    pub fn checked_sub(&self, other: UsdAmount) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(KeystoneError::AmountUnderflow)
    }

    /// Subtraction floored at zero
    pub fn saturating_sub(&self, other: UsdAmount) -> Self {
        Self(self.0.saturating_sub(other.0).max(0))
    }
}

impl Add for UsdAmount {
    type Output = UsdAmount;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for UsdAmount {
    type Output = UsdAmount;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for UsdAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.4}", self.to_dollars())
    }
}
