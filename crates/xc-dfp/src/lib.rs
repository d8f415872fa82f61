//! xc-dfp
//!
//! Exact decimal values as (integer coefficient, integer exponent) pairs.
//!
//! Every monetary comparison in the connector routes through [`Dfp`] so that
//! no floating-point representation ever touches a balance. The bookkeeping
//! ledger speaks this format natively (`amount` + `amount_exp`); exchange
//! balances arrive as decimal strings and are parsed into it.
//!
//! Deterministic, pure logic. No IO.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Dfp
// ---------------------------------------------------------------------------

/// A decimal fixed-point value: `amount * 10^exp`.
///
/// `(125, -2)` is `1.25`; `(150000000, -8)` is `1.50000000`.
///
/// Two values with different exponents may still be equal in value; use
/// [`Dfp::value_eq`], which rescales to the finer exponent by widening and
/// never truncates. Derived `PartialEq` is representation equality and is
/// deliberately kept (it is what map/merge tests want).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dfp {
    pub amount: i64,
    pub exp: i8,
}

impl Dfp {
    pub const ZERO: Dfp = Dfp { amount: 0, exp: 0 };

    pub fn new(amount: i64, exp: i8) -> Self {
        Self { amount, exp }
    }

    /// Parse a decimal string (`"1.25"`, `"-0.003"`, `"2"`) into a `Dfp`.
    ///
    /// The coefficient must fit in `i64`; the exponent must fit in `i8`.
    pub fn parse(s: &str) -> Result<Dfp, DfpParseError> {
        let d = rust_decimal::Decimal::from_str(s.trim())
            .map_err(|_| DfpParseError::Unparseable(s.to_string()))?;

        let amount = i64::try_from(d.mantissa())
            .map_err(|_| DfpParseError::OutOfRange(s.to_string()))?;
        let exp = i8::try_from(-(d.scale() as i32))
            .map_err(|_| DfpParseError::OutOfRange(s.to_string()))?;

        Ok(Dfp { amount, exp })
    }

    /// Value equality across exponents.
    ///
    /// Both sides are rescaled to the more negative (finer) exponent by
    /// widening the coefficient into `i128`; coefficients are then compared
    /// exactly. Symmetric and reflexive for all inputs.
    pub fn value_eq(&self, other: &Dfp) -> bool {
        if self.amount == 0 && other.amount == 0 {
            return true;
        }
        let target = self.exp.min(other.exp);
        match (self.widened_coefficient(target), other.widened_coefficient(target)) {
            (Some(a), Some(b)) => a == b,
            // A coefficient too large for i128 at the target exponent cannot
            // equal one that fits.
            _ => false,
        }
    }

    /// Coefficient of this value rescaled to `target` (`target <= self.exp`).
    /// `None` when the widened coefficient overflows `i128`.
    fn widened_coefficient(&self, target: i8) -> Option<i128> {
        debug_assert!(target <= self.exp);
        let shift = (self.exp as i32 - target as i32) as u32;
        (self.amount as i128).checked_mul(10i128.checked_pow(shift)?)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl std::ops::Neg for Dfp {
    type Output = Dfp;

    fn neg(self) -> Dfp {
        // Parse rejects coefficients outside i64, and -i64::MIN is the only
        // value whose negation would not fit; saturate rather than wrap.
        Dfp {
            amount: self.amount.checked_neg().unwrap_or(i64::MAX),
            exp: self.exp,
        }
    }
}

impl fmt::Display for Dfp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.amount.unsigned_abs().to_string();
        let sign = if self.amount < 0 { "-" } else { "" };

        if self.exp >= 0 {
            write!(f, "{sign}{digits}{}", "0".repeat(self.exp as usize))
        } else {
            let frac_len = (-(self.exp as i32)) as usize;
            if digits.len() > frac_len {
                let (int, frac) = digits.split_at(digits.len() - frac_len);
                write!(f, "{sign}{int}.{frac}")
            } else {
                write!(f, "{sign}0.{}{digits}", "0".repeat(frac_len - digits.len()))
            }
        }
    }
}

/// Why a decimal string did not produce a [`Dfp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DfpParseError {
    /// The string is not a finite decimal.
    Unparseable(String),
    /// The coefficient or exponent does not fit the wire representation.
    OutOfRange(String),
}

impl fmt::Display for DfpParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DfpParseError::Unparseable(s) => write!(f, "not a decimal value: '{s}'"),
            DfpParseError::OutOfRange(s) => {
                write!(f, "decimal value out of range for (i64, i8): '{s}'")
            }
        }
    }
}

impl std::error::Error for DfpParseError {}

// ---------------------------------------------------------------------------
// MaybeBalance
// ---------------------------------------------------------------------------

/// A balance observation that distinguishes "observed as zero" from
/// "not observed at all" on a given side.
///
/// When `present` is `false` the `balance` field carries no meaning and is
/// conventionally zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaybeBalance {
    pub balance: Dfp,
    pub present: bool,
}

impl MaybeBalance {
    pub fn of(balance: Dfp) -> Self {
        Self {
            balance,
            present: true,
        }
    }

    pub fn absent() -> Self {
        Self {
            balance: Dfp::ZERO,
            present: false,
        }
    }

    /// Two observations agree when both are present with equal values, or
    /// both are absent.
    pub fn agrees_with(&self, other: &MaybeBalance) -> bool {
        match (self.present, other.present) {
            (true, true) => self.balance.value_eq(&other.balance),
            (false, false) => true,
            _ => false,
        }
    }
}

impl fmt::Display for MaybeBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.present {
            write!(f, "{}", self.balance)
        } else {
            write!(f, "(absent)")
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
