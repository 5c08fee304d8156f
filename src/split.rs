// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Split resolution.
//!
//! Turns a [`Split`] specification into the concrete amounts each partner owes
//! for a shared expense.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use splitmint::{resolve_split, Split};
//!
//! let split: Split = "percentage:60:40".parse().unwrap();
//! let resolution = resolve_split(dec!(1000), &split);
//! assert!(resolution.is_valid);
//! assert_eq!(resolution.share_a, dec!(600));
//! assert_eq!(resolution.share_b, dec!(400));
//! ```

use crate::base::RECONCILIATION_EPSILON;
use crate::error::LedgerError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a shared expense is divided between partners `A` and `B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Split {
    /// Half each.
    Equal,
    /// Percent of the amount per partner, e.g. 60:40.
    Percentage { a: Decimal, b: Decimal },
    /// Absolute currency share per partner.
    Custom { a: Decimal, b: Decimal },
}

impl Split {
    /// Builds a split from the stored `(split_type, split_ratio)` pair,
    /// e.g. `("percentage", "60:40")`. The ratio is ignored for `equal`.
    pub fn from_parts(split_type: &str, split_ratio: &str) -> Result<Self, LedgerError> {
        match split_type.trim().to_lowercase().as_str() {
            "equal" => Ok(Split::Equal),
            "percentage" => {
                let (a, b) = parse_ratio(split_ratio)?;
                Ok(Split::Percentage { a, b })
            }
            "custom" => {
                let (a, b) = parse_ratio(split_ratio)?;
                Ok(Split::Custom { a, b })
            }
            other => Err(LedgerError::InvalidSplitRatio(format!(
                "unknown split type '{other}'"
            ))),
        }
    }

    /// Custom split where `B` takes whatever `A` does not.
    pub fn custom_from_first(amount: Decimal, share_a: Decimal) -> Self {
        Split::Custom {
            a: share_a,
            b: amount - share_a,
        }
    }

    pub fn split_type(&self) -> &'static str {
        match self {
            Split::Equal => "equal",
            Split::Percentage { .. } => "percentage",
            Split::Custom { .. } => "custom",
        }
    }

    /// Ratio in `a:b` form; `50:50` for equal splits.
    pub fn ratio(&self) -> String {
        match self {
            Split::Equal => "50:50".to_string(),
            Split::Percentage { a, b } | Split::Custom { a, b } => format!("{a}:{b}"),
        }
    }
}

fn parse_ratio(ratio: &str) -> Result<(Decimal, Decimal), LedgerError> {
    let invalid = || LedgerError::InvalidSplitRatio(format!("malformed ratio '{ratio}'"));

    let (a, b) = ratio.trim().split_once(':').ok_or_else(invalid)?;
    let a = Decimal::from_str(a.trim()).map_err(|_| invalid())?;
    let b = Decimal::from_str(b.trim()).map_err(|_| invalid())?;
    if a.is_sign_negative() || b.is_sign_negative() {
        return Err(LedgerError::InvalidSplitRatio(format!(
            "negative share in '{ratio}'"
        )));
    }
    Ok((a, b))
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Equal => write!(f, "equal"),
            _ => write!(f, "{}:{}", self.split_type(), self.ratio()),
        }
    }
}

impl FromStr for Split {
    type Err = LedgerError;

    /// Parses `equal`, `percentage:A:B` or `custom:A:B`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(':') {
            None => Split::from_parts(s, ""),
            Some((split_type, ratio)) => Split::from_parts(split_type, ratio),
        }
    }
}

impl TryFrom<String> for Split {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Split> for String {
    fn from(split: Split) -> Self {
        split.to_string()
    }
}

/// Resolved per-partner shares of one expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitResolution {
    pub amount: Decimal,
    pub share_a: Decimal,
    pub share_b: Decimal,
    /// Amount is positive, no share is negative and the shares add up to the
    /// amount within [`RECONCILIATION_EPSILON`].
    pub is_valid: bool,
}

impl SplitResolution {
    /// Returns `(share_a, share_b)` only when the resolution is valid.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - Amount is zero or negative.
    /// - [`LedgerError::SplitMismatch`] - Shares do not add up to the amount.
    pub fn into_shares(self) -> Result<(Decimal, Decimal), LedgerError> {
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if !self.is_valid {
            return Err(LedgerError::SplitMismatch {
                amount: self.amount,
                share_a: self.share_a,
                share_b: self.share_b,
            });
        }
        Ok((self.share_a, self.share_b))
    }
}

/// Resolves a split into the amounts owed by each partner.
///
/// | Split | share_a | share_b |
/// |-------|---------|---------|
/// | Equal | amount / 2 | amount - share_a |
/// | Percentage | amount * a / 100 | amount * b / 100 |
/// | Custom | a | b |
///
/// Never fails: inconsistencies are reported through
/// [`SplitResolution::is_valid`] so the caller decides whether to block or warn.
pub fn resolve_split(amount: Decimal, split: &Split) -> SplitResolution {
    let shares = match *split {
        Split::Equal => {
            let half = amount / dec!(2);
            Some((half, amount - half))
        }
        Split::Percentage { a, b } => share_of(amount, a).zip(share_of(amount, b)),
        Split::Custom { a, b } => Some((a, b)),
    };
    let (share_a, share_b) = shares.unwrap_or_default();

    let is_valid = shares.is_some()
        && amount > Decimal::ZERO
        && !share_a.is_sign_negative()
        && !share_b.is_sign_negative()
        && share_a
            .checked_add(share_b)
            .and_then(|sum| sum.checked_sub(amount))
            .is_some_and(|diff| diff.abs() <= RECONCILIATION_EPSILON);

    SplitResolution {
        amount,
        share_a,
        share_b,
        is_valid,
    }
}

fn share_of(amount: Decimal, percent: Decimal) -> Option<Decimal> {
    amount
        .checked_mul(percent)
        .and_then(|scaled| scaled.checked_div(dec!(100)))
        .or_else(|| (amount / dec!(100)).checked_mul(percent))
}
