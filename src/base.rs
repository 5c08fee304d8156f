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

//! Core identifier types, partner slots and reconciliation tolerances.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest gap tolerated between the sum of split shares and the expense amount.
pub const RECONCILIATION_EPSILON: Decimal = dec!(0.01);

/// A couple counts as settled up while the absolute net balance stays below this.
pub const SETTLED_TOLERANCE: Decimal = Decimal::ONE;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifies a person using the application.
    UserId
);
id_type!(
    /// Identifies a couple (a pairing of two users).
    CoupleId
);
id_type!(
    /// Identifies a shared expense within a couple.
    ExpenseId
);
id_type!(
    /// Identifies a settlement within a couple.
    SettlementId
);
id_type!(
    /// Identifies a savings goal within a couple.
    GoalId
);

/// Slot of a partner within a couple.
///
/// The inviter always occupies slot `A` and the invitee slot `B`. Balances are
/// signed from `A`'s point of view: positive means `B` owes `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Partner {
    A,
    B,
}

impl Partner {
    /// Returns the other slot.
    pub fn other(self) -> Partner {
        match self {
            Partner::A => Partner::B,
            Partner::B => Partner::A,
        }
    }
}

impl fmt::Display for Partner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partner::A => write!(f, "a"),
            Partner::B => write!(f, "b"),
        }
    }
}

impl FromStr for Partner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "a" => Ok(Partner::A),
            "b" => Ok(Partner::B),
            other => Err(format!("unknown partner '{other}' (expected 'a' or 'b')")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerances() {
        assert_eq!(RECONCILIATION_EPSILON, dec!(0.01));
        assert_eq!(SETTLED_TOLERANCE, dec!(1));
    }

    #[test]
    fn partner_other_is_involutive() {
        assert_eq!(Partner::A.other(), Partner::B);
        assert_eq!(Partner::B.other().other(), Partner::B);
    }

    #[test]
    fn partner_parses_case_insensitively() {
        assert_eq!(" A ".parse::<Partner>(), Ok(Partner::A));
        assert_eq!("b".parse::<Partner>(), Ok(Partner::B));
        assert!("c".parse::<Partner>().is_err());
    }

    #[test]
    fn ids_display_inner_value() {
        assert_eq!(ExpenseId(42).to_string(), "42");
        assert_eq!(UserId(7).to_string(), "7");
    }
}
