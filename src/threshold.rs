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

//! Spend-versus-limit classification shared by budgets and dashboards.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Percent of the limit at which spending starts to warn.
pub const WARNING_PERCENT: Decimal = dec!(80);

/// Percent of the limit at which spending is over budget.
pub const OVER_PERCENT: Decimal = dec!(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdStatus {
    Ok,
    Warning,
    Over,
}

impl fmt::Display for ThresholdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdStatus::Ok => write!(f, "ok"),
            ThresholdStatus::Warning => write!(f, "warning"),
            ThresholdStatus::Over => write!(f, "over"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdEvaluation {
    pub status: ThresholdStatus,
    /// `100 * spend / limit`; `None` when the limit is zero or negative or the
    /// ratio does not fit in a `Decimal`.
    pub percent_used: Option<Decimal>,
}

/// Classifies `spend` against `limit`.
///
/// A limit of zero or below has no meaningful percentage and is reported as
/// [`ThresholdStatus::Over`]. Large amounts never panic: when `spend * 100`
/// does not fit, the ratio is taken first.
pub fn evaluate_threshold(spend: Decimal, limit: Decimal) -> ThresholdEvaluation {
    if limit <= Decimal::ZERO {
        return ThresholdEvaluation {
            status: ThresholdStatus::Over,
            percent_used: None,
        };
    }

    let Some(percent_used) = percent_of(spend, limit) else {
        // The ratio itself is beyond the representable range.
        return ThresholdEvaluation {
            status: if spend.is_sign_negative() {
                ThresholdStatus::Ok
            } else {
                ThresholdStatus::Over
            },
            percent_used: None,
        };
    };
    let status = if percent_used >= OVER_PERCENT {
        ThresholdStatus::Over
    } else if percent_used >= WARNING_PERCENT {
        ThresholdStatus::Warning
    } else {
        ThresholdStatus::Ok
    };

    ThresholdEvaluation {
        status,
        percent_used: Some(percent_used),
    }
}

/// `100 * part / whole`, dividing first when the product would overflow.
pub(crate) fn percent_of(spend: Decimal, limit: Decimal) -> Option<Decimal> {
    spend
        .checked_mul(dec!(100))
        .and_then(|scaled| scaled.checked_div(limit))
        .or_else(|| {
            spend
                .checked_div(limit)
                .and_then(|ratio| ratio.checked_mul(dec!(100)))
        })
}
