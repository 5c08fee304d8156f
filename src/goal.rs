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

//! Joint savings goals.
//!
//! A goal only moves forward: contributions add to `current_amount` and the
//! goal stays completed once it reaches its target.

use crate::base::{GoalId, UserId};
use crate::error::LedgerError;
use crate::threshold::percent_of;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: GoalId,
    pub title: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub deadline: Option<NaiveDate>,
    pub is_completed: bool,
    pub contributions: Vec<Contribution>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub user_id: UserId,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Progress figures shown next to a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GoalProgress {
    /// Rounded to one decimal place; may exceed 100.
    pub percent_complete: Decimal,
    /// Monthly amount still needed to meet the deadline, rounded to two
    /// decimal places. `None` without a deadline or when it has passed.
    pub monthly_contribution_needed: Option<Decimal>,
}

impl SavingsGoal {
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] if `target_amount` is not positive.
    pub fn new(
        id: GoalId,
        title: impl Into<String>,
        target_amount: Decimal,
        deadline: Option<NaiveDate>,
    ) -> Result<Self, LedgerError> {
        if target_amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(Self {
            id,
            title: title.into(),
            target_amount,
            current_amount: Decimal::ZERO,
            deadline,
            is_completed: false,
            contributions: Vec::new(),
        })
    }

    /// Adds a contribution and completes the goal once the target is reached.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - Contribution is not positive.
    /// - [`LedgerError::AmountOverflow`] - The saved total would overflow.
    pub fn contribute(&mut self, contribution: Contribution) -> Result<(), LedgerError> {
        if contribution.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        self.current_amount = self
            .current_amount
            .checked_add(contribution.amount)
            .ok_or(LedgerError::AmountOverflow)?;
        if self.current_amount >= self.target_amount {
            self.is_completed = true;
        }
        self.contributions.push(contribution);
        Ok(())
    }

    pub fn remaining(&self) -> Decimal {
        (self.target_amount - self.current_amount).max(Decimal::ZERO)
    }

    pub fn progress(&self, today: NaiveDate) -> GoalProgress {
        let percent_complete = if self.target_amount > Decimal::ZERO {
            percent_of(self.current_amount, self.target_amount)
                .map_or(Decimal::MAX, |percent| percent.round_dp(1))
        } else {
            Decimal::ZERO
        };

        let monthly_contribution_needed = self.deadline.and_then(|deadline| {
            let months_left = months_between(today, deadline);
            (months_left > 0).then(|| (self.remaining() / Decimal::from(months_left)).round_dp(2))
        });

        GoalProgress {
            percent_complete,
            monthly_contribution_needed,
        }
    }
}

/// Calendar month difference, ignoring days.
fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn contribution(amount: Decimal) -> Contribution {
        Contribution {
            user_id: UserId(1),
            amount,
            created_at: Utc::now(),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejects_non_positive_target() {
        assert_eq!(
            SavingsGoal::new(GoalId(1), "Trip", Decimal::ZERO, None),
            Err(LedgerError::InvalidAmount)
        );
    }

    #[test]
    fn contributions_complete_goal() {
        let mut goal = SavingsGoal::new(GoalId(1), "Trip", dec!(1000), None).unwrap();
        goal.contribute(contribution(dec!(400))).unwrap();
        assert!(!goal.is_completed);
        goal.contribute(contribution(dec!(600))).unwrap();
        assert!(goal.is_completed);
        assert_eq!(goal.current_amount, dec!(1000));
        assert_eq!(goal.contributions.len(), 2);
    }

    #[test]
    fn completion_is_sticky() {
        let mut goal = SavingsGoal::new(GoalId(1), "Trip", dec!(100), None).unwrap();
        goal.contribute(contribution(dec!(150))).unwrap();
        goal.contribute(contribution(dec!(5))).unwrap();
        assert!(goal.is_completed);
        assert_eq!(goal.remaining(), Decimal::ZERO);
    }

    #[test]
    fn rejects_non_positive_contribution() {
        let mut goal = SavingsGoal::new(GoalId(1), "Trip", dec!(100), None).unwrap();
        assert_eq!(
            goal.contribute(contribution(dec!(-5))),
            Err(LedgerError::InvalidAmount)
        );
        assert_eq!(goal.current_amount, Decimal::ZERO);
        assert!(goal.contributions.is_empty());
    }

    #[test]
    fn huge_balances_do_not_overflow() {
        let mut goal = SavingsGoal::new(GoalId(1), "Moon", dec!(1e27), None).unwrap();
        goal.contribute(contribution(dec!(5e26))).unwrap();
        assert_eq!(goal.progress(ymd(2025, 1, 1)).percent_complete, dec!(50));

        goal.contribute(contribution(Decimal::MAX - dec!(5e26))).unwrap();
        assert_eq!(
            goal.contribute(contribution(dec!(1))),
            Err(LedgerError::AmountOverflow)
        );
        assert_eq!(goal.current_amount, Decimal::MAX);
        assert_eq!(goal.contributions.len(), 2);
    }

    #[test]
    fn progress_with_deadline() {
        let mut goal =
            SavingsGoal::new(GoalId(1), "Car", dec!(1200), Some(ymd(2025, 7, 1))).unwrap();
        goal.contribute(contribution(dec!(300))).unwrap();

        let progress = goal.progress(ymd(2025, 1, 20));
        assert_eq!(progress.percent_complete, dec!(25));
        assert_eq!(progress.monthly_contribution_needed, Some(dec!(150)));
    }

    #[test]
    fn progress_without_months_left() {
        let goal = SavingsGoal::new(GoalId(1), "Car", dec!(1200), Some(ymd(2025, 1, 31))).unwrap();
        assert_eq!(goal.progress(ymd(2025, 1, 2)).monthly_contribution_needed, None);

        let goal = SavingsGoal::new(GoalId(2), "Sofa", dec!(900), None).unwrap();
        assert_eq!(goal.progress(ymd(2025, 1, 2)).monthly_contribution_needed, None);
    }

    #[test]
    fn funded_goal_needs_nothing_more() {
        let mut goal =
            SavingsGoal::new(GoalId(1), "Car", dec!(100), Some(ymd(2026, 1, 1))).unwrap();
        goal.contribute(contribution(dec!(120))).unwrap();
        let progress = goal.progress(ymd(2025, 1, 1));
        assert_eq!(progress.percent_complete, dec!(120));
        assert_eq!(progress.monthly_contribution_needed, Some(Decimal::ZERO));
    }

    #[test]
    fn months_between_crosses_years() {
        assert_eq!(months_between(ymd(2024, 11, 30), ymd(2025, 2, 1)), 3);
        assert_eq!(months_between(ymd(2025, 3, 1), ymd(2025, 1, 1)), -2);
    }
}
