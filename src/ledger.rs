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

//! Balance aggregation over shared expenses and settlements.
//!
//! [`compute_balance`] derives a [`BalanceSummary`] from the full history of a
//! couple. Nothing is cached: callers re-run it after every mutation.
//!
//! # Sign Convention
//!
//! Balances are signed from partner `A`'s point of view. A positive
//! `net_balance` is the surplus `A` contributed beyond `A`'s fair share, i.e.
//! the amount `B` owes `A`.
//!
//! # Example
//!
//! ```
//! use chrono::{NaiveDate, Utc};
//! use rust_decimal_macros::dec;
//! use splitmint::{compute_balance, ExpenseId, Partner, Settlement, SettlementId, SharedExpense, Split};
//!
//! let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
//! let expenses = vec![SharedExpense::new(ExpenseId(1), Partner::A, dec!(1000), Split::Equal, date, "Rent")];
//! let report = compute_balance(&expenses, &[]);
//! assert_eq!(report.summary.net_balance, dec!(500));
//!
//! let settlement = Settlement::new(SettlementId(1), Partner::B, Partner::A, dec!(500), Utc::now());
//! let report = compute_balance(&expenses, &[settlement]);
//! assert!(report.summary.all_settled());
//! ```

use crate::base::{ExpenseId, Partner, SETTLED_TOLERANCE, SettlementId};
use crate::error::LedgerError;
use crate::split::{Split, resolve_split};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An expense paid by one partner and shared by both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedExpense {
    pub id: ExpenseId,
    pub payer: Partner,
    pub amount: Decimal,
    pub split: Split,
    pub date: NaiveDate,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl SharedExpense {
    pub fn new(
        id: ExpenseId,
        payer: Partner,
        amount: Decimal,
        split: Split,
        date: NaiveDate,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id,
            payer,
            amount,
            split,
            date,
            category: category.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A direct payment between partners outside the expense ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub paid_by: Partner,
    pub paid_to: Partner,
    pub amount: Decimal,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Settlement {
    pub fn new(
        id: SettlementId,
        paid_by: Partner,
        paid_to: Partner,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            paid_by,
            paid_to,
            amount,
            note: None,
            created_at,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Checks the record on its own, without looking at any balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - Amount is zero or negative.
    /// - [`LedgerError::SelfSettlement`] - Payer and payee are the same partner.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if self.paid_by == self.paid_to {
            return Err(LedgerError::SelfSettlement);
        }
        Ok(())
    }

    /// Effect on the `A`-signed balance: `A` paying `B` raises it, `B` paying
    /// `A` lowers it.
    fn signed_effect(&self) -> Decimal {
        match self.paid_by {
            Partner::A => self.amount,
            Partner::B => -self.amount,
        }
    }
}

/// Derived balance read model. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub total_shared: Decimal,
    pub paid_by_a: Decimal,
    pub paid_by_b: Decimal,
    /// Fair share of partner `A` across all accepted expenses.
    pub owe_a: Decimal,
    /// Fair share of partner `B` across all accepted expenses.
    pub owe_b: Decimal,
    /// `paid_by_a - owe_a`; positive means `B` owes `A`.
    pub net_balance: Decimal,
    pub settlements_total: Decimal,
    pub net_after_settlements: Decimal,
}

/// Where one partner stands after settlements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "position", content = "amount", rename_all = "snake_case")]
pub enum Position {
    Owes(Decimal),
    IsOwed(Decimal),
    Settled,
}

impl BalanceSummary {
    /// Absolute outstanding balance is below [`SETTLED_TOLERANCE`].
    pub fn all_settled(&self) -> bool {
        self.net_after_settlements.abs() < SETTLED_TOLERANCE
    }

    /// Balance after settlements as seen by `viewer`.
    pub fn position(&self, viewer: Partner) -> Position {
        if self.all_settled() {
            return Position::Settled;
        }
        let signed = match viewer {
            Partner::A => self.net_after_settlements,
            Partner::B => -self.net_after_settlements,
        };
        if signed > Decimal::ZERO {
            Position::IsOwed(signed)
        } else {
            Position::Owes(-signed)
        }
    }

    /// Adds one accepted expense, or `None` when a running total would overflow.
    pub(crate) fn with_expense(
        &self,
        payer: Partner,
        amount: Decimal,
        share_a: Decimal,
        share_b: Decimal,
    ) -> Option<Self> {
        let mut next = *self;
        match payer {
            Partner::A => next.paid_by_a = self.paid_by_a.checked_add(amount)?,
            Partner::B => next.paid_by_b = self.paid_by_b.checked_add(amount)?,
        }
        next.total_shared = self.total_shared.checked_add(amount)?;
        next.owe_a = self.owe_a.checked_add(share_a)?;
        next.owe_b = self.owe_b.checked_add(share_b)?;
        next.net_balance = next.paid_by_a.checked_sub(next.owe_a)?;
        next.net_after_settlements = next.net_balance;
        Some(next)
    }

    /// Applies one settlement, or `None` when a running total would overflow.
    pub(crate) fn with_settlement(&self, settlement: &Settlement) -> Option<Self> {
        let mut next = *self;
        next.settlements_total = self.settlements_total.checked_add(settlement.amount)?;
        next.net_after_settlements = self
            .net_after_settlements
            .checked_add(settlement.signed_effect())?;
        Some(next)
    }

    /// Partner who currently owes money, if any.
    pub fn debtor(&self) -> Option<Partner> {
        if self.all_settled() {
            None
        } else if self.net_after_settlements > Decimal::ZERO {
            Some(Partner::B)
        } else {
            Some(Partner::A)
        }
    }
}

/// The transfer that would bring the balance back to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettleUp {
    pub paid_by: Partner,
    pub paid_to: Partner,
    pub amount: Decimal,
}

/// Returns the settle-up transfer, or `None` when already settled.
pub fn suggest_settlement(summary: &BalanceSummary) -> Option<SettleUp> {
    let debtor = summary.debtor()?;
    Some(SettleUp {
        paid_by: debtor,
        paid_to: debtor.other(),
        amount: summary.net_after_settlements.abs(),
    })
}

/// Which record a [`DataWarning`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RecordRef {
    Expense(ExpenseId),
    Settlement(SettlementId),
}

/// A record that was left out of the aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataWarning {
    pub record: RecordRef,
    #[serde(serialize_with = "serialize_error")]
    pub reason: LedgerError,
}

fn serialize_error<S: serde::Serializer>(error: &LedgerError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

/// Output of [`compute_balance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    pub summary: BalanceSummary,
    /// Records skipped because they were malformed.
    pub warnings: Vec<DataWarning>,
}

impl BalanceReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Computes the balance summary of a couple from its full history.
///
/// Malformed records (non-positive amounts, inconsistent splits, settlements
/// to oneself, amounts that would overflow a running total) are skipped and reported in [`BalanceReport::warnings`]; the
/// remaining records are still aggregated. An empty history yields an all-zero
/// summary that counts as settled.
pub fn compute_balance(expenses: &[SharedExpense], settlements: &[Settlement]) -> BalanceReport {
    let mut summary = BalanceSummary::default();
    let mut warnings = Vec::new();

    for expense in expenses {
        let (share_a, share_b) = match resolve_split(expense.amount, &expense.split).into_shares() {
            Ok(shares) => shares,
            Err(reason) => {
                warn!(expense = %expense.id, %reason, "skipping shared expense");
                warnings.push(DataWarning {
                    record: RecordRef::Expense(expense.id),
                    reason,
                });
                continue;
            }
        };

        match summary.with_expense(expense.payer, expense.amount, share_a, share_b) {
            Some(next) => summary = next,
            None => {
                warn!(expense = %expense.id, "skipping shared expense, totals overflow");
                warnings.push(DataWarning {
                    record: RecordRef::Expense(expense.id),
                    reason: LedgerError::AmountOverflow,
                });
            }
        }
    }

    summary.net_after_settlements = summary.net_balance;
    for settlement in settlements {
        let next = settlement
            .validate()
            .and_then(|()| summary.with_settlement(settlement).ok_or(LedgerError::AmountOverflow));
        match next {
            Ok(next) => summary = next,
            Err(reason) => {
                warn!(settlement = %settlement.id, %reason, "skipping settlement");
                warnings.push(DataWarning {
                    record: RecordRef::Settlement(settlement.id),
                    reason,
                });
            }
        }
    }

    debug!(
        expenses = expenses.len(),
        settlements = settlements.len(),
        skipped = warnings.len(),
        net_balance = %summary.net_balance,
        net_after_settlements = %summary.net_after_settlements,
        "computed balance"
    );

    BalanceReport { summary, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn expense(id: u32, payer: Partner, amount: Decimal, split: Split) -> SharedExpense {
        SharedExpense::new(ExpenseId(id), payer, amount, split, date(), "Food")
    }

    fn settlement(id: u32, paid_by: Partner, amount: Decimal) -> Settlement {
        Settlement::new(SettlementId(id), paid_by, paid_by.other(), amount, Utc::now())
    }

    #[test]
    fn empty_history_is_settled() {
        let report = compute_balance(&[], &[]);
        assert_eq!(report.summary, BalanceSummary::default());
        assert!(report.summary.all_settled());
        assert!(report.is_clean());
        assert_eq!(report.summary.position(Partner::A), Position::Settled);
    }

    #[test]
    fn net_balance_equals_both_formulations() {
        let expenses = [
            expense(1, Partner::A, dec!(1000), Split::Equal),
            expense(
                2,
                Partner::B,
                dec!(300),
                Split::Percentage {
                    a: dec!(70),
                    b: dec!(30),
                },
            ),
        ];
        let summary = compute_balance(&expenses, &[]).summary;
        assert_eq!(summary.owe_a, dec!(710));
        assert_eq!(summary.owe_b, dec!(590));
        assert_eq!(summary.net_balance, summary.paid_by_a - summary.owe_a);
        assert_eq!(summary.net_balance, summary.owe_b - summary.paid_by_b);
        assert_eq!(summary.net_balance, dec!(290));
    }

    #[test]
    fn settlement_from_creditor_widens_the_gap() {
        let expenses = [expense(1, Partner::A, dec!(1000), Split::Equal)];
        let settlements = [settlement(1, Partner::A, dec!(100))];
        let summary = compute_balance(&expenses, &settlements).summary;
        assert_eq!(summary.net_after_settlements, dec!(600));
    }

    #[test]
    fn bad_settlements_are_skipped() {
        let settlements = [
            settlement(1, Partner::B, Decimal::ZERO),
            Settlement::new(SettlementId(2), Partner::A, Partner::A, dec!(5), Utc::now()),
        ];
        let report = compute_balance(&[], &settlements);
        assert_eq!(report.summary.settlements_total, Decimal::ZERO);
        assert_eq!(
            report.warnings,
            vec![
                DataWarning {
                    record: RecordRef::Settlement(SettlementId(1)),
                    reason: LedgerError::InvalidAmount,
                },
                DataWarning {
                    record: RecordRef::Settlement(SettlementId(2)),
                    reason: LedgerError::SelfSettlement,
                },
            ]
        );
    }

    #[test]
    fn overflowing_expense_is_skipped() {
        let expenses = [
            expense(1, Partner::A, Decimal::MAX, Split::Equal),
            expense(2, Partner::A, Decimal::MAX, Split::Equal),
        ];
        let report = compute_balance(&expenses, &[]);
        assert_eq!(
            report.warnings,
            vec![DataWarning {
                record: RecordRef::Expense(ExpenseId(2)),
                reason: LedgerError::AmountOverflow,
            }]
        );
        assert_eq!(report.summary.paid_by_a, Decimal::MAX);
        assert_eq!(report.summary.total_shared, Decimal::MAX);
        assert_eq!(report.summary.owe_a + report.summary.owe_b, Decimal::MAX);
        assert_eq!(
            report.summary.net_balance,
            report.summary.paid_by_a - report.summary.owe_a
        );
    }

    #[test]
    fn overflowing_settlement_is_skipped() {
        let settlements = [
            settlement(1, Partner::A, Decimal::MAX),
            settlement(2, Partner::A, Decimal::MAX),
            settlement(3, Partner::B, dec!(10)),
        ];
        let report = compute_balance(&[], &settlements);
        assert_eq!(
            report.warnings,
            vec![
                DataWarning {
                    record: RecordRef::Settlement(SettlementId(2)),
                    reason: LedgerError::AmountOverflow,
                },
                DataWarning {
                    record: RecordRef::Settlement(SettlementId(3)),
                    reason: LedgerError::AmountOverflow,
                },
            ]
        );
        assert_eq!(report.summary.settlements_total, Decimal::MAX);
        assert_eq!(report.summary.net_after_settlements, Decimal::MAX);
    }

    #[test]
    fn position_and_suggestion_follow_sign() {
        let expenses = [expense(1, Partner::B, dec!(200), Split::Equal)];
        let summary = compute_balance(&expenses, &[]).summary;
        assert_eq!(summary.position(Partner::A), Position::Owes(dec!(100)));
        assert_eq!(summary.position(Partner::B), Position::IsOwed(dec!(100)));
        assert_eq!(
            suggest_settlement(&summary),
            Some(SettleUp {
                paid_by: Partner::A,
                paid_to: Partner::B,
                amount: dec!(100),
            })
        );
    }

    #[test]
    fn sub_unit_residue_counts_as_settled() {
        let expenses = [expense(1, Partner::A, dec!(1.5), Split::Equal)];
        let summary = compute_balance(&expenses, &[]).summary;
        assert_eq!(summary.net_balance, dec!(0.75));
        assert!(summary.all_settled());
        assert_eq!(suggest_settlement(&summary), None);
    }
}
