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

//! Budget usage, dashboard breakdowns and spending nudges.
//!
//! Every status shown here comes from [`evaluate_threshold`], so category
//! budgets, the dashboard bar and nudges always agree.

use crate::ledger::SharedExpense;
use crate::threshold::{ThresholdStatus, evaluate_threshold};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeMap;

/// Savings rate below which a savings nudge fires.
const SAVINGS_RATE_FLOOR: Decimal = dec!(20);

/// Day of the month from which a low savings rate is worth a nudge.
const SAVINGS_NUDGE_FROM_DAY: u32 = 15;

/// Spend of one budget line against its monthly limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetUsage {
    pub category: String,
    pub limit: Decimal,
    pub spend: Decimal,
    /// Negative when over budget.
    pub remaining: Decimal,
    /// Rounded to one decimal place; zero when the limit is zero.
    pub percent_used: Decimal,
    pub status: ThresholdStatus,
}

impl BudgetUsage {
    pub fn new(category: impl Into<String>, limit: Decimal, spend: Decimal) -> Self {
        let evaluation = evaluate_threshold(spend, limit);
        Self {
            category: category.into(),
            limit,
            spend,
            remaining: limit - spend,
            percent_used: evaluation
                .percent_used
                .map_or(Decimal::ZERO, |percent| percent.round_dp(1)),
            status: evaluation.status,
        }
    }

    pub fn is_over(&self) -> bool {
        self.status == ThresholdStatus::Over
    }
}

/// Aggregate usage across all budget lines, as shown on the dashboard bar.
///
/// Returns `None` when there are no budget lines.
pub fn overall_usage(usages: &[BudgetUsage]) -> Option<BudgetUsage> {
    if usages.is_empty() {
        return None;
    }
    let limit = usages.iter().map(|u| u.limit).sum();
    let spend = usages.iter().map(|u| u.spend).sum();
    Some(BudgetUsage::new("Total", limit, spend))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub total: Decimal,
    /// Share of all listed spending, rounded to one decimal place.
    pub percentage: Decimal,
}

/// Totals shared expenses per category, sorted by category name.
pub fn category_breakdown(expenses: &[SharedExpense]) -> Vec<CategoryBreakdown> {
    let mut totals: BTreeMap<&str, Decimal> = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category.as_str()).or_default() += expense.amount;
    }
    let grand_total: Decimal = totals.values().copied().sum();

    totals
        .into_iter()
        .map(|(category, total)| {
            let percentage = if grand_total > Decimal::ZERO {
                (total * dec!(100) / grand_total).round_dp(1)
            } else {
                Decimal::ZERO
            };
            CategoryBreakdown {
                category: category.to_string(),
                total: total.round_dp(2),
                percentage,
            }
        })
        .collect()
}

/// Returns `(income - spend) / income` as a percentage, or `None` without income.
pub fn savings_rate(income: Decimal, spend: Decimal) -> Option<Decimal> {
    if income <= Decimal::ZERO {
        return None;
    }
    Some((income - spend) * dec!(100) / income)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeKind {
    BudgetWarning,
    SavingsAlert,
}

/// An in-app hint derived from spending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Nudge {
    pub kind: NudgeKind,
    pub title: String,
    pub message: String,
}

/// Budget nudges for every line at warning level or above.
///
/// The overall line, if given, comes first.
pub fn budget_nudges(usages: &[BudgetUsage], overall: Option<&BudgetUsage>) -> Vec<Nudge> {
    let mut nudges = Vec::new();

    // Without a positive overall budget there is nothing to alert against.
    if let Some(total) =
        overall.filter(|u| u.limit > Decimal::ZERO && u.status != ThresholdStatus::Ok)
    {
        nudges.push(Nudge {
            kind: NudgeKind::BudgetWarning,
            title: "Budget Alert".to_string(),
            message: format!(
                "You've spent {} of your {} monthly budget ({}%).",
                total.spend.round_dp(0),
                total.limit.round_dp(0),
                total.percent_used.round_dp(0)
            ),
        });
    }

    for usage in usages.iter().filter(|u| u.status != ThresholdStatus::Ok) {
        nudges.push(Nudge {
            kind: NudgeKind::BudgetWarning,
            title: format!("{} Budget Warning", usage.category),
            message: format!(
                "You've spent {} of {} for {}.",
                usage.spend.round_dp(0),
                usage.limit.round_dp(0),
                usage.category
            ),
        });
    }

    nudges
}

/// Savings nudge once the month is half over and the savings rate is low.
pub fn savings_nudge(income: Decimal, spend: Decimal, today: NaiveDate) -> Option<Nudge> {
    let rate = savings_rate(income, spend)?;
    if rate >= SAVINGS_RATE_FLOOR || today.day() < SAVINGS_NUDGE_FROM_DAY {
        return None;
    }
    Some(Nudge {
        kind: NudgeKind::SavingsAlert,
        title: "Savings Alert".to_string(),
        message: format!(
            "Your savings rate is only {}% this month. Consider reducing discretionary spending.",
            rate.round_dp(0)
        ),
    })
}
