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

//! # SplitMint
//!
//! This library is the computation core of a couple expense tracker: who paid
//! what, who owes whom after settlements, and how spending compares to budgets.
//!
//! ## Core Components
//!
//! - [`resolve_split`]: Turns a [`Split`] into per-partner shares
//! - [`compute_balance`]: Aggregates shared expenses and settlements into a [`BalanceSummary`]
//! - [`evaluate_threshold`]: Classifies spend against a limit as ok, warning or over
//! - [`Couple`]: Couple lifecycle (invite, accept, decline) and the couple's book
//! - [`CoupleRegistry`]: Thread-safe collection of couples
//! - [`LedgerError`]: Error types for all of the above
//!
//! ## Example
//!
//! ```
//! use chrono::{NaiveDate, Utc};
//! use rust_decimal_macros::dec;
//! use splitmint::{
//!     CoupleRegistry, ExpenseId, Partner, Settlement, SettlementId, SharedExpense, Split, UserId,
//! };
//!
//! let registry = CoupleRegistry::new();
//! let couple_id = registry.invite(UserId(1), UserId(2)).unwrap();
//! registry.accept(couple_id, UserId(2)).unwrap();
//!
//! let couple = registry.get(&couple_id).unwrap();
//! let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
//! couple
//!     .add_expense(SharedExpense::new(ExpenseId(1), Partner::A, dec!(1000), Split::Equal, date, "Rent"))
//!     .unwrap();
//!
//! let summary = couple.balance().unwrap().summary;
//! assert_eq!(summary.net_balance, dec!(500));
//!
//! couple
//!     .record_settlement(Settlement::new(SettlementId(1), Partner::B, Partner::A, dec!(500), Utc::now()))
//!     .unwrap();
//! assert!(couple.balance().unwrap().summary.all_settled());
//! ```
//!
//! ## Thread Safety
//!
//! Split, balance and threshold functions are pure. The registry allows
//! parallel access to different couples.

mod base;
pub mod budget;
pub mod couple;
pub mod error;
pub mod goal;
pub mod ledger;
mod registry;
pub mod split;
pub mod store;
pub mod threshold;

pub use base::{
    CoupleId, ExpenseId, GoalId, Partner, RECONCILIATION_EPSILON, SETTLED_TOLERANCE, SettlementId,
    UserId,
};
pub use budget::{BudgetUsage, CategoryBreakdown, Nudge, NudgeKind};
pub use couple::{Couple, CoupleStatus, Role};
pub use error::LedgerError;
pub use goal::{Contribution, GoalProgress, SavingsGoal};
pub use ledger::{
    BalanceReport, BalanceSummary, DataWarning, Position, RecordRef, SettleUp, Settlement,
    SharedExpense, compute_balance, suggest_settlement,
};
pub use registry::CoupleRegistry;
pub use split::{Split, SplitResolution, resolve_split};
pub use threshold::{ThresholdEvaluation, ThresholdStatus, evaluate_threshold};
