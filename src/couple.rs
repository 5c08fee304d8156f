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

//! Couple lifecycle and the couple's shared book.
//!
//! Lifecycle: `None` → `Pending` on invite, `Pending` → `Active` on accept,
//! `Pending` → `None` on decline.
//!
//! # Example
//!
//! ```
//! use splitmint::{Couple, CoupleId, UserId};
//!
//! let couple = Couple::new(CoupleId(1));
//! couple.invite(UserId(10), UserId(20)).unwrap();
//! couple.accept(UserId(20)).unwrap();
//! assert!(couple.status().is_active());
//! ```

use crate::base::{CoupleId, ExpenseId, GoalId, Partner, UserId};
use crate::error::LedgerError;
use crate::goal::{Contribution, SavingsGoal};
use crate::ledger::{BalanceReport, Settlement, SharedExpense, compute_balance};
use crate::split::resolve_split;
use parking_lot::Mutex;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Lifecycle of a couple.
///
//  None ──invite──► Pending ──accept──► Active
//                      │
//                      └──decline──► None
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CoupleStatus {
    None,
    Pending { inviter: UserId, invitee: UserId },
    /// `a` is the former inviter, `b` the former invitee.
    Active { a: UserId, b: UserId },
}

impl CoupleStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, CoupleStatus::Active { .. })
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, CoupleStatus::Pending { .. })
    }

    /// Both users of a pending or active couple.
    pub fn members(&self) -> Option<(UserId, UserId)> {
        match *self {
            CoupleStatus::None => None,
            CoupleStatus::Pending { inviter, invitee } => Some((inviter, invitee)),
            CoupleStatus::Active { a, b } => Some((a, b)),
        }
    }
}

/// Who sent the invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Inviter,
    Invitee,
}

#[derive(Debug)]
struct CoupleData {
    id: CoupleId,
    status: CoupleStatus,
    expenses: Vec<SharedExpense>,
    settlements: Vec<Settlement>,
    goals: BTreeMap<GoalId, SavingsGoal>,
}

impl CoupleData {
    fn new(id: CoupleId) -> Self {
        Self {
            id,
            status: CoupleStatus::None,
            expenses: Vec::new(),
            settlements: Vec::new(),
            goals: BTreeMap::new(),
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.status.is_active()
                || (self.expenses.is_empty() && self.settlements.is_empty() && self.goals.is_empty()),
            "Invariant violated: couple {} holds records while not active",
            self.id
        );
    }

    fn ensure_active(&self) -> Result<(UserId, UserId), LedgerError> {
        match self.status {
            CoupleStatus::Active { a, b } => Ok((a, b)),
            _ => Err(LedgerError::CoupleNotActive),
        }
    }

    fn invite(&mut self, inviter: UserId, invitee: UserId) -> Result<(), LedgerError> {
        if inviter == invitee {
            return Err(LedgerError::SelfInvite);
        }
        if self.status != CoupleStatus::None {
            return Err(LedgerError::AlreadyPaired);
        }
        self.status = CoupleStatus::Pending { inviter, invitee };
        self.assert_invariants();
        Ok(())
    }

    /// Checks that `user` may answer the pending invite and returns the inviter.
    fn pending_for(&self, user: UserId) -> Result<UserId, LedgerError> {
        match self.status {
            CoupleStatus::Pending { inviter, invitee } if invitee == user => Ok(inviter),
            CoupleStatus::Pending { .. } => Err(LedgerError::NotInvitee),
            _ => Err(LedgerError::InviteNotFound),
        }
    }

    fn accept(&mut self, user: UserId) -> Result<(), LedgerError> {
        let inviter = self.pending_for(user)?;
        self.status = CoupleStatus::Active { a: inviter, b: user };
        self.assert_invariants();
        Ok(())
    }

    fn decline(&mut self, user: UserId) -> Result<(), LedgerError> {
        self.pending_for(user)?;
        self.status = CoupleStatus::None;
        self.assert_invariants();
        Ok(())
    }

    fn slot_of(&self, user: UserId) -> Result<Partner, LedgerError> {
        let (a, b) = self.ensure_active()?;
        if user == a {
            Ok(Partner::A)
        } else if user == b {
            Ok(Partner::B)
        } else {
            Err(LedgerError::NotAMember)
        }
    }

    fn add_expense(&mut self, expense: SharedExpense) -> Result<(), LedgerError> {
        self.ensure_active()?;
        if self.expenses.iter().any(|e| e.id == expense.id) {
            return Err(LedgerError::DuplicateRecord);
        }
        // Inconsistent splits are refused here; aggregation only tolerates them in history.
        let (share_a, share_b) = resolve_split(expense.amount, &expense.split).into_shares()?;
        compute_balance(&self.expenses, &self.settlements)
            .summary
            .with_expense(expense.payer, expense.amount, share_a, share_b)
            .ok_or(LedgerError::AmountOverflow)?;
        self.expenses.push(expense);
        self.assert_invariants();
        Ok(())
    }

    fn delete_expense(&mut self, expense_id: ExpenseId) -> Result<SharedExpense, LedgerError> {
        self.ensure_active()?;
        let index = self
            .expenses
            .iter()
            .position(|e| e.id == expense_id)
            .ok_or(LedgerError::RecordNotFound)?;
        Ok(self.expenses.remove(index))
    }

    fn balance(&self) -> Result<BalanceReport, LedgerError> {
        self.ensure_active()?;
        Ok(compute_balance(&self.expenses, &self.settlements))
    }

    fn record_settlement(&mut self, settlement: Settlement) -> Result<(), LedgerError> {
        self.ensure_active()?;
        settlement.validate()?;
        if self.settlements.iter().any(|s| s.id == settlement.id) {
            return Err(LedgerError::DuplicateRecord);
        }

        let summary = compute_balance(&self.expenses, &self.settlements).summary;
        let before = summary.net_after_settlements;
        let after = summary
            .with_settlement(&settlement)
            .ok_or(LedgerError::AmountOverflow)?
            .net_after_settlements;
        if after.abs() >= before.abs() {
            return Err(LedgerError::SettlementIncreasesDebt);
        }

        self.settlements.push(settlement);
        self.assert_invariants();
        Ok(())
    }

    fn create_goal(&mut self, goal: SavingsGoal) -> Result<(), LedgerError> {
        self.ensure_active()?;
        if self.goals.contains_key(&goal.id) {
            return Err(LedgerError::DuplicateRecord);
        }
        self.goals.insert(goal.id, goal);
        self.assert_invariants();
        Ok(())
    }

    fn contribute(
        &mut self,
        goal_id: GoalId,
        contribution: Contribution,
    ) -> Result<(), LedgerError> {
        self.slot_of(contribution.user_id)?;
        let goal = self.goals.get_mut(&goal_id).ok_or(LedgerError::GoalNotFound)?;
        goal.contribute(contribution)
    }
}

/// A couple and its shared book.
///
/// Only an active couple holds shared expenses, settlements and goals. Every
/// balance query recomputes from the full history.
#[derive(Debug)]
pub struct Couple {
    inner: Mutex<CoupleData>,
}

impl Couple {
    pub fn new(id: CoupleId) -> Self {
        Self {
            inner: Mutex::new(CoupleData::new(id)),
        }
    }

    pub fn id(&self) -> CoupleId {
        self.inner.lock().id
    }

    pub fn status(&self) -> CoupleStatus {
        self.inner.lock().status
    }

    /// Whether `user` sent or received the invite.
    pub fn role_of(&self, user: UserId) -> Option<Role> {
        let (first, second) = self.inner.lock().status.members()?;
        if user == first {
            Some(Role::Inviter)
        } else if user == second {
            Some(Role::Invitee)
        } else {
            None
        }
    }

    pub fn partner_of(&self, user: UserId) -> Option<UserId> {
        let (first, second) = self.inner.lock().status.members()?;
        if user == first {
            Some(second)
        } else if user == second {
            Some(first)
        } else {
            None
        }
    }

    /// Slot of `user` in the active couple.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::CoupleNotActive`] - Couple is not active.
    /// - [`LedgerError::NotAMember`] - User is not one of the partners.
    pub fn slot_of(&self, user: UserId) -> Result<Partner, LedgerError> {
        self.inner.lock().slot_of(user)
    }

    /// Moves from `None` to `Pending`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::SelfInvite`] - Inviter and invitee are the same user.
    /// - [`LedgerError::AlreadyPaired`] - Couple is already pending or active.
    pub fn invite(&self, inviter: UserId, invitee: UserId) -> Result<(), LedgerError> {
        let mut data = self.inner.lock();
        data.invite(inviter, invitee)?;
        info!(couple = %data.id, %inviter, %invitee, "couple invite sent");
        Ok(())
    }

    /// Moves from `Pending` to `Active`. Only the invitee may accept.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InviteNotFound`] - No pending invite.
    /// - [`LedgerError::NotInvitee`] - `user` is not the invitee.
    pub fn accept(&self, user: UserId) -> Result<(), LedgerError> {
        let mut data = self.inner.lock();
        data.accept(user)?;
        info!(couple = %data.id, %user, "couple invite accepted");
        Ok(())
    }

    /// Moves from `Pending` back to `None`. Only the invitee may decline.
    ///
    /// # Errors
    ///
    /// Same as [`Couple::accept`].
    pub fn decline(&self, user: UserId) -> Result<(), LedgerError> {
        let mut data = self.inner.lock();
        data.decline(user)?;
        info!(couple = %data.id, %user, "couple invite declined");
        Ok(())
    }

    /// Records a shared expense.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::CoupleNotActive`] - Couple is not active.
    /// - [`LedgerError::DuplicateRecord`] - Expense ID already exists.
    /// - [`LedgerError::InvalidAmount`] - Amount is zero or negative.
    /// - [`LedgerError::SplitMismatch`] - Split shares do not add up to the amount.
    /// - [`LedgerError::AmountOverflow`] - A balance total would overflow.
    pub fn add_expense(&self, expense: SharedExpense) -> Result<(), LedgerError> {
        let mut data = self.inner.lock();
        let expense_id = expense.id;
        data.add_expense(expense)?;
        debug!(couple = %data.id, expense = %expense_id, "shared expense added");
        Ok(())
    }

    /// Deletes a shared expense, even when settlements were recorded after it.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::CoupleNotActive`] - Couple is not active.
    /// - [`LedgerError::RecordNotFound`] - No expense with this ID.
    pub fn delete_expense(&self, expense_id: ExpenseId) -> Result<SharedExpense, LedgerError> {
        let mut data = self.inner.lock();
        let removed = data.delete_expense(expense_id)?;
        debug!(couple = %data.id, expense = %expense_id, "shared expense deleted");
        Ok(removed)
    }

    /// Records a direct payment between partners.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::CoupleNotActive`] - Couple is not active.
    /// - [`LedgerError::InvalidAmount`] - Amount is zero or negative.
    /// - [`LedgerError::SelfSettlement`] - Payer and payee are the same partner.
    /// - [`LedgerError::DuplicateRecord`] - Settlement ID already exists.
    /// - [`LedgerError::SettlementIncreasesDebt`] - The absolute balance would not shrink.
    /// - [`LedgerError::AmountOverflow`] - A balance total would overflow.
    pub fn record_settlement(&self, settlement: Settlement) -> Result<(), LedgerError> {
        let mut data = self.inner.lock();
        let settlement_id = settlement.id;
        data.record_settlement(settlement)?;
        debug!(couple = %data.id, settlement = %settlement_id, "settlement recorded");
        Ok(())
    }

    /// Recomputes the balance from the full history.
    ///
    /// # Errors
    ///
    /// [`LedgerError::CoupleNotActive`] if the couple is not active.
    pub fn balance(&self) -> Result<BalanceReport, LedgerError> {
        self.inner.lock().balance()
    }

    pub fn expenses(&self) -> Vec<SharedExpense> {
        self.inner.lock().expenses.clone()
    }

    pub fn settlements(&self) -> Vec<Settlement> {
        self.inner.lock().settlements.clone()
    }

    /// # Errors
    ///
    /// - [`LedgerError::CoupleNotActive`] - Couple is not active.
    /// - [`LedgerError::DuplicateRecord`] - Goal ID already exists.
    pub fn create_goal(&self, goal: SavingsGoal) -> Result<(), LedgerError> {
        self.inner.lock().create_goal(goal)
    }

    /// # Errors
    ///
    /// - [`LedgerError::CoupleNotActive`] - Couple is not active.
    /// - [`LedgerError::NotAMember`] - Contributor is not one of the partners.
    /// - [`LedgerError::GoalNotFound`] - No goal with this ID.
    /// - [`LedgerError::InvalidAmount`] - Contribution is zero or negative.
    pub fn contribute(&self, goal_id: GoalId, contribution: Contribution) -> Result<(), LedgerError> {
        self.inner.lock().contribute(goal_id, contribution)
    }

    pub fn goal(&self, goal_id: GoalId) -> Option<SavingsGoal> {
        self.inner.lock().goals.get(&goal_id).cloned()
    }

    pub fn goals(&self) -> Vec<SavingsGoal> {
        self.inner.lock().goals.values().cloned().collect()
    }
}

impl Serialize for Couple {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.inner.lock();
        let mut state = serializer.serialize_struct("Couple", 4)?;
        state.serialize_field("id", &data.id)?;
        state.serialize_field("status", &data.status)?;
        state.serialize_field("expenses", &data.expenses.len())?;
        state.serialize_field("settlements", &data.settlements.len())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::SettlementId;
    use crate::split::Split;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    // === CoupleData Internal Tests ===

    fn active_data() -> CoupleData {
        let mut data = CoupleData::new(CoupleId(1));
        data.invite(UserId(1), UserId(2)).unwrap();
        data.accept(UserId(2)).unwrap();
        data
    }

    fn expense(id: u32, payer: Partner, amount: Decimal) -> SharedExpense {
        SharedExpense::new(
            ExpenseId(id),
            payer,
            amount,
            Split::Equal,
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            "Food",
        )
    }

    fn settlement(id: u32, paid_by: Partner, amount: Decimal) -> Settlement {
        Settlement::new(SettlementId(id), paid_by, paid_by.other(), amount, Utc::now())
    }

    #[test]
    fn accept_assigns_slots() {
        let data = active_data();
        assert_eq!(data.status, CoupleStatus::Active { a: UserId(1), b: UserId(2) });
        assert_eq!(data.slot_of(UserId(1)), Ok(Partner::A));
        assert_eq!(data.slot_of(UserId(2)), Ok(Partner::B));
        assert_eq!(data.slot_of(UserId(3)), Err(LedgerError::NotAMember));
    }

    #[test]
    fn inviter_cannot_accept() {
        let mut data = CoupleData::new(CoupleId(1));
        data.invite(UserId(1), UserId(2)).unwrap();
        assert_eq!(data.accept(UserId(1)), Err(LedgerError::NotInvitee));
        assert!(data.status.is_pending());
    }

    #[test]
    fn decline_reverts_to_none() {
        let mut data = CoupleData::new(CoupleId(1));
        data.invite(UserId(1), UserId(2)).unwrap();
        data.decline(UserId(2)).unwrap();
        assert_eq!(data.status, CoupleStatus::None);
        assert_eq!(data.decline(UserId(2)), Err(LedgerError::InviteNotFound));
    }

    #[test]
    fn settlement_must_shrink_balance() {
        let mut data = active_data();
        data.add_expense(expense(1, Partner::A, dec!(1000))).unwrap();

        // A is owed 500; A paying B would widen the gap.
        assert_eq!(
            data.record_settlement(settlement(1, Partner::A, dec!(10))),
            Err(LedgerError::SettlementIncreasesDebt)
        );
        // Paying 1000 lands on -500: no improvement.
        assert_eq!(
            data.record_settlement(settlement(2, Partner::B, dec!(1000))),
            Err(LedgerError::SettlementIncreasesDebt)
        );
        data.record_settlement(settlement(3, Partner::B, dec!(200))).unwrap();
        data.record_settlement(settlement(4, Partner::B, dec!(300))).unwrap();
        assert!(data.balance().unwrap().summary.all_settled());
    }

    #[test]
    fn expense_overflowing_totals_is_refused() {
        let mut data = active_data();
        data.add_expense(expense(1, Partner::A, Decimal::MAX)).unwrap();
        assert_eq!(
            data.add_expense(expense(2, Partner::B, dec!(1))),
            Err(LedgerError::AmountOverflow)
        );
        assert_eq!(data.expenses.len(), 1);

        let report = data.balance().unwrap();
        assert!(report.is_clean());
        assert_eq!(report.summary.total_shared, Decimal::MAX);
    }

    #[test]
    fn settled_couple_rejects_further_settlements() {
        let mut data = active_data();
        assert_eq!(
            data.record_settlement(settlement(1, Partner::B, dec!(1))),
            Err(LedgerError::SettlementIncreasesDebt)
        );
    }

    #[test]
    fn duplicate_expense_rejected() {
        let mut data = active_data();
        data.add_expense(expense(1, Partner::A, dec!(10))).unwrap();
        assert_eq!(
            data.add_expense(expense(1, Partner::B, dec!(20))),
            Err(LedgerError::DuplicateRecord)
        );
    }

    #[test]
    fn contributor_must_be_member() {
        let mut data = active_data();
        data.create_goal(SavingsGoal::new(GoalId(1), "Trip", dec!(100), None).unwrap())
            .unwrap();
        let contribution = Contribution {
            user_id: UserId(9),
            amount: dec!(10),
            created_at: Utc::now(),
        };
        assert_eq!(
            data.contribute(GoalId(1), contribution),
            Err(LedgerError::NotAMember)
        );
    }

    // === Serialization Tests ===

    #[test]
    fn serializes_summary_of_book() {
        let couple = Couple::new(CoupleId(5));
        couple.invite(UserId(1), UserId(2)).unwrap();
        let json = serde_json::to_value(&couple).unwrap();
        assert_eq!(json["id"], 5);
        assert_eq!(json["status"]["state"], "pending");
        assert_eq!(json["status"]["inviter"], 1);
        assert_eq!(json["expenses"], 0);
    }
}
