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

//! Error types for split resolution, couple bookkeeping and goals.

use rust_decimal::Decimal;
use thiserror::Error;

/// Domain errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Split shares do not add up to the expense amount
    #[error("split shares {share_a} + {share_b} do not add up to {amount}")]
    SplitMismatch {
        amount: Decimal,
        share_a: Decimal,
        share_b: Decimal,
    },

    /// A running total would exceed the representable range
    #[error("amount overflows the running total")]
    AmountOverflow,

    /// Split type or ratio could not be parsed
    #[error("invalid split specification: {0}")]
    InvalidSplitRatio(String),

    /// Settlement payer and payee are the same partner
    #[error("settlement payer and payee must differ")]
    SelfSettlement,

    /// Settlement would not reduce the outstanding balance
    #[error("settlement would not reduce the outstanding balance")]
    SettlementIncreasesDebt,

    /// A user tried to invite themselves
    #[error("cannot invite yourself")]
    SelfInvite,

    /// User is already part of a pending or active couple
    #[error("already in a couple or have a pending invite")]
    AlreadyPaired,

    /// No pending invite exists
    #[error("pending invite not found")]
    InviteNotFound,

    /// Only the invited user may answer an invite
    #[error("only the invited partner can answer this invite")]
    NotInvitee,

    /// Couple is not active
    #[error("no active couple")]
    CoupleNotActive,

    /// User does not belong to the couple
    #[error("user is not a member of this couple")]
    NotAMember,

    /// Record with the same ID already exists
    #[error("duplicate record ID")]
    DuplicateRecord,

    /// Referenced record does not exist
    #[error("record not found")]
    RecordNotFound,

    /// Referenced savings goal does not exist
    #[error("goal not found")]
    GoalNotFound,
}
