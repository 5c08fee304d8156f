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

//! Couple registry.
//!
//! The [`CoupleRegistry`] owns every couple known to the application and
//! enforces that a user belongs to at most one pending or active couple.
//!
//! # Thread Safety
//!
//! Couples live in a [`DashMap`] and guard their own book with a mutex, so
//! requests for different couples proceed in parallel. Membership claims go
//! through the entry API one user at a time; a failed second claim rolls back
//! the first.

use crate::base::{CoupleId, UserId};
use crate::couple::{Couple, CoupleStatus};
use crate::error::LedgerError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

/// Collection of couples indexed by couple ID, with a user index.
///
/// # Invariants
///
/// - A user appears in at most one pending or active couple.
/// - Declined couples are removed together with both memberships.
pub struct CoupleRegistry {
    /// Couples indexed by couple ID.
    couples: DashMap<CoupleId, Couple>,
    /// Couple each user currently belongs to.
    memberships: DashMap<UserId, CoupleId>,
    next_id: AtomicU32,
}

impl CoupleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        CoupleRegistry {
            couples: DashMap::new(),
            memberships: DashMap::new(),
            next_id: AtomicU32::new(1),
        }
    }

    fn claim(&self, user: UserId, couple_id: CoupleId) -> Result<(), LedgerError> {
        match self.memberships.entry(user) {
            Entry::Occupied(_) => Err(LedgerError::AlreadyPaired),
            Entry::Vacant(entry) => {
                entry.insert(couple_id);
                Ok(())
            }
        }
    }

    /// Creates a pending couple between `inviter` and `invitee`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::SelfInvite`] - Inviter and invitee are the same user.
    /// - [`LedgerError::AlreadyPaired`] - Either user already has a pending or active couple.
    pub fn invite(&self, inviter: UserId, invitee: UserId) -> Result<CoupleId, LedgerError> {
        if inviter == invitee {
            return Err(LedgerError::SelfInvite);
        }

        let couple_id = CoupleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.claim(inviter, couple_id)?;
        if let Err(e) = self.claim(invitee, couple_id) {
            self.memberships.remove(&inviter);
            debug!(%inviter, %invitee, "invitee already paired");
            return Err(e);
        }

        let couple = Couple::new(couple_id);
        couple.invite(inviter, invitee)?;
        self.couples.insert(couple_id, couple);
        Ok(couple_id)
    }

    /// Accepts a pending invite on behalf of `user`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InviteNotFound`] - No such pending couple.
    /// - [`LedgerError::NotInvitee`] - `user` is not the invitee.
    pub fn accept(&self, couple_id: CoupleId, user: UserId) -> Result<(), LedgerError> {
        self.couples
            .get(&couple_id)
            .ok_or(LedgerError::InviteNotFound)?
            .accept(user)
    }

    /// Declines a pending invite and frees both users.
    ///
    /// # Errors
    ///
    /// Same as [`CoupleRegistry::accept`].
    pub fn decline(&self, couple_id: CoupleId, user: UserId) -> Result<(), LedgerError> {
        let members = {
            let couple = self
                .couples
                .get(&couple_id)
                .ok_or(LedgerError::InviteNotFound)?;
            let members = couple.status().members();
            couple.decline(user)?;
            members
        };

        // The shard guard above must be released before removing.
        self.couples.remove(&couple_id);
        if let Some((inviter, invitee)) = members {
            self.memberships.remove(&inviter);
            self.memberships.remove(&invitee);
        }
        Ok(())
    }

    /// Pending or active couple of `user`.
    pub fn couple_for(
        &self,
        user: UserId,
    ) -> Option<dashmap::mapref::one::Ref<'_, CoupleId, Couple>> {
        let couple_id = *self.memberships.get(&user)?;
        self.couples.get(&couple_id)
    }

    /// Pending invites addressed to `user`.
    pub fn pending_invites(&self, user: UserId) -> Vec<CoupleId> {
        self.couple_for(user)
            .filter(|couple| {
                matches!(
                    couple.status(),
                    CoupleStatus::Pending { invitee, .. } if invitee == user
                )
            })
            .map(|couple| couple.id())
            .into_iter()
            .collect()
    }

    /// Retrieves a couple by ID.
    pub fn get(&self, couple_id: &CoupleId) -> Option<dashmap::mapref::one::Ref<'_, CoupleId, Couple>> {
        self.couples.get(couple_id)
    }

    /// Returns an iterator over all couples.
    pub fn couples(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, CoupleId, Couple>> {
        self.couples.iter()
    }
}

impl Default for CoupleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
