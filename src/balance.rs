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

//! Balance derivation and caching.
//!
//! `compute` memoizes the derived balance per account with a TTL (one hour
//! by default). The entry MUST be invalidated before any computation that
//! follows a mutating write; `refresh`/`refresh_locked` do that and also
//! persist the result into the account's stored `solde`.

use crate::account::{Account, AccountState};
use crate::base::AccountId;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::time::{Duration, Instant};

const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    solde: Decimal,
    computed_at: Instant,
}

/// Per-account balance cache keyed by account ID.
#[derive(Debug)]
pub struct BalanceCache {
    entries: DashMap<AccountId, CacheEntry>,
    ttl: Duration,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Derived balance of the account, served from cache while fresh.
    pub fn compute(&self, account: &Account) -> Decimal {
        if let Some(entry) = self.entries.get(&account.id) {
            if entry.computed_at.elapsed() < self.ttl {
                return entry.solde;
            }
        }
        // Derive and re-prime while holding the account lock: a miss
        // serializes with refresh_locked, so it cannot re-insert a balance
        // an interleaved writer has already superseded.
        let state = account.lock();
        let solde = state.derived_balance();
        self.remember(account.id, solde);
        solde
    }

    /// Drops the cached entry for the account.
    pub fn invalidate(&self, account_id: AccountId) {
        self.entries.remove(&account_id);
    }

    /// Invalidates, recomputes from the log, persists the result into the
    /// stored `solde`, and re-primes the cache.
    pub fn refresh(&self, account: &Account) -> Decimal {
        self.invalidate(account.id);
        let mut state = account.lock();
        self.refresh_locked(account.id, &mut state)
    }

    /// `refresh` for callers already holding the account lock, as the
    /// transfer path does while both legs are in flight.
    pub(crate) fn refresh_locked(
        &self,
        account_id: AccountId,
        state: &mut AccountState,
    ) -> Decimal {
        self.invalidate(account_id);
        let solde = state.derived_balance();
        state.set_solde(solde);
        self.remember(account_id, solde);
        solde
    }

    fn remember(&self, account_id: AccountId, solde: Decimal) {
        self.entries.insert(
            account_id,
            CacheEntry {
                solde,
                computed_at: Instant::now(),
            },
        );
    }
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new()
    }
}
