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

//! Accounts (comptes) and their append-only transaction logs.
//!
//! The stored `solde` is a cache of the balance derived from the log:
//! `sum(reception) - sum(paiement + transfert)`. Every mutating write goes
//! through the engine, which refreshes the cached value before releasing
//! the account lock, so the invariant `solde == derived balance` holds
//! after every committed operation.

use crate::base::{AccountId, ClientId, TransactionId};
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::sync::Arc;

/// Account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Courant,
    Cheque,
    Epargne,
}

/// Mutable state guarded by the account mutex: the cached balance and the
/// append-only transaction log, in insertion order.
#[derive(Debug)]
pub struct AccountState {
    solde: Decimal,
    transactions: Vec<Arc<Transaction>>,
}

impl AccountState {
    fn new() -> Self {
        Self {
            solde: Decimal::ZERO,
            transactions: Vec::new(),
        }
    }

    /// Balance derived from the log. This is the source of truth; the
    /// cached `solde` only mirrors it.
    pub fn derived_balance(&self) -> Decimal {
        self.transactions
            .iter()
            .fold(Decimal::ZERO, |acc, tx| acc + tx.signed_montant())
    }

    /// Appends a committed row and returns it. The caller must refresh the
    /// cached solde before releasing the lock.
    pub(crate) fn append(&mut self, transaction: Transaction) -> Arc<Transaction> {
        let transaction = Arc::new(transaction);
        self.transactions.push(Arc::clone(&transaction));
        transaction
    }

    pub(crate) fn set_solde(&mut self, solde: Decimal) {
        self.solde = solde;
    }

    pub fn solde(&self) -> Decimal {
        self.solde
    }

    pub fn transactions(&self) -> &[Arc<Transaction>] {
        &self.transactions
    }
}

/// A client account.
///
/// Identifier fields (`numero_compte`, `code_paiement`, `code_marchand`)
/// are immutable after creation; balance and log live behind a mutex so a
/// two-account transfer can hold both sides at once.
#[derive(Debug)]
pub struct Account {
    pub id: AccountId,
    pub owner_id: ClientId,
    pub numero_compte: String,
    pub code_paiement: String,
    /// Present only when the owner is a merchant.
    pub code_marchand: Option<String>,
    pub kind: AccountType,
    pub created_at: DateTime<Utc>,
    inner: Mutex<AccountState>,
}

impl Account {
    /// Fixed-point money: two fractional digits.
    pub const DECIMAL_PRECISION: u32 = 2;

    pub fn new(
        owner_id: ClientId,
        kind: AccountType,
        numero_compte: impl Into<String>,
        code_paiement: impl Into<String>,
        code_marchand: Option<String>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            owner_id,
            numero_compte: numero_compte.into(),
            code_paiement: code_paiement.into(),
            code_marchand,
            kind,
            created_at: Utc::now(),
            inner: Mutex::new(AccountState::new()),
        }
    }

    /// Locks the account state. Multi-account operations must acquire
    /// locks in ascending [`AccountId`] order.
    pub(crate) fn lock(&self) -> MutexGuard<'_, AccountState> {
        self.inner.lock()
    }

    /// Cached balance.
    pub fn solde(&self) -> Decimal {
        self.inner.lock().solde()
    }

    /// Balance recomputed from the transaction log.
    pub fn derived_balance(&self) -> Decimal {
        self.inner.lock().derived_balance()
    }

    /// Snapshot of the log in insertion order.
    pub fn transactions(&self) -> Vec<Arc<Transaction>> {
        self.inner.lock().transactions().to_vec()
    }

    /// Snapshot of the log, newest first.
    pub fn history(&self) -> Vec<Arc<Transaction>> {
        let mut txs = self.transactions();
        txs.reverse();
        txs
    }

    pub fn find_transaction(&self, id: TransactionId) -> Option<Arc<Transaction>> {
        self.inner
            .lock()
            .transactions()
            .iter()
            .find(|tx| tx.id == id)
            .cloned()
    }

    /// JSON payload encoded into the account's QR code. Rendering is an
    /// external concern; the core only defines the payload.
    pub fn qr_payload(&self) -> String {
        serde_json::json!({
            "numero_compte": self.numero_compte,
            "code_paiement": self.code_paiement,
        })
        .to_string()
    }
}

impl Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let state = self.inner.lock();
        // code_marchand is deliberately not serialized.
        let mut out = serializer.serialize_struct("Account", 6)?;
        out.serialize_field("id", &self.id)?;
        out.serialize_field("numero_compte", &self.numero_compte)?;
        out.serialize_field("code_paiement", &self.code_paiement)?;
        out.serialize_field("type", &self.kind)?;
        out.serialize_field("solde", &state.solde().round_dp(Account::DECIMAL_PRECISION))?;
        out.serialize_field("created_at", &self.created_at)?;
        out.end()
    }
}
