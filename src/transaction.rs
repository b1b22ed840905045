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

//! Ledger transaction rows.
//!
//! A transaction is immutable once created: the log is append-only and
//! balances are derived from it, never the other way around. Credits are
//! `reception` rows; debits are `paiement` and `transfert` rows.

use crate::LedgerError;
use crate::base::{AccountId, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Incoming funds (credit).
    Reception,
    /// Outgoing peer-to-peer transfer by phone number (debit).
    Transfert,
    /// Outgoing merchant payment by code (debit).
    Paiement,
}

impl TransactionKind {
    pub fn is_credit(self) -> bool {
        matches!(self, Self::Reception)
    }

    pub fn is_debit(self) -> bool {
        !self.is_credit()
    }
}

/// An immutable ledger entry attached to a single account.
///
/// A transfer between two accounts produces two independent rows (the debit
/// leg on the source, the credit leg on the destination) with distinct IDs
/// and no foreign key linking them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub montant: Decimal,
    pub code_marchand: Option<String>,
    pub numero_destinataire: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a new ledger entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidAmount`] if `montant` is not strictly
    /// positive.
    pub fn new(
        account_id: AccountId,
        kind: TransactionKind,
        montant: Decimal,
    ) -> Result<Self, LedgerError> {
        if montant <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(Self {
            id: TransactionId::new(),
            account_id,
            kind,
            montant,
            code_marchand: None,
            numero_destinataire: None,
            description: None,
            created_at: Utc::now(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Records the merchant code on a `paiement` leg.
    pub fn with_code_marchand(mut self, code: impl Into<String>) -> Self {
        self.code_marchand = Some(code.into());
        self
    }

    /// Records the recipient phone number on a `transfert` leg.
    pub fn with_numero_destinataire(mut self, numero: impl Into<String>) -> Self {
        self.numero_destinataire = Some(numero.into());
        self
    }

    /// Signed contribution of this row to its account's balance.
    pub fn signed_montant(&self) -> Decimal {
        if self.kind.is_credit() {
            self.montant
        } else {
            -self.montant
        }
    }
}

/// One page of a transaction history, mirroring the pagination envelope of
/// the external API boundary.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Total number of items across all pages.
    pub total: usize,
    /// Number of items on this page.
    pub count: usize,
    pub per_page: usize,
    pub current_page: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Slices `items` into the requested page. `page` is 1-based; a page
    /// beyond the end yields an empty `data` with the bookkeeping intact.
    pub fn paginate(items: Vec<T>, page: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let total = items.len();
        let total_pages = total.div_ceil(per_page).max(1);
        let data: Vec<T> = items
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .collect();
        let count = data.len();
        Self {
            data,
            total,
            count,
            per_page,
            current_page: page,
            total_pages,
        }
    }
}
