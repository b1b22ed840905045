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

//! In-process ledger store.
//!
//! Stands in for the durable store at its interface boundary: registries
//! for clients and accounts, unique secondary indexes (telephone, account
//! number, payment code, merchant code), and a per-client account list in
//! creation order. Uniqueness is enforced with the map entry API so a
//! concurrent double-insert cannot slip past the check.

use crate::LedgerError;
use crate::account::Account;
use crate::base::{AccountId, ClientId};
use crate::client::Client;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct LedgerStore {
    clients: DashMap<ClientId, Arc<Client>>,
    accounts: DashMap<AccountId, Arc<Account>>,
    by_telephone: DashMap<String, ClientId>,
    by_numero_compte: DashMap<String, AccountId>,
    by_code_paiement: DashMap<String, AccountId>,
    by_code_marchand: DashMap<String, AccountId>,
    /// Account IDs per client, append-ordered. "First account" resolution
    /// for phone transfers depends on this ordering.
    client_accounts: RwLock<Vec<(ClientId, AccountId)>>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- clients ---

    /// Registers a client, enforcing telephone uniqueness.
    pub fn insert_client(&self, client: Client) -> Result<Arc<Client>, LedgerError> {
        let client = Arc::new(client);
        match self.by_telephone.entry(client.telephone.clone()) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateTelephone),
            Entry::Vacant(entry) => {
                entry.insert(client.id);
                self.clients.insert(client.id, Arc::clone(&client));
                Ok(client)
            }
        }
    }

    pub fn get_client(&self, id: ClientId) -> Option<Arc<Client>> {
        self.clients.get(&id).map(|c| Arc::clone(&c))
    }

    pub fn find_client_by_telephone(&self, telephone: &str) -> Option<Arc<Client>> {
        let id = *self.by_telephone.get(telephone)?;
        self.get_client(id)
    }

    // --- accounts ---

    /// Persists an account, enforcing uniqueness of numero_compte,
    /// code_paiement, and code_marchand. On conflict every index claim
    /// taken so far is released, leaving the store unchanged.
    pub fn insert_account(&self, account: Account) -> Result<Arc<Account>, LedgerError> {
        let account = Arc::new(account);

        match self.by_numero_compte.entry(account.numero_compte.clone()) {
            Entry::Occupied(_) => return Err(LedgerError::DuplicateIdentifier),
            Entry::Vacant(entry) => entry.insert(account.id),
        };
        if let Err(e) = self.claim_code_paiement(&account) {
            self.by_numero_compte.remove(&account.numero_compte);
            return Err(e);
        }
        if let Err(e) = self.claim_code_marchand(&account) {
            self.by_numero_compte.remove(&account.numero_compte);
            self.by_code_paiement.remove(&account.code_paiement);
            return Err(e);
        }

        self.accounts.insert(account.id, Arc::clone(&account));
        self.client_accounts
            .write()
            .push((account.owner_id, account.id));
        Ok(account)
    }

    fn claim_code_paiement(&self, account: &Arc<Account>) -> Result<(), LedgerError> {
        match self.by_code_paiement.entry(account.code_paiement.clone()) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateIdentifier),
            Entry::Vacant(entry) => {
                entry.insert(account.id);
                Ok(())
            }
        }
    }

    fn claim_code_marchand(&self, account: &Arc<Account>) -> Result<(), LedgerError> {
        let Some(code) = &account.code_marchand else {
            return Ok(());
        };
        match self.by_code_marchand.entry(code.clone()) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateIdentifier),
            Entry::Vacant(entry) => {
                entry.insert(account.id);
                Ok(())
            }
        }
    }

    pub fn get_account(&self, id: AccountId) -> Option<Arc<Account>> {
        self.accounts.get(&id).map(|a| Arc::clone(&a))
    }

    pub fn find_account_by_code_marchand(&self, code: &str) -> Option<Arc<Account>> {
        let id = *self.by_code_marchand.get(code)?;
        self.get_account(id)
    }

    pub fn find_account_by_numero(&self, numero: &str) -> Option<Arc<Account>> {
        let id = *self.by_numero_compte.get(numero)?;
        self.get_account(id)
    }

    /// All accounts of a client, in creation order.
    pub fn accounts_of(&self, client_id: ClientId) -> Vec<Arc<Account>> {
        self.client_accounts
            .read()
            .iter()
            .filter(|(owner, _)| *owner == client_id)
            .filter_map(|(_, id)| self.get_account(*id))
            .collect()
    }

    /// The client's first account by creation order, the deterministic
    /// destination for phone transfers.
    pub fn first_account_of(&self, client_id: ClientId) -> Option<Arc<Account>> {
        self.client_accounts
            .read()
            .iter()
            .find(|(owner, _)| *owner == client_id)
            .and_then(|(_, id)| self.get_account(*id))
    }

    // --- uniqueness probes for identifier generation ---

    pub fn numero_compte_exists(&self, numero: &str) -> bool {
        self.by_numero_compte.contains_key(numero)
    }

    pub fn code_paiement_exists(&self, code: &str) -> bool {
        self.by_code_paiement.contains_key(code)
    }

    pub fn code_marchand_exists(&self, code: &str) -> bool {
        self.by_code_marchand.contains_key(code)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}
