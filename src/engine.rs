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

//! Ledger engine: account lifecycle, deposits, and multi-account transfers.
//!
//! # Money movement
//!
//! | Operation | Debit leg | Credit leg |
//! |-----------|-----------|------------|
//! | `pay_by_code` | `paiement` on source (records merchant code) | `reception` on merchant account |
//! | `transfer_by_phone` | `transfert` on source (records recipient phone) | `reception` on recipient's first account |
//! | `create_transaction` | any single row | any single row |
//!
//! Both legs of a transfer plus both balance refreshes form one atomic
//! unit: the two account mutexes are held together, acquired in ascending
//! [`AccountId`] order, and the sufficiency check reads the balance derived
//! fresh under that lock. Two concurrent debits can therefore never both
//! see a stale sufficient balance.
//!
//! # Authorization
//!
//! The engine trusts that the source account ID passed to a money movement
//! belongs to the authenticated actor; [`Engine::assert_owner`] is the
//! hook the boundary uses to establish that.

use crate::account::{Account, AccountType};
use crate::balance::BalanceCache;
use crate::base::{AccountId, ClientId, TransactionId};
use crate::client::{Client, Role};
use crate::error::LedgerError;
use crate::idgen;
use crate::notify::{NoopNotifier, NotificationEvent, Notifier};
use crate::store::LedgerStore;
use crate::transaction::{Page, Transaction, TransactionKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Opening balance seeded into every new account.
pub const INITIAL_BALANCE: Decimal = dec!(10000);

/// Description on the system-seeded opening transaction.
pub const OPENING_DESCRIPTION: &str = "Ouverture de compte - solde initial";

/// Default page size for transaction history.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Password check delegated to the external identity store.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, password_hash: &str, password: &str) -> bool;
}

/// Verifier for tests and demos: compares the stored "hash" to the
/// password verbatim. Production callers plug in the identity store's
/// verifier instead.
#[derive(Debug, Default)]
pub struct PlainTextVerifier;

impl CredentialVerifier for PlainTextVerifier {
    fn verify(&self, password_hash: &str, password: &str) -> bool {
        password_hash == password
    }
}

/// Attributes for registering a new identity.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub telephone: String,
    /// Already hashed by the external identity store.
    pub password_hash: String,
}

/// Both sides of a completed transfer, with their histories attached.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub source: Arc<Account>,
    pub destination: Arc<Account>,
}

/// The ledger core facade.
pub struct Engine {
    store: LedgerStore,
    balances: BalanceCache,
    notifier: Arc<dyn Notifier>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl Engine {
    /// Engine with no notification consumer and the plain-text demo
    /// verifier.
    pub fn new() -> Self {
        Self::with_collaborators(Arc::new(NoopNotifier), Arc::new(PlainTextVerifier))
    }

    pub fn with_collaborators(
        notifier: Arc<dyn Notifier>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            store: LedgerStore::new(),
            balances: BalanceCache::new(),
            notifier,
            verifier,
        }
    }

    /// Overrides the balance cache TTL (tests shrink it to force
    /// recomputation).
    pub fn with_balance_ttl(mut self, ttl: Duration) -> Self {
        self.balances = BalanceCache::with_ttl(ttl);
        self
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    // --- registration and authentication ---

    /// Registers a client, creates their default `courant` account seeded
    /// with the opening balance, and issues an activation OTP.
    pub fn register(&self, request: RegisterRequest) -> Result<Arc<Client>, LedgerError> {
        self.register_with_role(request, Role::Client)
    }

    /// Registers a merchant; their accounts additionally carry a merchant
    /// code so they can receive payments by code.
    pub fn register_merchant(&self, request: RegisterRequest) -> Result<Arc<Client>, LedgerError> {
        self.register_with_role(request, Role::Merchant)
    }

    fn register_with_role(
        &self,
        request: RegisterRequest,
        role: Role,
    ) -> Result<Arc<Client>, LedgerError> {
        let client = self.store.insert_client(Client::new(
            request.nom,
            request.prenom,
            request.email,
            request.telephone,
            request.password_hash,
            role,
        ))?;

        self.create_account(client.id, AccountType::Courant)?;

        let code = client.issue_otp();
        self.notifier.notify(NotificationEvent::Welcome {
            client_id: client.id,
            telephone: client.telephone.clone(),
        });
        self.notifier.notify(NotificationEvent::OtpIssued {
            client_id: client.id,
            code,
        });
        info!(client = %client.id, role = ?role, "identity registered, activation pending");
        Ok(client)
    }

    /// Activates a registered identity. The OTP is single-use; mismatch
    /// and expiry are indistinguishable to the caller.
    pub fn verify_otp(&self, telephone: &str, code: &str) -> Result<Arc<Client>, LedgerError> {
        let client = self
            .store
            .find_client_by_telephone(telephone)
            .ok_or(LedgerError::InvalidOrExpiredOtp)?;
        client.verify_otp(code)?;
        info!(client = %client.id, "identity activated");
        Ok(client)
    }

    /// Checks credentials and returns an opaque session token. Token
    /// storage and expiry belong to the external session layer. Unknown
    /// phone, wrong password, and a not-yet-activated identity all
    /// collapse to [`LedgerError::InvalidCredentials`].
    pub fn login(&self, telephone: &str, password: &str) -> Result<String, LedgerError> {
        let client = self
            .store
            .find_client_by_telephone(telephone)
            .ok_or(LedgerError::InvalidCredentials)?;
        if !client.is_activated() || !self.verifier.verify(&client.password_hash, password) {
            return Err(LedgerError::InvalidCredentials);
        }
        Ok(idgen::generate_session_token())
    }

    // --- account lifecycle ---

    /// Creates an account for an existing owner: fresh identifiers (plus a
    /// merchant code when the owner is a merchant), opening balance of
    /// [`INITIAL_BALANCE`] seeded by a `reception` row so the derived
    /// balance matches the stored one from the start.
    pub fn create_account(
        &self,
        owner_id: ClientId,
        kind: AccountType,
    ) -> Result<Arc<Account>, LedgerError> {
        let owner = self
            .store
            .get_client(owner_id)
            .ok_or(LedgerError::OwnerNotFound)?;

        let account = loop {
            let numero = idgen::generate_numero_compte(&self.store);
            let code_paiement = idgen::generate_code_paiement(&self.store);
            let code_marchand = owner
                .is_merchant()
                .then(|| idgen::generate_code_marchand(&self.store));
            let candidate = Account::new(owner_id, kind, numero, code_paiement, code_marchand);
            match self.store.insert_account(candidate) {
                Ok(account) => break account,
                // Lost an insert race on an index claim: draw again.
                Err(LedgerError::DuplicateIdentifier) => continue,
                Err(e) => return Err(e),
            }
        };

        let opening = Transaction::new(account.id, TransactionKind::Reception, INITIAL_BALANCE)?
            .with_description(OPENING_DESCRIPTION);
        let opening = {
            let mut state = account.lock();
            let tx = state.append(opening);
            self.balances.refresh_locked(account.id, &mut state);
            tx
        };
        self.notifier.notify(NotificationEvent::TransactionCreated {
            transaction: opening,
        });
        debug!(account = %account.id, owner = %owner_id, "account created");
        Ok(account)
    }

    // --- money movement ---

    /// Generic ledger entry creation, the direct deposit path. Debit kinds
    /// are still sufficiency-checked under the account lock.
    pub fn create_transaction(
        &self,
        account_id: AccountId,
        kind: TransactionKind,
        montant: Decimal,
        description: Option<String>,
    ) -> Result<Arc<Transaction>, LedgerError> {
        let account = self
            .store
            .get_account(account_id)
            .ok_or(LedgerError::AccountNotFound)?;

        let mut transaction = Transaction::new(account.id, kind, montant)?;
        if let Some(description) = description {
            transaction = transaction.with_description(description);
        }

        let transaction = {
            let mut state = account.lock();
            if kind.is_debit() && state.derived_balance() < montant {
                return Err(LedgerError::InsufficientFunds);
            }
            let tx = state.append(transaction);
            self.balances.refresh_locked(account.id, &mut state);
            tx
        };
        self.notifier.notify(NotificationEvent::TransactionCreated {
            transaction: Arc::clone(&transaction),
        });
        debug!(account = %account_id, ?kind, %montant, "transaction committed");
        Ok(transaction)
    }

    /// Merchant payment by code.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccountNotFound`] if the source is missing,
    /// [`LedgerError::MerchantsCannotPay`] if the payer is a merchant,
    /// [`LedgerError::MerchantCodeInvalid`] if no account carries `code`,
    /// [`LedgerError::InsufficientFunds`] if the freshly derived source
    /// balance is below `montant`.
    pub fn pay_by_code(
        &self,
        source_id: AccountId,
        code: &str,
        montant: Decimal,
    ) -> Result<TransferOutcome, LedgerError> {
        let source = self
            .store
            .get_account(source_id)
            .ok_or(LedgerError::AccountNotFound)?;
        let payer = self
            .store
            .get_client(source.owner_id)
            .ok_or(LedgerError::AccountNotFound)?;
        if payer.is_merchant() {
            return Err(LedgerError::MerchantsCannotPay);
        }
        let destination = self
            .store
            .find_account_by_code_marchand(code)
            .ok_or(LedgerError::MerchantCodeInvalid)?;

        let debit = Transaction::new(source.id, TransactionKind::Paiement, montant)?
            .with_code_marchand(code)
            .with_description(format!("Paiement vers marchand {code}"));
        let credit = Transaction::new(destination.id, TransactionKind::Reception, montant)?
            .with_description(format!("Réception de paiement de {}", payer.full_name()));

        self.execute_transfer(&source, &destination, debit, credit)?;
        info!(source = %source.id, destination = %destination.id, %montant, "paiement par code marchand");
        Ok(TransferOutcome {
            source,
            destination,
        })
    }

    /// Peer transfer by phone number, landing on the recipient's first
    /// account in creation order.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AccountNotFound`] if the source is missing or the
    /// recipient has no account, [`LedgerError::RecipientNotFound`] if no
    /// identity owns the phone number,
    /// [`LedgerError::InsufficientFunds`] on a short balance.
    pub fn transfer_by_phone(
        &self,
        source_id: AccountId,
        telephone: &str,
        montant: Decimal,
    ) -> Result<TransferOutcome, LedgerError> {
        let source = self
            .store
            .get_account(source_id)
            .ok_or(LedgerError::AccountNotFound)?;
        let sender = self
            .store
            .get_client(source.owner_id)
            .ok_or(LedgerError::AccountNotFound)?;
        let recipient = self
            .store
            .find_client_by_telephone(telephone)
            .ok_or(LedgerError::RecipientNotFound)?;
        let destination = self
            .store
            .first_account_of(recipient.id)
            .ok_or(LedgerError::AccountNotFound)?;

        let debit = Transaction::new(source.id, TransactionKind::Transfert, montant)?
            .with_numero_destinataire(telephone)
            .with_description(format!("Transfert vers {telephone}"));
        let credit = Transaction::new(destination.id, TransactionKind::Reception, montant)?
            .with_description(format!("Transfert reçu de {}", sender.full_name()));

        self.execute_transfer(&source, &destination, debit, credit)?;
        info!(source = %source.id, destination = %destination.id, %montant, "transfert par téléphone");
        Ok(TransferOutcome {
            source,
            destination,
        })
    }

    /// Single user-facing entry point: tries a merchant payment first and
    /// reinterprets the value as a phone number only when the code itself
    /// was unknown. Any other failure surfaces directly.
    pub fn pay_or_transfer(
        &self,
        source_id: AccountId,
        code_or_phone: &str,
        montant: Decimal,
    ) -> Result<TransferOutcome, LedgerError> {
        match self.pay_by_code(source_id, code_or_phone, montant) {
            Err(LedgerError::MerchantCodeInvalid) => {
                self.transfer_by_phone(source_id, code_or_phone, montant)
            }
            outcome => outcome,
        }
    }

    /// Writes both legs and refreshes both cached balances as one atomic
    /// unit. Locks are taken in ascending account-ID order; a transfer
    /// landing back on the source account takes a single lock.
    fn execute_transfer(
        &self,
        source: &Arc<Account>,
        destination: &Arc<Account>,
        debit: Transaction,
        credit: Transaction,
    ) -> Result<(Arc<Transaction>, Arc<Transaction>), LedgerError> {
        let montant = debit.montant;

        let (debit, credit) = if source.id == destination.id {
            let mut state = source.lock();
            if state.derived_balance() < montant {
                return Err(LedgerError::InsufficientFunds);
            }
            let debit = state.append(debit);
            let credit = state.append(credit);
            self.balances.refresh_locked(source.id, &mut state);
            (debit, credit)
        } else {
            let (mut src_state, mut dst_state) = if source.id < destination.id {
                let src = source.lock();
                let dst = destination.lock();
                (src, dst)
            } else {
                let dst = destination.lock();
                let src = source.lock();
                (src, dst)
            };
            // Sufficiency is judged on the balance derived fresh under the
            // lock, never the cached solde.
            if src_state.derived_balance() < montant {
                return Err(LedgerError::InsufficientFunds);
            }
            let debit = src_state.append(debit);
            let credit = dst_state.append(credit);
            self.balances.refresh_locked(source.id, &mut src_state);
            self.balances.refresh_locked(destination.id, &mut dst_state);
            (debit, credit)
        };

        self.notifier.notify(NotificationEvent::TransactionCreated {
            transaction: Arc::clone(&debit),
        });
        self.notifier.notify(NotificationEvent::TransactionCreated {
            transaction: Arc::clone(&credit),
        });
        Ok((debit, credit))
    }

    // --- reads ---

    pub fn get_client(&self, id: ClientId) -> Result<Arc<Client>, LedgerError> {
        self.store.get_client(id).ok_or(LedgerError::OwnerNotFound)
    }

    pub fn get_account(&self, id: AccountId) -> Result<Arc<Account>, LedgerError> {
        self.store
            .get_account(id)
            .ok_or(LedgerError::AccountNotFound)
    }

    /// Boundary hook: resolves the account and checks it belongs to the
    /// authenticated client.
    pub fn assert_owner(
        &self,
        client_id: ClientId,
        account_id: AccountId,
    ) -> Result<Arc<Account>, LedgerError> {
        let account = self.get_account(account_id)?;
        if account.owner_id != client_id {
            return Err(LedgerError::Forbidden);
        }
        Ok(account)
    }

    pub fn list_accounts(&self, owner_id: ClientId) -> Result<Vec<Arc<Account>>, LedgerError> {
        self.get_client(owner_id)?;
        Ok(self.store.accounts_of(owner_id))
    }

    /// Current balance, served from the TTL cache while fresh.
    pub fn get_balance(&self, account_id: AccountId) -> Result<Decimal, LedgerError> {
        let account = self.get_account(account_id)?;
        Ok(self.balances.compute(&account))
    }

    /// Looks up a single transaction on an account.
    pub fn get_transaction(
        &self,
        account_id: AccountId,
        transaction_id: TransactionId,
    ) -> Result<Arc<Transaction>, LedgerError> {
        let account = self.get_account(account_id)?;
        account
            .find_transaction(transaction_id)
            .ok_or(LedgerError::TransactionNotFound)
    }

    /// Transaction history, newest first, paginated. `per_page` defaults
    /// to [`DEFAULT_PAGE_SIZE`].
    pub fn get_history(
        &self,
        account_id: AccountId,
        page: usize,
        per_page: Option<usize>,
    ) -> Result<Page<Arc<Transaction>>, LedgerError> {
        let account = self.get_account(account_id)?;
        Ok(Page::paginate(
            account.history(),
            page,
            per_page.unwrap_or(DEFAULT_PAGE_SIZE),
        ))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
