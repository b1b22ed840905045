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

//! # Ledger Core
//!
//! A banking ledger core: client accounts, balances derived from an
//! immutable transaction log, and atomic money movement (deposits, peer
//! transfers by phone number, merchant payments by code).
//!
//! ## Core Components
//!
//! - [`Engine`]: facade over registration, account lifecycle, and transfers
//! - [`Account`]: a compte with its append-only transaction log
//! - [`Transaction`]: immutable ledger row (`reception` / `transfert` / `paiement`)
//! - [`BalanceCache`]: derived-balance memoization with TTL invalidation
//! - [`LedgerError`]: typed failures raised by the core
//!
//! ## Example
//!
//! ```
//! use ledger_core_rs::{Engine, RegisterRequest, INITIAL_BALANCE};
//!
//! let engine = Engine::new();
//! let client = engine
//!     .register(RegisterRequest {
//!         nom: "Diallo".into(),
//!         prenom: "Aminata".into(),
//!         email: "aminata@example.com".into(),
//!         telephone: "0600000000".into(),
//!         password_hash: "secret".into(),
//!     })
//!     .unwrap();
//!
//! // Registration auto-creates a courant account with the opening balance.
//! let accounts = engine.list_accounts(client.id).unwrap();
//! assert_eq!(engine.get_balance(accounts[0].id).unwrap(), INITIAL_BALANCE);
//! ```
//!
//! ## Concurrency
//!
//! Each account guards its log and cached balance with a mutex; transfers
//! touching two accounts acquire both locks in ascending account-ID order
//! and check sufficiency against the balance derived under the lock, so
//! concurrent debits cannot over-draw an account and opposite-direction
//! transfers cannot deadlock.

pub mod account;
mod balance;
mod base;
pub mod client;
mod engine;
pub mod error;
pub mod idgen;
mod notify;
mod store;
mod transaction;

pub use account::{Account, AccountType};
pub use balance::BalanceCache;
pub use base::{AccountId, ClientId, TransactionId};
pub use client::{ActivationState, Client, Role};
pub use engine::{
    CredentialVerifier, DEFAULT_PAGE_SIZE, Engine, INITIAL_BALANCE, OPENING_DESCRIPTION,
    PlainTextVerifier, RegisterRequest, TransferOutcome,
};
pub use error::LedgerError;
pub use notify::{ChannelNotifier, NoopNotifier, NotificationEvent, Notifier};
pub use store::LedgerStore;
pub use transaction::{Page, Transaction, TransactionKind};
