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

//! Account lifecycle and identifier integration tests.

use ledger_core_rs::{
    AccountType, ClientId, Engine, INITIAL_BALANCE, LedgerError, RegisterRequest, TransactionKind,
};
use rust_decimal_macros::dec;
use std::collections::HashSet;

fn request(telephone: &str) -> RegisterRequest {
    RegisterRequest {
        nom: "Client".into(),
        prenom: telephone.into(),
        email: format!("{telephone}@example.com"),
        telephone: telephone.into(),
        password_hash: "secret".into(),
    }
}

#[test]
fn create_account_requires_existing_owner() {
    let engine = Engine::new();
    let result = engine.create_account(ClientId::new(), AccountType::Courant);
    assert_eq!(result.unwrap_err(), LedgerError::OwnerNotFound);
}

#[test]
fn account_identifiers_have_expected_formats() {
    let engine = Engine::new();
    let client = engine.register(request("0600000001")).unwrap();
    let account = engine.store().first_account_of(client.id).unwrap();

    assert!(account.numero_compte.starts_with("FR"));
    assert_eq!(account.numero_compte.len(), 12);
    assert_eq!(account.code_paiement.len(), 8);
    assert!(
        account
            .code_paiement
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    );
}

#[test]
fn identifiers_are_unique_across_accounts() {
    let engine = Engine::new();
    let mut numeros = HashSet::new();
    let mut codes = HashSet::new();

    for i in 0..50 {
        let client = engine.register(request(&format!("06000001{i:02}"))).unwrap();
        let account = engine.store().first_account_of(client.id).unwrap();
        assert!(numeros.insert(account.numero_compte.clone()));
        assert!(codes.insert(account.code_paiement.clone()));
    }
}

#[test]
fn merchant_codes_are_unique() {
    let engine = Engine::new();
    let mut codes = HashSet::new();

    for i in 0..20 {
        let merchant = engine
            .register_merchant(request(&format!("06000002{i:02}")))
            .unwrap();
        let account = engine.store().first_account_of(merchant.id).unwrap();
        assert!(codes.insert(account.code_marchand.clone().unwrap()));
    }
}

#[test]
fn client_can_hold_multiple_account_types() {
    let engine = Engine::new();
    let client = engine.register(request("0600000001")).unwrap();

    let cheque = engine.create_account(client.id, AccountType::Cheque).unwrap();
    let epargne = engine
        .create_account(client.id, AccountType::Epargne)
        .unwrap();

    let accounts = engine.list_accounts(client.id).unwrap();
    assert_eq!(accounts.len(), 3);
    assert_eq!(accounts[0].kind, AccountType::Courant);
    assert_eq!(accounts[1].id, cheque.id);
    assert_eq!(accounts[2].id, epargne.id);

    // Every account is seeded with the opening balance.
    for account in &accounts {
        assert_eq!(engine.get_balance(account.id).unwrap(), INITIAL_BALANCE);
    }
}

#[test]
fn list_accounts_unknown_owner_fails() {
    let engine = Engine::new();
    assert_eq!(
        engine.list_accounts(ClientId::new()).unwrap_err(),
        LedgerError::OwnerNotFound
    );
}

#[test]
fn stored_solde_tracks_derived_balance_through_lifecycle() {
    let engine = Engine::new();
    let client = engine.register(request("0600000001")).unwrap();
    let account = engine.store().first_account_of(client.id).unwrap();

    assert_eq!(account.solde(), account.derived_balance());

    engine
        .create_transaction(account.id, TransactionKind::Reception, dec!(123.45), None)
        .unwrap();
    assert_eq!(account.solde(), account.derived_balance());

    engine
        .create_transaction(account.id, TransactionKind::Paiement, dec!(23.45), None)
        .unwrap();
    assert_eq!(account.solde(), account.derived_balance());
    assert_eq!(account.solde(), dec!(10100.00));
}

#[test]
fn balance_reads_do_not_mutate_history() {
    let engine = Engine::new();
    let client = engine.register(request("0600000001")).unwrap();
    let account = engine.store().first_account_of(client.id).unwrap();

    let before = account.history().len();
    for _ in 0..5 {
        engine.get_balance(account.id).unwrap();
        engine.get_history(account.id, 1, None).unwrap();
    }
    assert_eq!(account.history().len(), before);
}

#[test]
fn qr_payload_round_trips_identifiers() {
    let engine = Engine::new();
    let client = engine.register(request("0600000001")).unwrap();
    let account = engine.store().first_account_of(client.id).unwrap();

    let payload: serde_json::Value = serde_json::from_str(&account.qr_payload()).unwrap();
    assert_eq!(payload["numero_compte"], account.numero_compte.as_str());
    assert_eq!(payload["code_paiement"], account.code_paiement.as_str());
}

#[test]
fn transactions_are_immutable_snapshots() {
    let engine = Engine::new();
    let client = engine.register(request("0600000001")).unwrap();
    let account = engine.store().first_account_of(client.id).unwrap();

    let tx = engine
        .create_transaction(account.id, TransactionKind::Reception, dec!(10.00), None)
        .unwrap();
    let before = (tx.id, tx.montant, tx.created_at);

    // Later activity never rewrites earlier rows.
    engine
        .create_transaction(account.id, TransactionKind::Paiement, dec!(5.00), None)
        .unwrap();
    let same = account.find_transaction(tx.id).unwrap();
    assert_eq!((same.id, same.montant, same.created_at), before);
}
