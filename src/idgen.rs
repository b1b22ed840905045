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

//! Unique identifier generation.
//!
//! Collisions are astronomically unlikely given the keyspaces, but the
//! contract is retry-until-unique, not a single draw: each generator loops
//! until the store reports the candidate free.

use crate::store::LedgerStore;
use rand::Rng;

const NUMERO_PREFIX: &str = "FR";
const CODE_PAIEMENT_LEN: usize = 8;
const CODE_MARCHAND_LEN: usize = 10;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Account number: fixed prefix plus ten random digits.
pub fn generate_numero_compte(store: &LedgerStore) -> String {
    loop {
        let suffix = rand::thread_rng().gen_range(1_000_000_000u64..=9_999_999_999);
        let numero = format!("{NUMERO_PREFIX}{suffix}");
        if !store.numero_compte_exists(&numero) {
            return numero;
        }
    }
}

/// Per-account payment code: 8 uppercase alphanumeric characters.
pub fn generate_code_paiement(store: &LedgerStore) -> String {
    loop {
        let code = random_code(CODE_PAIEMENT_LEN);
        if !store.code_paiement_exists(&code) {
            return code;
        }
    }
}

/// Merchant code: 10 uppercase alphanumeric characters.
pub fn generate_code_marchand(store: &LedgerStore) -> String {
    loop {
        let code = random_code(CODE_MARCHAND_LEN);
        if !store.code_marchand_exists(&code) {
            return code;
        }
    }
}

/// Opaque session token handed out by `login`. Storage and expiry belong
/// to the external session layer.
pub fn generate_session_token() -> String {
    random_code(40)
}

fn random_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}
