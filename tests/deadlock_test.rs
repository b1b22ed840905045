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

//! Deadlock detection tests using parking_lot's built-in deadlock detector.
//!
//! Transfers lock two accounts at once; the engine orders those acquisitions
//! by ascending account ID. These tests hammer the patterns that would hang
//! if the ordering were ever wrong: opposite-direction transfers between the
//! same pair, transfer rings, and fan-in onto a single merchant.

use ledger_core_rs::{Account, Engine, INITIAL_BALANCE, RegisterRequest};
use parking_lot::deadlock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

fn request(telephone: &str) -> RegisterRequest {
    RegisterRequest {
        nom: "Client".into(),
        prenom: telephone.into(),
        email: format!("{telephone}@example.com"),
        telephone: telephone.into(),
        password_hash: "secret".into(),
    }
}

fn register_client(engine: &Engine, telephone: &str) -> Arc<Account> {
    let client = engine.register(request(telephone)).unwrap();
    engine.store().first_account_of(client.id).unwrap()
}

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150)); // Let detector thread exit
}

// === Tests ===

/// Opposite-direction transfers between the same two accounts. Without
/// ordered lock acquisition this is the textbook AB/BA deadlock.
#[test]
fn no_deadlock_opposite_direction_transfers() {
    let detector = start_deadlock_detector();
    let engine = Arc::new(Engine::new());
    let a = register_client(&engine, "0600000001");
    let b = register_client(&engine, "0600000002");

    const OPS_PER_THREAD: usize = 200;

    let forward = {
        let engine = Arc::clone(&engine);
        let source = a.id;
        thread::spawn(move || {
            for _ in 0..OPS_PER_THREAD {
                let _ = engine.transfer_by_phone(source, "0600000002", dec!(1.00));
            }
        })
    };
    let backward = {
        let engine = Arc::clone(&engine);
        let source = b.id;
        thread::spawn(move || {
            for _ in 0..OPS_PER_THREAD {
                let _ = engine.transfer_by_phone(source, "0600000001", dec!(1.00));
            }
        })
    };

    forward.join().expect("Thread panicked");
    backward.join().expect("Thread panicked");
    stop_deadlock_detector(detector);

    // Money only moved between the two accounts.
    let total = engine.get_balance(a.id).unwrap() + engine.get_balance(b.id).unwrap();
    assert_eq!(total, INITIAL_BALANCE * dec!(2));
}

/// Transfer ring A -> B -> C -> A running concurrently.
#[test]
fn no_deadlock_transfer_ring() {
    let detector = start_deadlock_detector();
    let engine = Arc::new(Engine::new());
    let phones = ["0600000001", "0600000002", "0600000003"];
    let accounts: Vec<_> = phones.iter().map(|p| register_client(&engine, p)).collect();

    const OPS_PER_THREAD: usize = 100;

    let mut handles = Vec::new();
    for i in 0..phones.len() {
        let engine = Arc::clone(&engine);
        let source = accounts[i].id;
        let dest = phones[(i + 1) % phones.len()].to_string();
        handles.push(thread::spawn(move || {
            for _ in 0..OPS_PER_THREAD {
                let _ = engine.transfer_by_phone(source, &dest, dec!(2.50));
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    stop_deadlock_detector(detector);

    let total: Decimal = accounts
        .iter()
        .map(|a| engine.get_balance(a.id).unwrap())
        .sum();
    assert_eq!(total, INITIAL_BALANCE * dec!(3));
}

/// Many payers fanning in on a single merchant while the merchant's
/// balance is read concurrently.
#[test]
fn no_deadlock_fan_in_on_merchant() {
    let detector = start_deadlock_detector();
    let engine = Arc::new(Engine::new());

    let merchant = engine.register_merchant(request("0699999999")).unwrap();
    let merchant_account = engine.store().first_account_of(merchant.id).unwrap();
    let code = merchant_account.code_marchand.clone().unwrap();

    const NUM_PAYERS: usize = 20;
    const OPS_PER_THREAD: usize = 50;

    let payers: Vec<_> = (0..NUM_PAYERS)
        .map(|i| register_client(&engine, &format!("06000001{i:02}")))
        .collect();

    let mut handles = Vec::with_capacity(NUM_PAYERS + 1);
    for payer in &payers {
        let engine = Arc::clone(&engine);
        let source = payer.id;
        let code = code.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..OPS_PER_THREAD {
                let _ = engine.pay_by_code(source, &code, dec!(1.00));
            }
        }));
    }
    // Reader thread polling the merchant balance during the storm.
    {
        let engine = Arc::clone(&engine);
        let merchant_id = merchant_account.id;
        handles.push(thread::spawn(move || {
            for _ in 0..NUM_PAYERS * OPS_PER_THREAD / 10 {
                let _ = engine.get_balance(merchant_id);
                thread::yield_now();
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    stop_deadlock_detector(detector);

    let expected = INITIAL_BALANCE
        + Decimal::from(NUM_PAYERS) * Decimal::from(OPS_PER_THREAD) * dec!(1.00);
    assert_eq!(engine.get_balance(merchant_account.id).unwrap(), expected);
    for payer in &payers {
        assert_eq!(
            engine.get_balance(payer.id).unwrap(),
            INITIAL_BALANCE - Decimal::from(OPS_PER_THREAD) * dec!(1.00)
        );
    }
}

/// Concurrent debits racing for the last of an account's funds: the
/// ordered-lock sufficiency check must never let the balance go negative.
#[test]
fn concurrent_debits_never_overdraw() {
    let detector = start_deadlock_detector();
    let engine = Arc::new(Engine::new());
    let source = register_client(&engine, "0600000001");
    register_client(&engine, "0600000002");

    const NUM_THREADS: usize = 10;

    // 10000 seeded; 10 threads each try to move 2000 => at most 5 succeed.
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let source_id = source.id;
            thread::spawn(move || {
                engine
                    .transfer_by_phone(source_id, "0600000002", dec!(2000.00))
                    .is_ok()
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .filter(|&ok| ok)
        .count();
    stop_deadlock_detector(detector);

    assert_eq!(successes, 5);
    assert_eq!(engine.get_balance(source.id).unwrap(), Decimal::ZERO);
}
