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

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use ledger_core_rs::{Engine, RegisterRequest, TransactionKind};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

/// Ledger Core - Replay a scenario CSV against the ledger engine
///
/// Reads operations from a CSV file (registrations, deposits, payments,
/// phone transfers) and outputs final account states to stdout.
#[derive(Parser, Debug)]
#[command(name = "ledger-core-rs")]
#[command(about = "Replays a banking scenario CSV and prints account states", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,telephone,cible,montant
    /// Example: cargo run -- scenario.csv > comptes.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let replay = match replay_operations(BufReader::new(file)) {
        Ok(replay) => replay,
        Err(e) => {
            eprintln!("Error replaying operations: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_accounts(&replay, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the scenario format.
///
/// Fields: `op, telephone, cible, montant`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    telephone: String,
    cible: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    montant: Option<Decimal>,
}

/// Engine plus the phone numbers seen, in registration order, so the
/// output is deterministic.
pub struct Replay {
    engine: Engine,
    telephones: Vec<String>,
}

impl Replay {
    fn new() -> Self {
        Self {
            engine: Engine::new(),
            telephones: Vec::new(),
        }
    }

    fn register(&mut self, telephone: &str, merchant: bool) -> bool {
        let request = RegisterRequest {
            nom: "Client".into(),
            prenom: telephone.into(),
            email: format!("{telephone}@example.com"),
            telephone: telephone.into(),
            password_hash: "demo".into(),
        };
        let result = if merchant {
            self.engine.register_merchant(request)
        } else {
            self.engine.register(request)
        };
        if result.is_ok() {
            self.telephones.push(telephone.to_string());
        }
        result.is_ok()
    }

    /// First account of the client registered under `telephone`.
    fn account_of(&self, telephone: &str) -> Option<ledger_core_rs::AccountId> {
        let client = self.engine.store().find_client_by_telephone(telephone)?;
        Some(self.engine.store().first_account_of(client.id)?.id)
    }

    fn apply(&mut self, record: CsvRecord) -> bool {
        match record.op.to_lowercase().as_str() {
            "register" => self.register(&record.telephone, false),
            "merchant" => self.register(&record.telephone, true),
            "depot" => {
                let (Some(account), Some(montant)) =
                    (self.account_of(&record.telephone), record.montant)
                else {
                    return false;
                };
                self.engine
                    .create_transaction(
                        account,
                        TransactionKind::Reception,
                        montant,
                        Some("Dépôt d'argent".into()),
                    )
                    .is_ok()
            }
            "paiement" => {
                let (Some(account), Some(cible), Some(montant)) = (
                    self.account_of(&record.telephone),
                    record.cible.as_deref(),
                    record.montant,
                ) else {
                    return false;
                };
                self.engine.pay_or_transfer(account, cible, montant).is_ok()
            }
            _ => false,
        }
    }
}

/// Replays operations from a CSV reader.
///
/// Malformed rows and failed operations are silently skipped; the replay
/// continues with whatever state the ledger reached.
///
/// # CSV Format
///
/// Expected columns: `op, telephone, cible, montant`
/// - `op`: register | merchant | depot | paiement
/// - `telephone`: acting client's phone number
/// - `cible`: merchant code or recipient phone (paiement only)
/// - `montant`: decimal amount (depot and paiement only)
///
/// # Example
///
/// ```csv
/// op,telephone,cible,montant
/// register,0600000001,,
/// merchant,0600000002,,
/// paiement,0600000001,0600000002,100.00
/// ```
pub fn replay_operations<R: Read>(reader: R) -> Result<Replay, csv::Error> {
    let mut replay = Replay::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                if !replay.apply(record) {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping failed operation");
                }
            }
            Err(e) => {
                #[cfg(debug_assertions)]
                eprintln!("Skipping malformed row: {}", e);
                continue;
            }
        }
    }

    Ok(replay)
}

/// Writes final account states as CSV, one row per account, grouped by
/// client in registration order.
pub fn write_accounts<W: Write>(replay: &Replay, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(["telephone", "numero_compte", "type", "solde"])?;

    for telephone in &replay.telephones {
        let Some(client) = replay.engine.store().find_client_by_telephone(telephone) else {
            continue;
        };
        for account in replay.engine.store().accounts_of(client.id) {
            wtr.write_record([
                telephone.as_str(),
                account.numero_compte.as_str(),
                match account.kind {
                    ledger_core_rs::AccountType::Courant => "courant",
                    ledger_core_rs::AccountType::Cheque => "cheque",
                    ledger_core_rs::AccountType::Epargne => "epargne",
                },
                &account
                    .solde()
                    .round_dp(ledger_core_rs::Account::DECIMAL_PRECISION)
                    .to_string(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
