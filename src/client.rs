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

//! Owning identities and OTP-gated activation.
//!
//! Activation state machine:
//!
//! ```text
//! Registered --issue_otp--> OtpIssued(code, expiry) --verify_otp--> Activated
//! ```
//!
//! Verification is single-use: the stored code is cleared on success. A
//! mismatch or an expired code both surface as
//! [`LedgerError::InvalidOrExpiredOtp`], never revealing which condition
//! failed.

use crate::LedgerError;
use crate::base::ClientId;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// OTP validity window, in minutes.
const OTP_VALIDITY_MINUTES: i64 = 10;

/// Role of an owning identity. Merchants may only receive payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Merchant,
}

/// Activation state of a registered identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationState {
    Registered,
    OtpIssued {
        code: String,
        expires_at: DateTime<Utc>,
    },
    Activated,
}

/// A registered client or merchant.
///
/// The password hash is opaque to the core; hashing and verification belong
/// to the external identity store.
#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub telephone: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    activation: Mutex<ActivationState>,
}

impl Client {
    pub fn new(
        nom: impl Into<String>,
        prenom: impl Into<String>,
        email: impl Into<String>,
        telephone: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: ClientId::new(),
            nom: nom.into(),
            prenom: prenom.into(),
            email: email.into(),
            telephone: telephone.into(),
            password_hash: password_hash.into(),
            role,
            created_at: Utc::now(),
            activation: Mutex::new(ActivationState::Registered),
        }
    }

    /// Full display name, used in transfer leg descriptions.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.nom, self.prenom)
    }

    pub fn is_merchant(&self) -> bool {
        self.role == Role::Merchant
    }

    pub fn is_activated(&self) -> bool {
        *self.activation.lock() == ActivationState::Activated
    }

    /// Issues a fresh 6-digit OTP valid for ten minutes, replacing any
    /// previously stored code. Returns the code so the caller can hand it
    /// to the notification dispatcher.
    pub fn issue_otp(&self) -> String {
        let code = format!("{:06}", rand::thread_rng().gen_range(100_000..=999_999));
        *self.activation.lock() = ActivationState::OtpIssued {
            code: code.clone(),
            expires_at: Utc::now() + Duration::minutes(OTP_VALIDITY_MINUTES),
        };
        code
    }

    /// Verifies a submitted OTP, consuming it on success.
    pub fn verify_otp(&self, code: &str) -> Result<(), LedgerError> {
        self.verify_otp_at(code, Utc::now())
    }

    fn verify_otp_at(&self, submitted: &str, now: DateTime<Utc>) -> Result<(), LedgerError> {
        let mut state = self.activation.lock();
        match &*state {
            ActivationState::OtpIssued { code, expires_at }
                if code == submitted && now < *expires_at =>
            {
                *state = ActivationState::Activated;
                Ok(())
            }
            // Mismatch, expiry, no code, already activated: one opaque error.
            _ => Err(LedgerError::InvalidOrExpiredOtp),
        }
    }
}
