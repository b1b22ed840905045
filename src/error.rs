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

//! Error types for the ledger core.

use thiserror::Error;

/// Failures raised by the ledger core.
///
/// Callers map these to user-facing responses; none of the messages leak
/// internal detail. In particular an OTP mismatch and an expired OTP are
/// deliberately the same variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Account lookup failed (source, destination, or recipient's account)
    #[error("account not found")]
    AccountNotFound,

    /// Owning identity lookup failed during account creation
    #[error("owner not found")]
    OwnerNotFound,

    /// No identity registered under the given phone number
    #[error("recipient not found")]
    RecipientNotFound,

    /// Referenced transaction does not exist
    #[error("transaction not found")]
    TransactionNotFound,

    /// Actor does not own the resource
    #[error("access to this account is denied")]
    Forbidden,

    /// Merchant accounts may only receive funds
    #[error("merchants cannot pay")]
    MerchantsCannotPay,

    /// No account carries the given merchant code
    #[error("merchant code invalid")]
    MerchantCodeInvalid,

    /// Debit would exceed the current derived balance
    #[error("insufficient balance")]
    InsufficientFunds,

    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// OTP mismatch or expiry, collapsed into one message
    #[error("invalid or expired OTP code")]
    InvalidOrExpiredOtp,

    /// Unknown phone, wrong password, or account not yet activated
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Uniqueness violation on a generated identifier. Absorbed by the
    /// retry loop in `idgen`; only surfaces when a caller inserts a
    /// hand-picked identifier that is already taken.
    #[error("identifier already in use")]
    DuplicateIdentifier,

    /// Phone number is already registered
    #[error("telephone already registered")]
    DuplicateTelephone,
}

#[cfg(test)]
mod tests {
    use super::LedgerError;

    #[test]
    fn error_display_messages() {
        assert_eq!(LedgerError::AccountNotFound.to_string(), "account not found");
        assert_eq!(LedgerError::OwnerNotFound.to_string(), "owner not found");
        assert_eq!(
            LedgerError::RecipientNotFound.to_string(),
            "recipient not found"
        );
        assert_eq!(
            LedgerError::MerchantsCannotPay.to_string(),
            "merchants cannot pay"
        );
        assert_eq!(
            LedgerError::MerchantCodeInvalid.to_string(),
            "merchant code invalid"
        );
        assert_eq!(
            LedgerError::InsufficientFunds.to_string(),
            "insufficient balance"
        );
        assert_eq!(
            LedgerError::InvalidAmount.to_string(),
            "invalid amount (must be positive)"
        );
        assert_eq!(
            LedgerError::InvalidOrExpiredOtp.to_string(),
            "invalid or expired OTP code"
        );
        assert_eq!(
            LedgerError::InvalidCredentials.to_string(),
            "invalid credentials"
        );
        assert_eq!(
            LedgerError::DuplicateTelephone.to_string(),
            "telephone already registered"
        );
    }

    #[test]
    fn otp_failure_does_not_reveal_cause() {
        // Mismatch and expiry must be indistinguishable to the caller.
        let mismatch = LedgerError::InvalidOrExpiredOtp;
        let expired = LedgerError::InvalidOrExpiredOtp;
        assert_eq!(mismatch, expired);
        assert_eq!(mismatch.to_string(), expired.to_string());
    }

    #[test]
    fn errors_are_cloneable() {
        let error = LedgerError::InsufficientFunds;
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }
}
