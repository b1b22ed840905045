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

//! Notification dispatch, fire-and-forget.
//!
//! Delivery (email rendering, SMTP, retries) is an external collaborator.
//! The core only emits events, and a failed or absent consumer must never
//! fail the ledger mutation that triggered it.

use crate::base::ClientId;
use crate::transaction::Transaction;
use crossbeam::channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use tracing::warn;

/// Events emitted by the ledger core for the external delivery layer.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    /// A new identity registered; carries what the welcome email needs.
    Welcome {
        client_id: ClientId,
        telephone: String,
    },
    /// An OTP was issued; the delivery layer emails the code.
    OtpIssued { client_id: ClientId, code: String },
    /// A ledger row was committed.
    TransactionCreated { transaction: Arc<Transaction> },
}

/// Sink for notification events.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: NotificationEvent);
}

/// Discards all events. Default when no delivery layer is attached.
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: NotificationEvent) {}
}

/// Queues events onto a crossbeam channel for an external worker.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: Sender<NotificationEvent>,
}

impl ChannelNotifier {
    /// Returns the notifier and the receiving end for the delivery worker.
    pub fn new() -> (Self, Receiver<NotificationEvent>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: NotificationEvent) {
        // Fire-and-forget: a disconnected consumer is logged and ignored.
        if self.sender.send(event).is_err() {
            warn!("notification dropped: delivery channel disconnected");
        }
    }
}
