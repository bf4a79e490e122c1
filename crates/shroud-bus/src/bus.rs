// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::event::VaultEvent;

/// An event plus the envelope every subscriber sees.
#[derive(Debug, Clone, Serialize)]
pub struct BusEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: VaultEvent,
}

/// Fire-and-forget fan-out of [`VaultEvent`]s.
///
/// Cloning is cheap and every clone publishes into the same channel.
/// Publishing never blocks; a subscriber that falls more than `capacity`
/// events behind receives `RecvError::Lagged` and skips ahead.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: VaultEvent) {
        let envelope = BusEvent {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        };
        let kind = envelope.event.kind();
        match self.tx.send(envelope) {
            Ok(receivers) => debug!(kind, receivers, "event published"),
            Err(_) => debug!(kind, "event dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
