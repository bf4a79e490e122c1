// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process notification bus.
//!
//! Vault and session components publish [`VaultEvent`]s here; collaborators
//! subscribe instead of polling.

pub mod bus;
pub mod event;

pub use bus::{BusEvent, EventBus};
pub use event::{LockReason, VaultEvent};
