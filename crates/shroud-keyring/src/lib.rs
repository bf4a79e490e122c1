// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Shroud keyring.
//!
//! A narrow facade over the encrypted vault, the in-memory session manager
//! and the panic wipe. UI, notebook and analytics collaborators talk to a
//! [`Keyring`] and subscribe to its notifications instead of polling.

pub mod keyring;
pub mod wipe;

pub use keyring::{Keyring, KeyringBuilder};
pub use wipe::{BackendOutcome, BackendResult, WipeReport};
