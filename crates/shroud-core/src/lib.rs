// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Shroud credential vault.
//!
//! Holds the error taxonomy, the non-secret records shared between crates,
//! and the traits that storage backends and wipe targets implement.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ShroudError;
pub use traits::{CredentialStore, WipeTarget};
pub use types::{BlobRecord, KeyId, VaultIndexEntry};
