// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Panic-wipe target trait.

use async_trait::async_trait;

use crate::error::ShroudError;

/// A backend that the panic wipe must erase.
///
/// `wipe` must be idempotent: wiping an already empty (or missing) backend
/// succeeds.
#[async_trait]
pub trait WipeTarget: Send + Sync {
    /// Name reported in the wipe report (`sessions`, `vault`, `cache-dir`, ...).
    fn target_name(&self) -> &str;

    async fn wipe(&self) -> Result<(), ShroudError>;
}
