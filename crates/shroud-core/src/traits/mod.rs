// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend traits. All use `#[async_trait]` for dynamic dispatch.

pub mod store;
pub mod wipe;

pub use store::CredentialStore;
pub use wipe::WipeTarget;
