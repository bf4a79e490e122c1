// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unlock sessions for the Shroud vault.
//!
//! Decrypted secrets live here, and only here, between an unlock and the
//! session's deadline. Nothing in this crate touches disk.

pub mod clock;
pub mod manager;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{SessionInfo, SessionManager};
pub use ttl::SessionTtl;
