// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Shroud integration tests.
//!
//! # Components
//!
//! - [`MemoryStore`] - In-memory credential store with fault injection
//! - [`FailingWipeTarget`] - Wipe backend that always reports failure
//! - [`TestHarness`] - Keyring with a manual clock and a cheap KDF

pub mod failing_target;
pub mod harness;
pub mod memory_store;

pub use failing_target::FailingWipeTarget;
pub use harness::{FAST_KDF, TestHarness, TestHarnessBuilder, secret};
pub use memory_store::MemoryStore;
