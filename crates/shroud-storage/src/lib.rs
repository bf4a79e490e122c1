// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable storage for the Shroud credential vault.
//!
//! A WAL-mode SQLite database with `secure_delete` and embedded migrations,
//! driven through `tokio-rusqlite`'s single writer thread, plus the query
//! cache and the on-disk cache directory that the panic wipe also erases.

pub mod cache;
pub mod database;
pub mod fs_cache;
pub mod migrations;
pub mod store;

pub use cache::QueryCache;
pub use database::Database;
pub use fs_cache::CacheDir;
pub use store::SqliteCredentialStore;
