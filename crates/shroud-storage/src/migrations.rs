// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations.
//!
//! The SQL under `migrations/` is compiled in with `embed_migrations!` and
//! applied on every open; refinery records progress in
//! `refinery_schema_history`.

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), refinery::Error> {
    let report = embedded::migrations::runner().run(conn)?;
    for applied in report.applied_migrations() {
        tracing::info!(migration = %applied, "applied vault schema migration");
    }
    Ok(())
}
