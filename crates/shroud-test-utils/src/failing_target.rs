// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A wipe target that always fails, for exercising partial-wipe reporting.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use shroud_core::{ShroudError, WipeTarget};

pub struct FailingWipeTarget {
    name: String,
    attempts: AtomicUsize,
}

impl FailingWipeTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// How many times a wipe was attempted.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WipeTarget for FailingWipeTarget {
    fn target_name(&self) -> &str {
        &self.name
    }

    async fn wipe(&self) -> Result<(), ShroudError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ShroudError::persistence(format!(
            "{} is read-only",
            self.name
        )))
    }
}
