// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Panic wipe: clear every backend, keep going on failure, report loudly.

use serde::Serialize;
use shroud_bus::{EventBus, VaultEvent};
use shroud_core::WipeTarget;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum BackendOutcome {
    Cleared,
    Failed { reason: String },
}

impl BackendOutcome {
    pub fn is_cleared(&self) -> bool {
        matches!(self, Self::Cleared)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendResult {
    pub backend: String,
    #[serde(flatten)]
    pub outcome: BackendOutcome,
}

/// Per-backend results in the order the backends were swept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WipeReport {
    results: Vec<BackendResult>,
}

impl WipeReport {
    pub fn results(&self) -> &[BackendResult] {
        &self.results
    }

    pub fn outcome(&self, backend: &str) -> Option<&BackendOutcome> {
        self.results
            .iter()
            .find(|r| r.backend == backend)
            .map(|r| &r.outcome)
    }

    /// True when every backend cleared.
    pub fn is_complete(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_cleared())
    }

    pub fn failed_backends(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.outcome.is_cleared())
            .map(|r| r.backend.clone())
            .collect()
    }
}

/// Sweeps each target in turn. A failure is recorded and the sweep moves on;
/// exactly one `vault-cleared` is published at the end.
pub(crate) async fn wipe_all(targets: &[&dyn WipeTarget], bus: &EventBus) -> WipeReport {
    warn!(targets = targets.len(), "panic wipe started");
    let mut results = Vec::with_capacity(targets.len());
    for target in targets {
        let backend = target.target_name().to_string();
        let outcome = match target.wipe().await {
            Ok(()) => {
                info!(backend = %backend, "backend cleared");
                BackendOutcome::Cleared
            }
            Err(e) => {
                error!(backend = %backend, error = %e, "backend could not be cleared");
                BackendOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        results.push(BackendResult { backend, outcome });
    }

    let report = WipeReport { results };
    let failed_backends = report.failed_backends();
    if failed_backends.is_empty() {
        info!("panic wipe complete");
    } else {
        error!(failed = ?failed_backends, "panic wipe incomplete");
    }
    bus.publish(VaultEvent::VaultCleared { failed_backends });
    report
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use shroud_core::ShroudError;

    use super::*;

    struct Counting {
        name: &'static str,
        fail: bool,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(name: &'static str, fail: bool) -> Self {
            Self {
                name,
                fail,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl WipeTarget for Counting {
        fn target_name(&self) -> &str {
            self.name
        }

        async fn wipe(&self) -> Result<(), ShroudError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ShroudError::persistence("disk on fire"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn failure_does_not_stop_later_targets() {
        let a = Counting::new("a", false);
        let b = Counting::new("b", true);
        let c = Counting::new("c", false);
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();

        let report = wipe_all(&[&a, &b, &c], &bus).await;

        assert_eq!(c.calls.load(Ordering::SeqCst), 1);
        assert!(!report.is_complete());
        assert_eq!(report.failed_backends(), ["b"]);
        assert!(report.outcome("a").unwrap().is_cleared());
        assert_eq!(
            report.outcome("b"),
            Some(&BackendOutcome::Failed {
                reason: "storage error: disk on fire".to_string()
            })
        );

        let event = rx.try_recv().unwrap().event;
        assert_eq!(
            event,
            VaultEvent::VaultCleared {
                failed_backends: vec!["b".to_string()]
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn report_serializes_as_ordered_list() {
        let report = WipeReport {
            results: vec![
                BackendResult {
                    backend: "sessions".into(),
                    outcome: BackendOutcome::Cleared,
                },
                BackendResult {
                    backend: "cache-dir".into(),
                    outcome: BackendOutcome::Failed {
                        reason: "denied".into(),
                    },
                },
            ],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json[0]["backend"], "sessions");
        assert_eq!(json[0]["status"], "cleared");
        assert_eq!(json[1]["status"], "failed");
        assert_eq!(json[1]["reason"], "denied");
    }
}
