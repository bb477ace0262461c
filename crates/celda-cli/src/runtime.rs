// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use celda_app::Intent;
use celda_ops::{Reply, commit_intent, preview_reply};
use celda_sheet::MemoryHost;
use celda_tui::{ChatRuntime, InternalEvent, PreviewOutcome};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Bridges the chat controller onto the in-memory host document.
///
/// Previews run on a worker thread so the UI keeps animating; commits run
/// synchronously on the UI thread. The mutex serializes host call groups.
pub struct HostRuntime {
    host: Arc<Mutex<MemoryHost>>,
    preview_delay: Duration,
}

impl HostRuntime {
    pub fn new(host: MemoryHost, preview_delay: Duration) -> Self {
        Self {
            host: Arc::new(Mutex::new(host)),
            preview_delay,
        }
    }

    pub fn host(&self) -> &Arc<Mutex<MemoryHost>> {
        &self.host
    }
}

impl ChatRuntime for HostRuntime {
    fn run_preview(&mut self, intent: Intent) -> Result<Reply> {
        let mut host = self
            .host
            .lock()
            .map_err(|_| anyhow!("host lock poisoned"))?;
        Ok(preview_reply(&mut *host, intent)?)
    }

    fn run_commit(&mut self, intent: Intent) -> Result<String> {
        let mut host = self
            .host
            .lock()
            .map_err(|_| anyhow!("host lock poisoned"))?;
        Ok(commit_intent(&mut *host, intent)?)
    }

    fn spawn_preview(
        &mut self,
        request_id: u64,
        intent: Intent,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let host = Arc::clone(&self.host);
        let delay = self.preview_delay;
        thread::Builder::new()
            .name("celda-preview".to_owned())
            .spawn(move || {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                let outcome = match host.lock() {
                    Ok(mut host) => match preview_reply(&mut *host, intent) {
                        Ok(reply) => PreviewOutcome::Completed(reply),
                        Err(error) => PreviewOutcome::Failed(error.to_string()),
                    },
                    Err(_) => PreviewOutcome::Failed("host lock poisoned".to_owned()),
                };
                let _ = tx.send(InternalEvent::PreviewDone {
                    request_id,
                    outcome,
                });
            })
            .context("spawn preview worker")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::HostRuntime;
    use anyhow::Result;
    use celda_app::Intent;
    use celda_sheet::MemoryHost;
    use celda_testkit::{empty_workbook, scenario_workbook};
    use celda_tui::{ChatRuntime, InternalEvent, PreviewOutcome};
    use std::sync::mpsc;
    use std::time::Duration;

    fn runtime_with(workbook: celda_sheet::Workbook) -> HostRuntime {
        HostRuntime::new(MemoryHost::new(workbook), Duration::ZERO)
    }

    #[test]
    fn run_preview_returns_the_sorted_grid() -> Result<()> {
        let mut runtime = runtime_with(scenario_workbook());
        let reply = runtime.run_preview(Intent::SortBySales)?;
        assert_eq!(reply.body.kind(), "table");
        assert_eq!(reply.commit, Some(Intent::SortBySales));
        Ok(())
    }

    #[test]
    fn run_commit_mutates_the_shared_host() -> Result<()> {
        let mut runtime = runtime_with(scenario_workbook());
        runtime.run_commit(Intent::SortBySales)?;

        let host = runtime.host().lock().expect("host lock");
        let table = &host.workbook().active_sheet().tables[0];
        let values = table.values_as_strings();
        assert_eq!(values[1][0], "B");
        Ok(())
    }

    #[test]
    fn spawn_preview_delivers_the_outcome_event() -> Result<()> {
        let mut runtime = runtime_with(scenario_workbook());
        let (tx, rx) = mpsc::channel();

        runtime.spawn_preview(7, Intent::SortBySales, tx)?;
        let event = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("preview outcome");
        match event {
            InternalEvent::PreviewDone {
                request_id,
                outcome,
            } => {
                assert_eq!(request_id, 7);
                assert!(matches!(outcome, PreviewOutcome::Completed(_)));
            }
            other => panic!("expected PreviewDone, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn spawn_preview_reports_missing_tables_as_failures() -> Result<()> {
        let mut runtime = runtime_with(empty_workbook());
        let (tx, rx) = mpsc::channel();

        runtime.spawn_preview(1, Intent::ScatterSalesCosts, tx)?;
        let event = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("preview outcome");
        match event {
            InternalEvent::PreviewDone { outcome, .. } => match outcome {
                PreviewOutcome::Failed(description) => {
                    assert!(description.contains("no table found"));
                }
                other => panic!("expected failure, got {other:?}"),
            },
            other => panic!("expected PreviewDone, got {other:?}"),
        }
        Ok(())
    }
}
