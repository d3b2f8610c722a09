//! Repairs report references missing from pregnancy registrations.
//!
//! Linking a new report to its registration is best effort, so a crash or write failure between
//! the two steps can leave a stored report that its registration does not list. The sweep walks
//! every report (oldest first, so repaired `reportRefs` keep submission order) and appends any
//! missing reference. Reports whose pregnancy was never registered are counted and left alone.

use crate::error::{ReportError, ReportResult};
use crate::workflow::ReportService;
use anc_api_shared::wire::ReconcileRes;
use anc_types::PregnancyId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub scanned: usize,
    pub relinked: usize,
    pub orphaned: usize,
}

impl From<ReconcileSummary> for ReconcileRes {
    fn from(summary: ReconcileSummary) -> Self {
        ReconcileRes {
            scanned: summary.scanned,
            relinked: summary.relinked,
            orphaned: summary.orphaned,
        }
    }
}

impl ReportService {
    /// Runs one reconciliation sweep over all stored reports.
    ///
    /// # Errors
    ///
    /// [`ReportError::Persistence`] if reports or registrations cannot be read, or a relink write
    /// fails.
    pub async fn reconcile(&self) -> ReportResult<ReconcileSummary> {
        let mut reports = self
            .reports()
            .list_all()
            .await
            .map_err(ReportError::Persistence)?;
        reports.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let mut summary = ReconcileSummary::default();
        let mut registrations = HashMap::<PregnancyId, Option<_>>::new();

        for report in &reports {
            summary.scanned += 1;

            if !registrations.contains_key(&report.pregnancy_id) {
                let record = self
                    .registrations()
                    .get(&report.pregnancy_id)
                    .await
                    .map_err(ReportError::Persistence)?;
                registrations.insert(report.pregnancy_id.clone(), record);
            }

            let Some(Some(record)) = registrations.get_mut(&report.pregnancy_id) else {
                tracing::warn!(
                    report_id = %report.id,
                    pregnancy_id = %report.pregnancy_id,
                    "report has no registration"
                );
                summary.orphaned += 1;
                continue;
            };

            if record.has_report(&report.id) {
                continue;
            }

            let appended = self
                .registrations()
                .append_report_ref(&report.pregnancy_id, &report.id)
                .await
                .map_err(ReportError::Persistence)?;
            record.report_refs.push(report.id.clone());
            if !appended {
                // Linked by a concurrent submission since the registration was read.
                continue;
            }
            summary.relinked += 1;
            tracing::info!(
                report_id = %report.id,
                pregnancy_id = %report.pregnancy_id,
                "relinked report to registration"
            );
        }

        tracing::info!(
            scanned = summary.scanned,
            relinked = summary.relinked,
            orphaned = summary.orphaned,
            "reconciliation complete"
        );
        Ok(summary)
    }
}

/// Runs [`ReportService::reconcile`] every `period` until the task is dropped.
///
/// Failures are logged and the next tick proceeds as normal.
pub async fn run_periodic(service: ReportService, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so startup is not blocked on a full scan.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(e) = service.reconcile().await {
            tracing::error!("periodic reconciliation failed: {:?}", e);
        }
    }
}
