//! Backfill of stale notices from a fresh upstream snapshot.
//!
//! Maintenance path, not part of request serving: notices that carry a
//! policy number but never received an application start date are matched
//! against one bounded snapshot of the upstream and patched with the usual
//! null-only rule.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::notice::{NewNotice, backfill_patch};
use crate::models::config::ServerConfig;
use crate::processing::record_error;
use crate::repository::errors::RepositoryError;
use crate::repository::{DieselRepository, NoticeReader, NoticeWriter};
use crate::sources::youth_policy::YouthPolicySource;
use crate::sources::{Source, UpstreamError, fetch_up_to};

/// Upper bound on the snapshot fetched per reconciliation run.
pub const SNAPSHOT_LIMIT: usize = 2000;

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub candidates: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ReconcileRunError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Re-derive missing fields for stale notices from one upstream snapshot,
/// matching records by their source-issued policy number.
///
/// A stale record without a snapshot counterpart is skipped, not an error.
pub async fn reconcile_stale_notices<S: Source>(
    source: &S,
    repo: &(impl NoticeReader + NoticeWriter),
    max_items: usize,
) -> Result<ReconcileReport, ReconcileRunError> {
    let stale = repo.list_stale_notices()?;
    let mut report = ReconcileReport {
        candidates: stale.len(),
        ..Default::default()
    };

    if stale.is_empty() {
        log::info!("{}: no stale notices to reconcile", source.name());
        return Ok(report);
    }
    log::info!("{}: reconciling {} stale notices", source.name(), stale.len());

    let snapshot = fetch_up_to(source, max_items).await?;
    let mut by_policy_number: HashMap<String, NewNotice> = HashMap::new();
    for raw in snapshot {
        let candidate = source.map_to_canonical(raw);
        if let Some(number) = candidate.policy_number.clone() {
            by_policy_number.entry(number).or_insert(candidate);
        }
    }

    for notice in stale {
        let Some(number) = notice.policy_number.as_deref() else {
            report.skipped += 1;
            continue;
        };
        let Some(candidate) = by_policy_number.get(number) else {
            report.skipped += 1;
            continue;
        };

        let patch = backfill_patch(&notice, candidate);
        if patch.is_empty() {
            report.skipped += 1;
            continue;
        }

        match repo.backfill_notice(notice.id, patch) {
            Ok(_) => report.updated += 1,
            Err(e) => {
                report.failed += 1;
                record_error(
                    &mut report.errors,
                    format!("notice {}: backfill failed: {e}", notice.id),
                );
            }
        }
    }

    log::info!(
        "{}: reconciliation finished, {} updated, {} skipped, {} failed",
        source.name(),
        report.updated,
        report.skipped,
        report.failed
    );
    Ok(report)
}

/// Handle one `Reconcile` job.
pub async fn process_reconcile_message(repo: &DieselRepository, config: &ServerConfig) {
    log::info!("Received reconcile job");

    let source = match YouthPolicySource::new(&config.youth_policy_api_key) {
        Ok(source) => source,
        Err(e) => {
            log::error!("Failed to build youth-policy source: {e}");
            return;
        }
    };

    match reconcile_stale_notices(&source, repo, SNAPSHOT_LIMIT).await {
        Ok(report) => log::info!("Finished reconcile job: {report:?}"),
        Err(e) => log::error!("Reconcile job failed: {e}"),
    }
}
