use crate::models::config::ServerConfig;
use crate::processing::record_error;
use crate::repository::{DieselRepository, NoticeWriter, UpsertOutcome};
use crate::sources::lh_notice::LhNoticeSource;
use crate::sources::youth_policy::YouthPolicySource;
use crate::sources::{Source, UpstreamError, fetch_all};

/// Outcome counts for one ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Fetch everything the source offers, normalize and upsert record by
/// record. Only a total upstream failure (nothing fetched at all) is an
/// error; individual write failures are counted and the run continues.
pub async fn run_ingest<S: Source>(
    source: &S,
    repo: &impl NoticeWriter,
) -> Result<IngestReport, UpstreamError> {
    log::info!("{}: ingestion started", source.name());

    let raw_items = fetch_all(source).await?;
    let mut report = IngestReport {
        fetched: raw_items.len(),
        ..Default::default()
    };

    for raw in raw_items {
        let notice = source.map_to_canonical(raw);
        match repo.upsert_notice(&notice) {
            Ok(UpsertOutcome::Inserted) => report.inserted += 1,
            Ok(UpsertOutcome::Updated) => report.updated += 1,
            Ok(UpsertOutcome::Duplicate) => report.duplicates += 1,
            Err(e) => {
                report.failed += 1;
                record_error(
                    &mut report.errors,
                    format!("{}: failed to write {:?}: {e}", source.name(), notice.title),
                );
            }
        }
    }

    log::info!(
        "{}: ingestion finished, fetched {} inserted {} updated {} duplicates {} failed {}",
        source.name(),
        report.fetched,
        report.inserted,
        report.updated,
        report.duplicates,
        report.failed
    );
    Ok(report)
}

/// Handle one `Collect` job: resolve the selector to a source and run it.
pub async fn process_collect_message(selector: &str, repo: &DieselRepository, config: &ServerConfig) {
    log::info!("Received collect job: {selector}");

    let result = match selector {
        "youth-policy" => match YouthPolicySource::new(&config.youth_policy_api_key) {
            Ok(source) => run_ingest(&source, repo).await,
            Err(e) => {
                log::error!("Failed to build youth-policy source: {e}");
                return;
            }
        },
        "lh-notice" => match LhNoticeSource::new(&config.lh_api_key) {
            Ok(source) => run_ingest(&source, repo).await,
            Err(e) => {
                log::error!("Failed to build lh-notice source: {e}");
                return;
            }
        },
        _ => {
            log::error!("Unknown source selector: {selector}");
            return;
        }
    };

    match result {
        Ok(report) => log::info!("Finished collect job {selector}: {report:?}"),
        Err(e) => log::error!("Collect job {selector} failed: {e}"),
    }
}
