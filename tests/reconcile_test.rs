mod common;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use youthscan::domain::notice::NewNotice;
use youthscan::processing::reconcile::reconcile_stale_notices;
use youthscan::repository::{ListFilter, NoticeReader, NoticeWriter};
use youthscan::sources::{Source, SourcePage, UpstreamError};

use common::TestDb;

/// A source whose snapshot is a fixed set of already-canonical records.
struct SnapshotSource {
    records: Vec<NewNotice>,
}

#[async_trait]
impl Source for SnapshotSource {
    type Raw = NewNotice;

    fn name(&self) -> &'static str {
        "snapshot"
    }

    fn page_delay(&self) -> Duration {
        Duration::ZERO
    }

    async fn fetch_page(&self, page: usize) -> Result<SourcePage<NewNotice>, UpstreamError> {
        let items = if page == 1 { self.records.clone() } else { Vec::new() };
        Ok(SourcePage {
            total_count: self.records.len(),
            items,
        })
    }

    fn map_to_canonical(&self, raw: NewNotice) -> NewNotice {
        raw
    }
}

fn stored(policy_number: &str, title: &str) -> NewNotice {
    NewNotice {
        policy_number: Some(policy_number.to_string()),
        title: title.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn reconciler_backfills_matched_records_and_skips_the_rest() {
    let db = TestDb::new();
    let repo = db.repo();

    // two stale records, one record that is already complete
    let mut complete = stored("R0", "완료된 정책");
    complete.start_date = NaiveDate::from_ymd_opt(2025, 1, 1);
    repo.upsert_notice(&complete).unwrap();
    repo.upsert_notice(&stored("R1", "날짜 없는 정책")).unwrap();
    repo.upsert_notice(&stored("R2", "스냅샷에 없는 정책")).unwrap();

    // the snapshot only knows R1
    let mut fresh = stored("R1", "날짜 없는 정책");
    fresh.start_date = NaiveDate::from_ymd_opt(2025, 3, 10);
    fresh.end_date = NaiveDate::from_ymd_opt(2025, 3, 26);
    fresh.description = Some("갱신된 설명".to_string());
    let source = SnapshotSource {
        records: vec![fresh],
    };

    let report = reconcile_stale_notices(&source, &repo, 2000).await.unwrap();

    assert_eq!(report.candidates, 2);
    assert_eq!(report.updated, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);

    let notices = repo.list_notices(&ListFilter::default(), 10, 0).unwrap();
    let updated = notices
        .iter()
        .find(|n| n.policy_number.as_deref() == Some("R1"))
        .unwrap();
    assert_eq!(updated.start_date, NaiveDate::from_ymd_opt(2025, 3, 10));
    assert_eq!(updated.end_date, NaiveDate::from_ymd_opt(2025, 3, 26));
    assert_eq!(updated.description.as_deref(), Some("갱신된 설명"));

    let untouched = notices
        .iter()
        .find(|n| n.policy_number.as_deref() == Some("R2"))
        .unwrap();
    assert_eq!(untouched.start_date, None);
}

#[tokio::test]
async fn reconciler_is_a_noop_without_stale_records() {
    let db = TestDb::new();
    let repo = db.repo();

    let mut complete = stored("R0", "완료된 정책");
    complete.start_date = NaiveDate::from_ymd_opt(2025, 1, 1);
    repo.upsert_notice(&complete).unwrap();

    let source = SnapshotSource { records: vec![] };
    let report = reconcile_stale_notices(&source, &repo, 2000).await.unwrap();

    assert_eq!(report.candidates, 0);
    assert_eq!(report.updated, 0);
}

#[tokio::test]
async fn reconciler_counts_unmatched_as_skipped_not_failed() {
    let db = TestDb::new();
    let repo = db.repo();

    repo.upsert_notice(&stored("R1", "정책")).unwrap();

    // snapshot fetch succeeds but matches nothing
    let source = SnapshotSource {
        records: vec![stored("R9", "다른 정책")],
    };
    let report = reconcile_stale_notices(&source, &repo, 2000).await.unwrap();

    assert_eq!(report.candidates, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
}
