mod common;

use chrono::NaiveDate;

use youthscan::domain::notice::NewNotice;
use youthscan::repository::errors::RepositoryError;
use youthscan::repository::{ListFilter, NoticeReader, NoticeWriter, UpsertOutcome};

use common::TestDb;

fn notice(policy_number: Option<&str>, url: Option<&str>, title: &str) -> NewNotice {
    NewNotice {
        policy_number: policy_number.map(str::to_string),
        original_url: url.map(str::to_string),
        title: title.to_string(),
        ..Default::default()
    }
}

#[test]
fn upsert_inserts_then_reports_duplicates() {
    let db = TestDb::new();
    let repo = db.repo();

    let record = notice(Some("R2024001"), None, "청년 월세 지원");
    assert_eq!(repo.upsert_notice(&record).unwrap(), UpsertOutcome::Inserted);
    assert_eq!(repo.upsert_notice(&record).unwrap(), UpsertOutcome::Duplicate);

    assert_eq!(repo.count_notices(&ListFilter::default()).unwrap(), 1);
}

#[test]
fn upsert_is_idempotent_across_runs() {
    let db = TestDb::new();
    let repo = db.repo();

    let batch = vec![
        notice(Some("R2024001"), None, "청년 월세 지원"),
        notice(None, Some("https://example.com/lh/1"), "국민임대 모집"),
    ];

    for record in &batch {
        repo.upsert_notice(record).unwrap();
    }
    let first_run: Vec<_> = repo
        .list_notices(&ListFilter::default(), 100, 0)
        .unwrap()
        .into_iter()
        .map(|n| (n.id, n.title))
        .collect();

    for record in &batch {
        assert_eq!(repo.upsert_notice(record).unwrap(), UpsertOutcome::Duplicate);
    }
    let second_run: Vec<_> = repo
        .list_notices(&ListFilter::default(), 100, 0)
        .unwrap()
        .into_iter()
        .map(|n| (n.id, n.title))
        .collect();

    assert_eq!(first_run, second_run);
}

#[test]
fn upsert_backfills_only_null_fields() {
    let db = TestDb::new();
    let repo = db.repo();

    let mut first = notice(Some("R2024001"), None, "청년 월세 지원");
    first.category = Some("주거".to_string());
    repo.upsert_notice(&first).unwrap();

    let mut second = notice(Some("R2024001"), Some("https://example.com/1"), "청년 월세 지원");
    second.category = Some("금융".to_string());
    second.description = Some("월 20만원 지원".to_string());
    second.start_date = NaiveDate::from_ymd_opt(2025, 3, 10);
    assert_eq!(repo.upsert_notice(&second).unwrap(), UpsertOutcome::Updated);

    let stored = repo
        .list_notices(&ListFilter::default(), 10, 0)
        .unwrap()
        .remove(0);
    // populated field untouched, null fields filled
    assert_eq!(stored.category.as_deref(), Some("주거"));
    assert_eq!(stored.description.as_deref(), Some("월 20만원 지원"));
    assert_eq!(stored.original_url.as_deref(), Some("https://example.com/1"));
    assert_eq!(stored.start_date, NaiveDate::from_ymd_opt(2025, 3, 10));
}

#[test]
fn upsert_matches_by_policy_number_before_url() {
    let db = TestDb::new();
    let repo = db.repo();

    let mut first = notice(Some("R2024001"), Some("https://example.com/old"), "지원 사업");
    first.category = Some("취업".to_string());
    repo.upsert_notice(&first).unwrap();

    // same policy number under a new url must not create a second record
    let second = notice(Some("R2024001"), Some("https://example.com/new"), "지원 사업");
    assert_eq!(repo.upsert_notice(&second).unwrap(), UpsertOutcome::Duplicate);

    let stored = repo
        .list_notices(&ListFilter::default(), 10, 0)
        .unwrap()
        .remove(0);
    assert_eq!(stored.original_url.as_deref(), Some("https://example.com/old"));
    assert_eq!(repo.count_notices(&ListFilter::default()).unwrap(), 1);
}

#[test]
fn upsert_without_natural_key_is_rejected() {
    let db = TestDb::new();
    let repo = db.repo();

    let record = notice(None, None, "키 없는 공고");
    assert!(matches!(
        repo.upsert_notice(&record),
        Err(RepositoryError::Validation(_))
    ));
}

#[test]
fn embedding_roundtrip_and_unembedded_scan() {
    let db = TestDb::new();
    let repo = db.repo();

    repo.upsert_notice(&notice(Some("R1"), None, "첫번째")).unwrap();
    repo.upsert_notice(&notice(Some("R2"), None, "두번째")).unwrap();

    let pending = repo.list_unembedded_notices().unwrap();
    assert_eq!(pending.len(), 2);

    let vector = vec![0.1_f32, 0.2, 0.3, 0.4];
    assert_eq!(repo.set_notice_embedding(pending[0].id, &vector).unwrap(), 1);

    let remaining = repo.list_unembedded_notices().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, pending[1].id);

    let stored = repo.get_notice(pending[0].id).unwrap();
    assert_eq!(stored.embedding.as_deref(), Some(vector.as_slice()));
}

#[test]
fn stale_scan_requires_policy_number_and_missing_start_date() {
    let db = TestDb::new();
    let repo = db.repo();

    repo.upsert_notice(&notice(Some("R1"), None, "날짜 없는 정책")).unwrap();

    let mut dated = notice(Some("R2"), None, "날짜 있는 정책");
    dated.start_date = NaiveDate::from_ymd_opt(2025, 1, 1);
    repo.upsert_notice(&dated).unwrap();

    repo.upsert_notice(&notice(None, Some("https://example.com/lh/1"), "LH 공고"))
        .unwrap();

    let stale = repo.list_stale_notices().unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].policy_number.as_deref(), Some("R1"));
}

#[test]
fn nearest_notices_ranks_and_paginates() {
    let db = TestDb::new();
    let repo = db.repo();

    for (number, title) in [("R1", "정확히 일치"), ("R2", "비슷함"), ("R3", "무관함")] {
        repo.upsert_notice(&notice(Some(number), None, title)).unwrap();
    }
    let pending = repo.list_unembedded_notices().unwrap();
    repo.set_notice_embedding(pending[0].id, &[1.0, 0.0, 0.0]).unwrap();
    repo.set_notice_embedding(pending[1].id, &[0.9, 0.43589, 0.0]).unwrap();
    repo.set_notice_embedding(pending[2].id, &[0.0, 1.0, 0.0]).unwrap();

    let query = [1.0_f32, 0.0, 0.0];
    assert_eq!(repo.count_nearest_notices(&query, 0.5).unwrap(), 2);

    let ranked = repo.nearest_notices(&query, 0.5, 10, 0).unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].0.title, "정확히 일치");
    assert!(ranked[0].1 > ranked[1].1);

    // second page of size one
    let paged = repo.nearest_notices(&query, 0.5, 1, 1).unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].0.title, "비슷함");

    // records without a vector never appear
    repo.upsert_notice(&notice(Some("R4"), None, "벡터 없음")).unwrap();
    assert_eq!(repo.count_nearest_notices(&query, 0.5).unwrap(), 2);
}
