//! Fill-engine behavior over the mock trait boundaries: no network, no
//! browser, no database.

use std::sync::Arc;

use chrono::{Duration, Utc};

use pagelens_common::ProfileFetch;
use pagelens_engine::testing::{
    member_record, page_detail, post_record, profile_record, MockRepo, MockSource,
};
use pagelens_engine::{FillError, PageFill};

#[tokio::test]
async fn miss_creates_page_with_children() {
    let source = MockSource::new()
        .on_profile("acme", ProfileFetch::Found(profile_record("acme", "Acme")))
        .on_posts(
            "acme",
            vec![
                post_record("https://example.com/p/1", "We are hiring!"),
                post_record("https://example.com/p/2", "Series B closed."),
            ],
        );
    let fill = PageFill::new(MockRepo::new(), source);

    let detail = fill.fetch_or_fill("acme").await.unwrap();

    assert!(detail.page.id > 0);
    assert_eq!(detail.page.name, "Acme");
    assert_eq!(detail.posts.len(), 2);
    assert_eq!(detail.employees.len(), 0);
    assert!(detail.page.refreshed_at.is_some());
}

#[tokio::test]
async fn second_fetch_skips_profile_scrape() {
    let source = MockSource::new()
        .on_profile("acme", ProfileFetch::Found(profile_record("acme", "Acme")))
        .on_posts("acme", vec![post_record("https://example.com/p/1", "Hello")]);
    let fill = PageFill::new(MockRepo::new(), source);

    let first = fill.fetch_or_fill("acme").await.unwrap();
    let second = fill.fetch_or_fill("acme").await.unwrap();

    assert_eq!(first.page.id, second.page.id);
    // The second request is a hit: employees are empty but the fill stamped
    // the refresh time, so no repair and no second profile fetch.
    assert_eq!(fill.source().profile_calls(), 1);
}

#[tokio::test]
async fn confirmed_absent_creates_nothing() {
    let source = MockSource::new().on_profile("ghost", ProfileFetch::NotFound);
    let fill = PageFill::new(MockRepo::new(), source);

    let err = fill.fetch_or_fill("ghost").await.unwrap_err();

    assert!(matches!(err, FillError::NotFound));
    assert_eq!(fill.repo().page_count(), 0);
}

#[tokio::test]
async fn upstream_failure_with_empty_cache_is_not_found() {
    let source = MockSource::new()
        .on_profile("flaky", ProfileFetch::Failed("timeout".to_string()));
    let fill = PageFill::new(MockRepo::new(), source);

    let err = fill.fetch_or_fill("flaky").await.unwrap_err();

    assert!(matches!(err, FillError::NotFound));
    assert_eq!(fill.repo().page_count(), 0);
}

#[tokio::test]
async fn cached_page_survives_upstream_outage() {
    // Incomplete cached page + dead upstream: the repair attempt finds
    // nothing, and the existing record is still served.
    let repo = MockRepo::new().seed(page_detail(7, "acme", &[], &[]));
    let fill = PageFill::new(repo, MockSource::new());

    let detail = fill.fetch_or_fill("acme").await.unwrap();

    assert_eq!(detail.page.id, 7);
    // Hit path never fetches the profile.
    assert_eq!(fill.source().profile_calls(), 0);
}

#[tokio::test]
async fn concurrent_first_fetches_create_one_row() {
    let source = MockSource::new()
        .on_profile("acme", ProfileFetch::Found(profile_record("acme", "Acme")))
        .on_posts("acme", vec![post_record("https://example.com/p/1", "Hello")])
        .on_members("acme", vec![member_record("Ada Lovelace")]);
    let fill = Arc::new(PageFill::new(MockRepo::new(), source));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let fill = Arc::clone(&fill);
        handles.push(tokio::spawn(async move { fill.fetch_or_fill("acme").await }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let detail = handle.await.unwrap().unwrap();
        ids.push(detail.page.id);
    }

    assert_eq!(fill.repo().page_count(), 1);
    assert!(ids.windows(2).all(|w| w[0] == w[1]), "all callers saw one page");
}

#[tokio::test]
async fn repair_fills_only_missing_collections() {
    let repo = MockRepo::new().seed(page_detail(3, "acme", &[], &["Ada Lovelace"]));
    let source = MockSource::new().on_posts(
        "acme",
        vec![
            post_record("https://example.com/p/1", "One"),
            post_record("https://example.com/p/2", "Two"),
        ],
    );
    let fill = PageFill::new(repo, source);

    let detail = fill.fetch_or_fill("acme").await.unwrap();

    assert_eq!(detail.posts.len(), 2);
    assert_eq!(detail.employees.len(), 1);
    assert_eq!(fill.source().post_calls(), 1);
    // Employees were present; that collection is not re-fetched.
    assert_eq!(fill.source().member_calls(), 0);
}

#[tokio::test]
async fn recent_refresh_suppresses_repair() {
    let mut detail = page_detail(4, "quiet", &[], &[]);
    detail.page.refreshed_at = Some(Utc::now());
    let fill = PageFill::new(MockRepo::new().seed(detail), MockSource::new());

    let served = fill.fetch_or_fill("quiet").await.unwrap();

    assert!(served.posts.is_empty());
    assert_eq!(fill.source().post_calls(), 0);
    assert_eq!(fill.source().member_calls(), 0);
}

#[tokio::test]
async fn stale_refresh_allows_repair_again() {
    let mut detail = page_detail(4, "quiet", &[], &[]);
    detail.page.refreshed_at = Some(Utc::now() - Duration::hours(48));
    let fill = PageFill::new(MockRepo::new().seed(detail), MockSource::new());

    fill.fetch_or_fill("quiet").await.unwrap();

    assert_eq!(fill.source().post_calls(), 1);
}

#[tokio::test]
async fn empty_repair_converges_instead_of_looping() {
    let repo = MockRepo::new().seed(page_detail(5, "quiet", &[], &[]));
    let fill = PageFill::new(repo, MockSource::new());

    let first = fill.fetch_or_fill("quiet").await.unwrap();
    let second = fill.fetch_or_fill("quiet").await.unwrap();

    assert!(first.posts.is_empty());
    assert_eq!(second.page.id, first.page.id);
    // The empty attempt stamped the page; the second read does not re-scrape.
    assert_eq!(fill.source().post_calls(), 1);
    assert_eq!(fill.source().member_calls(), 1);
}

#[tokio::test]
async fn repeated_repair_never_duplicates() {
    let repo = MockRepo::new().seed(page_detail(6, "acme", &[], &[]));
    let source = MockSource::new()
        .on_posts("acme", vec![post_record("https://example.com/p/1", "One")]);
    // Zero TTL: every read of a still-incomplete page attempts repair.
    let fill = PageFill::new(repo, source).with_repair_ttl(Duration::zero());

    let first = fill.fetch_or_fill("acme").await.unwrap();
    assert_eq!(first.posts.len(), 1);

    let second = fill.fetch_or_fill("acme").await.unwrap();

    assert_eq!(second.posts.len(), 1, "no duplicates from repeated repair");
    // Posts exist now, so only the still-empty members collection is re-fetched.
    assert_eq!(fill.source().post_calls(), 1);
    assert_eq!(fill.source().member_calls(), 2);
}

#[tokio::test]
async fn child_write_failure_still_serves_created_page() {
    let source = MockSource::new()
        .on_profile("acme", ProfileFetch::Found(profile_record("acme", "Acme")))
        .on_posts("acme", vec![post_record("https://example.com/p/1", "One")]);
    let repo = MockRepo::new().with_failing_child_writes();
    let fill = PageFill::new(repo, source);

    // The upsert blows up mid-fill; the last-chance re-read still finds the
    // created page and serves it rather than surfacing the error.
    let detail = fill.fetch_or_fill("acme").await.unwrap();

    assert_eq!(detail.page.name, "Acme");
    assert!(detail.posts.is_empty());
    assert_eq!(fill.repo().page_count(), 1);
}
