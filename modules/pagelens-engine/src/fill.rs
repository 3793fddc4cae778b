//! Cache-fill orchestration: serve cached, repair partial, or scrape fresh.
//!
//! The only contended write is the first-ever create for a handle. The store
//! reports that race as a typed `Conflict`, which this engine resolves by
//! re-reading: at most one page row per handle, and every racing caller
//! still gets a valid response.

use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use anyhow::Context;
use pagelens_common::{ProfileFetch, ProfileRecord};
use pagelens_store::{CreateOutcome, PageDetail};

use crate::traits::{PageRepo, ProfileSource};

/// How long a completed scrape attempt suppresses repair of still-empty
/// collections. Without this bound a page that legitimately has no posts
/// would be re-scraped on every read.
const REPAIR_TTL_HOURS: i64 = 6;

#[derive(Debug, Error)]
pub enum FillError {
    /// Confirmed absent upstream, or unreachable with nothing cached.
    #[error("page not found")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub struct PageFill<R, S> {
    repo: R,
    source: S,
    repair_ttl: Duration,
}

impl<R: PageRepo, S: ProfileSource> PageFill<R, S> {
    pub fn new(repo: R, source: S) -> Self {
        Self {
            repo,
            source,
            repair_ttl: Duration::hours(REPAIR_TTL_HOURS),
        }
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn with_repair_ttl(mut self, ttl: Duration) -> Self {
        self.repair_ttl = ttl;
        self
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn repo(&self) -> &R {
        &self.repo
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Serve the page for `handle`, filling or repairing the cache as needed.
    pub async fn fetch_or_fill(&self, handle: &str) -> Result<PageDetail, FillError> {
        match self.repo.get_by_handle(handle).await? {
            Some(detail) => Ok(self.repair_if_needed(detail).await),
            None => self.fill_miss(handle).await,
        }
    }

    // -----------------------------------------------------------------------
    // Hit paths
    // -----------------------------------------------------------------------

    fn is_complete(&self, detail: &PageDetail) -> bool {
        if !detail.posts.is_empty() && !detail.employees.is_empty() {
            return true;
        }
        detail
            .page
            .refreshed_at
            .is_some_and(|at| Utc::now() - at < self.repair_ttl)
    }

    /// Repair missing child collections of a cached page. Repair failures are
    /// absorbed: the existing record is always a valid response.
    async fn repair_if_needed(&self, detail: PageDetail) -> PageDetail {
        if self.is_complete(&detail) {
            return detail;
        }

        let page_id = detail.page.id;
        let handle = detail.page.handle.clone();
        info!(handle = %handle, page_id, "repairing partially cached page");

        let mut inserted_any = false;

        if detail.posts.is_empty() {
            let posts = self.source.fetch_posts(&handle).await;
            if !posts.is_empty() {
                match self.repo.upsert_posts(page_id, &posts).await {
                    Ok(n) => inserted_any |= n > 0,
                    Err(e) => warn!(handle = %handle, error = %e, "post repair write failed"),
                }
            }
        }

        if detail.employees.is_empty() {
            let members = self.source.fetch_members(&handle).await;
            if !members.is_empty() {
                match self.repo.upsert_members(page_id, &members).await {
                    Ok(n) => inserted_any |= n > 0,
                    Err(e) => warn!(handle = %handle, error = %e, "member repair write failed"),
                }
            }
        }

        // Stamp even when nothing came back, so an empty page is not
        // re-scraped on every read for the length of the TTL.
        if let Err(e) = self.repo.mark_refreshed(page_id).await {
            warn!(handle = %handle, error = %e, "failed to stamp refresh time");
        }

        if inserted_any {
            if let Ok(Some(fresh)) = self.repo.get_by_handle(&handle).await {
                return fresh;
            }
        }
        detail
    }

    // -----------------------------------------------------------------------
    // Miss path
    // -----------------------------------------------------------------------

    async fn fill_miss(&self, handle: &str) -> Result<PageDetail, FillError> {
        let profile = match self.source.fetch_profile(handle).await {
            ProfileFetch::NotFound => return Err(FillError::NotFound),
            ProfileFetch::Failed(reason) => {
                warn!(handle, reason = %reason, "profile fetch failed");
                // A concurrent filler may have succeeded in the meantime.
                return match self.repo.get_by_handle(handle).await? {
                    Some(detail) => Ok(detail),
                    None => Err(FillError::NotFound),
                };
            }
            ProfileFetch::Found(profile) => profile,
        };

        match self.create_and_populate(handle, &profile).await {
            Ok(detail) => Ok(detail),
            Err(e) => {
                // Not-Found is already ruled out here. Before surfacing an
                // internal error, check whether another request completed the
                // work. A valid cached record beats an error response.
                if let Ok(Some(detail)) = self.repo.get_by_handle(handle).await {
                    warn!(handle, error = %e, "fill failed but cache is populated, serving it");
                    return Ok(detail);
                }
                Err(FillError::Internal(e))
            }
        }
    }

    async fn create_and_populate(
        &self,
        handle: &str,
        profile: &ProfileRecord,
    ) -> anyhow::Result<PageDetail> {
        let page = match self.repo.create_page(profile).await? {
            CreateOutcome::Created(page) => page,
            CreateOutcome::Conflict => {
                // A concurrent request created the page first. Benign: drop
                // our write and serve whatever exists now, even if the
                // winner's child fetches are still in flight.
                debug!(handle, "lost create race, re-reading");
                return self
                    .repo
                    .get_by_handle(handle)
                    .await?
                    .context("page missing after create conflict");
            }
        };

        info!(handle, page_id = page.id, "created page, fetching children");

        let posts = self.source.fetch_posts(handle).await;
        if !posts.is_empty() {
            self.repo.upsert_posts(page.id, &posts).await?;
        }

        let members = self.source.fetch_members(handle).await;
        if !members.is_empty() {
            self.repo.upsert_members(page.id, &members).await?;
        }

        self.repo.mark_refreshed(page.id).await?;

        self.repo
            .get_by_handle(handle)
            .await?
            .context("page missing after create")
    }
}
