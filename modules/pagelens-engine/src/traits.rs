// Trait abstractions for the fill engine's dependencies.
//
// ProfileSource stands in for the scraper, PageRepo for the Postgres store.
// Both enable deterministic testing with MockSource and MockRepo: no
// network, no browser, no database.

use anyhow::Result;
use async_trait::async_trait;

use pagelens_common::{MemberRecord, PostRecord, ProfileFetch, ProfileRecord};
use pagelens_scraper::PageScraper;
use pagelens_store::{CreateOutcome, PageDetail, PageStore};

// ---------------------------------------------------------------------------
// ProfileSource (stands in for PageScraper)
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Best-effort profile fetch with a strict outcome taxonomy.
    async fn fetch_profile(&self, handle: &str) -> ProfileFetch;

    /// Recent posts; empty on any internal failure.
    async fn fetch_posts(&self, handle: &str) -> Vec<PostRecord>;

    /// Listed employees; empty on any internal failure.
    async fn fetch_members(&self, handle: &str) -> Vec<MemberRecord>;
}

#[async_trait]
impl ProfileSource for PageScraper {
    async fn fetch_profile(&self, handle: &str) -> ProfileFetch {
        PageScraper::fetch_profile(self, handle).await
    }

    async fn fetch_posts(&self, handle: &str) -> Vec<PostRecord> {
        PageScraper::fetch_posts(self, handle).await
    }

    async fn fetch_members(&self, handle: &str) -> Vec<MemberRecord> {
        PageScraper::fetch_members(self, handle).await
    }
}

// ---------------------------------------------------------------------------
// PageRepo (stands in for PageStore)
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PageRepo: Send + Sync {
    async fn get_by_handle(&self, handle: &str) -> Result<Option<PageDetail>>;

    /// Typed create: `Conflict` signals a lost race, never an error.
    async fn create_page(&self, profile: &ProfileRecord) -> Result<CreateOutcome>;

    /// Returns how many records were actually inserted.
    async fn upsert_posts(&self, page_id: i64, posts: &[PostRecord]) -> Result<usize>;

    async fn upsert_members(&self, page_id: i64, members: &[MemberRecord]) -> Result<usize>;

    async fn mark_refreshed(&self, page_id: i64) -> Result<()>;
}

#[async_trait]
impl PageRepo for PageStore {
    async fn get_by_handle(&self, handle: &str) -> Result<Option<PageDetail>> {
        Ok(PageStore::get_by_handle(self, handle).await?)
    }

    async fn create_page(&self, profile: &ProfileRecord) -> Result<CreateOutcome> {
        Ok(PageStore::create_page(self, profile).await?)
    }

    async fn upsert_posts(&self, page_id: i64, posts: &[PostRecord]) -> Result<usize> {
        Ok(PageStore::upsert_posts(self, page_id, posts).await?.len())
    }

    async fn upsert_members(&self, page_id: i64, members: &[MemberRecord]) -> Result<usize> {
        Ok(PageStore::upsert_members(self, page_id, members).await?.len())
    }

    async fn mark_refreshed(&self, page_id: i64) -> Result<()> {
        Ok(PageStore::mark_refreshed(self, page_id).await?)
    }
}
