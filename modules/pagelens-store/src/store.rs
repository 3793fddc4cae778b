//! Postgres persistence for the page catalog. The single source of truth:
//! all dedup and race detection rides on the schema's unique constraints.

use sqlx::PgPool;
use tracing::debug;

use pagelens_common::{CommentRecord, MemberRecord, PostRecord, ProfileRecord};

use crate::error::Result;
use crate::models::{Comment, CreateOutcome, Member, Page, PageDetail, PageSearch, Post};

const PAGE_COLUMNS: &str = "id, handle, name, description, website, industry, follower_count, \
     head_count, founded, specialties, image_url, refreshed_at, created_at";

const SEARCH_FILTER: &str = "($1::text IS NULL OR name ILIKE '%' || $1 || '%') \
     AND ($2::text IS NULL OR industry ILIKE '%' || $2 || '%') \
     AND ($3::int IS NULL OR follower_count >= $3) \
     AND ($4::int IS NULL OR follower_count <= $4)";

#[derive(Clone)]
pub struct PageStore {
    pool: PgPool,
}

impl PageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a new page. Returns `Conflict` when the handle already exists;
    /// the losing side of a create race re-reads instead of failing.
    pub async fn create_page(&self, profile: &ProfileRecord) -> Result<CreateOutcome> {
        let row = sqlx::query_as::<_, Page>(&format!(
            r#"
            INSERT INTO pages
                (handle, name, description, website, industry,
                 follower_count, head_count, founded, specialties, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (handle) DO NOTHING
            RETURNING {PAGE_COLUMNS}
            "#
        ))
        .bind(&profile.handle)
        .bind(&profile.name)
        .bind(&profile.description)
        .bind(&profile.website)
        .bind(&profile.industry)
        .bind(profile.follower_count)
        .bind(profile.head_count)
        .bind(&profile.founded)
        .bind(&profile.specialties)
        .bind(&profile.image_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(page) => CreateOutcome::Created(page),
            None => CreateOutcome::Conflict,
        })
    }

    /// Insert posts whose permalink is not already stored. Idempotent:
    /// repeating the same input inserts nothing. Returns the subset inserted.
    pub async fn upsert_posts(&self, page_id: i64, records: &[PostRecord]) -> Result<Vec<Post>> {
        let mut inserted = Vec::new();
        for record in records {
            let row = sqlx::query_as::<_, Post>(
                r#"
                INSERT INTO posts (page_id, content, url, like_count, comment_count, posted_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (url) DO NOTHING
                RETURNING id, page_id, content, url, like_count, comment_count, posted_at, created_at
                "#,
            )
            .bind(page_id)
            .bind(&record.content)
            .bind(&record.url)
            .bind(record.like_count)
            .bind(record.comment_count)
            .bind(record.posted_at)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(post) = row {
                inserted.push(post);
            }
        }
        debug!(page_id, total = records.len(), inserted = inserted.len(), "upserted posts");
        Ok(inserted)
    }

    /// Insert members not already present for this page, deduped by
    /// (page, name). Returns the subset inserted.
    pub async fn upsert_members(
        &self,
        page_id: i64,
        records: &[MemberRecord],
    ) -> Result<Vec<Member>> {
        let mut inserted = Vec::new();
        for record in records {
            let row = sqlx::query_as::<_, Member>(
                r#"
                INSERT INTO members (page_id, name, role, location, profile_url)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (page_id, name) DO NOTHING
                RETURNING id, page_id, name, role, location, profile_url
                "#,
            )
            .bind(page_id)
            .bind(&record.name)
            .bind(&record.role)
            .bind(&record.location)
            .bind(&record.profile_url)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(member) = row {
                inserted.push(member);
            }
        }
        debug!(page_id, total = records.len(), inserted = inserted.len(), "upserted members");
        Ok(inserted)
    }

    /// Append comments to a post.
    pub async fn add_comments(&self, post_id: i64, records: &[CommentRecord]) -> Result<Vec<Comment>> {
        let mut created = Vec::new();
        for record in records {
            let comment = sqlx::query_as::<_, Comment>(
                r#"
                INSERT INTO comments (post_id, author, content)
                VALUES ($1, $2, $3)
                RETURNING id, post_id, author, content, created_at
                "#,
            )
            .bind(post_id)
            .bind(&record.author)
            .bind(&record.content)
            .fetch_one(&self.pool)
            .await?;
            created.push(comment);
        }
        Ok(created)
    }

    /// Stamp the page as having completed a posts+members scrape attempt.
    pub async fn mark_refreshed(&self, page_id: i64) -> Result<()> {
        sqlx::query("UPDATE pages SET refreshed_at = now() WHERE id = $1")
            .bind(page_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Page with child collections, by external handle.
    pub async fn get_by_handle(&self, handle: &str) -> Result<Option<PageDetail>> {
        let Some(page) = self.find_page(handle).await? else {
            return Ok(None);
        };

        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, page_id, content, url, like_count, comment_count, posted_at, created_at
            FROM posts
            WHERE page_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(page.id)
        .fetch_all(&self.pool)
        .await?;

        let employees = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, page_id, name, role, location, profile_url
            FROM members
            WHERE page_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(page.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(PageDetail { page, posts, employees }))
    }

    /// Page row only (no children), by external handle.
    pub async fn find_page(&self, handle: &str) -> Result<Option<Page>> {
        let row = sqlx::query_as::<_, Page>(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE handle = $1"
        ))
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, page_id, content, url, like_count, comment_count, posted_at, created_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Catalog listing, newest-created-first.
    pub async fn list_pages(&self, skip: i64, limit: i64) -> Result<Vec<Page>> {
        let rows = sqlx::query_as::<_, Page>(&format!(
            r#"
            SELECT {PAGE_COLUMNS} FROM pages
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_pages(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM pages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Filtered search, highest-follower-count-first.
    pub async fn search_pages(
        &self,
        filter: &PageSearch,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Page>> {
        let rows = sqlx::query_as::<_, Page>(&format!(
            r#"
            SELECT {PAGE_COLUMNS} FROM pages
            WHERE {SEARCH_FILTER}
            ORDER BY follower_count DESC, id ASC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(&filter.name)
        .bind(&filter.industry)
        .bind(filter.min_followers)
        .bind(filter.max_followers)
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Count with the same filters as `search_pages`, for pagination metadata.
    pub async fn count_search(&self, filter: &PageSearch) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT count(*) FROM pages WHERE {SEARCH_FILTER}"
        ))
        .bind(&filter.name)
        .bind(&filter.industry)
        .bind(filter.min_followers)
        .bind(filter.max_followers)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn list_posts(&self, page_id: i64, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, page_id, content, url, like_count, comment_count, posted_at, created_at
            FROM posts
            WHERE page_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(page_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_posts(&self, page_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM posts WHERE page_id = $1")
            .bind(page_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn list_comments(&self, post_id: i64, limit: i64, offset: i64) -> Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, author, content, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(post_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_comments(&self, post_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn list_members(&self, page_id: i64, limit: i64, offset: i64) -> Result<Vec<Member>> {
        let rows = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, page_id, name, role, location, profile_url
            FROM members
            WHERE page_id = $1
            ORDER BY id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(page_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_members(&self, page_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM members WHERE page_id = $1")
            .bind(page_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
