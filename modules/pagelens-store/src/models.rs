//! Row types and read filters. These are the transport shapes the API
//! serializes directly; identity comes from BIGSERIAL keys.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Page {
    pub id: i64,
    pub handle: String,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub follower_count: i32,
    pub head_count: i32,
    pub founded: Option<String>,
    pub specialties: Option<String>,
    pub image_url: Option<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub page_id: i64,
    pub content: Option<String>,
    pub url: String,
    pub like_count: i32,
    pub comment_count: i32,
    pub posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Member {
    pub id: i64,
    pub page_id: i64,
    pub name: String,
    pub role: Option<String>,
    pub location: Option<String>,
    pub profile_url: Option<String>,
}

/// A page with its child collections eagerly loaded.
#[derive(Debug, Clone, Serialize)]
pub struct PageDetail {
    #[serde(flatten)]
    pub page: Page,
    pub posts: Vec<Post>,
    pub employees: Vec<Member>,
}

/// Outcome of a page create. `Conflict` means the unique constraint on
/// `handle` fired, meaning a concurrent creator won the race. Typed on
/// purpose: callers must not string-match a database error message.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(Page),
    Conflict,
}

/// Search filters, combined with AND. All optional.
#[derive(Debug, Clone, Default)]
pub struct PageSearch {
    /// Partial, case-insensitive match on name.
    pub name: Option<String>,
    /// Partial, case-insensitive match on industry.
    pub industry: Option<String>,
    /// Inclusive lower bound on follower count.
    pub min_followers: Option<i32>,
    /// Inclusive upper bound on follower count.
    pub max_followers: Option<i32>,
}
