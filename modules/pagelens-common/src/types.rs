//! Scrape-record types shared between the extraction client, the store,
//! and the fill engine. These carry what came off the wire; row types with
//! database identity live in `pagelens-store`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile attributes extracted from a company page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Public handle on the source platform, e.g. "acme".
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
}

/// One post extracted from a page's feed. The permalink is the dedup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub content: Option<String>,
    pub url: String,
    pub like_count: i32,
    pub comment_count: i32,
    /// Original posting time when the page exposes it.
    pub posted_at: Option<DateTime<Utc>>,
}

/// One comment on a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub author: Option<String>,
    pub content: String,
}

/// One employee extracted from a page's people tab.
/// Deduped per page by name. Approximate: accepts false negatives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRecord {
    pub name: String,
    pub role: Option<String>,
    pub location: Option<String>,
    pub profile_url: Option<String>,
}

/// Outcome of a profile fetch.
///
/// `NotFound` means the platform confirmed the page does not exist.
/// `Failed` means we could not determine (auth wall, timeout, unrecognized
/// markup). Conflating the two would seed the catalog with phantom pages on
/// every upstream hiccup, so callers must never treat `Failed` as absence
/// worth recording.
#[derive(Debug, Clone)]
pub enum ProfileFetch {
    Found(ProfileRecord),
    NotFound,
    Failed(String),
}
