// Test mocks for the fill engine.
//
// Two mocks matching the two trait boundaries:
// - MockSource (ProfileSource): HashMap-based handle → outcome, call counters
// - MockRepo (PageRepo): stateful in-memory catalog under one lock, so
//   create races resolve exactly like the database's unique constraint
//
// Plus helpers for building rows without touching Postgres.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use pagelens_common::{MemberRecord, PostRecord, ProfileFetch, ProfileRecord};
use pagelens_store::{CreateOutcome, Member, Page, PageDetail, Post};

use crate::traits::{PageRepo, ProfileSource};

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

/// Programmable extraction client. Unregistered handles fetch as `Failed`.
/// Builder pattern: `.on_profile()`, `.on_posts()`, `.on_members()`.
#[derive(Default)]
pub struct MockSource {
    profiles: HashMap<String, ProfileFetch>,
    posts: HashMap<String, Vec<PostRecord>>,
    members: HashMap<String, Vec<MemberRecord>>,
    profile_calls: AtomicUsize,
    post_calls: AtomicUsize,
    member_calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_profile(mut self, handle: &str, outcome: ProfileFetch) -> Self {
        self.profiles.insert(handle.to_string(), outcome);
        self
    }

    pub fn on_posts(mut self, handle: &str, posts: Vec<PostRecord>) -> Self {
        self.posts.insert(handle.to_string(), posts);
        self
    }

    pub fn on_members(mut self, handle: &str, members: Vec<MemberRecord>) -> Self {
        self.members.insert(handle.to_string(), members);
        self
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn post_calls(&self) -> usize {
        self.post_calls.load(Ordering::SeqCst)
    }

    pub fn member_calls(&self) -> usize {
        self.member_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileSource for MockSource {
    async fn fetch_profile(&self, handle: &str) -> ProfileFetch {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.profiles
            .get(handle)
            .cloned()
            .unwrap_or_else(|| ProfileFetch::Failed("unregistered handle".to_string()))
    }

    async fn fetch_posts(&self, handle: &str) -> Vec<PostRecord> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        self.posts.get(handle).cloned().unwrap_or_default()
    }

    async fn fetch_members(&self, handle: &str) -> Vec<MemberRecord> {
        self.member_calls.fetch_add(1, Ordering::SeqCst);
        self.members.get(handle).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// MockRepo
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RepoState {
    pages: Vec<PageDetail>,
    next_page_id: i64,
    next_child_id: i64,
}

/// In-memory catalog. All mutation happens under one lock, so the
/// create-race semantics match the store's unique constraint exactly.
#[derive(Default)]
pub struct MockRepo {
    state: Mutex<RepoState>,
    fail_child_writes: bool,
}

impl MockRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every child upsert fail, for exercising the last-chance re-read.
    pub fn with_failing_child_writes(mut self) -> Self {
        self.fail_child_writes = true;
        self
    }

    /// Preload a page, bypassing the create path.
    pub fn seed(self, detail: PageDetail) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_page_id = state.next_page_id.max(detail.page.id);
            state.pages.push(detail);
        }
        self
    }

    pub fn page_count(&self) -> usize {
        self.state.lock().unwrap().pages.len()
    }
}

#[async_trait]
impl PageRepo for MockRepo {
    async fn get_by_handle(&self, handle: &str) -> Result<Option<PageDetail>> {
        let state = self.state.lock().unwrap();
        Ok(state.pages.iter().find(|d| d.page.handle == handle).cloned())
    }

    async fn create_page(&self, profile: &ProfileRecord) -> Result<CreateOutcome> {
        let mut state = self.state.lock().unwrap();
        if state.pages.iter().any(|d| d.page.handle == profile.handle) {
            return Ok(CreateOutcome::Conflict);
        }
        state.next_page_id += 1;
        let page = Page {
            id: state.next_page_id,
            handle: profile.handle.clone(),
            name: profile.name.clone(),
            description: profile.description.clone(),
            website: profile.website.clone(),
            industry: profile.industry.clone(),
            follower_count: profile.follower_count,
            head_count: profile.head_count,
            founded: profile.founded.clone(),
            specialties: profile.specialties.clone(),
            image_url: profile.image_url.clone(),
            refreshed_at: None,
            created_at: Utc::now(),
        };
        state.pages.push(PageDetail {
            page: page.clone(),
            posts: Vec::new(),
            employees: Vec::new(),
        });
        Ok(CreateOutcome::Created(page))
    }

    async fn upsert_posts(&self, page_id: i64, posts: &[PostRecord]) -> Result<usize> {
        if self.fail_child_writes {
            bail!("injected write failure");
        }
        let mut state = self.state.lock().unwrap();
        state.next_child_id += 1;
        let mut next_id = state.next_child_id;
        let Some(detail) = state.pages.iter_mut().find(|d| d.page.id == page_id) else {
            bail!("no page with id {page_id}");
        };
        let mut inserted = 0;
        for record in posts {
            if detail.posts.iter().any(|p| p.url == record.url) {
                continue;
            }
            detail.posts.push(Post {
                id: next_id,
                page_id,
                content: record.content.clone(),
                url: record.url.clone(),
                like_count: record.like_count,
                comment_count: record.comment_count,
                posted_at: record.posted_at,
                created_at: Utc::now(),
            });
            next_id += 1;
            inserted += 1;
        }
        state.next_child_id = next_id;
        Ok(inserted)
    }

    async fn upsert_members(&self, page_id: i64, members: &[MemberRecord]) -> Result<usize> {
        if self.fail_child_writes {
            bail!("injected write failure");
        }
        let mut state = self.state.lock().unwrap();
        state.next_child_id += 1;
        let mut next_id = state.next_child_id;
        let Some(detail) = state.pages.iter_mut().find(|d| d.page.id == page_id) else {
            bail!("no page with id {page_id}");
        };
        let mut inserted = 0;
        for record in members {
            if detail.employees.iter().any(|m| m.name == record.name) {
                continue;
            }
            detail.employees.push(Member {
                id: next_id,
                page_id,
                name: record.name.clone(),
                role: record.role.clone(),
                location: record.location.clone(),
                profile_url: record.profile_url.clone(),
            });
            next_id += 1;
            inserted += 1;
        }
        state.next_child_id = next_id;
        Ok(inserted)
    }

    async fn mark_refreshed(&self, page_id: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(detail) = state.pages.iter_mut().find(|d| d.page.id == page_id) {
            detail.page.refreshed_at = Some(Utc::now());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row builders
// ---------------------------------------------------------------------------

pub fn profile_record(handle: &str, name: &str) -> ProfileRecord {
    ProfileRecord {
        handle: handle.to_string(),
        name: name.to_string(),
        description: Some(format!("{name} does things.")),
        website: Some(format!("https://{handle}.example.com")),
        industry: Some("Technology".to_string()),
        follower_count: 500,
        head_count: 50,
        founded: Some("2015".to_string()),
        specialties: None,
        image_url: None,
    }
}

pub fn post_record(url: &str, content: &str) -> PostRecord {
    PostRecord {
        content: Some(content.to_string()),
        url: url.to_string(),
        like_count: 3,
        comment_count: 1,
        posted_at: None,
    }
}

pub fn member_record(name: &str) -> MemberRecord {
    MemberRecord {
        name: name.to_string(),
        role: Some("Engineer".to_string()),
        location: None,
        profile_url: None,
    }
}

/// A fully-materialized page detail for read-path tests.
pub fn page_detail(id: i64, handle: &str, post_texts: &[&str], member_names: &[&str]) -> PageDetail {
    let page = Page {
        id,
        handle: handle.to_string(),
        name: capitalize(handle),
        description: Some("A test company.".to_string()),
        website: Some(format!("https://{handle}.example.com")),
        industry: Some("Technology".to_string()),
        follower_count: 500,
        head_count: 50,
        founded: None,
        specialties: None,
        image_url: None,
        refreshed_at: None,
        created_at: Utc::now(),
    };
    let posts = post_texts
        .iter()
        .enumerate()
        .map(|(i, text)| Post {
            id: (i + 1) as i64,
            page_id: id,
            content: Some(text.to_string()),
            url: format!("https://www.linkedin.com/feed/update/urn:li:activity:{id}{i}/"),
            like_count: 0,
            comment_count: 0,
            posted_at: None,
            created_at: Utc::now(),
        })
        .collect();
    let employees = member_names
        .iter()
        .enumerate()
        .map(|(i, name)| Member {
            id: (i + 1) as i64,
            page_id: id,
            name: name.to_string(),
            role: None,
            location: None,
            profile_url: None,
        })
        .collect();
    PageDetail { page, posts, employees }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
