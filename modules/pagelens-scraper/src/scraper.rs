use std::sync::Arc;

use browserless_client::BrowserlessClient;
use tracing::{info, warn};

use pagelens_common::{MemberRecord, PostRecord, ProfileFetch};

use crate::parse;
use crate::session::{Session, SessionOptions};

const BASE_URL: &str = "https://www.linkedin.com";

/// Extraction client for company pages. Cheap to clone; all clones share the
/// one scrape session.
#[derive(Clone)]
pub struct PageScraper {
    session: Arc<Session>,
}

impl PageScraper {
    pub fn new(client: BrowserlessClient, options: SessionOptions) -> Self {
        Self {
            session: Arc::new(Session::new(client, options)),
        }
    }

    /// Warm the session (cookie artifact, optional login). Never fails the
    /// caller: a dead session degrades every fetch instead.
    pub async fn init(&self) {
        self.session.init().await;
    }

    /// Fetch profile attributes for a handle.
    ///
    /// Outcomes are strict: `NotFound` only when the platform said the page
    /// does not exist, `Failed` for walls, timeouts, and unrecognized markup.
    pub async fn fetch_profile(&self, handle: &str) -> ProfileFetch {
        let url = format!("{BASE_URL}/company/{handle}/");
        info!(handle, "fetching profile");

        let html = match self.session.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(handle, error = %e, "profile navigation failed");
                return ProfileFetch::Failed(e.to_string());
            }
        };

        let html = if parse::is_auth_wall(&html) {
            if !self.session.reauthenticate().await {
                return ProfileFetch::Failed("auth wall, no usable session".to_string());
            }
            match self.session.fetch(&url).await {
                Ok(retry) if !parse::is_auth_wall(&retry) => retry,
                Ok(_) => {
                    return ProfileFetch::Failed("auth wall persisted after re-login".to_string())
                }
                Err(e) => return ProfileFetch::Failed(e.to_string()),
            }
        } else {
            html
        };

        if parse::is_missing_page(&html) {
            info!(handle, "page confirmed absent upstream");
            return ProfileFetch::NotFound;
        }

        match parse::profile(handle, &html) {
            Some(profile) => ProfileFetch::Found(profile),
            None => ProfileFetch::Failed("unrecognized page structure".to_string()),
        }
    }

    /// Recent posts for a handle. Degrades to empty on any internal error.
    pub async fn fetch_posts(&self, handle: &str) -> Vec<PostRecord> {
        let url = format!("{BASE_URL}/company/{handle}/posts/");
        match self.session.fetch(&url).await {
            Ok(html) if parse::is_auth_wall(&html) => {
                warn!(handle, "posts fetch hit auth wall, returning empty");
                Vec::new()
            }
            Ok(html) => {
                let posts = parse::posts(&html);
                info!(handle, count = posts.len(), "fetched posts");
                posts
            }
            Err(e) => {
                warn!(handle, error = %e, "posts fetch degraded to empty");
                Vec::new()
            }
        }
    }

    /// Listed employees for a handle. Degrades to empty on any internal error.
    pub async fn fetch_members(&self, handle: &str) -> Vec<MemberRecord> {
        let url = format!("{BASE_URL}/company/{handle}/people/");
        match self.session.fetch(&url).await {
            Ok(html) if parse::is_auth_wall(&html) => {
                warn!(handle, "members fetch hit auth wall, returning empty");
                Vec::new()
            }
            Ok(html) => {
                let members = parse::members(&html);
                info!(handle, count = members.len(), "fetched members");
                members
            }
            Err(e) => {
                warn!(handle, error = %e, "members fetch degraded to empty");
                Vec::new()
            }
        }
    }
}
