//! Long-lived scrape session over Browserless.
//!
//! The session owns the cookie jar. It is warmed once at startup from a disk
//! artifact (DevTools-shape cookie JSON, typically saved by an interactive
//! login) and optionally refreshed through a credential login script. There is
//! exactly one session per process; re-authentication holds the state lock for
//! its full duration so concurrent re-logins coalesce instead of racing.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use browserless_client::{BrowserlessClient, ContentOptions, Cookie};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Hard upper bound on any single navigation.
pub(crate) const NAV_TIMEOUT: Duration = Duration::from_secs(30);

/// Login flow gets longer: two navigations plus form interaction.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(60);

/// A re-login completed this recently satisfies any queued re-auth request.
const REAUTH_COALESCE: Duration = Duration::from_secs(60);

/// Puppeteer script for the Browserless /function endpoint: credential login,
/// then harvest the context cookies.
const LOGIN_SCRIPT: &str = r##"
export default async function ({ page, context }) {
  await page.goto("https://www.linkedin.com/login", { waitUntil: "domcontentloaded" });
  await page.type("#username", context.email);
  await page.type("#password", context.password);
  await Promise.all([
    page.waitForNavigation({ waitUntil: "domcontentloaded", timeout: 30000 }),
    page.click('button[type="submit"]'),
  ]);
  const cookies = await page.cookies();
  return { data: { cookies: cookies, url: page.url() }, type: "application/json" };
}
"##;

/// Credentials and artifacts for the scrape session. Everything optional:
/// with nothing set the session runs anonymously.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub email: Option<String>,
    pub password: Option<String>,
    /// Cookie artifact (JSON array in DevTools shape). Loaded at init,
    /// rewritten after a successful credential login.
    pub cookie_file: Option<PathBuf>,
}

impl SessionOptions {
    fn has_credentials(&self) -> bool {
        self.email.is_some() && self.password.is_some()
    }
}

#[derive(Default)]
struct SessionState {
    cookies: Vec<Cookie>,
    last_login: Option<Instant>,
    login_failed: bool,
}

pub(crate) struct Session {
    client: BrowserlessClient,
    options: SessionOptions,
    state: Mutex<SessionState>,
}

impl Session {
    pub(crate) fn new(client: BrowserlessClient, options: SessionOptions) -> Self {
        Self {
            client,
            options,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Warm the session: load the cookie artifact, and when credentials are
    /// configured but no artifact exists, attempt a login. Failures degrade to
    /// anonymous mode and never propagate past this boundary.
    pub(crate) async fn init(&self) {
        let mut state = self.state.lock().await;

        if let Some(ref path) = self.options.cookie_file {
            match load_cookie_file(path) {
                Ok(cookies) if !cookies.is_empty() => {
                    info!(path = %path.display(), count = cookies.len(), "loaded session cookies");
                    state.cookies = cookies;
                }
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "cookie artifact unreadable"),
            }
        }

        if state.cookies.is_empty() && self.options.has_credentials() {
            self.login_locked(&mut state).await;
        }

        if state.cookies.is_empty() {
            info!("scrape session running anonymously");
        }
    }

    /// Fetch a rendered page through the session.
    pub(crate) async fn fetch(&self, url: &str) -> browserless_client::Result<String> {
        let cookies = self.state.lock().await.cookies.clone();
        self.client
            .content_with(
                url,
                &ContentOptions {
                    cookies,
                    wait_until: "domcontentloaded",
                    timeout: NAV_TIMEOUT,
                },
            )
            .await
    }

    /// Re-authenticate after an auth wall. Returns true when the session holds
    /// a plausibly-fresh login afterwards. The state lock is held across the
    /// whole login: a second caller blocks here, then finds `last_login`
    /// recent and returns without logging in again.
    pub(crate) async fn reauthenticate(&self) -> bool {
        if !self.options.has_credentials() {
            return false;
        }

        let mut state = self.state.lock().await;

        if let Some(at) = state.last_login {
            if at.elapsed() < REAUTH_COALESCE {
                return true;
            }
        }
        if state.login_failed {
            return false;
        }

        self.login_locked(&mut state).await;
        state.last_login.is_some_and(|at| at.elapsed() < REAUTH_COALESCE)
    }

    /// Run the credential login script. Caller holds the state lock.
    async fn login_locked(&self, state: &mut SessionState) {
        let (Some(email), Some(password)) = (&self.options.email, &self.options.password) else {
            return;
        };

        info!("attempting credential login");

        let context = serde_json::json!({ "email": email, "password": password });
        let result = self
            .client
            .function(LOGIN_SCRIPT, context, LOGIN_TIMEOUT)
            .await;

        let value = match result {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "credential login failed");
                state.login_failed = true;
                return;
            }
        };

        let landed = value
            .get("url")
            .and_then(|u| u.as_str())
            .unwrap_or_default()
            .to_string();
        if landed.contains("/login") || landed.contains("checkpoint") {
            warn!(url = %landed, "login did not reach an authenticated page");
            state.login_failed = true;
            return;
        }

        let cookies: Vec<Cookie> = value
            .get("cookies")
            .cloned()
            .and_then(|c| serde_json::from_value(c).ok())
            .unwrap_or_default();
        if cookies.is_empty() {
            warn!("login returned no cookies");
            state.login_failed = true;
            return;
        }

        info!(count = cookies.len(), "credential login succeeded");
        if let Some(ref path) = self.options.cookie_file {
            save_cookie_file(path, &cookies);
        }
        state.cookies = cookies;
        state.last_login = Some(Instant::now());
        state.login_failed = false;
    }
}

fn load_cookie_file(path: &Path) -> std::io::Result<Vec<Cookie>> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(std::io::Error::other)
}

fn save_cookie_file(path: &Path, cookies: &[Cookie]) {
    match serde_json::to_string_pretty(cookies) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                warn!(path = %path.display(), error = %e, "failed to persist cookies");
            }
        }
        Err(e) => warn!(error = %e, "failed to serialize cookies"),
    }
}
