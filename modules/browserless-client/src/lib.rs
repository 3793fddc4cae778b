pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Extra headroom on the HTTP request beyond the in-browser navigation
/// timeout, so the navigation bound fires first and reports precisely.
const REQUEST_SLACK: Duration = Duration::from_secs(10);

/// One browser cookie in DevTools/Playwright JSON shape. The same shape is
/// accepted by the Browserless `/content` payload and produced by its
/// `page.cookies()`, so session artifacts round-trip without conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

/// Navigation options for a `/content` fetch.
#[derive(Debug, Clone)]
pub struct ContentOptions {
    /// Cookies set on the browser context before navigation.
    pub cookies: Vec<Cookie>,
    /// Puppeteer lifecycle event to wait for.
    pub wait_until: &'static str,
    /// Hard upper bound on the navigation itself.
    pub timeout: Duration,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            cookies: Vec::new(),
            wait_until: "domcontentloaded",
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30) + REQUEST_SLACK)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        let mut endpoint = format!("{}{path}", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    /// Fetch fully-rendered HTML content for a URL via the `/content` endpoint.
    pub async fn content(&self, url: &str) -> Result<String> {
        self.content_with(url, &ContentOptions::default()).await
    }

    /// Fetch fully-rendered HTML with cookies and navigation options.
    pub async fn content_with(&self, url: &str, options: &ContentOptions) -> Result<String> {
        let mut body = serde_json::json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": options.wait_until,
                "timeout": options.timeout.as_millis() as u64,
            },
        });
        if !options.cookies.is_empty() {
            body["cookies"] = serde_json::to_value(&options.cookies)
                .map_err(|e| BrowserlessError::Network(e.to_string()))?;
        }

        debug!(url, wait_until = options.wait_until, "browserless /content");

        let resp = self
            .client
            .post(self.endpoint("/content"))
            .header("Content-Type", "application/json")
            .timeout(options.timeout + REQUEST_SLACK)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }

    /// Run a scripted browser session via the `/function` endpoint and return
    /// whatever JSON the script resolves with. Used for flows a plain
    /// navigation can't express (credential login, cookie harvesting).
    pub async fn function(
        &self,
        code: &str,
        context: serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        let body = serde_json::json!({
            "code": code,
            "context": context,
        });

        debug!("browserless /function");

        let resp = self
            .client
            .post(self.endpoint("/function"))
            .header("Content-Type", "application/json")
            .timeout(timeout + REQUEST_SLACK)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cookie artifacts are written by DevTools/Playwright; the client must
    // accept that shape verbatim.
    #[test]
    fn cookie_artifact_roundtrip() {
        let artifact = r#"[{
            "name": "li_at",
            "value": "secret",
            "domain": ".linkedin.com",
            "path": "/",
            "expires": 1767225600.5,
            "httpOnly": true,
            "secure": true,
            "sameSite": "None"
        }]"#;

        let cookies: Vec<Cookie> = serde_json::from_str(artifact).unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "li_at");
        assert!(cookies[0].http_only);

        let json = serde_json::to_value(&cookies).unwrap();
        assert_eq!(json[0]["httpOnly"], serde_json::json!(true));
        assert_eq!(json[0]["sameSite"], serde_json::json!("None"));
    }

    #[test]
    fn cookie_artifact_tolerates_missing_fields() {
        let minimal = r#"[{"name": "bcookie", "value": "v", "domain": ".linkedin.com"}]"#;
        let cookies: Vec<Cookie> = serde_json::from_str(minimal).unwrap();
        assert_eq!(cookies[0].path, "/");
        assert!(!cookies[0].secure);
        assert!(cookies[0].expires.is_none());
    }

    #[test]
    fn default_navigation_options() {
        let options = ContentOptions::default();
        assert_eq!(options.wait_until, "domcontentloaded");
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert!(options.cookies.is_empty());
    }
}
