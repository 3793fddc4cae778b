//! Question answering over a cached page: bounded context + reasoning
//! service, with a deterministic rule-based fallback. A reasoning-service
//! outage is never the caller's problem.

use gemini_client::Gemini;
use tracing::warn;

use pagelens_store::PageDetail;

/// Most recent post texts included in the context.
const MAX_CONTEXT_POSTS: usize = 3;

const ANALYST_PREAMBLE: &str = "You are a business analyst for company-page data. \
Answer from the provided context only. Be concise and professional; when the \
context is missing the relevant data, say so and offer a clearly-labelled \
estimate based on industry and description. Keep answers under 150 words.";

pub struct InsightResponder {
    gemini: Option<Gemini>,
}

impl InsightResponder {
    /// `None` switches every answer to the deterministic fallback.
    pub fn new(gemini: Option<Gemini>) -> Self {
        Self { gemini }
    }

    pub async fn answer(&self, detail: &PageDetail, question: &str) -> String {
        let context = PageContext::from_detail(detail);

        if let Some(ref gemini) = self.gemini {
            match gemini
                .chat_completion(ANALYST_PREAMBLE, context.prompt(question))
                .await
            {
                Ok(text) => return text,
                Err(e) => {
                    warn!(page = %context.name, error = %e, "reasoning service failed, using fallback")
                }
            }
        }

        fallback_answer(&context, question)
    }
}

/// Bounded summary of a page, shared by the prompt and the fallback.
struct PageContext {
    name: String,
    description: Option<String>,
    industry: Option<String>,
    website: Option<String>,
    follower_count: i32,
    head_count: i32,
    recent_posts: Vec<String>,
}

impl PageContext {
    fn from_detail(detail: &PageDetail) -> Self {
        Self {
            name: detail.page.name.clone(),
            description: detail.page.description.clone(),
            industry: detail.page.industry.clone(),
            website: detail.page.website.clone(),
            follower_count: detail.page.follower_count,
            head_count: detail.page.head_count,
            recent_posts: detail
                .posts
                .iter()
                .filter_map(|p| p.content.clone())
                .take(MAX_CONTEXT_POSTS)
                .collect(),
        }
    }

    fn prompt(&self, question: &str) -> String {
        let mut lines = vec![
            format!("Company: {}", self.name),
            format!("Description: {}", self.description.as_deref().unwrap_or("unknown")),
            format!("Industry: {}", self.industry.as_deref().unwrap_or("unknown")),
            format!("Website: {}", self.website.as_deref().unwrap_or("unknown")),
            format!("Followers: {}", self.follower_count),
            format!("Headcount: {}", self.head_count),
        ];
        if self.recent_posts.is_empty() {
            lines.push("Recent posts: none captured".to_string());
        } else {
            lines.push("Recent posts:".to_string());
            for post in &self.recent_posts {
                lines.push(format!("- {post}"));
            }
        }
        lines.push(String::new());
        lines.push(format!("Question: {question}"));
        lines.join("\n")
    }
}

/// Keyword-matched answer from the same context the reasoning service would
/// have seen. Deterministic so callers can rely on it in outage conditions.
fn fallback_answer(context: &PageContext, question: &str) -> String {
    let q = question.to_lowercase();
    let name = &context.name;

    if contains_any(&q, &["follower", "audience", "reach"]) {
        return format!(
            "{name} currently has {} followers on its company page.",
            context.follower_count
        );
    }

    if contains_any(&q, &["post", "content", "activity", "publish"]) {
        return if context.recent_posts.is_empty() {
            format!("No recent posts have been captured for {name} yet.")
        } else {
            format!(
                "Recent activity from {name}: {}",
                context.recent_posts.join(" | ")
            )
        };
    }

    if contains_any(&q, &["employee", "headcount", "team", "staff", "people", "hiring"]) {
        return format!("{name} lists a headcount of about {} people.", context.head_count);
    }

    if contains_any(&q, &["industry", "sector", "do", "about"]) {
        let industry = context.industry.as_deref().unwrap_or("an unspecified industry");
        return match context.description {
            Some(ref description) => {
                format!("{name} operates in {industry}. {description}")
            }
            None => format!("{name} operates in {industry}."),
        };
    }

    if contains_any(&q, &["website", "site", "url", "link"]) {
        return match context.website {
            Some(ref website) => format!("The website for {name} is {website}."),
            None => format!("No website is recorded for {name}."),
        };
    }

    format!(
        "{name}: {} followers, headcount {}, industry {}.",
        context.follower_count,
        context.head_count,
        context.industry.as_deref().unwrap_or("unknown")
    )
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::page_detail;

    fn context() -> PageContext {
        PageContext::from_detail(&page_detail(
            1,
            "acme",
            &["We are hiring!", "Series B closed.", "Demo day.", "Old news."],
            &["Ada Lovelace"],
        ))
    }

    #[test]
    fn context_caps_posts() {
        assert_eq!(context().recent_posts.len(), MAX_CONTEXT_POSTS);
    }

    #[test]
    fn fallback_routes_follower_questions() {
        let answer = fallback_answer(&context(), "How many followers do they have?");
        assert!(answer.contains("followers"));
        assert!(answer.contains("Acme"));
    }

    #[test]
    fn fallback_routes_post_questions() {
        let answer = fallback_answer(&context(), "What have they posted lately?");
        assert!(answer.contains("We are hiring!"));
    }

    #[test]
    fn fallback_is_deterministic() {
        let a = fallback_answer(&context(), "Tell me something.");
        let b = fallback_answer(&context(), "Tell me something.");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn responder_without_key_uses_fallback() {
        let responder = InsightResponder::new(None);
        let detail = page_detail(1, "acme", &[], &[]);
        let answer = responder.answer(&detail, "how many followers?").await;
        assert!(answer.contains("followers"));
    }
}
