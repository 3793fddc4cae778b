//! HTML extraction for company pages.
//!
//! Public pages embed their data twice: og meta tags for link previews, and
//! JSON data islands for the client app. Profile attributes come from the
//! meta tags with JSON fragments filling the gaps; posts and members come
//! from the JSON islands. All of it is brittle by nature; every function
//! here returns what it can prove and nothing else.

use std::sync::LazyLock;

use regex::Regex;

use pagelens_common::{MemberRecord, PostRecord, ProfileRecord};

/// Cap on posts taken from a single feed page.
const MAX_POSTS: usize = 20;
/// Cap on members taken from a single people page.
const MAX_MEMBERS: usize = 50;

// Interstitial markers. A wall page must never be parsed as profile data:
// the extraction surface cannot tell a redirect-to-login apart from a real
// short company name without this check.
const AUTH_WALL_MARKERS: &[&str] = &[
    "authwall",
    "sign in to continue",
    "join linkedin",
    "/checkpoint/challenge",
    "security verification",
];

const MISSING_PAGE_MARKERS: &[&str] = &[
    "page not found",
    "this page doesn\u{2019}t exist",
    "this page doesn't exist",
    "page-not-found",
];

static FOLLOWERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([\d.,]+\s*[km]?)\s*followers").expect("valid regex")
});
static EMPLOYEES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([\d.,]+\s*[km]?)\+?\s*employees").expect("valid regex")
});
static INDUSTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""industry"\s*:\s*"([^"]+)""#).expect("valid regex")
});
static WEBSITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""website"\s*:\s*"(https?://[^"]+)""#).expect("valid regex")
});
static FOUNDED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""foundedOn"\s*:\s*\{\s*"year"\s*:\s*(\d{4})"#).expect("valid regex")
});
static SPECIALTIES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""speciali?ties"\s*:\s*"([^"]+)""#).expect("valid regex")
});
static ACTIVITY_URN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"urn:li:activity:(\d+)").expect("valid regex"));
static COMMENTARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""commentary"\s*:\s*\{\s*"text"\s*:\s*"((?:\\.|[^"\\])*)""#).expect("valid regex")
});
static NUM_LIKES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""numLikes"\s*:\s*(\d+)"#).expect("valid regex"));
static NUM_COMMENTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""numComments"\s*:\s*(\d+)"#).expect("valid regex"));
static FIRST_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""firstName"\s*:\s*"([^"]*)""#).expect("valid regex"));
static LAST_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""lastName"\s*:\s*"([^"]*)""#).expect("valid regex"));
static OCCUPATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""occupation"\s*:\s*"((?:\\.|[^"\\])*)""#).expect("valid regex")
});
static GEO_REGION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""geoRegion"\s*:\s*"([^"]*)""#).expect("valid regex"));
static PUBLIC_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""publicIdentifier"\s*:\s*"([^"]+)""#).expect("valid regex"));

pub(crate) fn is_auth_wall(html: &str) -> bool {
    let lower = html.to_lowercase();
    AUTH_WALL_MARKERS.iter().any(|m| lower.contains(m))
}

pub(crate) fn is_missing_page(html: &str) -> bool {
    let lower = html.to_lowercase();
    MISSING_PAGE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Profile attributes from a company page. `None` when the markup carries no
/// usable identity. The caller reports Failed, never a placeholder record.
pub(crate) fn profile(handle: &str, html: &str) -> Option<ProfileRecord> {
    let name = meta_property(html, "og:title").map(strip_platform_suffix)?;
    if name.is_empty() {
        return None;
    }

    let description = meta_property(html, "og:description").filter(|d| !d.is_empty());
    let image_url = meta_property(html, "og:image").filter(|u| !u.is_empty());

    let follower_count = FOLLOWERS_RE
        .captures(html)
        .and_then(|c| parse_count(&c[1]))
        .unwrap_or(0);
    let head_count = EMPLOYEES_RE
        .captures(html)
        .and_then(|c| parse_count(&c[1]))
        .unwrap_or(0);

    Some(ProfileRecord {
        handle: handle.to_string(),
        name,
        description,
        website: WEBSITE_RE.captures(html).map(|c| c[1].to_string()),
        industry: INDUSTRY_RE.captures(html).map(|c| c[1].to_string()),
        follower_count,
        head_count,
        founded: FOUNDED_RE.captures(html).map(|c| c[1].to_string()),
        specialties: SPECIALTIES_RE.captures(html).map(|c| c[1].to_string()),
        image_url,
    })
}

/// Posts from a feed page: activity permalinks paired positionally with
/// commentary texts and engagement counts from the same data island.
pub(crate) fn posts(html: &str) -> Vec<PostRecord> {
    let mut seen = std::collections::HashSet::new();
    let ids: Vec<&str> = ACTIVITY_URN_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|id| seen.insert(*id))
        .take(MAX_POSTS)
        .collect();

    let texts: Vec<String> = COMMENTARY_RE
        .captures_iter(html)
        .map(|c| json_unescape(&c[1]))
        .collect();
    let likes: Vec<i32> = NUM_LIKES_RE
        .captures_iter(html)
        .filter_map(|c| c[1].parse().ok())
        .collect();
    let comments: Vec<i32> = NUM_COMMENTS_RE
        .captures_iter(html)
        .filter_map(|c| c[1].parse().ok())
        .collect();

    ids.iter()
        .enumerate()
        .map(|(i, id)| PostRecord {
            content: texts.get(i).cloned().filter(|t| !t.is_empty()),
            url: format!("https://www.linkedin.com/feed/update/urn:li:activity:{id}/"),
            like_count: likes.get(i).copied().unwrap_or(0),
            comment_count: comments.get(i).copied().unwrap_or(0),
            posted_at: None,
        })
        .collect()
}

/// Members from a people page. Each profile blob is scanned in a bounded
/// window after its firstName key, so a missing field in one card cannot
/// shift every later card's data.
pub(crate) fn members(html: &str) -> Vec<MemberRecord> {
    let mut out: Vec<MemberRecord> = Vec::new();

    for m in FIRST_NAME_RE.captures_iter(html).take(MAX_MEMBERS) {
        let Some(whole) = m.get(0) else { continue };
        let first = json_unescape(&m[1]);
        let start = whole.end();
        let mut end = (start + 600).min(html.len());
        while !html.is_char_boundary(end) {
            end -= 1;
        }
        let window = &html[start..end];

        let last = LAST_NAME_RE
            .captures(window)
            .map(|c| json_unescape(&c[1]))
            .unwrap_or_default();
        let name = format!("{first} {last}").trim().to_string();
        if name.is_empty() {
            continue;
        }

        let role = OCCUPATION_RE
            .captures(window)
            .map(|c| json_unescape(&c[1]))
            .filter(|r| !r.is_empty());
        let location = GEO_REGION_RE
            .captures(window)
            .map(|c| json_unescape(&c[1]))
            .filter(|l| !l.is_empty());
        let profile_url = PUBLIC_ID_RE
            .captures(window)
            .map(|c| format!("https://www.linkedin.com/in/{}/", &c[1]));

        if out.iter().any(|existing| existing.name == name) {
            continue;
        }
        out.push(MemberRecord {
            name,
            role,
            location,
            profile_url,
        });
    }

    out
}

/// Content of a `<meta property="..." content="...">` tag. Scans tag-by-tag
/// rather than one regex because attribute order varies.
fn meta_property(html: &str, property: &str) -> Option<String> {
    let needle = format!("property=\"{property}\"");
    let mut rest = html;
    loop {
        let tag_start = rest.find("<meta")?;
        let after = &rest[tag_start..];
        let tag_end = after.find('>').map(|i| i + 1).unwrap_or(after.len());
        let tag = &after[..tag_end];
        if tag.contains(&needle) {
            let content = tag.split("content=\"").nth(1)?;
            let end = content.find('"')?;
            return Some(decode_entities(content[..end].trim()));
        }
        rest = &after[tag_end..];
    }
}

fn strip_platform_suffix(title: String) -> String {
    title
        .trim_end_matches(" | LinkedIn")
        .trim_end_matches(" - LinkedIn")
        .trim_end_matches("LinkedIn")
        .trim()
        .to_string()
}

/// "1,234" / "1.2K" / "3M" / "10,000+" style counts.
fn parse_count(raw: &str) -> Option<i32> {
    let cleaned = raw.trim().trim_end_matches('+').replace(',', "");
    let cleaned = cleaned.trim();
    let (digits, multiplier) = match cleaned.chars().last()? {
        'k' | 'K' => (&cleaned[..cleaned.len() - 1], 1_000.0),
        'm' | 'M' => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        _ => (cleaned, 1.0),
    };
    let value: f64 = digits.trim().parse().ok()?;
    Some((value * multiplier) as i32)
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
}

/// Minimal JSON string unescape for text lifted out of data islands.
fn json_unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => {}
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if let Some(decoded) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(decoded);
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_HTML: &str = r#"<html><head>
        <meta property="og:title" content="Acme Robotics | LinkedIn" />
        <meta property="og:description" content="We build &amp; ship robots." />
        <meta property="og:image" content="https://cdn.example.com/acme.png" />
        </head><body>
        <div>Acme Robotics · 12,345 followers · 201-500 employees</div>
        <script type="application/json">
        {"industry":"Robotics","website":"https://acme.example.com",
         "foundedOn":{"year":2015},"specialities":"automation, arms"}
        </script>
        </body></html>"#;

    const WALL_HTML: &str = r#"<html><body>
        <form action="https://www.linkedin.com/authwall?trk=x">
        Sign in to continue to LinkedIn</form></body></html>"#;

    const MISSING_HTML: &str =
        r#"<html><body><h1>Page not found</h1><p>Go to your feed.</p></body></html>"#;

    const FEED_HTML: &str = r#"<html><body><script type="application/json">
        {"updates":[
          {"entityUrn":"urn:li:activity:7001","commentary":{"text":"We are hiring!"},
           "social":{"numLikes":42,"numComments":7}},
          {"entityUrn":"urn:li:activity:7002","commentary":{"text":"Series B closed.\nThank you all."},
           "social":{"numLikes":10,"numComments":1}}
        ]}
        </script>
        <a href="/feed/update/urn:li:activity:7001/">permalink</a>
        </body></html>"#;

    const PEOPLE_HTML: &str = r#"<html><body><script type="application/json">
        {"elements":[
          {"firstName":"Ada","lastName":"Lovelace","occupation":"Chief Engineer",
           "geoRegion":"London","publicIdentifier":"ada-lovelace"},
          {"firstName":"Grace","lastName":"Hopper","occupation":"Compiler Lead",
           "geoRegion":"Arlington","publicIdentifier":"grace-hopper"}
        ]}
        </script></body></html>"#;

    #[test]
    fn profile_extracts_meta_and_fragments() {
        let p = profile("acme", PROFILE_HTML).unwrap();
        assert_eq!(p.handle, "acme");
        assert_eq!(p.name, "Acme Robotics");
        assert_eq!(p.description.as_deref(), Some("We build & ship robots."));
        assert_eq!(p.image_url.as_deref(), Some("https://cdn.example.com/acme.png"));
        assert_eq!(p.follower_count, 12_345);
        assert_eq!(p.industry.as_deref(), Some("Robotics"));
        assert_eq!(p.website.as_deref(), Some("https://acme.example.com"));
        assert_eq!(p.founded.as_deref(), Some("2015"));
        assert_eq!(p.specialties.as_deref(), Some("automation, arms"));
    }

    #[test]
    fn profile_requires_a_title() {
        assert!(profile("acme", "<html><body>nothing here</body></html>").is_none());
    }

    #[test]
    fn wall_and_missing_markers_detected() {
        assert!(is_auth_wall(WALL_HTML));
        assert!(!is_auth_wall(PROFILE_HTML));
        assert!(is_missing_page(MISSING_HTML));
        assert!(!is_missing_page(PROFILE_HTML));
    }

    #[test]
    fn posts_pair_urns_with_texts_and_counts() {
        let posts = posts(FEED_HTML);
        assert_eq!(posts.len(), 2);
        assert_eq!(
            posts[0].url,
            "https://www.linkedin.com/feed/update/urn:li:activity:7001/"
        );
        assert_eq!(posts[0].content.as_deref(), Some("We are hiring!"));
        assert_eq!(posts[0].like_count, 42);
        assert_eq!(posts[0].comment_count, 7);
        assert_eq!(
            posts[1].content.as_deref(),
            Some("Series B closed.\nThank you all.")
        );
    }

    #[test]
    fn posts_dedup_repeated_urns() {
        let html = r#"urn:li:activity:1 urn:li:activity:2 urn:li:activity:1"#;
        let posts = posts(html);
        assert_eq!(posts.len(), 2);
    }

    #[test]
    fn members_windowed_extraction() {
        let members = members(PEOPLE_HTML);
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "Ada Lovelace");
        assert_eq!(members[0].role.as_deref(), Some("Chief Engineer"));
        assert_eq!(members[0].location.as_deref(), Some("London"));
        assert_eq!(
            members[0].profile_url.as_deref(),
            Some("https://www.linkedin.com/in/ada-lovelace/")
        );
        assert_eq!(members[1].name, "Grace Hopper");
    }

    #[test]
    fn count_suffixes() {
        assert_eq!(parse_count("1,234"), Some(1_234));
        assert_eq!(parse_count("1.2K"), Some(1_200));
        assert_eq!(parse_count("3M"), Some(3_000_000));
        assert_eq!(parse_count("10,000+"), Some(10_000));
        assert_eq!(parse_count("nope"), None);
    }
}
