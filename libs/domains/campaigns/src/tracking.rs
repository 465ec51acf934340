//! Open and click tracking instrumentation
//!
//! Tokens are truncated SHA-256 digests over campaign id, recipient id,
//! and a server-side secret, so tracking URLs cannot be forged or
//! replayed across recipients. Injection rewrites `href` targets to the
//! click redirect and drops a 1x1 pixel before `</body>`.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

static HREF_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href=["']([^"']+)["']"#).unwrap());

static BODY_CLOSE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body>").unwrap());

/// Which tracking channels to instrument during a send
#[derive(Debug, Clone, Copy)]
pub struct TrackingOptions {
    pub open: bool,
    pub click: bool,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            open: true,
            click: true,
        }
    }
}

/// Builds and verifies tracking URLs for a campaign send
#[derive(Debug, Clone)]
pub struct LinkTracker {
    api_base_url: String,
    secret: String,
}

impl LinkTracker {
    pub fn new(api_base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        let api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        Self {
            api_base_url,
            secret: secret.into(),
        }
    }

    /// Tracking token bound to one campaign and one recipient
    pub fn token(&self, campaign_id: Uuid, recipient_id: Uuid) -> String {
        let digest = Sha256::digest(format!(
            "{}:{}:{}",
            campaign_id, recipient_id, self.secret
        ));
        let mut token = hex::encode(digest);
        token.truncate(32);
        token
    }

    /// Recompute the token and compare against the presented one
    pub fn verify(&self, campaign_id: Uuid, recipient_id: Uuid, token: &str) -> bool {
        self.token(campaign_id, recipient_id) == token
    }

    pub fn open_pixel_url(&self, campaign_id: Uuid, recipient_id: Uuid) -> String {
        format!(
            "{}/track/open?c={}&r={}&t={}",
            self.api_base_url,
            campaign_id,
            recipient_id,
            self.token(campaign_id, recipient_id)
        )
    }

    pub fn tracked_click_url(&self, campaign_id: Uuid, recipient_id: Uuid, url: &str) -> String {
        format!(
            "{}/track/click?c={}&r={}&t={}&u={}",
            self.api_base_url,
            campaign_id,
            recipient_id,
            self.token(campaign_id, recipient_id),
            urlencoding::encode(url)
        )
    }

    fn open_pixel_html(&self, campaign_id: Uuid, recipient_id: Uuid) -> String {
        format!(
            r#"<img src="{}" width="1" height="1" alt="" style="display:none;" />"#,
            self.open_pixel_url(campaign_id, recipient_id)
        )
    }

    /// Rewrite every trackable `href` target through the click redirect
    pub fn rewrite_links(&self, html: &str, campaign_id: Uuid, recipient_id: Uuid) -> String {
        let mut result = html.to_string();
        for caps in HREF_PATTERN.captures_iter(html) {
            let full_tag = &caps[0];
            let url = &caps[1];
            if !is_trackable(url) {
                continue;
            }
            let tracked = self.tracked_click_url(campaign_id, recipient_id, url);
            let replacement = full_tag.replacen(url, &tracked, 1);
            result = result.replacen(full_tag, &replacement, 1);
        }
        result
    }

    /// Insert the open pixel before `</body>`, or append when absent
    pub fn append_pixel(&self, html: &str, campaign_id: Uuid, recipient_id: Uuid) -> String {
        let pixel = self.open_pixel_html(campaign_id, recipient_id);
        match BODY_CLOSE_PATTERN.find(html) {
            Some(m) => format!("{}{}{}", &html[..m.start()], pixel, &html[m.start()..]),
            None => format!("{}{}", html, pixel),
        }
    }

    /// Apply the requested tracking channels to rendered HTML
    pub fn inject(
        &self,
        html: &str,
        campaign_id: Uuid,
        recipient_id: Uuid,
        options: TrackingOptions,
    ) -> String {
        let mut out = if options.click {
            self.rewrite_links(html, campaign_id, recipient_id)
        } else {
            html.to_string()
        };
        if options.open {
            out = self.append_pixel(&out, campaign_id, recipient_id);
        }
        out
    }
}

fn is_trackable(url: &str) -> bool {
    if url.starts_with("mailto:")
        || url.starts_with("tel:")
        || url.starts_with("javascript:")
        || url.starts_with('#')
    {
        return false;
    }
    if url.to_lowercase().contains("unsubscribe") {
        return false;
    }
    // Already rewritten; wrapping twice would break the redirect target.
    if url.contains("track/click") {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> LinkTracker {
        LinkTracker::new("http://localhost:8080", "test-secret")
    }

    #[test]
    fn test_token_is_stable_and_scoped() {
        let t = tracker();
        let campaign = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let token = t.token(campaign, alice);
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(token, t.token(campaign, alice));
        assert_ne!(token, t.token(campaign, bob));
    }

    #[test]
    fn test_verify_rejects_tampered_token() {
        let t = tracker();
        let campaign = Uuid::new_v4();
        let recipient = Uuid::new_v4();

        let token = t.token(campaign, recipient);
        assert!(t.verify(campaign, recipient, &token));
        assert!(!t.verify(campaign, recipient, "0000deadbeef0000deadbeef0000dead"));
        assert!(!t.verify(recipient, campaign, &token));
    }

    #[test]
    fn test_token_depends_on_secret() {
        let campaign = Uuid::new_v4();
        let recipient = Uuid::new_v4();

        let a = LinkTracker::new("http://localhost:8080", "secret-a");
        let b = LinkTracker::new("http://localhost:8080", "secret-b");

        assert_ne!(a.token(campaign, recipient), b.token(campaign, recipient));
    }

    #[test]
    fn test_pixel_inserted_before_body_close() {
        let t = tracker();
        let campaign = Uuid::new_v4();
        let recipient = Uuid::new_v4();

        let html = "<html><body><p>Hi</p></BODY></html>";
        let out = t.append_pixel(html, campaign, recipient);

        let pixel_at = out.find("/track/open?").unwrap();
        let body_at = out.find("</BODY>").unwrap();
        assert!(pixel_at < body_at);
        assert!(out.contains(r#"width="1" height="1""#));
    }

    #[test]
    fn test_pixel_appended_without_body_tag() {
        let t = tracker();
        let campaign = Uuid::new_v4();
        let recipient = Uuid::new_v4();

        let out = t.append_pixel("<p>Hi</p>", campaign, recipient);
        assert!(out.starts_with("<p>Hi</p><img"));
    }

    #[test]
    fn test_click_rewrite_preserves_destination() {
        let t = tracker();
        let campaign = Uuid::new_v4();
        let recipient = Uuid::new_v4();

        let html = r#"<a href="https://example.com/offer?x=1">Offer</a>"#;
        let out = t.rewrite_links(html, campaign, recipient);

        assert!(out.contains("/track/click?"));
        assert!(out.contains(&format!("c={}", campaign)));
        assert!(out.contains("u=https%3A%2F%2Fexample.com%2Foffer%3Fx%3D1"));
        assert!(!out.contains(r#"href="https://example.com/offer?x=1""#));
    }

    #[test]
    fn test_click_rewrite_handles_single_quotes() {
        let t = tracker();
        let out = t.rewrite_links(
            "<a href='https://example.com'>x</a>",
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        assert!(out.contains("/track/click?"));
    }

    #[test]
    fn test_click_rewrite_skips_special_links() {
        let t = tracker();
        let campaign = Uuid::new_v4();
        let recipient = Uuid::new_v4();

        let html = concat!(
            r#"<a href="mailto:a@b.c">mail</a>"#,
            r#"<a href="tel:+123">call</a>"#,
            r#"<a href="javascript:void(0)">js</a>"#,
            r##"<a href="#section">jump</a>"##,
            r#"<a href="https://x.test/UNSUBSCRIBE?e=a">out</a>"#,
        );
        let out = t.rewrite_links(html, campaign, recipient);

        assert!(!out.contains("/track/click?"));
        assert_eq!(out, html);
    }

    #[test]
    fn test_click_rewrite_is_idempotent() {
        let t = tracker();
        let campaign = Uuid::new_v4();
        let recipient = Uuid::new_v4();

        let once = t.rewrite_links(
            r#"<a href="https://example.com">x</a>"#,
            campaign,
            recipient,
        );
        let twice = t.rewrite_links(&once, campaign, recipient);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_inject_applies_both_channels() {
        let t = tracker();
        let campaign = Uuid::new_v4();
        let recipient = Uuid::new_v4();

        let html = r#"<body><a href="https://example.com">x</a></body>"#;
        let out = t.inject(html, campaign, recipient, TrackingOptions::default());

        assert!(out.contains("/track/click?"));
        assert!(out.contains("/track/open?"));

        let none = t.inject(
            html,
            campaign,
            recipient,
            TrackingOptions {
                open: false,
                click: false,
            },
        );
        assert_eq!(none, html);
    }
}
