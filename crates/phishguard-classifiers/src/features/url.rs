//! Phishing indicators derived from a live URL.
//!
//! The indicators mirror the columns of the tabular training data so that a
//! single URL can be scored with the tabular artifacts. Lexical indicators
//! come from the URL itself, content indicators from a best-effort fetch of
//! the page, and a handful of registry lookups are fixed placeholders.
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use crate::features::FeatureVector;

/// Indicator names in the order the tabular schema expects them.
pub const URL_FEATURE_NAMES: [&str; 30] = [
    "having_IP_Address",
    "URL_Length",
    "Shortining_Service",
    "having_At_Symbol",
    "double_slash_redirecting",
    "Prefix_Suffix",
    "having_Sub_Domain",
    "SSLfinal_State",
    "Domain_registeration_length",
    "Favicon",
    "port",
    "HTTPS_token",
    "Request_URL",
    "URL_of_Anchor",
    "Links_in_tags",
    "SFH",
    "Submitting_to_email",
    "Abnormal_URL",
    "Redirect",
    "on_mouseover",
    "RightClick",
    "popUpWidnow",
    "Iframe",
    "age_of_domain",
    "DNSRecord",
    "web_traffic",
    "Page_Rank",
    "Google_Index",
    "Links_pointing_to_page",
    "Statistical_report",
];

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unreadable body: {0}")]
    Body(String),
}

/// Source of page HTML for content indicators.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Blocking HTTP fetch with a fixed timeout. Error statuses still yield their
/// body, as a browser would render it.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = match self.agent.get(url).call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(e) => return Err(FetchError::Transport(e.to_string())),
        };
        response
            .into_string()
            .map_err(|e| FetchError::Body(e.to_string()))
    }
}

/// Result of one extraction. `degraded` is set when the page could not be
/// fetched and content indicators were computed on an empty document.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlExtraction {
    pub features: FeatureVector,
    pub degraded: bool,
}

pub struct UrlFeatureExtractor {
    fetcher: Box<dyn PageFetcher>,
    log_target: String,
}

impl UrlFeatureExtractor {
    pub fn new(fetcher: Box<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            log_target: "phishguard".to_string(),
        }
    }

    pub fn with_log_target(mut self, target: impl Into<String>) -> Self {
        self.log_target = target.into();
        self
    }

    /// Never fails: a fetch error degrades content indicators to "absent".
    pub fn extract(&self, url: &str) -> UrlExtraction {
        let (html, degraded) = match self.fetcher.fetch(url) {
            Ok(html) => (html, false),
            Err(e) => {
                log::warn!(
                    target: &self.log_target,
                    "extraction degraded for {}: {}; content indicators use an empty page",
                    url,
                    e
                );
                (String::new(), true)
            }
        };
        UrlExtraction {
            features: url_features(url, &html),
            degraded,
        }
    }
}

impl Default for UrlFeatureExtractor {
    fn default() -> Self {
        Self::new(Box::new(HttpFetcher::new()))
    }
}

/// Pure indicator computation from the URL and its (possibly empty) HTML.
pub fn url_features(url: &str, html: &str) -> FeatureVector {
    let parts = UrlParts::parse(url);
    let host = parts.host.as_str();
    let flag = |b: bool| if b { 1.0 } else { 0.0 };
    let in_html = |needle: &str| flag(html.contains(needle));

    let double_slash = url
        .find("//")
        .map(|byte_idx| url[..byte_idx].chars().count() > 7)
        .unwrap_or(false);

    let values = [
        flag(ip_host_regex().is_match(host)),
        url.chars().count() as f64,
        flag(["bit.ly", "tinyurl", "goo.gl"].iter().any(|s| url.contains(s))),
        flag(url.contains('@')),
        flag(double_slash),
        flag(host.contains('-')),
        flag(host.split('.').count() > 3),
        flag(parts.scheme == "https"),
        1.0,
        in_html("favicon"),
        0.0,
        flag(url.to_lowercase().contains("https")),
        in_html("request"),
        in_html("href"),
        in_html("link"),
        0.0,
        in_html("mailto:"),
        flag(url.contains("about:blank")),
        in_html("window.location"),
        in_html("onmouseover"),
        in_html("event.button==2"),
        in_html("popup"),
        in_html("<iframe"),
        1.0,
        1.0,
        1.0,
        1.0,
        in_html("index"),
        html.matches("href").count() as f64,
        flag(html.contains("phishtank") || html.contains("stopbadware")),
    ];

    FeatureVector::new(
        URL_FEATURE_NAMES
            .iter()
            .zip(values)
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    )
}

fn ip_host_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").expect("valid IPv4 pattern"))
}

fn authority_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:([A-Za-z][A-Za-z0-9+.\-]*):)?//([^/?#]*)")
            .expect("valid authority pattern")
    })
}

fn scheme_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):").expect("valid scheme pattern"))
}

/// Lenient split of a URL into lowercase scheme and host. Anything that does
/// not look like `scheme://authority` leaves the host empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlParts {
    pub scheme: String,
    pub host: String,
}

impl UrlParts {
    pub fn parse(url: &str) -> Self {
        let url = url.trim();
        let scheme = scheme_regex()
            .captures(url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();

        let host = authority_regex()
            .captures(url)
            .and_then(|c| c.get(2))
            .map(|m| host_of(m.as_str()))
            .unwrap_or_default();

        UrlParts { scheme, host }
    }
}

fn host_of(authority: &str) -> String {
    let without_userinfo = match authority.rfind('@') {
        Some(idx) => &authority[idx + 1..],
        None => authority,
    };
    let host = if let Some(rest) = without_userinfo.strip_prefix('[') {
        rest.split(']').next().unwrap_or("")
    } else {
        without_userinfo.split(':').next().unwrap_or("")
    };
    host.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticPage(&'static str);

    impl PageFetcher for StaticPage {
        fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn parses_host_leniently() {
        let parts = UrlParts::parse("HTTPS://user:pw@Login-Secure.Example.com:8443/path?q=1");
        assert_eq!(parts.scheme, "https");
        assert_eq!(parts.host, "login-secure.example.com");
        assert_eq!(UrlParts::parse("example.com/path").host, "");
        assert_eq!(UrlParts::parse("http://[::1]:80/").host, "::1");
    }

    #[test]
    fn lexical_indicators() {
        let fv = url_features("http://192.168.0.1/login@x//y", "");
        assert_eq!(fv.get("having_IP_Address"), Some(1.0));
        assert_eq!(fv.get("having_At_Symbol"), Some(1.0));
        assert_eq!(fv.get("double_slash_redirecting"), Some(0.0));
        assert_eq!(fv.get("SSLfinal_State"), Some(0.0));
        assert_eq!(fv.get("URL_Length"), Some(29.0));

        let fv = url_features("https://a.b.c.d.example.com", "");
        assert_eq!(fv.get("having_Sub_Domain"), Some(1.0));
        assert_eq!(fv.get("HTTPS_token"), Some(1.0));
        assert_eq!(fv.get("SSLfinal_State"), Some(1.0));
    }

    #[test]
    fn content_indicators_read_html() {
        let html = r#"<link rel="icon" href="favicon.ico"><a href="mailto:x@y">x</a><iframe src=x>"#;
        let fv = UrlFeatureExtractor::new(Box::new(StaticPage(html)))
            .extract("http://example.com")
            .features;
        assert_eq!(fv.get("Favicon"), Some(1.0));
        assert_eq!(fv.get("Submitting_to_email"), Some(1.0));
        assert_eq!(fv.get("Iframe"), Some(1.0));
        assert_eq!(fv.get("Links_pointing_to_page"), Some(2.0));
        assert_eq!(fv.get("Redirect"), Some(0.0));
    }

    #[test]
    fn placeholders_are_constant() {
        for html in ["", "<html>index port dns</html>"] {
            let fv = url_features("http://example.com", html);
            assert_eq!(fv.get("Domain_registeration_length"), Some(1.0));
            assert_eq!(fv.get("port"), Some(0.0));
            assert_eq!(fv.get("SFH"), Some(0.0));
            assert_eq!(fv.get("age_of_domain"), Some(1.0));
            assert_eq!(fv.get("DNSRecord"), Some(1.0));
            assert_eq!(fv.get("web_traffic"), Some(1.0));
            assert_eq!(fv.get("Page_Rank"), Some(1.0));
        }
    }

    #[test]
    fn extraction_is_pure_given_content() {
        let extractor = UrlFeatureExtractor::new(Box::new(StaticPage("<a href=x>")));
        assert_eq!(
            extractor.extract("http://example.com/a"),
            extractor.extract("http://example.com/a")
        );
    }
}
