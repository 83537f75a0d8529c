//! In-memory cookie storage (RFC 6265 subset).

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use url::Url;

use crate::error::{Error, Result};

/// A stored cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Set when the cookie came without a Domain attribute.
    pub host_only: bool,
    pub secure: bool,
    pub http_only: bool,
    pub expires: Option<DateTime<Utc>>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: normalize_domain(&domain.into()),
            path: "/".to_string(),
            host_only: true,
            secure: false,
            http_only: false,
            expires: None,
        }
    }

    /// Parse a `Set-Cookie` value received from `request_url`.
    pub fn parse_set_cookie(header: &str, request_url: &Url) -> Result<Self> {
        let request_domain = request_url
            .host_str()
            .ok_or_else(|| Error::config("Cookie source URL has no host"))?;

        let mut parts = header.split(';').map(str::trim);
        let (name, value) = parts
            .next()
            .and_then(|pair| pair.split_once('='))
            .ok_or_else(|| Error::config(format!("Malformed Set-Cookie: {}", header)))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::config("Empty cookie name"));
        }

        let mut cookie = Cookie::new(name, value.trim(), request_domain);
        cookie.path = default_path(request_url.path());

        // Max-Age wins over Expires regardless of order.
        let mut max_age = None;
        for attr in parts {
            let (key, val) = attr.split_once('=').map_or((attr, ""), |(k, v)| (k.trim(), v.trim()));
            match key.to_ascii_lowercase().as_str() {
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                "domain" if !val.is_empty() => {
                    let domain = normalize_domain(val);
                    if !domain_matches(&request_domain.to_ascii_lowercase(), &domain) {
                        return Err(Error::config(format!(
                            "Cookie domain {} does not match {}",
                            domain, request_domain
                        )));
                    }
                    cookie.domain = domain;
                    cookie.host_only = false;
                }
                "path" if val.starts_with('/') => cookie.path = val.to_string(),
                "expires" => cookie.expires = cookie.expires.or_else(|| parse_cookie_date(val)),
                "max-age" => max_age = val.parse::<i64>().ok(),
                _ => {}
            }
        }
        if let Some(secs) = max_age {
            cookie.expires = Duration::try_seconds(secs.max(0))
                .and_then(|d| Utc::now().checked_add_signed(d));
        }
        Ok(cookie)
    }

    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|t| t <= Utc::now())
    }

    /// Whether this cookie should be sent to `url`.
    pub fn matches_url(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else { return false };
        let host = host.to_ascii_lowercase();

        if self.secure && url.scheme() != "https" {
            return false;
        }
        if self.is_expired() {
            return false;
        }
        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_matches(&host, &self.domain)
        };
        domain_ok && path_matches(url.path(), &self.path)
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Cookie jar keyed by domain, then (path, name).
#[derive(Debug, Default, Clone)]
pub struct CookieJar {
    cookies: HashMap<String, HashMap<(String, String), Cookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; an already expired cookie deletes its match.
    pub fn store(&mut self, cookie: Cookie) {
        let key = (cookie.path.clone(), cookie.name.clone());
        if cookie.is_expired() {
            if let Some(bucket) = self.cookies.get_mut(&cookie.domain) {
                bucket.remove(&key);
            }
            return;
        }
        self.cookies.entry(cookie.domain.clone()).or_default().insert(key, cookie);
    }

    /// Store every `Set-Cookie` field among `headers`.
    pub fn store_from_headers(&mut self, headers: &[(String, String)], request_url: &Url) {
        for (name, value) in headers {
            if !name.eq_ignore_ascii_case("set-cookie") {
                continue;
            }
            match Cookie::parse_set_cookie(value, request_url) {
                Ok(cookie) => self.store(cookie),
                Err(e) => tracing::debug!("ignoring cookie from {}: {}", request_url, e),
            }
        }
    }

    pub fn cookies_for_url(&self, url: &Url) -> Vec<&Cookie> {
        let mut matching: Vec<&Cookie> = self
            .cookies
            .values()
            .flat_map(|m| m.values())
            .filter(|c| c.matches_url(url))
            .collect();
        // Longer paths first.
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matching
    }

    /// `Cookie` header value for `url`, if any cookie applies.
    pub fn build_cookie_header(&self, url: &Url) -> Option<String> {
        let cookies = self.cookies_for_url(url);
        if cookies.is_empty() {
            return None;
        }
        Some(cookies.iter().map(|c| c.to_string()).collect::<Vec<_>>().join("; "))
    }

    pub fn get(&self, domain: &str, name: &str) -> Option<&Cookie> {
        self.cookies
            .get(&normalize_domain(domain))?
            .values()
            .find(|c| c.name == name)
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    pub fn len(&self) -> usize {
        self.cookies.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.strip_prefix('.').unwrap_or(domain).to_ascii_lowercase()
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    request_path == cookie_path
        || (request_path.starts_with(cookie_path)
            && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/')))
}

/// Directory of the request path (RFC 6265 section 5.1.4).
fn default_path(request_path: &str) -> String {
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => request_path[..i].to_string(),
    }
}

fn parse_cookie_date(date_str: &str) -> Option<DateTime<Utc>> {
    for fmt in ["%a, %d %b %Y %H:%M:%S GMT", "%a, %d-%b-%Y %H:%M:%S GMT", "%a, %d-%b-%y %H:%M:%S GMT"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(date_str, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_parse_basic_cookie() {
        let cookie = Cookie::parse_set_cookie("sid=abc; Path=/; HttpOnly", &url("https://example.com/login")).unwrap();
        assert_eq!(cookie.name, "sid");
        assert_eq!(cookie.value, "abc");
        assert_eq!(cookie.domain, "example.com");
        assert!(cookie.host_only);
        assert!(cookie.http_only);
    }

    #[test]
    fn test_default_path_is_request_directory() {
        let cookie = Cookie::parse_set_cookie("a=1", &url("https://example.com/app/login")).unwrap();
        assert_eq!(cookie.path, "/app");
        assert!(cookie.matches_url(&url("https://example.com/app/page")));
        assert!(!cookie.matches_url(&url("https://example.com/other")));
    }

    #[test]
    fn test_domain_attribute_covers_subdomains() {
        let cookie = Cookie::parse_set_cookie("a=1; Domain=.example.com", &url("https://www.example.com/")).unwrap();
        assert!(!cookie.host_only);
        assert!(cookie.matches_url(&url("https://api.example.com/")));
        assert!(!cookie.matches_url(&url("https://example.org/")));
    }

    #[test]
    fn test_foreign_domain_rejected() {
        assert!(Cookie::parse_set_cookie("a=1; Domain=evil.com", &url("https://example.com/")).is_err());
    }

    #[test]
    fn test_secure_cookie_not_sent_over_http() {
        let cookie = Cookie::parse_set_cookie("a=1; Secure", &url("https://example.com/")).unwrap();
        assert!(cookie.matches_url(&url("https://example.com/")));
        assert!(!cookie.matches_url(&url("http://example.com/")));
    }

    #[test]
    fn test_expired_cookie_deletes_existing() {
        let origin = url("https://example.com/");
        let mut jar = CookieJar::new();
        jar.store_from_headers(&fields(&[("Set-Cookie", "a=1")]), &origin);
        assert_eq!(jar.len(), 1);

        jar.store_from_headers(&fields(&[("set-cookie", "a=gone; Max-Age=0")]), &origin);
        assert!(jar.is_empty());
    }

    #[test]
    fn test_expires_attribute_parsed() {
        let cookie = Cookie::parse_set_cookie(
            "a=1; Expires=Wed, 21 Oct 2015 07:28:00 GMT",
            &url("https://example.com/"),
        )
        .unwrap();
        assert!(cookie.is_expired());
    }

    #[test]
    fn test_build_cookie_header() {
        let origin = url("https://example.com/");
        let mut jar = CookieJar::new();
        jar.store_from_headers(
            &fields(&[
                ("Set-Cookie", "a=1"),
                ("Content-Type", "text/html"),
                ("Set-Cookie", "b=2; Path=/docs"),
            ]),
            &origin,
        );
        assert_eq!(jar.build_cookie_header(&url("https://example.com/docs/x")).as_deref(), Some("b=2; a=1"));
        assert_eq!(jar.build_cookie_header(&url("https://example.com/")).as_deref(), Some("a=1"));
        assert_eq!(jar.build_cookie_header(&url("https://other.com/")), None);
        assert_eq!(jar.get("example.com", "b").unwrap().path, "/docs");
    }

    #[test]
    fn test_path_matching() {
        assert!(path_matches("/docs", "/docs"));
        assert!(path_matches("/docs/a", "/docs"));
        assert!(path_matches("/docs/a", "/docs/"));
        assert!(!path_matches("/docsx", "/docs"));
    }
}
