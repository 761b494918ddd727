//! Just enough WebDAV multistatus reading for calendar discovery and sync.
//!
//! Servers are free to pick namespace prefixes, so every element is matched by
//! local name with an optional `prefix:`.

use once_cell::sync::Lazy;
use regex::Regex;

static RESPONSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<(?:[\w.-]+:)?response\b[^>]*>(.*?)</(?:[\w.-]+:)?response\s*>")
        .expect("response regex")
});

static CDATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("cdata regex"));

/// One `<response>` of a multistatus body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavResponse {
    pub href: String,
    pub body: String,
}

pub fn responses(xml: &str) -> Vec<DavResponse> {
    RESPONSE
        .captures_iter(xml)
        .filter_map(|caps| {
            let body = caps.get(1)?.as_str();
            let href = element(body, "href")?;
            Some(DavResponse {
                href: unescape(href.trim()),
                body: body.to_string(),
            })
        })
        .collect()
}

/// Inner text of the first element with the given local name.
pub fn element<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let name = regex::escape(name);
    let pattern = format!(r"(?s)<(?:[\w.-]+:)?{name}(?:\s[^>]*)?>(.*?)</(?:[\w.-]+:)?{name}\s*>");
    let re = Regex::new(&pattern).ok()?;
    re.captures(xml).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// `href` nested in the named property, e.g. `current-user-principal`.
pub fn nested_href(xml: &str, property: &str) -> Option<String> {
    element(xml, property)
        .and_then(|inner| element(inner, "href"))
        .map(|href| unescape(href.trim()))
}

/// Whether the named element appears at all, self-closing or not.
pub fn has_element(xml: &str, name: &str) -> bool {
    let pattern = format!(r"<(?:[\w.-]+:)?{}[\s/>]", regex::escape(name));
    Regex::new(&pattern)
        .map(|re| re.is_match(xml))
        .unwrap_or(false)
}

/// Text content with CDATA unwrapped and XML entities decoded.
pub fn text(xml: &str, name: &str) -> Option<String> {
    element(xml, name).map(|raw| {
        let raw = CDATA.replace_all(raw, "$1");
        unescape(&raw).trim().to_string()
    })
}

pub fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#13;", "\r")
        .replace("&#xD;", "\r")
        .replace("&#10;", "\n")
        .replace("&#xA;", "\n")
        .replace("&amp;", "&")
}
