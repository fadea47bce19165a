//! Reference extraction from CSS text and srcset attribute values.
//!
//! Scanning is regex-based and tolerant: the goal is reference discovery in
//! whatever text a page hands us (style attributes, `<style>` blocks, fetched
//! stylesheets), not semantic CSS validation. Malformed input yields fewer
//! matches, never an error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::asset_url::is_data_url;

static CSS_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\s*\(\s*['"]?([^'")\s]+)['"]?\s*\)"#)
        .expect("css url() pattern is valid")
});

/// Extract raw URL strings from every `url(...)` form in CSS text, in order.
///
/// Quoting is optional. Fragment-only references (`#mask`) and data-URIs are
/// excluded since they never become downloadable assets.
#[must_use]
pub fn extract_css_urls(css: &str) -> Vec<String> {
    CSS_URL_RE
        .captures_iter(css)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|url| !url.is_empty() && !is_data_url(url) && !url.starts_with('#'))
        .collect()
}

/// Parse a `srcset` attribute into its candidate URLs, in order, with width
/// and density descriptors stripped.
#[must_use]
pub fn parse_srcset(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            let url = match trimmed.rfind(' ') {
                Some(idx) if idx > 0 => trimmed[..idx].trim(),
                _ => trimmed,
            };
            if url.is_empty() || is_data_url(url) {
                None
            } else {
                Some(url.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_quoted_and_bare_urls() {
        let css = r#"
            a { background: url('a.png'); }
            b { background: url("b.png"); }
            c { background: url( c.png ); }
        "#;
        assert_eq!(extract_css_urls(css), vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn skips_data_uris_and_fragments() {
        let css = "a{mask:url(#m)} b{background:url(data:image/png;base64,AA)} c{background:url(x.png)}";
        assert_eq!(extract_css_urls(css), vec!["x.png"]);
    }

    #[test]
    fn tolerates_malformed_css() {
        let css = "@media screen { .broken { url( ; background: url(ok.gif)";
        assert_eq!(extract_css_urls(css), vec!["ok.gif"]);
        assert!(extract_css_urls("complete garbage }}{{").is_empty());
    }

    #[test]
    fn parses_srcset_descriptors() {
        let srcset = "small.jpg 480w, large.jpg 2x , bare.jpg";
        assert_eq!(parse_srcset(srcset), vec!["small.jpg", "large.jpg", "bare.jpg"]);
    }

    #[test]
    fn srcset_drops_empty_and_data_candidates() {
        assert!(parse_srcset("").is_empty());
        assert_eq!(parse_srcset("data:image/gif 1x, real.png 2x"), vec!["real.png"]);
    }
}
