//! Reference rewriting: substitute every serialized form of each captured
//! URL with its local path, in the markup and in downloaded stylesheets.
//!
//! Substitution runs longest-key-first everywhere so a URL that is a prefix
//! of another never clobbers the longer occurrence. A key that never matches
//! is silently left alone; the output then still carries the original
//! absolute URL, which keeps working over the network.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::fetch::AssetMap;

static BASE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<base[^>]*>").expect("base tag pattern is valid"));

/// Rewrite the top-level markup against the final asset map.
///
/// Per entry, three serialized forms are replaced: `src`/`href`/`content`
/// attributes, srcset candidates (URL followed by a width/density
/// descriptor), and CSS `url()` forms. Any `<base>` element is stripped last
/// so remaining relative paths resolve against the output file itself.
#[must_use]
pub fn rewrite_markup(html: &str, map: &AssetMap) -> String {
    let mut out = html.to_string();

    for (key, local) in map.entries_longest_first() {
        let escaped = regex::escape(key);

        if let Ok(re) = Regex::new(&format!(r#"(?i)(src|href|content)=["']{escaped}["']"#)) {
            out = re
                .replace_all(&out, format!(r#"${{1}}="{local}""#))
                .into_owned();
        }

        if let Ok(re) = Regex::new(&format!(r"(?i){escaped}(\s+[0-9.]+[wx])")) {
            out = re.replace_all(&out, format!("{local}${{1}}")).into_owned();
        }

        if let Ok(re) = Regex::new(&format!(r#"(?i)url\s*\(\s*['"]?{escaped}['"]?\s*\)"#)) {
            out = re
                .replace_all(&out, format!(r#"url("{local}")"#))
                .into_owned();
        }
    }

    BASE_TAG_RE.replace_all(&out, "").into_owned()
}

/// Rewrite one stylesheet's text, substituting every asset map key with the
/// path from the stylesheet's output location to the asset's.
#[must_use]
pub fn rewrite_stylesheet(css: &str, stylesheet_local_path: &str, map: &AssetMap) -> String {
    let sheet_dir = Path::new(stylesheet_local_path)
        .parent()
        .unwrap_or_else(|| Path::new(""));

    let mut out = css.to_string();
    for (key, local) in map.entries_longest_first() {
        let relative = pathdiff::diff_paths(Path::new(local), sheet_dir)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|| local.to_string());
        out = out.replace(key, &relative);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> AssetMap {
        let mut map = AssetMap::new();
        for (key, local) in entries {
            map.insert(key, key, local);
        }
        map
    }

    #[test]
    fn rewrites_src_href_content_attributes() {
        let map = map(&[("https://x.test/a.png", "assets/images/ab.png")]);
        let html = r#"<img src="https://x.test/a.png"><link href='https://x.test/a.png'><meta content="https://x.test/a.png">"#;
        let out = rewrite_markup(html, &map);
        assert_eq!(
            out,
            r#"<img src="assets/images/ab.png"><link href="assets/images/ab.png"><meta content="assets/images/ab.png">"#
        );
    }

    #[test]
    fn rewrites_srcset_candidates_with_descriptors() {
        let map = map(&[("https://x.test/a.png", "assets/images/ab.png")]);
        let html = r#"<img srcset="https://x.test/a.png 480w, https://x.test/b.png 2x">"#;
        let out = rewrite_markup(html, &map);
        assert!(out.contains("assets/images/ab.png 480w"));
        assert!(out.contains("https://x.test/b.png 2x"));
    }

    #[test]
    fn rewrites_css_url_forms() {
        let map = map(&[("https://x.test/bg.jpg", "assets/images/bg.jpg")]);
        let html = r#"<div style="background: url( 'https://x.test/bg.jpg' )"></div>"#;
        let out = rewrite_markup(html, &map);
        assert!(out.contains(r#"url("assets/images/bg.jpg")"#));
    }

    #[test]
    fn longest_key_first_protects_prefixed_urls() {
        let map = map(&[
            ("https://x.test/a", "assets/other/short"),
            ("https://x.test/a/long.png", "assets/images/long.png"),
        ]);
        let html = r#"<img src="https://x.test/a/long.png"><a href="https://x.test/a"></a>"#;
        let out = rewrite_markup(html, &map);
        assert!(out.contains(r#"src="assets/images/long.png""#));
        assert!(out.contains(r#"href="assets/other/short""#));
    }

    #[test]
    fn rewriting_is_idempotent() {
        let map = map(&[("https://x.test/a.png", "assets/images/ab.png")]);
        let html = r#"<img src="https://x.test/a.png" srcset="https://x.test/a.png 1x">"#;
        let once = rewrite_markup(html, &map);
        let twice = rewrite_markup(&once, &map);
        assert_eq!(once, twice);
    }

    #[test]
    fn strips_base_elements() {
        let out = rewrite_markup(r#"<head><base href="https://x.test/"></head>"#, &AssetMap::new());
        assert_eq!(out, "<head></head>");
    }

    #[test]
    fn unmatched_keys_leave_text_untouched() {
        let map = map(&[("https://x.test/never.png", "assets/images/n.png")]);
        let html = r#"<img src="https://x.test/other.png">"#;
        assert_eq!(rewrite_markup(html, &map), html);
    }

    #[test]
    fn stylesheet_rewrite_uses_relative_paths() {
        let mut map = AssetMap::new();
        map.insert("https://x.test/css/b.png", "b.png", "assets/images/abc.png");
        let css = "body{background:url('b.png')}";
        let out = rewrite_stylesheet(css, "assets/css/s.css", &map);
        assert_eq!(out, "body{background:url('../images/abc.png')}");
    }

    #[test]
    fn stylesheet_rewrite_is_longest_key_first() {
        let mut map = AssetMap::new();
        map.insert("https://x.test/f", "https://x.test/f", "assets/other/f1");
        map.insert("https://x.test/f/x.woff2", "https://x.test/f/x.woff2", "assets/fonts/f2.woff2");
        let css = "@font-face{src:url(https://x.test/f/x.woff2)}";
        let out = rewrite_stylesheet(css, "assets/css/s.css", &map);
        assert_eq!(out, "@font-face{src:url(../fonts/f2.woff2)}");
    }
}
