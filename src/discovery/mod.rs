//! Asset discovery over the rendered document.
//!
//! Walks a parsed DOM snapshot and produces one entry per distinct resolved
//! URL across every reference syntax a page can carry: `src`/`srcset`,
//! stylesheet and preload links, media sources, icons, inline style `url()`
//! references, `<style>` blocks, and Open-Graph/Twitter meta images.

use std::collections::HashSet;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::asset_url::{AssetCategory, is_data_url, resolve};
use crate::css_scan::{extract_css_urls, parse_srcset};

/// One discovered asset reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredAsset {
    /// Absolute URL after resolution against the page's final URL.
    pub url: String,
    /// Category guessed from the reference syntax; the fetch orchestrator may
    /// override it from the observed content-type.
    pub category: AssetCategory,
    /// The reference text exactly as it appeared in the document. Rewriting
    /// substitutes this form as well as the resolved URL.
    pub original_ref: String,
}

struct Collector {
    base: String,
    seen: HashSet<String>,
    out: Vec<DiscoveredAsset>,
}

impl Collector {
    fn add(&mut self, raw: &str, category: AssetCategory) {
        if raw.is_empty() || is_data_url(raw) {
            return;
        }
        let resolved = resolve(&self.base, raw);
        if is_data_url(&resolved) || self.seen.contains(&resolved) {
            return;
        }
        self.seen.insert(resolved.clone());
        self.out.push(DiscoveredAsset {
            url: resolved,
            category,
            original_ref: raw.to_string(),
        });
    }
}

/// Discover every asset reference in the rendered markup, deduplicated by
/// resolved absolute URL. First occurrence wins the category.
#[must_use]
pub fn discover_assets(html: &str, base_url: &str) -> Vec<DiscoveredAsset> {
    let document = Html::parse_document(html);
    let mut collector = Collector {
        base: base_url.to_string(),
        seen: HashSet::new(),
        out: Vec::new(),
    };

    // img src first so plain references win category tagging over srcset.
    collect_attr(&document, &mut collector, "img[src]", "src", AssetCategory::Image);

    let srcset_selector = Selector::parse("[srcset]").expect("srcset selector is valid");
    for element in document.select(&srcset_selector) {
        if let Some(srcset) = element.value().attr("srcset") {
            for candidate in parse_srcset(srcset) {
                collector.add(&candidate, AssetCategory::Image);
            }
        }
    }

    let attr_sources: &[(&str, &str, AssetCategory)] = &[
        ("link[rel=\"stylesheet\"][href]", "href", AssetCategory::Stylesheet),
        ("link[rel=\"preload\"][as=\"style\"][href]", "href", AssetCategory::Stylesheet),
        ("script[src]", "src", AssetCategory::Script),
        ("video[src]", "src", AssetCategory::Video),
        ("video source[src]", "src", AssetCategory::Video),
        ("audio[src]", "src", AssetCategory::Audio),
        ("audio source[src]", "src", AssetCategory::Audio),
        ("link[rel=\"icon\"][href]", "href", AssetCategory::Image),
        ("link[rel=\"shortcut icon\"][href]", "href", AssetCategory::Image),
        ("link[rel=\"apple-touch-icon\"][href]", "href", AssetCategory::Image),
        ("link[rel=\"preload\"][as=\"font\"][href]", "href", AssetCategory::Font),
        ("meta[property=\"og:image\"][content]", "content", AssetCategory::Image),
        ("meta[name=\"twitter:image\"][content]", "content", AssetCategory::Image),
    ];

    for (selector, attr, category) in attr_sources {
        collect_attr(&document, &mut collector, selector, attr, *category);
    }

    let style_attr_selector = Selector::parse("[style]").expect("style selector is valid");
    for element in document.select(&style_attr_selector) {
        if let Some(style) = element.value().attr("style")
            && style.contains("url")
        {
            for url in extract_css_urls(style) {
                collector.add(&url, AssetCategory::Image);
            }
        }
    }

    let style_block_selector = Selector::parse("style").expect("style selector is valid");
    for element in document.select(&style_block_selector) {
        let css: String = element.text().collect();
        for url in extract_css_urls(&css) {
            collector.add(&url, AssetCategory::Image);
        }
    }

    log::debug!(
        "discovered {} distinct asset references for {base_url}",
        collector.out.len()
    );
    collector.out
}

fn collect_attr(
    document: &Html,
    collector: &mut Collector,
    selector: &str,
    attr: &str,
    category: AssetCategory,
) {
    let selector = Selector::parse(selector).expect("static selector is valid");
    for element in document.select(&selector) {
        if let Some(value) = element.value().attr(attr) {
            collector.add(value.trim(), category);
        }
    }
}
