//! URL normalization, resolution, and asset classification.
//!
//! Everything that decides *what* a reference points at and *where* its local
//! copy lives: scheme normalization for user input, relative-reference
//! resolution against a base, extension/content-type classification, and
//! deterministic local filenames.

use std::path::Path;

use url::Url;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{CaptureError, CaptureResult};

/// Category of a downloaded asset, used for the output directory layout.
///
/// Derived from the URL extension first and the observed content-type second;
/// it is a best guess, not authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Image,
    Stylesheet,
    Script,
    Video,
    Audio,
    Font,
    Other,
}

impl AssetCategory {
    /// Directory name under `assets/` for this category.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Stylesheet => "css",
            Self::Script => "js",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Font => "fonts",
            Self::Other => "other",
        }
    }
}

/// Normalize user input into an absolute http(s) URL.
///
/// A missing scheme defaults to `https://`. Anything that still fails to
/// parse, or parses to a non-http(s) scheme, is rejected.
pub fn normalize(input: &str) -> CaptureResult<String> {
    let trimmed = input.trim();
    // Only schemeless input gets the https default; an explicit scheme is
    // validated as given.
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    match Url::parse(&candidate) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url.to_string()),
        _ => Err(CaptureError::InvalidUrl(input.to_string())),
    }
}

/// True if the string is a `data:` URI.
#[must_use]
pub fn is_data_url(s: &str) -> bool {
    s.trim_start().starts_with("data:")
}

/// Resolve a reference against a base URL.
///
/// Scheme-relative references inherit the base's scheme, relative paths
/// resolve per standard rules, and data-URIs pass through untouched. This
/// never fails: an unresolvable reference is returned unchanged and callers
/// leave it as is.
#[must_use]
pub fn resolve(base: &str, reference: &str) -> String {
    if reference.is_empty() || is_data_url(reference) {
        return reference.to_string();
    }
    match Url::parse(base).and_then(|b| b.join(reference)) {
        Ok(url) => url.to_string(),
        Err(_) => reference.to_string(),
    }
}

/// Best-guess file extension (including the dot) from the URL path, falling
/// back to a content-type table, else empty.
#[must_use]
pub fn extension_for(url: &str, content_type: Option<&str>) -> String {
    if let Ok(parsed) = Url::parse(url)
        && let Some(ext) = Path::new(parsed.path())
            .extension()
            .and_then(|e| e.to_str())
        && !ext.is_empty()
        && ext.len() <= 5
    {
        return format!(".{}", ext.to_ascii_lowercase());
    }

    let mime = content_type
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    let ext = match mime.as_str() {
        "text/html" => ".html",
        "text/css" => ".css",
        "text/javascript" | "application/javascript" => ".js",
        "application/json" => ".json",
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "image/x-icon" | "image/vnd.microsoft.icon" => ".ico",
        "font/woff" | "application/font-woff" => ".woff",
        "font/woff2" | "application/font-woff2" => ".woff2",
        "font/ttf" | "application/x-font-ttf" => ".ttf",
        "font/otf" | "application/x-font-otf" => ".otf",
        "video/mp4" => ".mp4",
        "video/webm" => ".webm",
        "audio/mpeg" => ".mp3",
        "audio/wav" => ".wav",
        _ => "",
    };
    ext.to_string()
}

/// Classify an asset by URL extension first, content-type second.
#[must_use]
pub fn classify(url: &str, content_type: Option<&str>) -> AssetCategory {
    let ext = extension_for(url, content_type);
    match ext.as_str() {
        ".css" => return AssetCategory::Stylesheet,
        ".js" => return AssetCategory::Script,
        ".png" | ".jpg" | ".jpeg" | ".gif" | ".webp" | ".svg" | ".ico" | ".bmp" => {
            return AssetCategory::Image;
        }
        ".woff" | ".woff2" | ".ttf" | ".otf" | ".eot" => return AssetCategory::Font,
        ".mp4" | ".webm" | ".ogg" | ".mov" => return AssetCategory::Video,
        ".mp3" | ".wav" | ".flac" | ".aac" => return AssetCategory::Audio,
        _ => {}
    }

    let mime = content_type
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if mime.starts_with("image/") {
        AssetCategory::Image
    } else if mime.starts_with("font/") || mime.contains("font") {
        AssetCategory::Font
    } else if mime.starts_with("video/") {
        AssetCategory::Video
    } else if mime.starts_with("audio/") {
        AssetCategory::Audio
    } else if mime == "text/css" {
        AssetCategory::Stylesheet
    } else if mime.contains("javascript") {
        AssetCategory::Script
    } else {
        AssetCategory::Other
    }
}

/// Deterministic local filename for an asset: a 12-hex-character hash of the
/// source URL plus a best-guess extension.
///
/// The hash is the low 48 bits of xxh3-64, so two distinct URLs can in theory
/// collide and silently overwrite each other's file. At the scale of a single
/// page capture this is an accepted limitation.
#[must_use]
pub fn asset_filename(url: &str, content_type: Option<&str>) -> String {
    let hash = xxh3_64(url.as_bytes()) & 0xFFFF_FFFF_FFFF;
    format!("{hash:012x}{}", extension_for(url, content_type))
}

/// Local relative path for an asset: `assets/<category dir>/<filename>`.
#[must_use]
pub fn asset_local_path(url: &str, content_type: Option<&str>) -> (AssetCategory, String) {
    let category = classify(url, content_type);
    let path = format!(
        "assets/{}/{}",
        category.dir_name(),
        asset_filename(url, content_type)
    );
    (category, path)
}

/// Output folder name for a capture: sanitized host plus millisecond
/// timestamp, e.g. `example.com_1724700000000`.
#[must_use]
pub fn output_folder_name(url: &str) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "page".to_string());

    let mut safe = sanitize_filename::sanitize(&host).replace(' ', "_");
    safe.truncate(50);
    if safe.is_empty() {
        safe.push_str("page");
    }

    format!("{safe}_{}", chrono::Utc::now().timestamp_millis())
}
