use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

/// Placeholder used when a scrape or synthesis finds no image at all.
pub const FALLBACK_IMAGE: &str =
    "https://images.unsplash.com/photo-1556742049-0cfed4f6a45d?w=400&h=300&fit=crop";

/// Placeholder used when the vendor API answers without pictures.
pub const MISSING_IMAGE: &str = "https://http2.mlstatic.com/static/org-img/errors/404-mla.png";

static DIMENSIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)_?(\d+)x(\d+)\.(?:jpg|jpeg|png|webp)$").unwrap());

static S_RES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)s-(\d+)(?:-|$)").unwrap());

static S_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"s-\d+").unwrap());

#[derive(Debug, Clone)]
pub struct ImageCandidate {
    pub url: String,
    /// Nominal size tag from the payload (`XL`, `L`, ...), empty when absent.
    pub size_tag: String,
    pub width: u32,
    pub height: u32,
}

impl ImageCandidate {
    /// Candidate with dimensions inferred from URL tokens only.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let (width, height) = dimensions_from_url(&url);
        Self {
            url,
            size_tag: String::new(),
            width,
            height,
        }
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Explicit high-quality marker: an "original" filename infix or more
    /// than a megapixel of resolution.
    pub fn is_high_quality(&self) -> bool {
        self.url.contains("-O.")
            || self.url.contains("_O.")
            || self.url.contains("original")
            || self.pixel_count() > 1_000_000
    }
}

/// Pull `WxH` or `s-<n>` resolution tokens out of an image URL.
pub fn dimensions_from_url(url: &str) -> (u32, u32) {
    if let Some(caps) = DIMENSIONS_RE.captures(url) {
        let w = caps[1].parse().unwrap_or(0);
        let h = caps[2].parse().unwrap_or(0);
        return (w, h);
    }
    if let Some(caps) = S_RES_RE.captures(url) {
        let s = caps[1].parse().unwrap_or(0);
        return (s, s);
    }
    (0, 0)
}

fn size_ordinal(tag: &str) -> u8 {
    match tag.to_uppercase().as_str() {
        "XL" | "X-LARGE" => 4,
        "L" | "LARGE" => 3,
        "M" | "MEDIUM" => 2,
        "S" | "SMALL" => 1,
        _ => 0,
    }
}

/// Pick the best candidate: high-quality markers first, then pixel count,
/// then the nominal size tag. The winner's URL is upgraded to a
/// higher-resolution variant when a known substitution applies.
/// `None` only when no candidate has an http(s) URL.
pub fn rank(mut candidates: Vec<ImageCandidate>) -> Option<String> {
    candidates.retain(|c| c.url.starts_with("http"));
    candidates.sort_by(|a, b| {
        b.is_high_quality()
            .cmp(&a.is_high_quality())
            .then_with(|| b.pixel_count().cmp(&a.pixel_count()))
            .then_with(|| size_ordinal(&b.size_tag).cmp(&size_ordinal(&a.size_tag)))
            .then(Ordering::Equal)
    });
    let best = candidates.into_iter().next()?;
    Some(upgrade_url(&best.url).unwrap_or(best.url))
}

/// Known filename-token substitutions that request the original-resolution
/// variant of a vendor image. `None` when no rule applies.
pub fn upgrade_url(url: &str) -> Option<String> {
    if url.contains("-I.") {
        return Some(url.replace("-I.", "-O."));
    }
    if url.contains("_I.") {
        return Some(url.replace("_I.", "_O."));
    }
    if url.contains("s-l64") {
        return Some(url.replace("s-l64", "s-l2000"));
    }
    if S_TOKEN_RE.is_match(url) && !url.contains("s-l2000") {
        return Some(S_TOKEN_RE.replace(url, "s-2000").into_owned());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(url: &str, size: &str, w: u32, h: u32) -> ImageCandidate {
        ImageCandidate {
            url: url.into(),
            size_tag: size.into(),
            width: w,
            height: h,
        }
    }

    #[test]
    fn high_quality_marker_beats_resolution() {
        let picked = rank(vec![
            candidate("https://img.example/a-V.jpg", "", 1000, 900),
            candidate("https://img.example/b-O.jpg", "", 100, 100),
        ]);
        assert_eq!(picked.as_deref(), Some("https://img.example/b-O.jpg"));
    }

    #[test]
    fn more_pixels_win_within_same_quality() {
        let picked = rank(vec![
            candidate("https://img.example/small.jpg", "", 200, 200),
            candidate("https://img.example/big.jpg", "", 800, 600),
        ]);
        assert_eq!(picked.as_deref(), Some("https://img.example/big.jpg"));
    }

    #[test]
    fn size_tag_breaks_resolution_ties() {
        let picked = rank(vec![
            candidate("https://img.example/m.jpg", "M", 0, 0),
            candidate("https://img.example/xl.jpg", "XL", 0, 0),
        ]);
        assert_eq!(picked.as_deref(), Some("https://img.example/xl.jpg"));
    }

    #[test]
    fn low_res_suffix_is_upgraded() {
        assert_eq!(
            upgrade_url("https://img.example/photo-I.jpg").as_deref(),
            Some("https://img.example/photo-O.jpg")
        );
        assert_eq!(
            upgrade_url("https://img.example/s-l64/photo.jpg").as_deref(),
            Some("https://img.example/s-l2000/photo.jpg")
        );
        assert_eq!(
            upgrade_url("https://img.example/s-500/photo.jpg").as_deref(),
            Some("https://img.example/s-2000/photo.jpg")
        );
    }

    #[test]
    fn no_rule_keeps_url() {
        assert!(upgrade_url("https://img.example/photo-O.jpg").is_none());
        let picked = rank(vec![candidate("https://img.example/photo-O.jpg", "", 0, 0)]);
        assert_eq!(picked.as_deref(), Some("https://img.example/photo-O.jpg"));
    }

    #[test]
    fn empty_or_relative_candidates_yield_none() {
        assert!(rank(vec![]).is_none());
        assert!(rank(vec![candidate("/relative.jpg", "", 0, 0)]).is_none());
    }

    #[test]
    fn dimensions_parsed_from_url_tokens() {
        assert_eq!(
            dimensions_from_url("https://img.example/photo_640x480.jpg"),
            (640, 480)
        );
        assert_eq!(dimensions_from_url("https://img.example/s-500-x/p.jpg"), (500, 500));
        assert_eq!(dimensions_from_url("https://img.example/p.jpg"), (0, 0));
    }
}
