use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::model::ProductId;

/// Path markers of shortened/affiliate links that need resolution.
const SHORT_MARKERS: &[&str] = &["/sec/", "/share/", "/s/"];

/// Final shape every accepted item code must have.
static ID_SHAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{2,4}\d{8,}$").unwrap());

/// URL patterns in priority order; the first capture that survives
/// normalization wins. Direct `/p/` paths outrank bare `MLB` codes, which
/// outrank query parameters.
static ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // /p/ product paths
        r"(?i)/p/(MLB\d{8,})",
        r"(?i)/p/MLB-([A-Z0-9]+)",
        r"(?i)/p/[^/]+/([A-Z]{2,4}\d{8,})",
        // hyphenated codes: MLB-1234567890-produto
        r"(?i)MLB-(\d{8,})[^\d]",
        r"(?i)MLB-(\d{8,})",
        // bare codes anywhere in the path
        r"(?i)/(MLB\d{8,})",
        r"(?i)([A-Z]{2,4}\d{8,})",
        r"(?i)/item/([A-Z]{2,4}\d{8,})",
        r"(?i)-([A-Z]{2,4}\d{8,})-",
        r"(?i)-([A-Z]{2,4}\d{8,})",
        // query parameters
        r"(?i)[?&]id=([A-Z]{2,4}\d{8,})",
        r"(?i)[?&]wid=([A-Z]{2,4}\d{8,})",
        r"(?i)[?&]product_id=([A-Z]{2,4}\d{8,})",
        r"(?i)[?&]item_id=([A-Z]{2,4}\d{8,})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

pub fn is_short_link(url: &str) -> bool {
    SHORT_MARKERS.iter().any(|m| url.contains(m))
}

/// Derive the canonical item code from a URL. Pure and deterministic; no I/O.
///
/// Pattern matches and URL-component scans yield `Confidence::Certain`.
/// For shortened links where nothing else matched, the trailing path segment
/// is turned into a candidate code and returned as `Confidence::Guessed` —
/// a heuristic that may name a nonexistent item, so callers decide whether
/// it is worth a network round-trip.
pub fn extract_id(url: &str) -> Option<ProductId> {
    for pattern in ID_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(url) {
            if let Some(code) = normalize(&caps[1]) {
                return Some(ProductId::certain(code));
            }
        }
    }

    // Nothing matched positionally; scan query values and path segments for
    // anything already shaped like an item code.
    if let Ok(parsed) = Url::parse(url) {
        for (_, value) in parsed.query_pairs() {
            let upper = value.to_uppercase();
            if ID_SHAPE.is_match(&upper) {
                return Some(ProductId::certain(upper));
            }
        }
        if let Some(segments) = parsed.path_segments() {
            for segment in segments {
                let upper = segment.to_uppercase();
                if ID_SHAPE.is_match(&upper) {
                    return Some(ProductId::certain(upper));
                }
            }
        }
    }

    // Last resort for shortened links: treat the trailing short code as the
    // numeric tail of an item code.
    if is_short_link(url) {
        if let Some(code) = trailing_segment(url) {
            if code.len() >= 6 {
                let cleaned: String = code
                    .chars()
                    .filter(char::is_ascii_alphanumeric)
                    .collect::<String>()
                    .to_uppercase();
                let candidate = format!("MLB{cleaned}");
                if candidate.len() >= 10 {
                    return Some(ProductId::guessed(candidate));
                }
            }
        }
    }

    None
}

/// Uppercase, prefix bare digit runs with `MLB`, strip separators, and
/// validate the final shape. `None` sends the caller to the next pattern.
fn normalize(raw: &str) -> Option<String> {
    let mut code = raw.to_uppercase();
    if code.len() >= 8 && code.bytes().all(|b| b.is_ascii_digit()) {
        code = format!("MLB{code}");
    }
    code.retain(|c| c.is_ascii_alphanumeric());
    ID_SHAPE.is_match(&code).then_some(code)
}

/// Last path segment with any query string or fragment stripped.
pub(crate) fn trailing_segment(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Confidence;

    #[test]
    fn direct_p_link() {
        let id = extract_id("https://www.mercadolivre.com.br/smartphone-x/p/MLB4216225440");
        let id = id.unwrap();
        assert_eq!(id.code, "MLB4216225440");
        assert_eq!(id.confidence, Confidence::Certain);
    }

    #[test]
    fn p_pattern_outranks_query_code() {
        // Both a /p/ code and a different code in the query string; the /p/
        // one must win.
        let id = extract_id(
            "https://www.mercadolivre.com.br/p/MLB4216225440?tracking=MLB9999999999",
        );
        assert_eq!(id.unwrap().code, "MLB4216225440");
    }

    #[test]
    fn hyphenated_code_gains_prefix() {
        let id = extract_id("https://produto.mercadolivre.com.br/MLB-3456789012-liquidificador-_JM");
        assert_eq!(id.unwrap().code, "MLB3456789012");
    }

    #[test]
    fn lowercase_url_is_normalized() {
        let id = extract_id("https://www.mercadolivre.com.br/p/mlb4216225440");
        assert_eq!(id.unwrap().code, "MLB4216225440");
    }

    #[test]
    fn query_parameter_code() {
        let id = extract_id("https://www.mercadolivre.com.br/checkout?item_id=MLB1234567890");
        assert_eq!(id.unwrap().code, "MLB1234567890");
    }

    #[test]
    fn item_path_code() {
        let id = extract_id("https://www.mercadolivre.com.br/item/MLB1234567890");
        assert_eq!(id.unwrap().code, "MLB1234567890");
    }

    #[test]
    fn short_digits_rejected() {
        // Seven digits is below the item-code floor everywhere.
        assert!(extract_id("https://www.mercadolivre.com.br/p/MLB1234567").is_none());
    }

    #[test]
    fn short_link_yields_guess() {
        let id = extract_id("https://mercadolivre.com/sec/28TFwez").unwrap();
        assert_eq!(id.code, "MLB28TFWEZ");
        assert!(id.is_guessed());
    }

    #[test]
    fn tiny_short_code_yields_nothing() {
        assert!(extract_id("https://mercadolivre.com/sec/ab1").is_none());
    }

    #[test]
    fn unrelated_url_yields_nothing() {
        assert!(extract_id("https://example.com/nothing-here").is_none());
    }

    #[test]
    fn extraction_is_deterministic() {
        let url = "https://www.mercadolivre.com.br/x/p/MLB4216225440?a=1";
        assert_eq!(extract_id(url), extract_id(url));
    }
}
