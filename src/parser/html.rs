use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::image::{self, ImageCandidate};
use crate::category;
use crate::model::{ProductRecord, RecordSource};

// ── Name ──

/// Name sources in priority order: page title, embedded JSON title, known
/// product-title class fragments, bare <h1>.
static TITLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<title[^>]*>([^<]+?)\s*(?:-\s*Mercado\s*Livre)?</title>",
        r#"(?i)"title":\s*"([^"]+)""#,
        r#"(?i)class="[^"]*ui-pdp-title[^"]*"[^>]*>([^<]+)<"#,
        r#"(?i)data-testid="product-title"[^>]*>([^<]+)<"#,
        r"(?is)<h1[^>]*>([^<]+)<",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static ML_TITLE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*-\s*Mercado\s*Livre.*$").unwrap());

// ── Prices ──

static JSON_PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"(original_price|base_price|price)":\s*(\d+(?:\.\d+)?)"#).unwrap()
});

/// Price-fragment elements; only the integer part is tagged.
static FRACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)class="[^"]*andes-money-amount__fraction[^"]*"[^>]*>(\d+)"#,
        r#"(?i)class="[^"]*price-tag-fraction[^"]*"[^>]*>(\d+)"#,
        r#"(?i)class="[^"]*ui-pdp-price__fraction[^"]*"[^>]*>(\d+)"#,
        r#"(?is)<span[^>]*class="[^"]*price[^"]*"[^>]*>.*?R\$\s*(\d+(?:[.,]\d+)?)"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TEXTUAL_PRICE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)R\$\s*(\d{1,3}(?:[.,]\d{3})*(?:[.,]\d{2})?)",
        r"(?i)(\d{1,3}(?:[.,]\d{3})*(?:[.,]\d{2})?)\s*reais?",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static DIGIT_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{2,6}").unwrap());

// ── Images ──

static JSON_LD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script type="application/ld\+json">\s*(\{.*?\})\s*</script>"#).unwrap()
});

static GALLERY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)"pictures":\s*(\[.*?\])"#).unwrap());

static DATA_IMAGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)data-(?:src|image|zoom)="([^"]*?\.(?:jpg|jpeg|png|webp)[^"]*?)""#,
        r#"(?i)"secure_url":\s*"([^"]*?\.(?:jpg|jpeg|png|webp)[^"]*?)""#,
        r#"(?i)"url":\s*"([^"]*?\.(?:jpg|jpeg|png|webp)[^"]*?)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TAG_IMAGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)<img[^>]+(?:src|data-src|data-srcset)="([^"]*?\.(?:jpg|jpeg|png|webp)[^"]*?)"[^>]*>"#,
        r#"(?i)<source[^>]+(?:srcset|src)="([^"]*?\.(?:jpg|jpeg|png|webp)[^"]*?)"[^>]*>"#,
        r#"(?i)<div[^>]+(?:data-src|data-image)="([^"]*?\.(?:jpg|jpeg|png|webp)[^"]*?)"[^>]*>"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static IMAGE_EXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|webp)(?:\?.*)?$").unwrap());

// ── Rating / reviews ──

static RATING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)"rating_average":\s*(\d+(?:\.\d+)?)"#,
        r"(?i)(\d+(?:\.\d+)?)\s*estrelas?",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static REVIEWS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)"reviews_total":\s*(\d+)"#,
        r"(?i)(\d+)\s*(?:avalia|opini|review)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Extract a normalized record straight from product-page HTML. Never
/// fails: when no usable name is found the synthesized fallback comes back
/// instead, tagged accordingly so callers can tell it was not a real parse.
pub fn parse(html: &str, id_code: &str) -> ProductRecord {
    let Some(name) = extract_name(html) else {
        debug!("no product name in HTML, synthesizing record for {id_code}");
        return super::basic_record(id_code);
    };

    let (original_price, discount_price) = extract_prices(html);
    let image = extract_image(html);
    let (rating, reviews) = extract_rating_reviews(html);

    ProductRecord {
        description: format!(
            "{name} - Produto disponível no MercadoLivre com entrega rápida e segura."
        ),
        category: category::from_name(&name),
        name,
        original_price,
        discount_price: discount_price.filter(|d| *d > 0.0 && *d < original_price),
        image,
        rating,
        reviews,
        affiliate_link: String::new(),
        source: RecordSource::Scraped,
    }
}

fn extract_name(html: &str) -> Option<String> {
    for pattern in TITLE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(html) {
            let candidate = ML_TITLE_SUFFIX_RE.replace(caps[1].trim(), "");
            let candidate = candidate.trim();
            if candidate.chars().count() > 5 {
                return Some(candidate.to_string());
            }
        }
    }
    None
}

/// Three independent passes pooled together, deduplicated and filtered to a
/// plausible range; out-of-range candidates are parsing noise and dropped.
fn extract_prices(html: &str) -> (f64, Option<f64>) {
    let (json_original, json_current) = json_price_pass(html);

    let mut pool: Vec<f64> = Vec::new();
    pool.extend(json_current);
    pool.extend(json_original);
    pool.extend(fraction_pass(html));
    pool.extend(textual_pass(html));

    let mut valid: Vec<f64> = pool
        .into_iter()
        .filter(|p| *p > 10.0 && *p < 100_000.0)
        .collect();
    valid.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    valid.dedup();

    if !valid.is_empty() {
        // Structured fields take precedence over positional guessing.
        if let (Some(op), Some(cp)) = (json_original, json_current) {
            return (op, (cp < op).then_some(cp));
        }
        if valid.len() >= 2 {
            return (valid[0], Some(valid[1]));
        }
        return (valid[0], None);
    }

    if let Some(price) = digit_token_pass(html) {
        return (price, None);
    }
    (99.99, None)
}

/// Embedded JSON numeric fields, bucketed by field name; the largest value
/// per bucket wins.
fn json_price_pass(html: &str) -> (Option<f64>, Option<f64>) {
    let mut original: Option<f64> = None;
    let mut current: Option<f64> = None;
    for caps in JSON_PRICE_RE.captures_iter(html) {
        let Ok(price) = caps[2].parse::<f64>() else {
            continue;
        };
        if price <= 1.0 || price >= 1_000_000.0 {
            continue;
        }
        let bucket = if caps[1].eq_ignore_ascii_case("original_price") {
            &mut original
        } else {
            &mut current
        };
        *bucket = Some(bucket.map_or(price, |b: f64| b.max(price)));
    }
    (original, current)
}

fn fraction_pass(html: &str) -> Vec<f64> {
    let mut prices = Vec::new();
    for pattern in FRACTION_PATTERNS.iter() {
        for caps in pattern.captures_iter(html) {
            let digits: String = caps[1].chars().filter(|c| c.is_ascii_digit()).collect();
            if let Ok(price) = digits.parse::<f64>() {
                if price > 1.0 && price < 1_000_000.0 {
                    prices.push(price);
                }
            }
        }
    }
    prices
}

fn textual_pass(html: &str) -> Vec<f64> {
    let mut prices = Vec::new();
    for pattern in TEXTUAL_PRICE_PATTERNS.iter() {
        for caps in pattern.captures_iter(html) {
            if let Some(price) = normalize_brl(&caps[1]) {
                if price > 1.0 && price < 1_000_000.0 {
                    prices.push(price);
                }
            }
        }
    }
    prices
}

/// Brazilian decimal/thousands separators: `1.234,56` → `1234.56`.
pub(crate) fn normalize_brl(text: &str) -> Option<f64> {
    let normalized = if text.contains(',') && text.contains('.') {
        text.replace('.', "").replace(',', ".")
    } else if text.contains(',') {
        text.replace(',', ".")
    } else {
        text.to_string()
    };
    normalized.parse().ok()
}

/// Last-resort single price: any 2–6 digit run in a plausible range.
fn digit_token_pass(html: &str) -> Option<f64> {
    DIGIT_RUN_RE
        .find_iter(html)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| *n > 50.0 && *n < 50_000.0)
        .fold(None, |best: Option<f64>, n| {
            Some(best.map_or(n, |b| b.max(n)))
        })
}

/// Union of every image-discovery pass, ranked for quality. Never empty:
/// the placeholder comes back when the page had nothing.
fn extract_image(html: &str) -> String {
    let mut found: Vec<String> = Vec::new();

    // 1. JSON-LD structured data, recursively walked.
    for caps in JSON_LD_RE.captures_iter(html) {
        if let Ok(value) = serde_json::from_str::<Value>(&caps[1]) {
            walk_json_images(&value, &mut found);
        }
    }

    // 2. Embedded gallery array.
    for caps in GALLERY_RE.captures_iter(html) {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&caps[1]) {
            for item in items {
                if let Some(url) = item.get("url").and_then(Value::as_str) {
                    let cleaned = url.replace('\\', "");
                    if IMAGE_EXT_RE.is_match(&cleaned) {
                        push_unique(&mut found, cleaned);
                    }
                }
            }
        }
    }

    // 3. Tagged data attributes and embedded JSON url fields.
    for pattern in DATA_IMAGE_PATTERNS.iter() {
        for caps in pattern.captures_iter(html) {
            let cleaned = caps[1].replace('\\', "").trim_matches('"').to_string();
            if cleaned.starts_with("http") && IMAGE_EXT_RE.is_match(&cleaned) {
                push_unique(&mut found, cleaned);
            }
        }
    }

    // 4. Plain <img>/<source>/<div> markup.
    for pattern in TAG_IMAGE_PATTERNS.iter() {
        for caps in pattern.captures_iter(html) {
            let cleaned = caps[1].replace('\\', "");
            if cleaned.starts_with("http") {
                push_unique(&mut found, cleaned);
            }
        }
    }

    let candidates: Vec<ImageCandidate> = found.into_iter().map(ImageCandidate::from_url).collect();
    image::rank(candidates).unwrap_or_else(|| image::FALLBACK_IMAGE.to_string())
}

/// Collect image URLs from a schema.org-ish JSON value: `ImageObject`
/// nodes, well-known image properties, and everything nested below.
fn walk_json_images(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                walk_json_images(item, out);
            }
        }
        Value::Object(map) => {
            if map.get("@type").and_then(Value::as_str) == Some("ImageObject") {
                if let Some(url) = map.get("contentUrl").and_then(Value::as_str) {
                    let cleaned = url.replace('\\', "");
                    if IMAGE_EXT_RE.is_match(&cleaned) {
                        push_unique(out, cleaned);
                    }
                }
            }
            for prop in ["image", "thumbnail", "thumbnailUrl", "url", "contentUrl"] {
                match map.get(prop) {
                    Some(Value::String(url)) if IMAGE_EXT_RE.is_match(url) => {
                        push_unique(out, url.clone());
                    }
                    Some(Value::Array(urls)) => {
                        for url in urls {
                            if let Some(url) = url.as_str() {
                                if IMAGE_EXT_RE.is_match(url) {
                                    push_unique(out, url.to_string());
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            for nested in map.values() {
                walk_json_images(nested, out);
            }
        }
        _ => {}
    }
}

fn push_unique(out: &mut Vec<String>, url: String) {
    if !out.contains(&url) {
        out.push(url);
    }
}

fn extract_rating_reviews(html: &str) -> (f64, u32) {
    let mut rating = 4.0;
    for pattern in RATING_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(html) {
            if let Ok(value) = caps[1].parse::<f64>() {
                rating = value.clamp(0.0, 5.0);
                break;
            }
        }
    }

    let mut reviews = 100;
    for pattern in REVIEWS_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(html) {
            if let Ok(value) = caps[1].parse::<u32>() {
                reviews = value;
                break;
            }
        }
    }

    (rating, reviews)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/product_page.html").unwrap()
    }

    #[test]
    fn fixture_parses_to_scraped_record() {
        let record = parse(&fixture(), "MLB4216225440");
        assert_eq!(record.source, RecordSource::Scraped);
        assert_eq!(record.name, "Smartphone Galaxy X 128GB Preto");
        assert_eq!(record.category, Category::Tecnologia);
        assert_eq!(record.original_price, 1899.0);
        assert_eq!(record.discount_price, Some(1499.0));
        assert!((record.rating - 4.7).abs() < 1e-9);
        assert_eq!(record.reviews, 312);
    }

    #[test]
    fn fixture_picks_original_resolution_image() {
        let record = parse(&fixture(), "MLB4216225440");
        assert_eq!(record.image, "https://http2.mlstatic.com/D_NQ_NP_2X_987654-O.webp");
    }

    #[test]
    fn brazilian_separators_normalize() {
        assert_eq!(normalize_brl("1.234,56"), Some(1234.56));
        assert_eq!(normalize_brl("89,90"), Some(89.9));
        assert_eq!(normalize_brl("1500"), Some(1500.0));
    }

    #[test]
    fn textual_price_is_found() {
        let html = "<p>por apenas R$ 1.234,56 à vista</p>";
        let (original, discount) = extract_prices(html);
        assert_eq!(original, 1234.56);
        assert!(discount.is_none());
    }

    #[test]
    fn two_pooled_candidates_become_original_and_discount() {
        let html = "<p>De R$ 200,00 por R$ 150,00</p>";
        let (original, discount) = extract_prices(html);
        assert_eq!(original, 200.0);
        assert_eq!(discount, Some(150.0));
    }

    #[test]
    fn structured_fields_override_pooling() {
        let html = r#"{"price": 80, "original_price": 100} R$ 999,00"#;
        let (original, discount) = extract_prices(html);
        assert_eq!(original, 100.0);
        assert_eq!(discount, Some(80.0));
    }

    #[test]
    fn equal_structured_prices_have_no_discount() {
        let html = r#"{"price": 100, "original_price": 100}"#;
        let record = parse(
            &format!("<title>Produto de teste qualquer</title>{html}"),
            "MLB1",
        );
        assert!(record.discount_price.is_none());
    }

    #[test]
    fn noise_prices_are_discarded() {
        // 2.50 and 980000 are out of the plausible range; only 59.90 stays.
        let html = "<p>R$ 2,50</p><p>R$ 980.000,00</p><p>R$ 59,90</p>";
        let (original, discount) = extract_prices(html);
        assert_eq!(original, 59.9);
        assert!(discount.is_none());
    }

    #[test]
    fn no_name_means_synthesized_fallback() {
        let record = parse("<html><body>nada</body></html>", "MLB3456789012");
        assert_eq!(record.source, RecordSource::Synthesized);
        assert!(!record.image.is_empty());
    }

    #[test]
    fn missing_image_falls_back_to_placeholder() {
        let record = parse("<title>Produto sem nenhuma foto</title>", "MLB1");
        assert_eq!(record.image, image::FALLBACK_IMAGE);
    }

    #[test]
    fn title_suffix_is_stripped() {
        let html = "<title>Notebook Legal 16GB - Mercado Livre</title>";
        assert_eq!(extract_name(html).as_deref(), Some("Notebook Legal 16GB"));
    }

    #[test]
    fn short_titles_are_skipped() {
        let html = "<title>Loja</title><h1>Cafeteira Expresso Prime</h1>";
        assert_eq!(extract_name(html).as_deref(), Some("Cafeteira Expresso Prime"));
    }
}
