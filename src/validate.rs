use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Vendor domain suffixes, one per supported country site.
const VALID_DOMAINS: &[&str] = &[
    "mercadolivre.com.br",
    "mercadolivre.com",
    "mercadolibre.com.ar",
    "mercadolibre.com.mx",
    "mercadolibre.com.co",
    "mercadolibre.cl",
    "mercadolibre.com.pe",
    "mercadolibre.com.uy",
    "mercadolibre.com.ve",
    "mercadolibre.com.ec",
    "mercadolibre.com.bo",
    "mercadolibre.com.py",
    "mercadolibre.com.cr",
    "mercadolibre.com.pa",
    "mercadolibre.com.ni",
    "mercadolibre.com.sv",
    "mercadolibre.com.gt",
    "mercadolibre.com.hn",
    "mercadolibre.com.do",
    "mercadolibre.com.pt",
    "mercadolivre.pt",
];

static PROFILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/(perfil|user)/[^/]+").unwrap());

static SHORT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/(sec|s|share)/").unwrap());

static PRODUCT_PATH_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)/p/",
        r"(?i)MLB-?\d+",
        r"(?i)/[A-Z]{2,4}\d{8,}",
        r"(?i)/produto/",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Whether a URL is worth handing to the pipeline: an allow-listed vendor
/// host, not a user/profile page, and either a short link (accepted now,
/// resolved later) or something carrying a product-path indicator.
/// Unparseable input is simply invalid.
pub fn is_valid_link(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };

    let domain_ok = VALID_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")));
    if !domain_ok {
        return false;
    }

    if PROFILE_RE.is_match(url) {
        return false;
    }

    // Short links can't be judged by path yet; accept and resolve later.
    if SHORT_LINK_RE.is_match(url) {
        return true;
    }

    PRODUCT_PATH_RES.iter().any(|re| re.is_match(url))
}
