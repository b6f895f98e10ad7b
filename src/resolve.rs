use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use tracing::{info, warn};

use crate::config::Config;
use crate::http::Transport;
use crate::ident;
use crate::parser::api::SearchPayload;
use crate::validate::is_valid_link;

/// Redirect hints inside served HTML, scanned after the JSON-LD `url`
/// field. Order mirrors trust: script redirects, generic url fields,
/// anchors pointing at product paths.
static REDIRECT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)window\.location\.href\s*=\s*["']([^"']+)["']"#,
        r#"(?i)location\.href\s*=\s*["']([^"']+)["']"#,
        r#"(?i)url=([^"'>\s&]+)"#,
        r#"(?i)href=["']([^"']*mercado[^"']*)["']"#,
        r#"(?i)"url":\s*"([^"]*mercado[^"]*)""#,
        r#"(?i)<a[^>]*href=["']([^"']*/p/[^"']*)["'][^>]*>"#,
        r#"(?i)<a[^>]*href=["']([^"']*MLB-?\d+[^"']*)["'][^>]*>"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static HTTP_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^"'\s]+"#).unwrap());

static PRODUCT_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)MLB-?\d+").unwrap());

static JSON_LD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script type="application/ld\+json">\s*(\{.*?\})\s*</script>"#).unwrap()
});

/// Best-effort resolution of shortened/affiliate links to a direct product
/// URL. Strategies run in fixed priority order, each swallowing its own
/// failure; when everything misses, the input comes back unchanged and the
/// caller decides what an unresolved short link means.
pub struct Resolver<'a, T: Transport> {
    config: &'a Config,
    transport: &'a T,
}

impl<'a, T: Transport> Resolver<'a, T> {
    pub fn new(config: &'a Config, transport: &'a T) -> Self {
        Self { config, transport }
    }

    pub async fn resolve(&self, url: &str) -> String {
        if !ident::is_short_link(url) {
            return url.to_string();
        }

        match self.search_by_code(url).await {
            Ok(direct) => {
                info!("resolved via search: {direct}");
                return direct;
            }
            Err(e) => warn!("search-by-code failed: {e:#}"),
        }
        match self.scan_proxied_html(url).await {
            Ok(direct) => {
                info!("resolved via proxied HTML: {direct}");
                return direct;
            }
            Err(e) => warn!("proxied HTML scan failed: {e:#}"),
        }
        match self.follow_redirect(url).await {
            Ok(direct) => {
                info!("resolved via redirect: {direct}");
                return direct;
            }
            Err(e) => warn!("redirect probe failed: {e:#}"),
        }
        match self.probe_constructed(url).await {
            Ok(direct) => {
                info!("resolved via constructed URL: {direct}");
                return direct;
            }
            Err(e) => warn!("constructed-URL probe failed: {e:#}"),
        }

        warn!("all resolution strategies exhausted for {url}");
        url.to_string()
    }

    /// Strategy 1: query the trailing short code against the vendor search
    /// endpoint under a few casing/prefix variants; first hit with a valid
    /// permalink wins.
    async fn search_by_code(&self, url: &str) -> Result<String> {
        let code = short_code(url).context("no usable short code in URL")?;
        let queries = [
            code.to_string(),
            code.to_uppercase(),
            format!("MLB{code}"),
            code.chars().filter(|c| c.is_ascii_alphanumeric()).collect(),
        ];

        for query in queries {
            let search_url = self.config.search_url(&query, 5);
            let response = match self.transport.get(&search_url).await {
                Ok(r) => r,
                Err(e) => {
                    warn!("search query {query:?} failed: {e}");
                    continue;
                }
            };
            if !response.is_ok() {
                continue;
            }
            let Ok(payload) = serde_json::from_str::<SearchPayload>(&response.body) else {
                continue;
            };
            for result in payload.results {
                if let Some(permalink) = result.permalink {
                    if is_valid_link(&permalink) {
                        return Ok(permalink);
                    }
                }
            }
        }
        bail!("no search result with a valid permalink")
    }

    /// Strategy 2: fetch the short link's HTML through a proxy and mine it
    /// for the destination product URL.
    async fn scan_proxied_html(&self, url: &str) -> Result<String> {
        let proxy = self.config.proxies.first().context("no proxies configured")?;
        let response = self.transport.get(&proxy.wrap(url)).await?;
        if !response.is_ok() {
            bail!("proxy answered with status {}", response.status);
        }
        let html = proxy
            .unwrap_body(&response.body)
            .context("empty proxy envelope")?;
        scan_html_for_product_url(&html).context("no product URL in served HTML")
    }

    /// Strategy 3: let the transport follow redirects on a HEAD request and
    /// see whether it lands somewhere else.
    async fn follow_redirect(&self, url: &str) -> Result<String> {
        let response = self.transport.head(url).await?;
        if response.final_url.is_empty() || response.final_url == url {
            bail!("no redirect detected");
        }
        Ok(response.final_url)
    }

    /// Strategy 4: synthesize plausible canonical URL shapes around the
    /// short code and probe each one.
    async fn probe_constructed(&self, url: &str) -> Result<String> {
        let code = short_code(url).context("no usable short code in URL")?;
        let candidates = [
            format!("{}/MLB-{}", self.config.alt_product_base, code),
            format!("{}/p/MLB{}", self.config.product_base, code),
            format!("{}/MLB-{}", self.config.list_base, code),
            format!("{}/{}", self.config.alt_product_base, code),
            format!("{}/p/{}", self.config.product_base, code),
        ];

        for candidate in candidates {
            match self.transport.head(&candidate).await {
                Ok(response) if response.is_ok() && is_valid_link(&response.final_url) => {
                    return Ok(response.final_url);
                }
                Ok(_) => {}
                Err(e) => warn!("probe {candidate} failed: {e}"),
            }
        }
        bail!("no constructed URL answered")
    }
}

/// Mine HTML for the product URL a short link redirects to. The JSON-LD
/// `url` field is the most trustworthy source; after that, redirect-style
/// patterns are collected into a deduplicated set, anything carrying `/p/`
/// or an `MLB-` code returns immediately, and the first collected match is
/// the consolation prize.
pub(crate) fn scan_html_for_product_url(html: &str) -> Option<String> {
    if let Some(caps) = JSON_LD_RE.captures(html) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&caps[1]) {
            if let Some(url) = value.get("url").and_then(|u| u.as_str()) {
                if is_valid_link(url) {
                    return Some(url.to_string());
                }
            }
        }
    }

    let mut found: Vec<String> = Vec::new();
    for pattern in REDIRECT_PATTERNS.iter() {
        for matched in pattern.find_iter(html) {
            let Some(raw) = HTTP_URL_RE.find(matched.as_str()) else {
                continue;
            };
            let candidate = match urlencoding::decode(raw.as_str()) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => raw.as_str().to_string(),
            };

            let looks_like_product =
                candidate.contains("/p/") || PRODUCT_CODE_RE.is_match(&candidate);
            if !is_valid_link(&candidate)
                || !looks_like_product
                || candidate.contains("/perfil/")
                || candidate.contains("/user/")
                || found.contains(&candidate)
            {
                continue;
            }

            if candidate.contains("/p/") || candidate.contains("MLB-") {
                return Some(candidate);
            }
            found.push(candidate);
        }
    }

    found.into_iter().next()
}

/// Trailing path segment of a short link, when long enough to mean anything.
fn short_code(url: &str) -> Option<&str> {
    ident::trailing_segment(url).filter(|c| c.len() > 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_ld_url_is_most_trusted() {
        let html = r#"
            <a href="https://www.mercadolivre.com.br/outro/p/MLB111111111">x</a>
            <script type="application/ld+json">
            {"@type": "Product", "url": "https://www.mercadolivre.com.br/item/p/MLB4216225440"}
            </script>
        "#;
        assert_eq!(
            scan_html_for_product_url(html).as_deref(),
            Some("https://www.mercadolivre.com.br/item/p/MLB4216225440")
        );
    }

    #[test]
    fn script_redirect_is_detected() {
        let html = r#"<script>window.location.href = "https://www.mercadolivre.com.br/x/p/MLB4216225440";</script>"#;
        assert_eq!(
            scan_html_for_product_url(html).as_deref(),
            Some("https://www.mercadolivre.com.br/x/p/MLB4216225440")
        );
    }

    #[test]
    fn product_anchor_returns_immediately() {
        let html = r#"
            <a href="https://www.mercadolivre.com.br/social/share?x=1">share</a>
            <a href="https://produto.mercadolivre.com.br/MLB-1234567890-coisa">produto</a>
        "#;
        assert_eq!(
            scan_html_for_product_url(html).as_deref(),
            Some("https://produto.mercadolivre.com.br/MLB-1234567890-coisa")
        );
    }

    #[test]
    fn profile_urls_are_ignored() {
        let html = r#"<a href="https://www.mercadolivre.com.br/perfil/LOJAX">loja</a>"#;
        assert!(scan_html_for_product_url(html).is_none());
    }

    #[test]
    fn foreign_urls_are_ignored() {
        let html = r#"<script>window.location.href = "https://evil.example/p/MLB123";</script>"#;
        assert!(scan_html_for_product_url(html).is_none());
    }

    #[test]
    fn nothing_found_is_none() {
        assert!(scan_html_for_product_url("<html><body>vazio</body></html>").is_none());
    }

    #[test]
    fn short_code_needs_length() {
        assert_eq!(
            short_code("https://mercadolivre.com/sec/28TFwez"),
            Some("28TFwez")
        );
        assert!(short_code("https://mercadolivre.com/sec/ab").is_none());
    }
}
