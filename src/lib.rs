//! MercadoLivre product-link resolution and data extraction.
//!
//! Takes any vendor URL — direct product page, shortened affiliate link, or
//! redirect wrapper — and produces a normalized [`ProductRecord`] by chaining
//! fallback strategies: link resolution, identifier extraction, API fetch,
//! proxy relays, HTML scraping, and a synthesized terminal record. Each call
//! is stateless; nothing is cached between invocations.

pub mod category;
pub mod config;
pub mod cta;
pub mod error;
pub mod fetch;
pub mod http;
pub mod ident;
pub mod model;
pub mod parser;
pub mod resolve;
pub mod validate;

use tracing::info;

pub use config::Config;
pub use error::ExtractError;
pub use http::{ReqwestTransport, Transport};
pub use ident::extract_id;
pub use model::{Audience, Category, Confidence, CtaStyle, ProductId, ProductRecord, RecordSource};
pub use validate::is_valid_link;

use fetch::Fetcher;
use resolve::Resolver;

/// The pipeline front door: validates, resolves, extracts an identifier and
/// fetches through the degradation chain, then stamps the caller's original
/// URL as the affiliate link.
pub struct Extractor<T: Transport = ReqwestTransport> {
    config: Config,
    transport: T,
}

impl Extractor<ReqwestTransport> {
    pub fn new() -> Self {
        Self::with_transport(Config::default(), ReqwestTransport::new())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_transport(config, ReqwestTransport::new())
    }
}

impl Default for Extractor<ReqwestTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Extractor<T> {
    /// Swap in any transport; tests run the whole pipeline against a mock.
    pub fn with_transport(config: Config, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve a possibly-indirect URL to a direct product URL; the input
    /// comes back unchanged when nothing better was found.
    pub async fn resolve(&self, url: &str) -> String {
        Resolver::new(&self.config, &self.transport)
            .resolve(url)
            .await
    }

    /// Full extraction. The only two failure modes a caller sees are an
    /// input that fails link validation and a URL no strategy could turn
    /// into a product; everything else degrades internally, down to a
    /// synthesized record for a validated identifier.
    pub async fn extract_product_data(&self, url: &str) -> Result<ProductRecord, ExtractError> {
        if !validate::is_valid_link(url) {
            return Err(ExtractError::InvalidLink {
                url: url.to_string(),
            });
        }

        let resolved = self.resolve(url).await;
        if resolved != url {
            info!("resolved {url} -> {resolved}");
        }

        let fetched = match ident::extract_id(&resolved) {
            Some(id) => {
                info!("extracted id {} ({:?})", id.code, id.confidence);
                Fetcher::new(&self.config, &self.transport).fetch(&id).await
            }
            None => None,
        };

        let mut record = match fetched {
            Some(record) => record,
            // A short link that never became an id (or whose guessed id led
            // nowhere) gets one last chance as a search term before the
            // hard failure.
            None => self
                .search_short_code(url)
                .await
                .ok_or_else(|| ExtractError::ResolutionExhausted {
                    url: url.to_string(),
                })?,
        };

        record.affiliate_link = url.to_string();
        Ok(record)
    }

    async fn search_short_code(&self, url: &str) -> Option<ProductRecord> {
        if !ident::is_short_link(url) {
            return None;
        }
        let code = ident::trailing_segment(url).filter(|c| c.len() > 3)?;
        Fetcher::new(&self.config, &self.transport)
            .search_by_term(code)
            .await
    }
}
