use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::http::{Proxy, Transport};
use crate::model::{ProductId, ProductRecord, RecordSource};
use crate::parser;
use crate::parser::api::{ApiItemPayload, SearchPayload};

/// Retrieves a normalized record for an item code, degrading through
/// layers: direct API, API via each proxy, HTML scrape via each proxy,
/// alternate-URL scrape, and finally a synthesized record. No layer
/// failure is fatal; the chain only stops on the first success.
pub struct Fetcher<'a, T: Transport> {
    config: &'a Config,
    transport: &'a T,
}

impl<'a, T: Transport> Fetcher<'a, T> {
    pub fn new(config: &'a Config, transport: &'a T) -> Self {
        Self { config, transport }
    }

    /// Fetch a record for `id`. For a pattern-validated code this always
    /// produces a record — the terminal layer is pure computation. A
    /// guessed code gets the whole network chain but not the synthetic
    /// terminal record; `None` tells the caller the guess led nowhere.
    pub async fn fetch(&self, id: &ProductId) -> Option<ProductRecord> {
        match self.api_direct(&id.code).await {
            Ok(record) => {
                info!("item {} resolved via direct API", id.code);
                return Some(record);
            }
            Err(e) => warn!("direct API failed for {}: {e:#}", id.code),
        }

        match self.api_via_proxies(&id.code).await {
            Ok(record) => {
                info!("item {} resolved via proxied API", id.code);
                return Some(record);
            }
            Err(e) => warn!("proxied API failed for {}: {e:#}", id.code),
        }

        match self.scrape_product_page(&id.code).await {
            Ok(record) => {
                info!("item {} resolved via page scrape", id.code);
                return Some(record);
            }
            Err(e) => warn!("page scrape failed for {}: {e:#}", id.code),
        }

        match self.scrape_alternate_page(&id.code).await {
            Ok(record) => {
                info!("item {} resolved via alternate page scrape", id.code);
                return Some(record);
            }
            Err(e) => warn!("alternate page scrape failed for {}: {e:#}", id.code),
        }

        if id.is_guessed() {
            warn!("guessed id {} never materialized, giving up", id.code);
            return None;
        }

        info!("item {} falling back to synthesized record", id.code);
        Some(parser::basic_record(&id.code))
    }

    /// Layer 1: the vendor item endpoint, no relay.
    async fn api_direct(&self, id_code: &str) -> Result<ProductRecord> {
        let response = self.transport.get(&self.config.item_url(id_code)).await?;
        if !response.is_ok() {
            bail!("status {}", response.status);
        }
        let payload: ApiItemPayload =
            serde_json::from_str(&response.body).context("item payload is not JSON")?;
        if !payload.has_title() {
            bail!("item payload has no title");
        }
        Ok(parser::api::parse(&payload))
    }

    /// Layer 2: the same endpoint relayed through each proxy in turn.
    async fn api_via_proxies(&self, id_code: &str) -> Result<ProductRecord> {
        for proxy in &self.config.proxies {
            match self.api_via_proxy(proxy, id_code).await {
                Ok(record) => return Ok(record),
                Err(e) => warn!("proxy {} failed: {e:#}", proxy.base),
            }
        }
        bail!("every proxy failed")
    }

    async fn api_via_proxy(&self, proxy: &Proxy, id_code: &str) -> Result<ProductRecord> {
        let target = self.config.item_url(id_code);
        let response = self.transport.get(&proxy.wrap(&target)).await?;
        if !response.is_ok() {
            bail!("status {}", response.status);
        }
        let body = proxy
            .unwrap_body(&response.body)
            .context("empty proxy envelope")?;
        let payload: ApiItemPayload =
            serde_json::from_str(&body).context("relayed payload is not JSON")?;
        if !payload.has_title() {
            bail!("relayed payload has no title");
        }
        Ok(parser::api::parse(&payload))
    }

    /// Layer 3: scrape the canonical product page through each proxy.
    async fn scrape_product_page(&self, id_code: &str) -> Result<ProductRecord> {
        let page = self.config.product_page(id_code);
        for proxy in &self.config.proxies {
            match self.scrape_via(proxy, &page, id_code).await {
                Ok(record) => return Ok(record),
                Err(e) => warn!("scrape via {} failed: {e:#}", proxy.base),
            }
        }
        bail!("every proxy failed")
    }

    /// Layer 4: the alternate URL shape for the same code.
    async fn scrape_alternate_page(&self, id_code: &str) -> Result<ProductRecord> {
        let proxy = self.config.proxies.first().context("no proxies configured")?;
        self.scrape_via(proxy, &self.config.alt_product_page(id_code), id_code)
            .await
    }

    async fn scrape_via(&self, proxy: &Proxy, page: &str, id_code: &str) -> Result<ProductRecord> {
        let response = self.transport.get(&proxy.wrap(page)).await?;
        if !response.is_ok() {
            bail!("status {}", response.status);
        }
        let html = proxy
            .unwrap_body(&response.body)
            .context("empty proxy envelope")?;
        let record = parser::html::parse(&html, id_code);
        if record.source != RecordSource::Scraped {
            bail!("page had no extractable product");
        }
        Ok(record)
    }

    /// Search the vendor for a free-form term and build a record from the
    /// first hit. Last pre-error resort for short links no strategy could
    /// resolve into a real code.
    pub async fn search_by_term(&self, term: &str) -> Option<ProductRecord> {
        let response = match self.transport.get(&self.config.search_url(term, 1)).await {
            Ok(r) => r,
            Err(e) => {
                warn!("term search failed: {e}");
                return None;
            }
        };
        if !response.is_ok() {
            return None;
        }
        let payload: SearchPayload = serde_json::from_str(&response.body).ok()?;
        let first = payload.results.into_iter().next()?;
        if first.title.is_none() {
            return None;
        }
        info!("term search hit for {term:?}");
        Some(parser::api::from_search(first))
    }
}
