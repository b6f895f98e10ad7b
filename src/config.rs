use crate::http::{Proxy, ProxyMode};

/// Endpoints the pipeline talks to. Injected into the resolver and fetcher
/// so tests can point everything at a mock transport; nothing network-shaped
/// is hardcoded inside the strategies.
#[derive(Debug, Clone)]
pub struct Config {
    /// Vendor public JSON API.
    pub api_base: String,
    /// Vendor site id used by the search endpoint (Brazil: `MLB`).
    pub site_id: String,
    /// CORS-bypass relays, tried in order.
    pub proxies: Vec<Proxy>,
    /// Canonical product-page host.
    pub product_base: String,
    /// Alternate product-page host (`produto.` subdomain URL shape).
    pub alt_product_base: String,
    /// Listing host, used only by constructed-URL probing.
    pub list_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "https://api.mercadolibre.com".into(),
            site_id: "MLB".into(),
            proxies: vec![
                Proxy::new("https://api.allorigins.win/get?url=", ProxyMode::JsonEnvelope),
                Proxy::new("https://cors-anywhere.herokuapp.com/", ProxyMode::Prefix),
                Proxy::new("https://corsproxy.io/?", ProxyMode::Prefix),
            ],
            product_base: "https://www.mercadolivre.com.br".into(),
            alt_product_base: "https://produto.mercadolivre.com.br".into(),
            list_base: "https://lista.mercadolivre.com.br".into(),
        }
    }
}

impl Config {
    pub fn item_url(&self, id: &str) -> String {
        format!("{}/items/{}", self.api_base, id)
    }

    pub fn search_url(&self, query: &str, limit: u32) -> String {
        format!(
            "{}/sites/{}/search?q={}&limit={}",
            self.api_base,
            self.site_id,
            urlencoding::encode(query),
            limit
        )
    }

    pub fn product_page(&self, id: &str) -> String {
        format!("{}/p/{}", self.product_base, id)
    }

    pub fn alt_product_page(&self, id: &str) -> String {
        format!("{}/{}", self.alt_product_base, id)
    }
}
