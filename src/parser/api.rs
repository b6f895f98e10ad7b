use serde::{Deserialize, Deserializer};

use super::image::{self, ImageCandidate};
use crate::category;
use crate::model::{ProductRecord, RecordSource};

/// Item payload from the vendor API. Everything past the title is optional
/// in practice, so every field defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ApiItemPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub secure_thumbnail: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    /// Listing health score in [0, 1].
    #[serde(default)]
    pub health: Option<f64>,
    #[serde(default)]
    pub sold_quantity: Option<u32>,
    #[serde(default)]
    pub pictures: Vec<ApiPicture>,
}

impl ApiItemPayload {
    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiPicture {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub secure_url: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    // The API serves dimensions as numbers or "480x480"-style strings
    // depending on the endpoint age.
    #[serde(default, deserialize_with = "dimension")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "dimension")]
    pub height: Option<u32>,
}

fn dimension<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().map(|f| f as u32),
        serde_json::Value::String(s) => {
            let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    })
}

/// Map an API item payload into the normalized record.
pub fn parse(payload: &ApiItemPayload) -> ProductRecord {
    let name = payload
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Produto do MercadoLivre".to_string());

    let (original_price, discount_price) = resolve_prices(payload.price, payload.original_price);

    let candidates: Vec<ImageCandidate> = payload.pictures.iter().map(picture_candidate).collect();
    let image = image::rank(candidates)
        .or_else(|| payload.secure_thumbnail.clone())
        .or_else(|| payload.thumbnail.clone())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| image::MISSING_IMAGE.to_string());

    let cat = payload
        .category_id
        .as_deref()
        .map(category::from_code)
        .unwrap_or(crate::model::Category::Geral);

    let rating = payload
        .health
        .map(|h| (h * 5.0).clamp(0.0, 5.0))
        .unwrap_or(4.0);
    let reviews = payload.sold_quantity.unwrap_or(0);

    let description = super::clean_description(
        payload
            .subtitle
            .as_deref()
            .unwrap_or_else(|| payload.title.as_deref().unwrap_or("")),
    );

    ProductRecord {
        name,
        original_price,
        discount_price,
        image,
        category: cat,
        description,
        rating,
        reviews,
        affiliate_link: String::new(),
        source: RecordSource::Api,
    }
}

/// Current/original price disambiguation. A discount only exists when the
/// original is strictly above the current price; with no usable price at
/// all, a nominal placeholder keeps discount-percentage math away from zero.
fn resolve_prices(price: Option<f64>, original_price: Option<f64>) -> (f64, Option<f64>) {
    let current = price.filter(|p| *p > 0.0);
    let original = original_price.filter(|p| *p > 0.0);
    match (original, current) {
        (Some(op), Some(cp)) if op > cp => (op, Some(cp)),
        (Some(_), Some(cp)) => (cp, None),
        (Some(op), None) => (op, None),
        (None, Some(cp)) => (cp, None),
        (None, None) => (99.99, None),
    }
}

fn picture_candidate(picture: &ApiPicture) -> ImageCandidate {
    let url = picture
        .secure_url
        .as_deref()
        .or(picture.url.as_deref())
        .unwrap_or("")
        .trim()
        .replacen("http:", "https:", 1);
    let (mut width, mut height) = (
        picture.width.unwrap_or(0),
        picture.height.unwrap_or(0),
    );
    if width == 0 || height == 0 {
        let (w, h) = image::dimensions_from_url(&url);
        width = w;
        height = h;
    }
    ImageCandidate {
        url,
        size_tag: picture.size.clone().unwrap_or_default().to_uppercase(),
        width,
        height,
    }
}

// ── Search payloads ──

#[derive(Debug, Default, Deserialize)]
pub struct SearchPayload {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub secure_thumbnail: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
}

/// Build a record from a search hit; used when a short code can only be
/// matched by querying it as a term.
pub fn from_search(result: SearchResult) -> ProductRecord {
    let name = result
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Produto não identificado".to_string());

    let (original_price, discount_price) = resolve_prices(result.price, result.original_price);

    let image = result
        .thumbnail
        .or(result.secure_thumbnail)
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| image::MISSING_IMAGE.to_string());

    let cat = result
        .category_id
        .as_deref()
        .map(category::from_code)
        .unwrap_or(crate::model::Category::Geral);

    ProductRecord {
        description: super::clean_description(&name),
        name,
        original_price,
        discount_price,
        image,
        category: cat,
        rating: 4.0,
        reviews: 100,
        affiliate_link: String::new(),
        source: RecordSource::Search,
    }
}
