pub mod api;
pub mod html;
pub mod image;

use crate::category;
use crate::model::{ProductRecord, RecordSource};

/// Terminal fallback: a minimal record built from the identifier alone,
/// used when every real data source failed. The category guess comes from
/// the code's numeric range and decides only which placeholder is shown.
pub fn basic_record(id_code: &str) -> ProductRecord {
    let profile = category::synth_profile(id_code);
    ProductRecord {
        description: format!(
            "{} disponível no MercadoLivre com entrega rápida e segura.",
            profile.name
        ),
        name: profile.name,
        original_price: 99.99,
        discount_price: None,
        image: profile.image.to_string(),
        category: profile.category,
        rating: 4.2,
        reviews: 150,
        affiliate_link: String::new(),
        source: RecordSource::Synthesized,
    }
}

/// Collapse whitespace and cap length for display contexts.
pub(crate) fn clean_description(text: &str) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return "Produto disponível no MercadoLivre".to_string();
    }
    if cleaned.chars().count() > 200 {
        let truncated: String = cleaned.chars().take(200).collect();
        format!("{truncated}...")
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    #[test]
    fn basic_record_is_complete() {
        let record = basic_record("MLB2456789012");
        assert_eq!(record.source, RecordSource::Synthesized);
        assert_eq!(record.category, Category::Tecnologia);
        assert!(!record.image.is_empty());
        assert!(record.original_price > 0.0);
        assert!(record.discount_price.is_none());
    }

    #[test]
    fn description_is_collapsed_and_capped() {
        assert_eq!(clean_description("a  b\n\nc"), "a b c");
        assert_eq!(clean_description(""), "Produto disponível no MercadoLivre");
        let long = "x".repeat(300);
        let cleaned = clean_description(&long);
        assert_eq!(cleaned.chars().count(), 203);
        assert!(cleaned.ends_with("..."));
    }
}
