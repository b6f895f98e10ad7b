use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Normalized product record produced by every layer of the pipeline.
///
/// `affiliate_link` starts empty and is stamped once with the caller's
/// original URL after a fetch succeeds; parsers never touch it.
#[derive(Debug, Clone, Serialize)]
pub struct ProductRecord {
    pub name: String,
    pub original_price: f64,
    /// Present only when strictly below `original_price`.
    pub discount_price: Option<f64>,
    /// Always a non-empty absolute URL; placeholder when nothing resolved.
    pub image: String,
    pub category: Category,
    pub description: String,
    /// In [0, 5]; 4.0 when the source carried nothing usable.
    pub rating: f64,
    pub reviews: u32,
    pub affiliate_link: String,
    pub source: RecordSource,
}

impl ProductRecord {
    pub fn has_discount(&self) -> bool {
        self.discount_price
            .is_some_and(|d| d > 0.0 && d < self.original_price)
    }

    /// Discount as a percentage of the original price; 0.0 without one.
    pub fn discount_percent(&self) -> f64 {
        match self.discount_price {
            Some(d) if self.has_discount() => {
                (self.original_price - d) / self.original_price * 100.0
            }
            _ => 0.0,
        }
    }

    pub fn savings(&self) -> f64 {
        match self.discount_price {
            Some(d) if self.has_discount() => self.original_price - d,
            _ => 0.0,
        }
    }
}

/// Where a record's data actually came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    /// The vendor item API (directly or through a proxy).
    Api,
    /// A vendor search result, matched by term.
    Search,
    /// Scraped out of product-page HTML.
    Scraped,
    /// Built from the identifier alone; no real data source answered.
    Synthesized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tecnologia,
    Casa,
    Esportes,
    Beleza,
    Roupas,
    Geral,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tecnologia => "tecnologia",
            Category::Casa => "casa",
            Category::Esportes => "esportes",
            Category::Beleza => "beleza",
            Category::Roupas => "roupas",
            Category::Geral => "geral",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much the identifier extractor trusts a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Matched a known URL pattern and validated against the item-code shape.
    Certain,
    /// Synthesized from a shortened-link path segment; may not exist.
    Guessed,
}

/// A vendor item code plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductId {
    pub code: String,
    pub confidence: Confidence,
}

impl ProductId {
    pub fn certain(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            confidence: Confidence::Certain,
        }
    }

    pub fn guessed(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            confidence: Confidence::Guessed,
        }
    }

    pub fn is_guessed(&self) -> bool {
        self.confidence == Confidence::Guessed
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

/// Target audience a CTA message is shaped for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Jovens,
    Adultos,
    Familia,
    Tecnologia,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Jovens => "jovens",
            Audience::Adultos => "adultos",
            Audience::Familia => "familia",
            Audience::Tecnologia => "tecnologia",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jovens" => Ok(Audience::Jovens),
            "adultos" => Ok(Audience::Adultos),
            "familia" => Ok(Audience::Familia),
            "tecnologia" => Ok(Audience::Tecnologia),
            other => Err(format!("unknown audience: {other}")),
        }
    }
}

/// Copy style for a CTA message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CtaStyle {
    Urgencia,
    Beneficios,
    Social,
    Emocional,
}

impl CtaStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            CtaStyle::Urgencia => "urgencia",
            CtaStyle::Beneficios => "beneficios",
            CtaStyle::Social => "social",
            CtaStyle::Emocional => "emocional",
        }
    }
}

impl fmt::Display for CtaStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CtaStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "urgencia" => Ok(CtaStyle::Urgencia),
            "beneficios" => Ok(CtaStyle::Beneficios),
            "social" => Ok(CtaStyle::Social),
            "emocional" => Ok(CtaStyle::Emocional),
            other => Err(format!("unknown CTA style: {other}")),
        }
    }
}
