use std::time::{SystemTime, UNIX_EPOCH};

use url::Url;

use crate::model::{Audience, Category, CtaStyle, ProductRecord};

/// Audience a finished record most likely speaks to, by category.
pub fn detect_audience(record: &ProductRecord) -> Audience {
    match record.category {
        Category::Tecnologia => Audience::Tecnologia,
        Category::Esportes => Audience::Jovens,
        Category::Casa => Audience::Familia,
        Category::Beleza | Category::Roupas | Category::Geral => Audience::Adultos,
    }
}

/// Pick the copy style with the highest expected conversion. Precedence:
/// deep discount, then social proof from ratings, then category defaults,
/// then any discount at all.
pub fn detect_best_cta_style(record: &ProductRecord) -> CtaStyle {
    let has_discount = record.has_discount();

    if has_discount && record.discount_percent() > 20.0 {
        return CtaStyle::Urgencia;
    }
    if record.rating >= 4.5 && record.reviews > 50 {
        return CtaStyle::Social;
    }
    match record.category {
        Category::Tecnologia => return CtaStyle::Beneficios,
        Category::Casa => return CtaStyle::Emocional,
        Category::Beleza | Category::Roupas => return CtaStyle::Social,
        _ => {}
    }
    if has_discount {
        return CtaStyle::Urgencia;
    }
    CtaStyle::Beneficios
}

/// `1234.5` → `1234,50` (pt-BR price formatting for message templates).
fn brl(value: f64) -> String {
    format!("{value:.2}").replace('.', ",")
}

/// WhatsApp-formatted CTA message from the local template set. Template
/// lookup goes category+style, then audience+style, then the default.
pub fn generate_cta(record: &ProductRecord, audience: Audience, style: CtaStyle) -> String {
    match (record.category, style) {
        (Category::Casa, CtaStyle::Urgencia) => casa_urgencia(record),
        (Category::Tecnologia, CtaStyle::Urgencia) => tecnologia_urgencia(record),
        _ => match (audience, style) {
            (Audience::Jovens, CtaStyle::Social) => jovens_social(record),
            (Audience::Familia, CtaStyle::Beneficios) => familia_beneficios(record),
            _ => default_template(record),
        },
    }
}

/// Price block shared by the urgency-flavored templates.
fn price_block(record: &ProductRecord) -> String {
    match record.discount_price {
        Some(discount) if record.has_discount() => format!(
            "💰 ~DE R$ {}~\n🔥 *POR APENAS R$ {}*\n💸 *VOCÊ ECONOMIZA R$ {}!*",
            brl(record.original_price),
            brl(discount),
            brl(record.savings()),
        ),
        _ => format!("💰 *APENAS R$ {}*", brl(record.original_price)),
    }
}

fn discount_badge(record: &ProductRecord) -> String {
    let percent = record.discount_percent();
    if percent > 0.0 {
        format!("*{}% OFF*", percent.round() as i64)
    } else {
        "*PREÇO ESPECIAL*".to_string()
    }
}

fn rating_line(record: &ProductRecord) -> String {
    if record.rating > 0.0 {
        format!(
            "⭐ *{:.1}/5 estrelas* ({}+ avaliações)",
            record.rating, record.reviews
        )
    } else {
        "⭐ Produto bem avaliado".to_string()
    }
}

fn casa_urgencia(record: &ProductRecord) -> String {
    format!(
        "🚨 *OFERTA RELÂMPAGO!* {}\n\n📦 *{}*\n\n{}\n\n✅ Motor potente e durável\n✅ Fácil de usar e limpar\n✅ Garantia oficial do fabricante\n{}\n\n⏰ *ÚLTIMAS UNIDADES DISPONÍVEIS!*\n🚚 *FRETE GRÁTIS* para todo Brasil\n🔒 Compra *100% SEGURA*\n\n👆 *CLIQUE E GARANTA O SEU!*",
        discount_badge(record),
        record.name,
        price_block(record),
        rating_line(record),
    )
}

fn tecnologia_urgencia(record: &ProductRecord) -> String {
    format!(
        "🚨 *ALERTA DE OFERTA!* {}\n\n📱 *{}*\n\n{}\n\n✅ Produto original e lacrado\n✅ Garantia oficial do fabricante\n✅ Entrega rápida e segura\n{}\n\n⏰ *ÚLTIMAS UNIDADES DISPONÍVEIS!*\n🚚 *FRETE GRÁTIS* para todo Brasil\n\n👆 *CLIQUE AGORA E GARANTA O SEU!*",
        discount_badge(record),
        record.name,
        price_block(record),
        rating_line(record),
    )
}

fn jovens_social(record: &ProductRecord) -> String {
    let badge = if record.discount_percent() > 0.0 {
        format!("🔥 *{}% OFF*", record.discount_percent().round() as i64)
    } else {
        String::new()
    };
    format!(
        "🏆 *MAIS VENDIDO!* {}\n\n🛍️ *{}*\n\n⭐ *NOTA {:.1}/5*\n💬 *{}+ pessoas já compraram!*\n\n{}\n\n✅ Entrega super rápida\n✅ Produto 100% original\n✅ Troca grátis em 30 dias\n✅ Pagamento seguro\n\n🔥 *Todo mundo tá comprando!*\n\n👇 *CLICA AÍ E GARANTA O SEU!*",
        badge,
        record.name,
        record.rating,
        record.reviews,
        price_block(record),
    )
}

fn familia_beneficios(record: &ProductRecord) -> String {
    format!(
        "👨‍👩‍👧‍👦 *PERFEITO PARA SUA FAMÍLIA!*\n\n🏠 *{}*\n\n💡 *Por que milhares de famílias escolheram:*\n✅ Qualidade premium comprovada\n✅ *{}+ famílias aprovaram*\n✅ *{:.1} estrelas* de avaliação\n✅ Garantia oficial + Suporte\n\n{}\n\n🚚 *FRETE GRÁTIS* + Entrega rápida\n🔒 Compra *100% PROTEGIDA*\n\n👆 *GARANTA JÁ O SEU!*",
        record.name,
        record.reviews,
        record.rating,
        price_block(record),
    )
}

fn default_template(record: &ProductRecord) -> String {
    format!(
        "🎯 *OPORTUNIDADE IMPERDÍVEL!* {}\n\n📦 *{}*\n\n{}\n📊 *{}+ clientes satisfeitos*\n\n{}\n\n✅ Produto original e garantido\n✅ Frete grátis para todo Brasil\n✅ Compra 100% segura\n✅ Entrega rápida\n\n👆 *CLIQUE E APROVEITE AGORA!*",
        discount_badge(record),
        record.name,
        rating_line(record),
        record.reviews,
        price_block(record),
    )
}

/// Stamp tracking parameters onto the affiliate link. Unparseable input
/// comes back untouched.
pub fn add_utm_params(link: &str, record: &ProductRecord, audience: Audience, style: CtaStyle) -> String {
    let Ok(mut url) = Url::parse(link) else {
        return link.to_string();
    };

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_default();

    url.query_pairs_mut()
        .append_pair("utm_source", "whatsapp")
        .append_pair("utm_medium", "cta_generator")
        .append_pair("utm_campaign", "affiliate_cta")
        .append_pair("utm_content", &format!("{audience}_{style}"))
        .append_pair("utm_term", record.category.as_str())
        .append_pair("cta_version", "2.0")
        .append_pair("product_category", record.category.as_str())
        .append_pair("timestamp", &timestamp);

    url.to_string()
}
