use crate::model::Category;

/// Keyword table for name-based inference. Order is significant: the first
/// category with a matching keyword wins.
const KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Tecnologia,
        &[
            "smartphone",
            "celular",
            "tablet",
            "notebook",
            "computador",
            "tv",
            "smart",
            "android",
            "ios",
            "samsung",
            "apple",
            "xiaomi",
            "iphone",
        ],
    ),
    (
        Category::Casa,
        &[
            "liquidificador",
            "geladeira",
            "fogão",
            "micro-ondas",
            "air fryer",
            "panela",
            "cozinha",
            "casa",
            "lar",
            "móvel",
            "decoração",
        ],
    ),
    (
        Category::Esportes,
        &[
            "tênis", "sapato", "esporte", "corrida", "academia", "fitness", "nike", "adidas",
            "puma",
        ],
    ),
    (
        Category::Beleza,
        &[
            "perfume",
            "maquiagem",
            "cabelo",
            "pele",
            "beleza",
            "cosmético",
            "shampoo",
        ],
    ),
    (
        Category::Roupas,
        &["roupa", "camisa", "calça", "vestido", "blusa", "shorts", "jeans"],
    ),
];

/// Infer a category from a product name by keyword.
pub fn from_name(name: &str) -> Category {
    let lower = name.to_lowercase();
    for (category, words) in KEYWORDS {
        if words.iter().any(|w| lower.contains(w)) {
            return *category;
        }
    }
    Category::Geral
}

/// Map a vendor category code to the internal tag set.
pub fn from_code(code: &str) -> Category {
    match code {
        "MLA1051" | "MLA1648" | "MLA1144" => Category::Tecnologia,
        "MLA1039" | "MLA1071" | "MLA1182" => Category::Casa,
        "MLA1276" => Category::Esportes,
        "MLA1430" => Category::Roupas,
        "MLA1246" => Category::Beleza,
        _ => Category::Geral,
    }
}

/// Skeleton of a synthesized record for an identifier nothing answered for.
#[derive(Debug)]
pub struct SynthProfile {
    pub category: Category,
    pub name: String,
    pub image: &'static str,
}

/// Coarse category guess from the numeric range of an item code. This is a
/// heuristic of last resort, not a reliable signal; it only decides which
/// placeholder the synthesized record carries.
pub fn synth_profile(id_code: &str) -> SynthProfile {
    let numeric: u64 = id_code
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .unwrap_or(0);

    if numeric > 3_000_000_000 {
        SynthProfile {
            category: Category::Casa,
            name: "Produto para Casa e Cozinha".into(),
            image: "https://images.unsplash.com/photo-1556909114-f6e7ad7d3136?w=400&h=300&fit=crop",
        }
    } else if numeric > 2_000_000_000 {
        SynthProfile {
            category: Category::Tecnologia,
            name: "Produto de Tecnologia".into(),
            image: "https://images.unsplash.com/photo-1511707171634-5f897ff02aa9?w=400&h=300&fit=crop",
        }
    } else if numeric > 1_000_000_000 {
        SynthProfile {
            category: Category::Roupas,
            name: "Produto de Moda e Vestuário".into(),
            image: "https://images.unsplash.com/photo-1542291026-7eec264c27ff?w=400&h=300&fit=crop",
        }
    } else {
        SynthProfile {
            category: Category::Geral,
            name: format!("Produto {id_code}"),
            image: "https://images.unsplash.com/photo-1556742049-0cfed4f6a45d?w=400&h=300&fit=crop",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smartphone_is_tecnologia() {
        assert_eq!(from_name("Smartphone X 128GB"), Category::Tecnologia);
    }

    #[test]
    fn liquidificador_is_casa() {
        assert_eq!(from_name("Liquidificador Turbo 900W"), Category::Casa);
    }

    #[test]
    fn keyword_order_decides_ties() {
        // "smart" (tecnologia) appears before any casa keyword is checked.
        assert_eq!(from_name("Smart panela elétrica"), Category::Tecnologia);
    }

    #[test]
    fn unknown_name_is_geral() {
        assert_eq!(from_name("Coisa indefinida"), Category::Geral);
    }

    #[test]
    fn code_map_defaults_to_geral() {
        assert_eq!(from_code("MLA1051"), Category::Tecnologia);
        assert_eq!(from_code("MLA1246"), Category::Beleza);
        assert_eq!(from_code("ZZZ999"), Category::Geral);
    }

    #[test]
    fn id_ranges_pick_placeholder_category() {
        assert_eq!(synth_profile("MLB3456789012").category, Category::Casa);
        assert_eq!(synth_profile("MLB2456789012").category, Category::Tecnologia);
        assert_eq!(synth_profile("MLB1456789012").category, Category::Roupas);
        assert_eq!(synth_profile("MLB0456789012").category, Category::Geral);
        assert_eq!(synth_profile("MLBABC").category, Category::Geral);
    }
}
