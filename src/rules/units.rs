use super::text::simplify_key;

/// Canonical unit followed by the spellings that mean it
pub const UNIT_SYNONYMS: &[(&str, &[&str])] = &[
    ("un", &["unidade", "unidades", "und", "unid", "u", "uni"]),
    ("kg", &["quilo", "quilos", "kilo", "kilos", "quilograma", "quilogramas", "kgs"]),
    ("g", &["grama", "gramas", "gr", "grs"]),
    ("t", &["tonelada", "toneladas", "ton", "tn"]),
    ("m", &["metro", "metros", "mt", "mts"]),
    ("m2", &["metro quadrado", "metros quadrados", "m²", "mq"]),
    ("m3", &["metro cubico", "metros cubicos", "m³", "mc"]),
    ("l", &["litro", "litros", "lt", "lts"]),
    ("ml", &["mililitro", "mililitros"]),
    ("cx", &["caixa", "caixas", "cxs"]),
    ("pc", &["peca", "pecas", "pç", "pcs"]),
    ("sc", &["saco", "sacos", "scs"]),
    ("h", &["hora", "horas", "hr", "hrs"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitCheck {
    /// Already written in canonical form
    Canonical,
    /// Known spelling of a canonical unit
    Synonym(&'static str),
    Unknown,
}

pub fn check_unit(raw: &str) -> UnitCheck {
    let trimmed = raw.trim();
    if UNIT_SYNONYMS.iter().any(|(canonical, _)| *canonical == trimmed) {
        return UnitCheck::Canonical;
    }

    let lowered = trimmed.to_lowercase();
    let key = simplify_key(trimmed);
    for (canonical, synonyms) in UNIT_SYNONYMS {
        if *canonical == key
            || synonyms
                .iter()
                .any(|s| *s == lowered || simplify_key(s) == key)
        {
            return UnitCheck::Synonym(canonical);
        }
    }

    UnitCheck::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_units() {
        assert_eq!(check_unit("kg"), UnitCheck::Canonical);
        assert_eq!(check_unit(" m3 "), UnitCheck::Canonical);
    }

    #[test]
    fn test_synonyms() {
        assert_eq!(check_unit("Metro Cúbico"), UnitCheck::Synonym("m3"));
        assert_eq!(check_unit("M³"), UnitCheck::Synonym("m3"));
        assert_eq!(check_unit("KG"), UnitCheck::Synonym("kg"));
        assert_eq!(check_unit("Peça"), UnitCheck::Synonym("pc"));
        assert_eq!(check_unit("UND"), UnitCheck::Synonym("un"));
    }

    #[test]
    fn test_unknown_unit() {
        assert_eq!(check_unit("balde"), UnitCheck::Unknown);
    }
}
