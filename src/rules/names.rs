use super::text::{collapse_whitespace, fold_diacritics};
use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical number marker written before a size/grade digit
pub const NUMBER_MARKER: &str = "Nº";

/// Shortest word that takes part in token matching
pub const MIN_TOKEN_CHARS: usize = 3;

/// "No.", "N ", "Nr.", "N.", "Nº ", "N° " ... before a digit. A separator is
/// required, so codes such as "N95" are left alone.
static NUMBER_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bN(?:R|O)?(?:\s*[º°ª]|\.[º°ª]?|\s)\s*(\d)").expect("number marker pattern is valid")
});

/// Rewrite every number marker variant to `Nº` followed directly by the digit
pub fn canonicalize_markers(s: &str) -> String {
    NUMBER_MARKER_RE
        .replace_all(s, format!("{}$1", NUMBER_MARKER).as_str())
        .into_owned()
}

/// Comparison key for reference names: uppercase, trimmed, whitespace
/// collapsed, diacritics stripped, number markers canonicalized.
pub fn normalize_name(s: &str) -> String {
    let upper = fold_diacritics(&s.to_uppercase());
    canonicalize_markers(&collapse_whitespace(&upper))
}

/// Display form of a product name: whitespace collapsed and number markers
/// canonicalized, letter case kept.
pub fn canonical_product_name(s: &str) -> String {
    canonicalize_markers(&collapse_whitespace(s))
}

/// Words of at least `MIN_TOKEN_CHARS` characters
pub fn name_tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_variants_collapse() {
        for input in [
            "SEIXO BRITADO N.1",
            "seixo britado n 1",
            "SEIXO BRITADO Nº 1",
            "Seixo  Britado No.1",
            "SEIXO BRITADO Nr. 1",
            "SEIXO BRITADO N° 1",
        ] {
            assert_eq!(normalize_name(input), "SEIXO BRITADO Nº1", "input: {}", input);
        }
    }

    #[test]
    fn test_diacritics_and_spacing() {
        assert_eq!(normalize_name("  Tijolo   cerâmico "), "TIJOLO CERAMICO");
    }

    #[test]
    fn test_words_starting_with_n_untouched() {
        assert_eq!(normalize_name("nome 1"), "NOME 1");
        assert_eq!(normalize_name("ANO 2024"), "ANO 2024");
    }

    #[test]
    fn test_codes_glued_to_n_untouched() {
        assert_eq!(normalize_name("Mascara N95"), "MASCARA N95");
        assert_eq!(canonical_product_name("MASCARA N95"), "MASCARA N95");
        assert_eq!(canonical_product_name("Luva NR10"), "Luva NR10");
        assert_eq!(canonical_product_name("Tubo Nº5"), "Tubo Nº5");
    }

    #[test]
    fn test_canonical_product_name_keeps_case() {
        assert_eq!(canonical_product_name("Brita  n. 2"), "Brita Nº2");
    }

    #[test]
    fn test_tokens() {
        assert_eq!(name_tokens("AREIA DE RIO Nº1"), vec!["AREIA", "RIO", "Nº1"]);
    }
}
