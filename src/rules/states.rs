use super::text::simplify_key;

/// Brazilian federative units: abbreviation and full name
pub const STATES: &[(&str, &str)] = &[
    ("AC", "Acre"),
    ("AL", "Alagoas"),
    ("AP", "Amapá"),
    ("AM", "Amazonas"),
    ("BA", "Bahia"),
    ("CE", "Ceará"),
    ("DF", "Distrito Federal"),
    ("ES", "Espírito Santo"),
    ("GO", "Goiás"),
    ("MA", "Maranhão"),
    ("MT", "Mato Grosso"),
    ("MS", "Mato Grosso do Sul"),
    ("MG", "Minas Gerais"),
    ("PA", "Pará"),
    ("PB", "Paraíba"),
    ("PR", "Paraná"),
    ("PE", "Pernambuco"),
    ("PI", "Piauí"),
    ("RJ", "Rio de Janeiro"),
    ("RN", "Rio Grande do Norte"),
    ("RS", "Rio Grande do Sul"),
    ("RO", "Rondônia"),
    ("RR", "Roraima"),
    ("SC", "Santa Catarina"),
    ("SP", "São Paulo"),
    ("SE", "Sergipe"),
    ("TO", "Tocantins"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateCheck {
    Canonical,
    /// Full name or lowercase abbreviation of a known state
    Abbreviate(&'static str),
    Unknown,
}

pub fn check_state(raw: &str) -> StateCheck {
    let trimmed = raw.trim();
    if STATES.iter().any(|(abbr, _)| *abbr == trimmed) {
        return StateCheck::Canonical;
    }

    let key = simplify_key(trimmed);
    for (abbr, name) in STATES {
        if abbr.to_lowercase() == key || simplify_key(name) == key {
            return StateCheck::Abbreviate(abbr);
        }
    }

    StateCheck::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviation_is_canonical() {
        assert_eq!(check_state("AM"), StateCheck::Canonical);
    }

    #[test]
    fn test_full_names() {
        assert_eq!(check_state("Amazonas"), StateCheck::Abbreviate("AM"));
        assert_eq!(check_state("sao paulo"), StateCheck::Abbreviate("SP"));
        assert_eq!(check_state("Pará"), StateCheck::Abbreviate("PA"));
        assert_eq!(check_state("rj"), StateCheck::Abbreviate("RJ"));
    }

    #[test]
    fn test_unknown_state() {
        assert_eq!(check_state("Atlantis"), StateCheck::Unknown);
    }
}
