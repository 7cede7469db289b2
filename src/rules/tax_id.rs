use super::text::digits_only;
use serde::{Deserialize, Serialize};

/// Digit count of an individual taxpayer id (CPF)
pub const CPF_DIGITS: usize = 11;

/// Digit count of a company taxpayer id (CNPJ)
pub const CNPJ_DIGITS: usize = 14;

/// Entity subtype implied by the tax id length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonType {
    Fisica,
    Juridica,
}

impl PersonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonType::Fisica => "fisica",
            PersonType::Juridica => "juridica",
        }
    }
}

/// Result of checking a raw tax id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxId {
    pub digits: String,
    pub person_type: PersonType,
}

/// Classify a tax id by its cleaned digit count.
/// Returns the digit count on failure.
pub fn classify_tax_id(raw: &str) -> Result<TaxId, usize> {
    let digits = digits_only(raw);
    let person_type = match digits.len() {
        CPF_DIGITS => PersonType::Fisica,
        CNPJ_DIGITS => PersonType::Juridica,
        other => return Err(other),
    };
    Ok(TaxId {
        digits,
        person_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpf_is_fisica() {
        let id = classify_tax_id("123.456.789-01").unwrap();
        assert_eq!(id.digits, "12345678901");
        assert_eq!(id.person_type, PersonType::Fisica);
    }

    #[test]
    fn test_cnpj_is_juridica() {
        let id = classify_tax_id("12.345.678/0001-95").unwrap();
        assert_eq!(id.person_type, PersonType::Juridica);
    }

    #[test]
    fn test_other_lengths_fail() {
        assert_eq!(classify_tax_id("1234567890"), Err(10));
        assert_eq!(classify_tax_id(""), Err(0));
    }
}
