/// Parse a money or quantity string.
///
/// Accepts `R$` prefixes, Brazilian (`1.234,56`) and international
/// (`1,234.56`) grouping. When both separators occur the last one is the
/// decimal separator; a lone comma is always decimal.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut s: String = raw
        .trim()
        .trim_start_matches("R$")
        .trim_start_matches("r$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if s.is_empty() {
        return None;
    }

    let negative = s.starts_with('-') || (s.starts_with('(') && s.ends_with(')'));
    s = s
        .trim_start_matches('-')
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim_start_matches("R$")
        .to_string();

    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (None, Some(_)) => {
            if s.matches(',').count() > 1 {
                s.replace(',', "")
            } else {
                s.replace(',', ".")
            }
        }
        (Some(_), None) => {
            if s.matches('.').count() > 1 {
                s.replace('.', "")
            } else {
                s
            }
        }
        (None, None) => s,
    };

    if !normalized
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.')
    {
        return None;
    }

    let value: f64 = normalized.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Two-decimal plain representation used for prices
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

/// Plain representation without trailing zeros, used for quantities
pub fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.6}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// True when the text is already a plain decimal (`1234.5`)
pub fn is_plain_decimal(raw: &str) -> bool {
    let s = raw.trim();
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-')
        && s.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brazilian_format() {
        assert_eq!(parse_amount("R$ 1.234,56"), Some(1234.56));
        assert_eq!(parse_amount("12,5"), Some(12.5));
        assert_eq!(parse_amount("1.000.000"), Some(1_000_000.0));
    }

    #[test]
    fn test_international_format() {
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("99.90"), Some(99.9));
    }

    #[test]
    fn test_negative_and_invalid() {
        assert_eq!(parse_amount("-R$ 10,00"), Some(-10.0));
        assert_eq!(parse_amount("(5,00)"), Some(-5.0));
        assert_eq!(parse_amount("dez reais"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_amount(1234.5), "1234.50");
        assert_eq!(format_quantity(3.0), "3");
        assert_eq!(format_quantity(2.5), "2.5");
        assert!(is_plain_decimal("1234.50"));
        assert!(!is_plain_decimal("1.234,50"));
    }
}
