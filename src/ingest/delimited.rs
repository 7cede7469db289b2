// Delimited text ingestion (CSV/TSV)

use super::types::{CellValue, ParsedSheet, RawRow};
use super::IngestError;

/// Parse delimited text into rows keyed by header label.
///
/// Rows are numbered by their position below the header, counting blank
/// lines, so ordinals point at the operator's spreadsheet line.
pub fn parse_delimited(bytes: &[u8]) -> Result<ParsedSheet, IngestError> {
    let content = normalize_line_endings(decode_text(bytes));
    let delimiter = sniff_delimiter(&content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut record = csv::StringRecord::new();
    loop {
        if !reader.read_record(&mut record)? {
            return Err(IngestError::EmptyInput);
        }
        if record.iter().any(|f| !f.trim().is_empty()) {
            break;
        }
    }

    let columns = super::normalize_headers(record.iter().map(|h| h.to_string()));
    let mut sheet = ParsedSheet {
        columns,
        ..Default::default()
    };

    let mut ordinal = 0u32;
    let mut line = reader.position().line();
    while reader.read_record(&mut record)? {
        // Empty lines are dropped by the reader but still take up a row
        let next_line = reader.position().line();
        let embedded: u64 = record.iter().map(|f| f.matches('\n').count() as u64).sum();
        let skipped = (next_line - line).saturating_sub(embedded + 1);
        line = next_line;
        ordinal += 1 + skipped as u32;

        if record.len() > sheet.columns.len() {
            sheet.warnings.push(format!(
                "Row {} has {} fields, extra values after column {} were ignored",
                ordinal,
                record.len(),
                sheet.columns.len()
            ));
        }

        let mut row = RawRow::new(ordinal);
        for (label, field) in sheet.columns.iter().zip(record.iter()) {
            row.values.insert(label.clone(), CellValue::from(field));
        }

        if !row.is_blank() {
            sheet.rows.push(row);
        }
    }

    Ok(sheet)
}

/// Decode bytes as UTF-8, falling back to Windows-1252 (common for Excel-exported CSVs)
fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Use "\n" everywhere and terminate the last record, so every record
/// consumes exactly its own lines
fn normalize_line_endings(mut text: String) -> String {
    if text.contains('\r') {
        text = text.replace("\r\n", "\n").replace('\r', "\n");
    }
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must split the header line to be viable
        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_semicolon() {
        let content = "Nome;CPF;Cidade\nAna;123;Manaus\nBia;456;Belém\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_default() {
        assert_eq!(sniff_delimiter("single\nvalue\n"), b',');
    }

    #[test]
    fn test_parse_skips_blank_rows() {
        let sheet = parse_delimited(b"Nome,Valor\nA,1\n,\nB,2\n").unwrap();
        assert_eq!(sheet.columns, vec!["Nome", "Valor"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1].row, 3);
        assert_eq!(sheet.rows[1].text("Nome").as_deref(), Some("B"));
    }

    #[test]
    fn test_row_numbers_count_empty_lines() {
        let sheet = parse_delimited(b"Nome;Valor\r\nA;1\r\n\r\n\r\nB;2").unwrap();
        let rows: Vec<_> = sheet.rows.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![1, 4]);
    }

    #[test]
    fn test_quoted_line_break_is_one_row() {
        let sheet = parse_delimited(b"Nome,Obs\nA,\"linha 1\nlinha 2\"\nB,ok\n").unwrap();
        let rows: Vec<_> = sheet.rows.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![1, 2]);
        assert_eq!(sheet.rows[0].text("Obs").as_deref(), Some("linha 1\nlinha 2"));
    }

    #[test]
    fn test_parse_windows_1252() {
        // "Endereço" with ç encoded as 0xE7
        let bytes = b"Nome;Endere\xE7o\nAna;Rua A\n";
        let sheet = parse_delimited(bytes).unwrap();
        assert_eq!(sheet.columns[1], "Endereço");
    }

    #[test]
    fn test_header_only_is_empty() {
        let sheet = parse_delimited(b"Nome,Valor\n").unwrap();
        assert!(sheet.rows.is_empty());
    }
}
