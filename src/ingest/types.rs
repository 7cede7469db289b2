use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single untyped spreadsheet cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell as trimmed text. Integral numbers drop the fraction.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Text(s) => s.trim().to_string(),
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

/// One data row of the uploaded file, keyed by original column label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// 1-based position among the data rows
    pub row: u32,
    pub values: BTreeMap<String, CellValue>,
}

impl RawRow {
    pub fn new(row: u32) -> Self {
        Self {
            row,
            values: BTreeMap::new(),
        }
    }

    /// Build a row from (label, text) pairs
    pub fn from_pairs<'a>(row: u32, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), CellValue::from(v)))
            .collect();
        Self { row, values }
    }

    pub fn text(&self, column: &str) -> Option<String> {
        self.values
            .get(column)
            .filter(|v| !v.is_empty())
            .map(CellValue::as_text)
    }

    pub fn is_blank(&self) -> bool {
        self.values.values().all(CellValue::is_empty)
    }
}

/// A parsed spreadsheet
#[derive(Debug, Clone, Default)]
pub struct ParsedSheet {
    /// Header labels in file order
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
    pub warnings: Vec<String>,
}

/// A document forwarded whole to the classifier
#[derive(Debug, Clone)]
pub struct DocumentFile {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// What an upload turned into
#[derive(Debug, Clone)]
pub enum ImportSource {
    Spreadsheet(ParsedSheet),
    Document(DocumentFile),
}

impl ImportSource {
    pub fn rows(&self) -> &[RawRow] {
        match self {
            ImportSource::Spreadsheet(sheet) => &sheet.rows,
            ImportSource::Document(_) => &[],
        }
    }

    pub fn columns(&self) -> &[String] {
        match self {
            ImportSource::Spreadsheet(sheet) => &sheet.columns,
            ImportSource::Document(_) => &[],
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, ImportSource::Document(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_rendering() {
        assert_eq!(CellValue::Number(42.0).as_text(), "42");
        assert_eq!(CellValue::Number(12.5).as_text(), "12.5");
        assert_eq!(CellValue::Text("  abc ".into()).as_text(), "abc");
    }

    #[test]
    fn test_untagged_json_shape() {
        let row = RawRow::from_pairs(1, [("Nome", "Ana"), ("Idade", "")]);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["values"]["Nome"], "Ana");
        assert!(json["values"]["Idade"].is_null());
    }
}
