// Workbook ingestion (xlsx, xls, xlsb, ods)

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};

use super::types::{CellValue, ParsedSheet, RawRow};
use super::IngestError;
use crate::rules::dates::serial_to_iso;

/// Maximum number of data rows read from a worksheet
const MAX_ROWS: usize = 65536;

/// Parse the first non-empty worksheet of a workbook
pub fn parse_workbook(bytes: &[u8]) -> Result<ParsedSheet, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| IngestError::Unreadable(format!("Failed to open workbook: {}", e)))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(IngestError::EmptyInput);
    }

    for sheet_name in &sheet_names {
        let range = workbook.worksheet_range(sheet_name).map_err(|e| {
            IngestError::Unreadable(format!("Failed to read sheet '{}': {}", sheet_name, e))
        })?;

        let Some(mut sheet) = sheet_from_range(sheet_name, &range) else {
            continue;
        };

        if sheet_names.len() > 1 {
            sheet.warnings.push(format!("Only sheet '{}' was imported", sheet_name));
        }

        return Ok(sheet);
    }

    Err(IngestError::EmptyInput)
}

/// First row is the header; data rows keep their position below it, blank
/// rows included
fn sheet_from_range(sheet_name: &str, range: &Range<Data>) -> Option<ParsedSheet> {
    let (height, width) = range.get_size();
    if height == 0 || width == 0 {
        return None;
    }

    let mut rows = range.rows();
    let header = rows.next()?;

    let columns = super::normalize_headers(header.iter().map(|c| cell_value(c).as_text()));
    let mut sheet = ParsedSheet {
        columns,
        ..Default::default()
    };

    for (index, cells) in rows.enumerate() {
        if sheet.rows.len() >= MAX_ROWS {
            sheet.warnings.push(format!(
                "Sheet '{}' truncated at {} rows",
                sheet_name, MAX_ROWS
            ));
            break;
        }

        let mut row = RawRow::new(index as u32 + 1);
        for (label, cell) in sheet.columns.iter().zip(cells.iter()) {
            row.values.insert(label.clone(), cell_value(cell));
        }

        if !row.is_blank() {
            sheet.rows.push(row);
        }
    }

    Some(sheet)
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => match serial_to_iso(dt.as_f64()) {
            Some(iso) => CellValue::Text(iso),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::Text(s.chars().take(10).collect()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
