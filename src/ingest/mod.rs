//! Upload ingestion.
//!
//! Spreadsheet uploads are parsed into [`RawRow`]s keyed by their header
//! labels. Document uploads are not parsed locally; their bytes travel to the
//! classifier, which performs the extraction.

mod delimited;
mod types;
mod xlsx;

pub use types::{CellValue, DocumentFile, ImportSource, ParsedSheet, RawRow};

use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("The file contains no data rows")]
    EmptyInput,

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("File is too large ({0} bytes, limit {1})")]
    TooLarge(usize, usize),

    #[error("Could not read file: {0}")]
    Unreadable(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Kind of upload, decided by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Delimited,
    Workbook,
    Document(&'static str),
}

impl FileKind {
    pub fn from_file_name(file_name: &str) -> Result<Self, IngestError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" | "tsv" | "txt" => Ok(FileKind::Delimited),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(FileKind::Workbook),
            "pdf" => Ok(FileKind::Document("application/pdf")),
            "png" => Ok(FileKind::Document("image/png")),
            "jpg" | "jpeg" => Ok(FileKind::Document("image/jpeg")),
            "webp" => Ok(FileKind::Document("image/webp")),
            _ => Err(IngestError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// Parse a spreadsheet upload. Zero data rows is an error.
pub fn parse_spreadsheet(file_name: &str, bytes: &[u8]) -> Result<ParsedSheet, IngestError> {
    let sheet = match FileKind::from_file_name(file_name)? {
        FileKind::Delimited => delimited::parse_delimited(bytes)?,
        FileKind::Workbook => xlsx::parse_workbook(bytes)?,
        FileKind::Document(_) => {
            return Err(IngestError::UnsupportedFormat(format!(
                "{} is a document, not a spreadsheet",
                file_name
            )))
        }
    };

    if sheet.rows.is_empty() {
        return Err(IngestError::EmptyInput);
    }

    info!(
        file = %file_name,
        rows = sheet.rows.len(),
        columns = sheet.columns.len(),
        "Parsed spreadsheet"
    );

    Ok(sheet)
}

impl ImportSource {
    /// Turn an upload into rows or a forwarded document
    pub fn from_upload(
        file_name: &str,
        bytes: Vec<u8>,
        max_bytes: usize,
    ) -> Result<Self, IngestError> {
        if bytes.len() > max_bytes {
            return Err(IngestError::TooLarge(bytes.len(), max_bytes));
        }
        if bytes.is_empty() {
            return Err(IngestError::EmptyInput);
        }

        match FileKind::from_file_name(file_name)? {
            FileKind::Document(media_type) => Ok(ImportSource::Document(DocumentFile {
                file_name: file_name.to_string(),
                media_type: media_type.to_string(),
                bytes,
            })),
            _ => Ok(ImportSource::Spreadsheet(parse_spreadsheet(file_name, &bytes)?)),
        }
    }
}

/// Trim header labels and make them unique and non-empty
fn normalize_headers(labels: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for (index, label) in labels.enumerate() {
        let base = match label.trim() {
            "" => format!("Column {}", index + 1),
            trimmed => trimmed.to_string(),
        };

        let mut candidate = base.clone();
        let mut suffix = 2;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{} ({})", base, suffix);
            suffix += 1;
        }
        columns.push(candidate);
    }

    columns
}
