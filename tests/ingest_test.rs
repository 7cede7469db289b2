use import_daemon::ingest::{parse_spreadsheet, ImportSource, IngestError};

#[test]
fn test_semicolon_csv_with_latin1_bytes() {
    // "Preço" and "Pão" encoded as Windows-1252
    let bytes = b"Produto;Pre\xe7o\nP\xe3o;1,50\n\n".to_vec();
    let sheet = parse_spreadsheet("produtos.csv", &bytes).unwrap();

    assert_eq!(sheet.columns, vec!["Produto", "Preço"]);
    assert_eq!(sheet.rows.len(), 1);
    assert_eq!(sheet.rows[0].row, 1);
    assert_eq!(sheet.rows[0].text("Produto").as_deref(), Some("Pão"));
    assert_eq!(sheet.rows[0].text("Preço").as_deref(), Some("1,50"));
}

#[test]
fn test_header_only_file_is_empty() {
    let result = parse_spreadsheet("vazio.csv", b"Nome,CPF\n");
    assert!(matches!(result, Err(IngestError::EmptyInput)));
}

#[test]
fn test_documents_are_forwarded() {
    let source = ImportSource::from_upload("pedido.PDF", b"%PDF-1.4".to_vec(), 1024).unwrap();
    match source {
        ImportSource::Document(document) => {
            assert_eq!(document.media_type, "application/pdf");
            assert_eq!(document.bytes, b"%PDF-1.4");
        }
        ImportSource::Spreadsheet(_) => panic!("expected a document"),
    }
}

#[test]
fn test_upload_guards() {
    let unsupported = ImportSource::from_upload("notes.docx", b"abc".to_vec(), 1024);
    assert!(matches!(unsupported, Err(IngestError::UnsupportedFormat(_))));

    let too_large = ImportSource::from_upload("big.csv", vec![b'a'; 2048], 1024);
    assert!(matches!(too_large, Err(IngestError::TooLarge(2048, 1024))));
}
