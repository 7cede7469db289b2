mod common;

use common::{create_test_dir, seed_product, FlakyStore};
use import_daemon::classify::{classify_row, ReferenceSnapshot};
use import_daemon::ingest::RawRow;
use import_daemon::item::{ColumnMapping, ItemStatus, SubjectType};
use import_daemon::reconciliation::{commit_items, CommitContext};
use import_daemon::store::{load_references, EntityStore, JsonFileStore};

fn customer_mapping() -> Vec<ColumnMapping> {
    [("Nome", "name"), ("Documento", "cpf_cnpj")]
        .iter()
        .map(|(source, field)| ColumnMapping {
            source_column: source.to_string(),
            canonical_field: field.to_string(),
            confidence: 1.0,
        })
        .collect()
}

#[tokio::test]
async fn test_commit_continues_past_failing_row() {
    let temp_dir = create_test_dir();
    let store = FlakyStore::new(JsonFileStore::for_workspace(temp_dir.path()), 3);

    let mapping = customer_mapping();
    let refs = ReferenceSnapshot::default();
    let mut items: Vec<_> = (1..=5u32)
        .map(|row| {
            let tax_id = format!("1234567890{}", row);
            let name = format!("Cliente {}", row);
            classify_row(
                SubjectType::Customers,
                &RawRow::from_pairs(row, [("Nome", name.as_str()), ("Documento", tax_id.as_str())]),
                &mapping,
                &refs,
            )
        })
        .collect();
    assert!(items.iter().all(|i| i.status == ItemStatus::Ready));

    let mut ctx = CommitContext::load(&store, 3).await.unwrap();
    let summary = commit_items(&store, &mut ctx, SubjectType::Customers, &mut items).await;

    assert_eq!(summary.created, 4);
    assert_eq!(summary.errored, 1);
    assert_eq!(summary.failed_rows.len(), 1);
    assert_eq!(summary.failed_rows[0].row, 3);

    let customers = store.list_customers().await.unwrap();
    let codes: Vec<_> = customers.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["001", "002", "003", "004"]);

    // Only the failed row is attempted again
    let committed: Vec<_> = items.iter().filter(|i| i.committed).map(|i| i.row).collect();
    assert_eq!(committed, vec![1, 2, 4, 5]);
    let retry = commit_items(&store, &mut ctx, SubjectType::Customers, &mut items).await;
    assert_eq!(retry.created, 1);
    assert_eq!(retry.errored, 0);
    assert!(items.iter().all(|i| i.committed));
    assert_eq!(store.list_customers().await.unwrap()[4].code, "005");
}

#[tokio::test]
async fn test_rows_are_committed_in_row_order() {
    let temp_dir = create_test_dir();
    let store = JsonFileStore::for_workspace(temp_dir.path());

    let mapping = customer_mapping();
    let refs = ReferenceSnapshot::default();
    let mut items: Vec<_> = [(2u32, "Bruno", "22222222222"), (1, "Alice", "11111111111")]
        .iter()
        .map(|(row, name, tax_id)| {
            classify_row(
                SubjectType::Customers,
                &RawRow::from_pairs(*row, [("Nome", *name), ("Documento", *tax_id)]),
                &mapping,
                &refs,
            )
        })
        .collect();
    // Same tax id as row 1: a duplicate within the batch
    items.push(classify_row(
        SubjectType::Customers,
        &RawRow::from_pairs(3, [("Nome", "Alice S."), ("Documento", "11111111111")]),
        &mapping,
        &refs,
    ));

    let mut ctx = CommitContext::load(&store, 3).await.unwrap();
    let summary = commit_items(&store, &mut ctx, SubjectType::Customers, &mut items).await;
    assert_eq!(summary.created, 2);
    assert_eq!(summary.skipped_duplicates, 1);

    let customers = store.list_customers().await.unwrap();
    assert_eq!(customers[0].name, "Alice");
    assert_eq!(customers[0].code, "001");
    assert_eq!(customers[1].name, "Bruno");
}

#[tokio::test]
async fn test_failed_sale_still_reports_created_customer() {
    let temp_dir = create_test_dir();
    let inner = JsonFileStore::for_workspace(temp_dir.path());
    seed_product(&inner, "001", "AREIA MEDIA", "m3", 10.0).await;
    // First create is the new customer, the second (the sale) fails
    let store = FlakyStore::new(inner, 2);

    let mapping: Vec<ColumnMapping> = [
        ("Cliente", "customer_name"),
        ("Produto", "product_name"),
        ("Qtd", "quantity"),
        ("Valor", "unit_price"),
        ("Data", "sale_date"),
    ]
    .iter()
    .map(|(source, field)| ColumnMapping {
        source_column: source.to_string(),
        canonical_field: field.to_string(),
        confidence: 1.0,
    })
    .collect();
    let refs = load_references(&store).await.unwrap();
    let item = classify_row(
        SubjectType::Sales,
        &RawRow::from_pairs(
            1,
            [
                ("Cliente", "Maria"),
                ("Produto", "AREIA MEDIA"),
                ("Qtd", "2"),
                ("Valor", "10.00"),
                ("Data", "2024-03-05"),
            ],
        ),
        &mapping,
        &refs,
    );
    assert_eq!(item.status, ItemStatus::Ready);
    assert!(item.needs_entity_creation);

    let mut ctx = CommitContext::load(&store, 3).await.unwrap();
    let summary = commit_items(&store, &mut ctx, SubjectType::Sales, &mut [item]).await;

    assert_eq!(summary.created, 0);
    assert_eq!(summary.errored, 1);
    assert_eq!(summary.customers_auto_created, 1);
    assert_eq!(summary.failed_rows[0].row, 1);
    assert_eq!(
        summary.message(),
        "0 created, 1 customers created automatically, 1 with errors"
    );

    let customers = store.list_customers().await.unwrap();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].name, "Maria");
    assert!(store.list_sales().await.unwrap().is_empty());
}
