mod common;

use common::{create_test_dir, init_importer_workspace, seed_customer, seed_product};
use import_daemon::item::{ItemStatus, SubjectType};
use import_daemon::session::{SessionError, SessionRegistry, SessionState};
use import_daemon::store::EntityStore;

const CUSTOMERS_CSV: &str = "Nome;CPF/CNPJ;UF\n\
Ana Souza;123.456.789-01;São Paulo\n\
Construtora Alfa;12.345.678/0001-90;SP\n\
Carlos Lima;1234;RJ\n";

#[tokio::test]
async fn test_customer_import_end_to_end() {
    let temp_dir = create_test_dir();
    let workspace = temp_dir.path();
    init_importer_workspace(workspace).await;

    let registry = SessionRegistry::new();
    let store = registry.store_for(workspace).await;
    seed_customer(&store, "001", "Construtora Alfa", "12345678000190").await;

    let session = registry
        .upload(workspace, SubjectType::Customers, "clientes.csv", CUSTOMERS_CSV.as_bytes().to_vec())
        .await
        .expect("Should accept upload");
    assert_eq!(session.state, SessionState::Uploaded);
    assert_eq!(session.row_count(), 3);

    let classified = registry.classify(&session.id).await.expect("Should classify");
    let statuses: Vec<_> = classified.items.iter().map(|i| i.status).collect();
    assert_eq!(
        statuses,
        vec![ItemStatus::NeedsCorrection, ItemStatus::NeedsCorrection, ItemStatus::Error]
    );
    assert_eq!(
        classified.items[1].matched_reference_name.as_deref(),
        Some("Construtora Alfa")
    );

    let fixes = registry.apply_auto_fixes(&session.id).await.unwrap();
    assert_eq!(fixes.len(), 3);

    let summary = registry.commit(&session.id).await.expect("Should commit");
    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped_duplicates, 1);
    assert_eq!(summary.errored, 1);
    assert_eq!(summary.pending_review, 0);

    let customers = store.list_customers().await.unwrap();
    assert_eq!(customers.len(), 2);
    let ana = customers.iter().find(|c| c.name == "Ana Souza").unwrap();
    assert_eq!(ana.code, "002");
    assert_eq!(ana.cpf_cnpj, "12345678901");
    assert_eq!(ana.state.as_deref(), Some("SP"));

    let stored = registry.get(&session.id).await.unwrap();
    assert_eq!(stored.state, SessionState::Committed);
    assert_eq!(stored.last_commit, Some(summary));
}

#[tokio::test]
async fn test_malformed_and_repeated_tax_ids() {
    let temp_dir = create_test_dir();
    let workspace = temp_dir.path();
    init_importer_workspace(workspace).await;

    let csv = "Nome,CPF\nAna Souza,12345678901\nBruno Reis,1234567890\nAna S.,12345678901\n";
    let registry = SessionRegistry::new();
    let session = registry
        .upload(workspace, SubjectType::Customers, "clientes.csv", csv.as_bytes().to_vec())
        .await
        .unwrap();
    let classified = registry.classify(&session.id).await.unwrap();
    assert_eq!(classified.items[1].status, ItemStatus::Error);
    assert!(!classified.items[1].issues[0].can_auto_fix);

    let summary = registry.commit(&session.id).await.unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped_duplicates, 1);
    assert_eq!(summary.errored, 1);
    assert_eq!(summary.message(), "1 created, 1 duplicates skipped, 1 with errors");
}

#[tokio::test]
async fn test_sales_import_creates_missing_customer() {
    let temp_dir = create_test_dir();
    let workspace = temp_dir.path();
    init_importer_workspace(workspace).await;

    let registry = SessionRegistry::new();
    let store = registry.store_for(workspace).await;
    seed_customer(&store, "001", "Construtora Alfa", "12345678000190").await;
    let seixo = seed_product(&store, "001", "SEIXO BRITADO Nº1", "m3", 150.0).await;

    let csv = "Cliente;Produto;Quantidade;Valor unitário;Data\n\
Construtora Alfa;Seixo britado n. 1;2;150,00;05/03/2024\n\
Maria Souza;SEIXO BRITADO Nº1;1;150.00;2024-03-06\n\
Maria Souza;Areia grossa;1;90.00;2024-03-06\n";

    let session = registry
        .upload(workspace, SubjectType::Sales, "vendas.csv", csv.as_bytes().to_vec())
        .await
        .unwrap();
    let classified = registry.classify(&session.id).await.unwrap();

    assert!(classified.items[1].needs_entity_creation);
    assert!(!classified.items[0].needs_entity_creation);
    assert_eq!(classified.items[2].status, ItemStatus::Error);

    registry.apply_auto_fixes(&session.id).await.unwrap();
    let summary = registry.commit(&session.id).await.unwrap();

    assert_eq!(summary.created, 2);
    assert_eq!(summary.customers_auto_created, 1);
    assert_eq!(summary.errored, 1);
    assert!(summary.message().contains("1 customers created automatically"));

    let sales = store.list_sales().await.unwrap();
    assert_eq!(sales.len(), 2);
    assert_eq!(sales[0].number, "001");
    assert_eq!(sales[0].sale_date, "2024-03-05");
    assert_eq!(sales[0].items[0].product_id, seixo.id);
    assert_eq!(sales[0].total, 300.0);

    let customers = store.list_customers().await.unwrap();
    let maria = customers.iter().find(|c| c.name == "Maria Souza").unwrap();
    assert_eq!(maria.code, "002");
    assert_eq!(sales[1].customer_id, maria.id);
}

#[tokio::test]
async fn test_product_codes_fill_gaps() {
    let temp_dir = create_test_dir();
    let workspace = temp_dir.path();
    init_importer_workspace(workspace).await;

    let registry = SessionRegistry::new();
    let store = registry.store_for(workspace).await;
    seed_product(&store, "001", "Cimento", "sc", 35.0).await;
    seed_product(&store, "002", "Cal", "sc", 20.0).await;
    seed_product(&store, "005", "Tijolo", "un", 1.2).await;

    let csv = "Produto;Unidade;Preço\nAreia média;m3;95.00\nBrita 1;m3;110.00\nPedra rachão;t;80.00\n";
    let session = registry
        .upload(workspace, SubjectType::Products, "produtos.csv", csv.as_bytes().to_vec())
        .await
        .unwrap();
    registry.classify(&session.id).await.unwrap();
    let summary = registry.commit(&session.id).await.unwrap();
    assert_eq!(summary.created, 3);

    let products = store.list_products().await.unwrap();
    let codes: Vec<_> = products.iter().skip(3).map(|p| p.code.as_str()).collect();
    assert_eq!(codes, vec!["003", "004", "006"]);
}

#[tokio::test]
async fn test_state_machine() {
    let temp_dir = create_test_dir();
    let workspace = temp_dir.path();
    init_importer_workspace(workspace).await;

    let registry = SessionRegistry::new();
    let session = registry
        .upload(workspace, SubjectType::Customers, "clientes.csv", CUSTOMERS_CSV.as_bytes().to_vec())
        .await
        .unwrap();

    let early = registry.commit(&session.id).await;
    assert!(matches!(early, Err(SessionError::InvalidState { .. })));

    registry.classify(&session.id).await.unwrap();
    // Re-classifying replaces the items
    registry.classify(&session.id).await.unwrap();

    let discarded = registry.discard_items(&session.id, &[3, 99]).await.unwrap();
    assert_eq!(discarded, 1);

    let summary = registry.commit(&session.id).await.unwrap();
    assert_eq!(summary.pending_review, 2);
    assert_eq!(summary.created, 0);

    // Pending rows are counted again until they are fixed
    let again = registry.commit(&session.id).await.unwrap();
    assert_eq!(again.pending_review, 2);
    let reclassify = registry.classify(&session.id).await;
    assert!(matches!(reclassify, Err(SessionError::InvalidState { .. })));
}

#[tokio::test]
async fn test_pending_rows_commit_after_fixes() {
    let temp_dir = create_test_dir();
    let workspace = temp_dir.path();
    init_importer_workspace(workspace).await;

    let registry = SessionRegistry::new();
    let store = registry.store_for(workspace).await;
    let session = registry
        .upload(workspace, SubjectType::Customers, "clientes.csv", CUSTOMERS_CSV.as_bytes().to_vec())
        .await
        .unwrap();
    registry.classify(&session.id).await.unwrap();

    let first = registry.commit(&session.id).await.unwrap();
    assert_eq!(first.message(), "0 created, 1 with errors, 2 awaiting review");

    let fixes = registry.apply_auto_fixes(&session.id).await.unwrap();
    assert_eq!(fixes.len(), 3);
    let second = registry.commit(&session.id).await.unwrap();
    assert_eq!(second.created, 2);
    assert_eq!(second.errored, 1);
    assert_eq!(second.pending_review, 0);

    registry
        .correct_item(&session.id, 3, "cpf_cnpj", "98765432100")
        .await
        .unwrap();
    let third = registry.commit(&session.id).await.unwrap();
    assert_eq!(third.created, 1);
    assert_eq!(third.errored, 0);

    // Nothing is stored twice
    let fourth = registry.commit(&session.id).await.unwrap();
    assert_eq!(fourth.message(), "0 created");
    let customers = store.list_customers().await.unwrap();
    let codes: Vec<_> = customers.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["001", "002", "003"]);

    let edit = registry.correct_item(&session.id, 1, "name", "Ana").await;
    assert!(matches!(edit, Err(SessionError::ItemCommitted(1))));
    assert_eq!(registry.discard_items(&session.id, &[1]).await.unwrap(), 0);

    let stored = registry.get(&session.id).await.unwrap();
    assert_eq!(stored.state, SessionState::Committed);
    assert!(stored.items.iter().all(|i| i.committed));
}

#[tokio::test]
async fn test_manual_correction() {
    let temp_dir = create_test_dir();
    let workspace = temp_dir.path();
    init_importer_workspace(workspace).await;

    let registry = SessionRegistry::new();
    let session = registry
        .upload(workspace, SubjectType::Customers, "clientes.csv", CUSTOMERS_CSV.as_bytes().to_vec())
        .await
        .unwrap();
    registry.classify(&session.id).await.unwrap();

    let item = registry
        .correct_item(&session.id, 3, "cpf_cnpj", "98765432100")
        .await
        .unwrap();
    assert_eq!(item.status, ItemStatus::Ready);

    let missing = registry.correct_item(&session.id, 42, "name", "x").await;
    assert!(matches!(missing, Err(SessionError::ItemNotFound(42))));
}

#[tokio::test]
async fn test_unknown_session() {
    let registry = SessionRegistry::new();
    let result = registry.get("does-not-exist").await;
    assert!(matches!(result, Err(SessionError::NotFound(_))));
}
