#![allow(dead_code)]

use async_trait::async_trait;
use import_daemon::store::{
    Customer, EntityStore, JsonFileStore, NewCustomer, NewProduct, NewSale, Product, Sale,
    StoreError,
};
use import_daemon::session::init_workspace;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Initialize .importer/ in the given directory
pub async fn init_importer_workspace(workspace: &Path) {
    init_workspace(workspace)
        .await
        .expect("Failed to initialize workspace");
}

pub async fn seed_customer(store: &JsonFileStore, code: &str, name: &str, cpf_cnpj: &str) -> Customer {
    store
        .create_customer(NewCustomer {
            code: code.to_string(),
            name: name.to_string(),
            cpf_cnpj: cpf_cnpj.to_string(),
            ..Default::default()
        })
        .await
        .expect("Failed to seed customer")
}

pub async fn seed_product(store: &JsonFileStore, code: &str, name: &str, unit: &str, price: f64) -> Product {
    store
        .create_product(NewProduct {
            code: code.to_string(),
            name: name.to_string(),
            unit: unit.to_string(),
            sale_price: price,
            ..Default::default()
        })
        .await
        .expect("Failed to seed product")
}

/// Store wrapper whose Nth create call fails
pub struct FlakyStore<S> {
    inner: S,
    fail_on: usize,
    creates: AtomicUsize,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            creates: AtomicUsize::new(0),
        }
    }

    fn should_fail(&self) -> bool {
        self.creates.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on
    }
}

#[async_trait]
impl<S: EntityStore> EntityStore for FlakyStore<S> {
    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        self.inner.list_customers().await
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        self.inner.list_products().await
    }

    async fn list_sales(&self) -> Result<Vec<Sale>, StoreError> {
        self.inner.list_sales().await
    }

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        if self.should_fail() {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.inner.create_customer(customer).await
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        if self.should_fail() {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.inner.create_product(product).await
    }

    async fn create_sale(&self, sale: NewSale) -> Result<Sale, StoreError> {
        if self.should_fail() {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        self.inner.create_sale(sale).await
    }
}
