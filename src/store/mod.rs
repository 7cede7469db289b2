mod json_file;
mod types;

pub use json_file::{init_store, JsonFileStore};
pub use types::{
    Customer, NewCustomer, NewProduct, NewSale, Product, Sale, SaleItem, StoreData,
};

use crate::classify::{CustomerReference, ProductReference, ReferenceSnapshot};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Code already in use: {0}")]
    DuplicateCode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for the imported entities
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError>;
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
    async fn list_sales(&self) -> Result<Vec<Sale>, StoreError>;

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError>;
    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError>;
    async fn create_sale(&self, sale: NewSale) -> Result<Sale, StoreError>;
}

/// Load the reference catalog used by classification
pub async fn load_references(store: &dyn EntityStore) -> Result<ReferenceSnapshot, StoreError> {
    let customers = store
        .list_customers()
        .await?
        .into_iter()
        .map(|c| CustomerReference {
            name: c.name,
            cpf_cnpj: c.cpf_cnpj,
        })
        .collect();
    let products = store
        .list_products()
        .await?
        .into_iter()
        .map(|p| ProductReference {
            name: p.name,
            code: p.code,
            unit: p.unit,
        })
        .collect();

    Ok(ReferenceSnapshot {
        customers,
        products,
    })
}
