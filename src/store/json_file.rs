use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::types::{Customer, NewCustomer, NewProduct, NewSale, Product, Sale, StoreData};
use super::{EntityStore, StoreError};
use crate::utils::{get_store_path, now_iso};

/// Entity store kept in `.importer/store.json` inside a workspace
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn for_workspace(workspace_path: &Path) -> Self {
        Self::new(get_store_path(workspace_path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_unlocked(&self) -> Result<StoreData, StoreError> {
        if !self.path.exists() {
            return Ok(StoreData::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        let data: StoreData = serde_json::from_str(&content)?;
        Ok(data)
    }

    /// Write without acquiring the lock (caller must hold it)
    async fn write_unlocked(&self, data: &StoreData) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write atomically using temp file + rename
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(data)?;
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }

    /// Read-modify-write under the store lock
    async fn update<T, F>(&self, mutate: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut StoreData) -> Result<T, StoreError> + Send,
        T: Send,
    {
        let _guard = self.lock.lock().await;
        let mut data = self.read_unlocked().await?;
        let result = mutate(&mut data)?;
        data.updated_at = now_iso();
        self.write_unlocked(&data).await?;
        Ok(result)
    }
}

/// Create an empty store file if none exists
pub async fn init_store(workspace_path: &Path) -> Result<bool, StoreError> {
    let store = JsonFileStore::for_workspace(workspace_path);
    if store.path.exists() {
        return Ok(false);
    }
    let _guard = store.lock.lock().await;
    store.write_unlocked(&StoreData::new()).await?;
    Ok(true)
}

#[async_trait]
impl EntityStore for JsonFileStore {
    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_unlocked().await?.customers)
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_unlocked().await?.products)
    }

    async fn list_sales(&self) -> Result<Vec<Sale>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_unlocked().await?.sales)
    }

    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        self.update(move |data| {
            if data.customers.iter().any(|c| c.code == customer.code) {
                return Err(StoreError::DuplicateCode(customer.code));
            }
            let created = Customer {
                id: uuid::Uuid::new_v4().to_string(),
                code: customer.code,
                name: customer.name,
                cpf_cnpj: customer.cpf_cnpj,
                person_type: customer.person_type,
                email: customer.email,
                phone: customer.phone,
                address: customer.address,
                city: customer.city,
                state: customer.state,
                zip_code: customer.zip_code,
                created_at: now_iso(),
            };
            debug!(code = %created.code, "Customer stored");
            data.customers.push(created.clone());
            Ok(created)
        })
        .await
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        self.update(move |data| {
            if data.products.iter().any(|p| p.code == product.code) {
                return Err(StoreError::DuplicateCode(product.code));
            }
            let created = Product {
                id: uuid::Uuid::new_v4().to_string(),
                code: product.code,
                name: product.name,
                unit: product.unit,
                sale_price: product.sale_price,
                cost_price: product.cost_price,
                category: product.category,
                created_at: now_iso(),
            };
            debug!(code = %created.code, "Product stored");
            data.products.push(created.clone());
            Ok(created)
        })
        .await
    }

    async fn create_sale(&self, sale: NewSale) -> Result<Sale, StoreError> {
        self.update(move |data| {
            if !data.customers.iter().any(|c| c.id == sale.customer_id) {
                return Err(StoreError::NotFound(format!("customer {}", sale.customer_id)));
            }
            if let Some(missing) = sale
                .items
                .iter()
                .find(|i| !data.products.iter().any(|p| p.id == i.product_id))
            {
                return Err(StoreError::NotFound(format!("product {}", missing.product_id)));
            }
            let total = sale.total();
            let created = Sale {
                id: uuid::Uuid::new_v4().to_string(),
                number: sale.number,
                customer_id: sale.customer_id,
                sale_date: sale.sale_date,
                items: sale.items,
                total,
                created_at: now_iso(),
            };
            debug!(number = %created.number, "Sale stored");
            data.sales.push(created.clone());
            Ok(created)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SaleItem;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::for_workspace(temp.path());
        assert!(store.list_customers().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_create_persists_and_rejects_duplicate_code() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::for_workspace(temp.path());

        let customer = NewCustomer {
            code: "001".to_string(),
            name: "Ana".to_string(),
            cpf_cnpj: "12345678901".to_string(),
            ..Default::default()
        };
        let created = store.create_customer(customer.clone()).await.unwrap();
        assert!(!created.id.is_empty());

        let reopened = JsonFileStore::for_workspace(temp.path());
        assert_eq!(reopened.list_customers().await.unwrap(), vec![created]);

        let result = store.create_customer(customer).await;
        assert!(matches!(result, Err(StoreError::DuplicateCode(code)) if code == "001"));
    }

    #[tokio::test]
    async fn test_sale_requires_known_references() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::for_workspace(temp.path());

        let result = store
            .create_sale(NewSale {
                number: "001".to_string(),
                customer_id: "nobody".to_string(),
                sale_date: "2024-01-01".to_string(),
                items: vec![SaleItem {
                    product_id: "nothing".to_string(),
                    quantity: 1.0,
                    unit_price: 1.0,
                    discount: 0.0,
                    total: 1.0,
                }],
            })
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_init_store_is_idempotent() {
        let temp = tempdir().unwrap();
        assert!(init_store(temp.path()).await.unwrap());
        assert!(!init_store(temp.path()).await.unwrap());
    }
}
