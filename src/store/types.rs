use crate::rules::PersonType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub code: String,
    pub name: String,
    /// Digits only
    pub cpf_cnpj: String,
    #[serde(default)]
    pub person_type: Option<PersonType>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub code: String,
    pub name: String,
    pub unit: String,
    pub sale_price: f64,
    #[serde(default)]
    pub cost_price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub product_id: String,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub discount: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub number: String,
    pub customer_id: String,
    /// ISO date
    pub sale_date: String,
    pub items: Vec<SaleItem>,
    pub total: f64,
    pub created_at: String,
}

/// A customer to be created; the store assigns id and timestamp
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCustomer {
    pub code: String,
    pub name: String,
    pub cpf_cnpj: String,
    pub person_type: Option<PersonType>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub unit: String,
    pub sale_price: f64,
    pub cost_price: Option<f64>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSale {
    pub number: String,
    pub customer_id: String,
    pub sale_date: String,
    pub items: Vec<SaleItem>,
}

impl NewSale {
    pub fn total(&self) -> f64 {
        self.items.iter().map(|i| i.total).sum()
    }
}

/// Contents of the store file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreData {
    pub schema_version: u32,
    pub updated_at: String,
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub sales: Vec<Sale>,
}

impl StoreData {
    pub fn new() -> Self {
        Self {
            schema_version: 1,
            updated_at: crate::utils::now_iso(),
            ..Default::default()
        }
    }
}
