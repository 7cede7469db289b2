use super::codes::CodeAllocator;
use crate::matching::ReferenceIndex;
use crate::rules::names::normalize_name;
use crate::rules::classify_tax_id;
use crate::store::{Customer, EntityStore, Product, Sale, StoreError};

/// Entities visible to a commit: what the store held when the batch began
/// plus everything the batch has created so far.
pub struct CommitContext {
    customers: Vec<Customer>,
    products: Vec<Product>,
    product_index: ReferenceIndex,
    customer_codes: CodeAllocator,
    product_codes: CodeAllocator,
    sale_numbers: CodeAllocator,
}

impl CommitContext {
    pub fn new(customers: Vec<Customer>, products: Vec<Product>, sales: &[Sale], code_width: usize) -> Self {
        let customer_codes = CodeAllocator::new(code_width, customers.iter().map(|c| c.code.as_str()));
        let product_codes = CodeAllocator::new(code_width, products.iter().map(|p| p.code.as_str()));
        let sale_numbers = CodeAllocator::new(code_width, sales.iter().map(|s| s.number.as_str()));
        let product_index = ReferenceIndex::new(products.iter().map(|p| p.name.as_str()));

        Self {
            customers,
            products,
            product_index,
            customer_codes,
            product_codes,
            sale_numbers,
        }
    }

    /// Snapshot the store
    pub async fn load(store: &dyn EntityStore, code_width: usize) -> Result<Self, StoreError> {
        let customers = store.list_customers().await?;
        let products = store.list_products().await?;
        let sales = store.list_sales().await?;
        Ok(Self::new(customers, products, &sales, code_width))
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn customer_by_tax_id(&self, raw: &str) -> Option<&Customer> {
        let id = classify_tax_id(raw).ok()?;
        self.customers.iter().find(|c| c.cpf_cnpj == id.digits)
    }

    pub fn customer_by_name(&self, name: &str) -> Option<&Customer> {
        let key = normalize_name(name);
        if key.is_empty() {
            return None;
        }
        self.customers.iter().find(|c| normalize_name(&c.name) == key)
    }

    pub fn product_by_code(&self, code: &str) -> Option<&Product> {
        let code = code.trim();
        self.products.iter().find(|p| p.code == code)
    }

    /// Fuzzy catalog lookup
    pub fn find_product(&self, name: &str) -> Option<&Product> {
        self.product_index
            .find(name)
            .and_then(|found| self.products.get(found.index))
    }

    pub fn next_customer_code(&mut self) -> String {
        self.customer_codes.next_code()
    }

    pub fn next_product_code(&mut self) -> String {
        self.product_codes.next_code()
    }

    pub fn next_sale_number(&mut self) -> String {
        self.sale_numbers.next_code()
    }

    pub fn release_customer_code(&mut self, code: &str) {
        self.customer_codes.release(code);
    }

    pub fn release_product_code(&mut self, code: &str) {
        self.product_codes.release(code);
    }

    pub fn release_sale_number(&mut self, number: &str) {
        self.sale_numbers.release(number);
    }

    pub fn record_customer(&mut self, customer: Customer) {
        self.customer_codes.reserve(&customer.code);
        self.customers.push(customer);
    }

    pub fn record_product(&mut self, product: Product) {
        self.product_codes.reserve(&product.code);
        self.product_index.push(&product.name);
        self.products.push(product);
    }
}
