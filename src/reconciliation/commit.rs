use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use super::context::CommitContext;
use crate::item::{ImportItem, ItemStatus, SubjectType};
use crate::rules::currency::parse_amount;
use crate::rules::dates::{parse_date, to_iso};
use crate::rules::{classify_tax_id, fields};
use crate::store::{EntityStore, NewCustomer, NewProduct, NewSale, SaleItem, StoreError};

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Missing value for {0}")]
    MissingValue(String),

    #[error("Product not found in catalog: {0}")]
    ProductNotFound(String),
}

/// A row that could not be stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    pub row: u32,
    pub message: String,
}

/// Counts for one commit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub created: u32,
    pub skipped_duplicates: u32,
    pub customers_auto_created: u32,
    /// Rows in error plus rows whose store call failed
    pub errored: u32,
    pub pending_review: u32,
    pub failed_rows: Vec<RowFailure>,
}

impl CommitSummary {
    fn record_failure(&mut self, row: u32, e: &CommitError) {
        self.errored += 1;
        error!(row, error = %e, "Failed to commit row");
        self.failed_rows.push(RowFailure {
            row,
            message: e.to_string(),
        });
    }

    /// Operator-facing summary line
    pub fn message(&self) -> String {
        let mut parts = vec![format!("{} created", self.created)];
        if self.skipped_duplicates > 0 {
            parts.push(format!("{} duplicates skipped", self.skipped_duplicates));
        }
        if self.customers_auto_created > 0 {
            parts.push(format!("{} customers created automatically", self.customers_auto_created));
        }
        if self.errored > 0 {
            parts.push(format!("{} with errors", self.errored));
        }
        if self.pending_review > 0 {
            parts.push(format!("{} awaiting review", self.pending_review));
        }
        parts.join(", ")
    }
}

enum RowOutcome {
    Created { customers_auto_created: u32 },
    Duplicate(String),
    /// The row failed after creating entities that stay in the store
    Failed {
        customers_auto_created: u32,
        error: CommitError,
    },
}

fn required<'a>(item: &'a ImportItem, field: &str) -> Result<&'a str, CommitError> {
    item.field(field)
        .ok_or_else(|| CommitError::MissingValue(field.to_string()))
}

fn amount(item: &ImportItem, field: &str) -> Result<Option<f64>, CommitError> {
    item.field(field)
        .map(|value| {
            parse_amount(value).ok_or_else(|| CommitError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
            })
        })
        .transpose()
}

fn optional(item: &ImportItem, field: &str) -> Option<String> {
    item.field(field).map(str::to_string)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

async fn commit_customer(
    store: &dyn EntityStore,
    ctx: &mut CommitContext,
    item: &ImportItem,
) -> Result<RowOutcome, CommitError> {
    let name = required(item, fields::NAME)?;
    let raw_tax_id = required(item, fields::CPF_CNPJ)?;
    let tax_id = classify_tax_id(raw_tax_id).map_err(|_| CommitError::InvalidValue {
        field: fields::CPF_CNPJ.to_string(),
        value: raw_tax_id.to_string(),
    })?;

    if let Some(existing) = ctx.customer_by_tax_id(&tax_id.digits) {
        return Ok(RowOutcome::Duplicate(format!(
            "tax id {} already belongs to customer {}",
            tax_id.digits, existing.code
        )));
    }

    let code = ctx.next_customer_code();
    let new_customer = NewCustomer {
        code: code.clone(),
        name: name.to_string(),
        cpf_cnpj: tax_id.digits,
        person_type: Some(tax_id.person_type),
        email: optional(item, fields::EMAIL),
        phone: optional(item, fields::PHONE),
        address: optional(item, fields::ADDRESS),
        city: optional(item, fields::CITY),
        state: optional(item, fields::STATE),
        zip_code: optional(item, fields::ZIP_CODE),
    };

    match store.create_customer(new_customer).await {
        Ok(created) => {
            ctx.record_customer(created);
            Ok(RowOutcome::Created {
                customers_auto_created: 0,
            })
        }
        Err(e) => {
            ctx.release_customer_code(&code);
            Err(e.into())
        }
    }
}

async fn commit_product(
    store: &dyn EntityStore,
    ctx: &mut CommitContext,
    item: &ImportItem,
) -> Result<RowOutcome, CommitError> {
    let name = required(item, fields::NAME)?;
    let unit = required(item, fields::UNIT)?;
    let sale_price = amount(item, fields::SALE_PRICE)?
        .ok_or_else(|| CommitError::MissingValue(fields::SALE_PRICE.to_string()))?;
    let cost_price = amount(item, fields::COST_PRICE)?;

    let (code, generated) = match item.field(fields::CODE) {
        Some(code) => {
            if let Some(existing) = ctx.product_by_code(code) {
                return Ok(RowOutcome::Duplicate(format!(
                    "code {} already belongs to {}",
                    code, existing.name
                )));
            }
            (code.to_string(), false)
        }
        None => (ctx.next_product_code(), true),
    };

    let new_product = NewProduct {
        code: code.clone(),
        name: name.to_string(),
        unit: unit.to_string(),
        sale_price,
        cost_price,
        category: optional(item, fields::CATEGORY),
    };

    match store.create_product(new_product).await {
        Ok(created) => {
            ctx.record_product(created);
            Ok(RowOutcome::Created {
                customers_auto_created: 0,
            })
        }
        Err(e) => {
            if generated {
                ctx.release_product_code(&code);
            }
            Err(e.into())
        }
    }
}

async fn commit_sale(
    store: &dyn EntityStore,
    ctx: &mut CommitContext,
    item: &ImportItem,
) -> Result<RowOutcome, CommitError> {
    let product_name = required(item, fields::PRODUCT_NAME)?;
    let product_id = item
        .field(fields::PRODUCT_CODE)
        .and_then(|code| ctx.product_by_code(code))
        .or_else(|| ctx.find_product(product_name))
        .map(|p| p.id.clone())
        .ok_or_else(|| CommitError::ProductNotFound(product_name.to_string()))?;

    let quantity = amount(item, fields::QUANTITY)?
        .ok_or_else(|| CommitError::MissingValue(fields::QUANTITY.to_string()))?;
    let unit_price = amount(item, fields::UNIT_PRICE)?
        .ok_or_else(|| CommitError::MissingValue(fields::UNIT_PRICE.to_string()))?;
    let discount = amount(item, fields::DISCOUNT)?.unwrap_or(0.0);
    let raw_date = required(item, fields::SALE_DATE)?;
    let sale_date = parse_date(raw_date)
        .map(to_iso)
        .ok_or_else(|| CommitError::InvalidValue {
            field: fields::SALE_DATE.to_string(),
            value: raw_date.to_string(),
        })?;

    let customer_name = required(item, fields::CUSTOMER_NAME)?;
    let customer_tax_id = item.field(fields::CUSTOMER_CPF_CNPJ);

    let total = round_cents(quantity * unit_price - discount);
    if total < 0.0 {
        return Err(CommitError::InvalidValue {
            field: fields::DISCOUNT.to_string(),
            value: discount.to_string(),
        });
    }

    let existing_customer = customer_tax_id
        .and_then(|t| ctx.customer_by_tax_id(t))
        .or_else(|| ctx.customer_by_name(customer_name))
        .map(|c| c.id.clone());

    let mut customers_auto_created = 0;
    let customer_id = match existing_customer {
        Some(id) => id,
        None => {
            let tax_id = customer_tax_id.and_then(|t| classify_tax_id(t).ok());
            let code = ctx.next_customer_code();
            let new_customer = NewCustomer {
                code: code.clone(),
                name: customer_name.to_string(),
                cpf_cnpj: tax_id.as_ref().map(|t| t.digits.clone()).unwrap_or_default(),
                person_type: tax_id.map(|t| t.person_type),
                ..Default::default()
            };
            let created = match store.create_customer(new_customer).await {
                Ok(created) => created,
                Err(e) => {
                    ctx.release_customer_code(&code);
                    return Err(e.into());
                }
            };
            info!(row = item.row, code = %created.code, name = %created.name, "Customer created from sale");
            let id = created.id.clone();
            ctx.record_customer(created);
            customers_auto_created = 1;
            id
        }
    };

    let number = ctx.next_sale_number();
    let new_sale = NewSale {
        number: number.clone(),
        customer_id,
        sale_date,
        items: vec![SaleItem {
            product_id,
            quantity,
            unit_price,
            discount,
            total,
        }],
    };

    if let Err(e) = store.create_sale(new_sale).await {
        ctx.release_sale_number(&number);
        if customers_auto_created > 0 {
            warn!(row = item.row, "Sale failed after its customer was created");
        }
        return Ok(RowOutcome::Failed {
            customers_auto_created,
            error: e.into(),
        });
    }

    Ok(RowOutcome::Created {
        customers_auto_created,
    })
}

/// Persist the ready items of a batch.
///
/// Rows are processed one at a time in ascending row order. A failing row
/// is counted and logged and the batch continues; nothing is rolled back.
/// Stored and duplicate rows are marked `committed` and ignored by later
/// commits of the same items.
pub async fn commit_items(
    store: &dyn EntityStore,
    ctx: &mut CommitContext,
    subject: SubjectType,
    items: &mut [ImportItem],
) -> CommitSummary {
    let mut ordered: Vec<&mut ImportItem> = items
        .iter_mut()
        .filter(|item| !item.committed)
        .collect();
    ordered.sort_by_key(|item| item.row);

    let mut summary = CommitSummary::default();

    for item in ordered {
        match item.status {
            ItemStatus::Error => {
                summary.errored += 1;
                continue;
            }
            ItemStatus::NeedsCorrection => {
                summary.pending_review += 1;
                continue;
            }
            ItemStatus::Ready => {}
        }

        let outcome = match subject {
            SubjectType::Customers => commit_customer(store, ctx, item).await,
            SubjectType::Products => commit_product(store, ctx, item).await,
            SubjectType::Sales => commit_sale(store, ctx, item).await,
        };

        match outcome {
            Ok(RowOutcome::Created {
                customers_auto_created,
            }) => {
                summary.created += 1;
                summary.customers_auto_created += customers_auto_created;
                item.committed = true;
            }
            Ok(RowOutcome::Duplicate(reason)) => {
                summary.skipped_duplicates += 1;
                info!(row = item.row, %reason, "Skipped duplicate");
                item.committed = true;
            }
            Ok(RowOutcome::Failed {
                customers_auto_created,
                error,
            }) => {
                summary.customers_auto_created += customers_auto_created;
                summary.record_failure(item.row, &error);
            }
            Err(e) => summary.record_failure(item.row, &e),
        }
    }

    info!(%subject, summary = %summary.message(), "Commit finished");
    summary
}
