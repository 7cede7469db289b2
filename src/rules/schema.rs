use super::text::simplify_key;
use crate::item::SubjectType;
use serde::Serialize;

/// Canonical field names shared by every stage
pub mod fields {
    pub const NAME: &str = "name";
    pub const CPF_CNPJ: &str = "cpf_cnpj";
    pub const PERSON_TYPE: &str = "person_type";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const ADDRESS: &str = "address";
    pub const CITY: &str = "city";
    pub const STATE: &str = "state";
    pub const ZIP_CODE: &str = "zip_code";

    pub const CODE: &str = "code";
    pub const UNIT: &str = "unit";
    pub const SALE_PRICE: &str = "sale_price";
    pub const COST_PRICE: &str = "cost_price";
    pub const CATEGORY: &str = "category";

    pub const CUSTOMER_NAME: &str = "customer_name";
    pub const CUSTOMER_CPF_CNPJ: &str = "customer_cpf_cnpj";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const PRODUCT_CODE: &str = "product_code";
    pub const QUANTITY: &str = "quantity";
    pub const UNIT_PRICE: &str = "unit_price";
    pub const DISCOUNT: &str = "discount";
    pub const SALE_DATE: &str = "sale_date";
}

/// How a canonical field is validated by the local rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    TaxId,
    State,
    Unit,
    Money,
    Quantity,
    Date,
    ProductName,
    ProductReference,
    CustomerReference,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
    /// Header spellings that map to this field
    pub synonyms: &'static [&'static str],
}

const fn field(
    name: &'static str,
    kind: FieldKind,
    required: bool,
    description: &'static str,
    synonyms: &'static [&'static str],
) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required,
        description,
        synonyms,
    }
}

use fields::*;

static CUSTOMER_FIELDS: &[FieldSpec] = &[
    field(NAME, FieldKind::Text, true, "Customer or company name",
        &["nome", "cliente", "razao social", "nome do cliente", "nome completo", "customer"]),
    field(CPF_CNPJ, FieldKind::TaxId, true, "CPF (11 digits) or CNPJ (14 digits)",
        &["cpf", "cnpj", "cpf cnpj", "cpf/cnpj", "documento", "doc", "tax id"]),
    field(EMAIL, FieldKind::Text, false, "E-mail address", &["e mail", "email", "correio eletronico"]),
    field(PHONE, FieldKind::Text, false, "Phone number", &["telefone", "fone", "celular", "whatsapp", "tel"]),
    field(ADDRESS, FieldKind::Text, false, "Street address",
        &["endereco", "logradouro", "rua", "endereco completo", "address"]),
    field(CITY, FieldKind::Text, false, "City", &["cidade", "municipio", "city"]),
    field(STATE, FieldKind::State, false, "Two-letter state abbreviation", &["estado", "uf", "state"]),
    field(ZIP_CODE, FieldKind::Text, false, "Postal code", &["cep", "codigo postal", "zip"]),
];

static PRODUCT_FIELDS: &[FieldSpec] = &[
    field(NAME, FieldKind::ProductName, true, "Product description",
        &["produto", "descricao", "nome", "nome do produto", "item", "material"]),
    field(CODE, FieldKind::Text, false, "Product code; generated when absent",
        &["codigo", "cod", "sku", "referencia", "ref"]),
    field(UNIT, FieldKind::Unit, true, "Unit of measure", &["unidade", "un", "und", "medida", "unidade de medida"]),
    field(SALE_PRICE, FieldKind::Money, true, "Sale price",
        &["preco", "preco de venda", "valor", "valor de venda", "preco venda", "price"]),
    field(COST_PRICE, FieldKind::Money, false, "Cost price",
        &["custo", "preco de custo", "valor de custo", "cost"]),
    field(CATEGORY, FieldKind::Text, false, "Category", &["categoria", "grupo", "familia", "category"]),
];

static SALE_FIELDS: &[FieldSpec] = &[
    field(CUSTOMER_NAME, FieldKind::CustomerReference, true, "Buyer name",
        &["cliente", "nome do cliente", "comprador", "customer"]),
    field(CUSTOMER_CPF_CNPJ, FieldKind::TaxId, false, "Buyer CPF or CNPJ",
        &["cpf", "cnpj", "cpf cnpj", "cpf/cnpj", "documento do cliente", "documento"]),
    field(PRODUCT_NAME, FieldKind::ProductReference, true, "Product sold; must match the catalog",
        &["produto", "descricao", "item", "material", "mercadoria"]),
    field(QUANTITY, FieldKind::Quantity, true, "Quantity sold", &["quantidade", "qtd", "qtde", "quant"]),
    field(UNIT_PRICE, FieldKind::Money, true, "Unit price",
        &["preco", "preco unitario", "valor unitario", "vl unitario", "valor"]),
    field(DISCOUNT, FieldKind::Money, false, "Discount amount for the line", &["desconto", "desc"]),
    field(SALE_DATE, FieldKind::Date, true, "Sale date", &["data", "data da venda", "data venda", "emissao"]),
];

/// The canonical schema of a subject
pub fn subject_fields(subject: SubjectType) -> &'static [FieldSpec] {
    match subject {
        SubjectType::Customers => CUSTOMER_FIELDS,
        SubjectType::Products => PRODUCT_FIELDS,
        SubjectType::Sales => SALE_FIELDS,
    }
}

pub fn field_spec(subject: SubjectType, name: &str) -> Option<&'static FieldSpec> {
    subject_fields(subject).iter().find(|f| f.name == name)
}

/// Confidence that a header names a field: 1.0 for an exact synonym,
/// 0.7 when a multi-word synonym appears inside the header.
pub fn header_confidence(spec: &FieldSpec, header: &str) -> f64 {
    let key = simplify_key(header);
    if key.is_empty() {
        return 0.0;
    }

    let exact = simplify_key(spec.name) == key
        || spec.synonyms.iter().any(|s| simplify_key(s) == key);
    if exact {
        return 1.0;
    }

    let padded = format!(" {} ", key);
    let contained = spec.synonyms.iter().any(|s| {
        let synonym = simplify_key(s);
        synonym.len() > 3 && padded.contains(&format!(" {} ", synonym))
    });
    if contained {
        0.7
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subject_has_required_fields() {
        for subject in [SubjectType::Customers, SubjectType::Products, SubjectType::Sales] {
            assert!(subject_fields(subject).iter().any(|f| f.required));
        }
    }

    #[test]
    fn test_header_confidence() {
        let spec = field_spec(SubjectType::Customers, CPF_CNPJ).unwrap();
        assert_eq!(header_confidence(spec, "CPF/CNPJ"), 1.0);
        assert_eq!(header_confidence(spec, "Telefone"), 0.0);

        let price = field_spec(SubjectType::Products, SALE_PRICE).unwrap();
        assert_eq!(header_confidence(price, "Preço de Venda (R$)"), 0.7);
    }
}
