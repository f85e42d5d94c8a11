//! Built-in schema catalogue for the platform's standard import types.
//!
//! [`StaticSchemaCatalog`] ships the target schemas bulk imports are
//! offered out of the box. Deployments with additional domains provide
//! their own [`SchemaCatalog`] implementation instead.

use std::collections::HashMap;

use async_trait::async_trait;
use stevedore_core::schema::{FieldType, TargetField, TargetSchema};

use crate::collab::SchemaCatalog;

/// In-memory catalogue of the standard import entity types.
pub struct StaticSchemaCatalog {
    schemas: HashMap<String, TargetSchema>,
}

impl StaticSchemaCatalog {
    pub fn new() -> Self {
        let mut schemas = HashMap::new();
        for schema in [
            customer(),
            supplier(),
            product(),
            category(),
            warehouse(),
            unit(),
            contact(),
            opening_balance(),
            price_list(),
        ] {
            schemas.insert(schema.entity_type.clone(), schema);
        }
        Self { schemas }
    }

    /// All known entity type names, ascending.
    pub fn entity_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for StaticSchemaCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaCatalog for StaticSchemaCatalog {
    async fn schema_for(&self, entity_type: &str) -> Option<TargetSchema> {
        self.schemas.get(entity_type).cloned()
    }
}

fn customer() -> TargetSchema {
    TargetSchema::new(
        "customer",
        vec![
            TargetField::new("code", "Code", FieldType::Text)
                .required()
                .max_length(50),
            TargetField::new("name", "Name", FieldType::Text)
                .required()
                .max_length(200),
            TargetField::new("tax_number", "Tax Number", FieldType::Text).max_length(20),
            TargetField::new("tax_office", "Tax Office", FieldType::Text).max_length(100),
            TargetField::new("phone", "Phone", FieldType::Text).max_length(20),
            TargetField::new("email", "Email", FieldType::Email).max_length(100),
            TargetField::new("address", "Address", FieldType::Text).max_length(500),
            TargetField::new("city", "City", FieldType::Text).max_length(50),
            TargetField::new("district", "District", FieldType::Text).max_length(50),
            TargetField::new("credit_limit", "Credit Limit", FieldType::Decimal),
        ],
    )
    .unique_by("code")
}

fn supplier() -> TargetSchema {
    TargetSchema::new(
        "supplier",
        vec![
            TargetField::new("code", "Code", FieldType::Text)
                .required()
                .max_length(50),
            TargetField::new("name", "Name", FieldType::Text)
                .required()
                .max_length(200),
            TargetField::new("tax_number", "Tax Number", FieldType::Text).max_length(20),
            TargetField::new("tax_office", "Tax Office", FieldType::Text).max_length(100),
            TargetField::new("phone", "Phone", FieldType::Text).max_length(20),
            TargetField::new("email", "Email", FieldType::Email).max_length(100),
            TargetField::new("address", "Address", FieldType::Text).max_length(500),
        ],
    )
    .unique_by("code")
}

fn product() -> TargetSchema {
    TargetSchema::new(
        "product",
        vec![
            TargetField::new("code", "Code", FieldType::Text)
                .required()
                .max_length(50),
            TargetField::new("name", "Name", FieldType::Text)
                .required()
                .max_length(200),
            TargetField::new("description", "Description", FieldType::Text).max_length(500),
            TargetField::new("barcode", "Barcode", FieldType::Text).max_length(50),
            TargetField::new("category_code", "Category Code", FieldType::Text).max_length(50),
            TargetField::new("unit", "Unit", FieldType::Text)
                .required()
                .max_length(20),
            TargetField::new("vat_rate", "VAT Rate", FieldType::Decimal),
            TargetField::new("purchase_price", "Purchase Price", FieldType::Decimal),
            TargetField::new("sale_price", "Sale Price", FieldType::Decimal),
            TargetField::new("min_stock", "Minimum Stock", FieldType::Decimal),
            TargetField::new("max_stock", "Maximum Stock", FieldType::Decimal),
        ],
    )
    .unique_by("code")
}

fn category() -> TargetSchema {
    TargetSchema::new(
        "category",
        vec![
            TargetField::new("code", "Code", FieldType::Text)
                .required()
                .max_length(50),
            TargetField::new("name", "Name", FieldType::Text)
                .required()
                .max_length(100),
            TargetField::new("parent_code", "Parent Code", FieldType::Text).max_length(50),
            TargetField::new("description", "Description", FieldType::Text).max_length(500),
        ],
    )
    .unique_by("code")
}

fn warehouse() -> TargetSchema {
    TargetSchema::new(
        "warehouse",
        vec![
            TargetField::new("code", "Code", FieldType::Text)
                .required()
                .max_length(50),
            TargetField::new("name", "Name", FieldType::Text)
                .required()
                .max_length(100),
            TargetField::new("address", "Address", FieldType::Text).max_length(500),
            TargetField::new("is_default", "Is Default", FieldType::Text).max_length(5),
        ],
    )
    .unique_by("code")
}

fn unit() -> TargetSchema {
    TargetSchema::new(
        "unit",
        vec![
            TargetField::new("code", "Code", FieldType::Text)
                .required()
                .max_length(20),
            TargetField::new("name", "Name", FieldType::Text)
                .required()
                .max_length(50),
            TargetField::new("description", "Description", FieldType::Text).max_length(200),
        ],
    )
    .unique_by("code")
}

fn contact() -> TargetSchema {
    TargetSchema::new(
        "contact",
        vec![
            TargetField::new("name", "Name", FieldType::Text)
                .required()
                .max_length(200),
            TargetField::new("email", "Email", FieldType::Email).max_length(100),
            TargetField::new("phone", "Phone", FieldType::Text).max_length(20),
            TargetField::new("title", "Title", FieldType::Text).max_length(100),
            TargetField::new("company", "Company", FieldType::Text).max_length(200),
            TargetField::new("address", "Address", FieldType::Text).max_length(500),
            TargetField::new("city", "City", FieldType::Text).max_length(50),
            TargetField::new("notes", "Notes", FieldType::Text).max_length(500),
        ],
    )
    .unique_by("email")
}

fn opening_balance() -> TargetSchema {
    TargetSchema::new(
        "opening-balance",
        vec![
            TargetField::new("product_code", "Product Code", FieldType::Text)
                .required()
                .max_length(50),
            TargetField::new("warehouse_code", "Warehouse Code", FieldType::Text)
                .required()
                .max_length(50),
            TargetField::new("quantity", "Quantity", FieldType::Decimal).required(),
            TargetField::new("unit_cost", "Unit Cost", FieldType::Decimal),
            TargetField::new("date", "Date", FieldType::Date),
        ],
    )
}

fn price_list() -> TargetSchema {
    TargetSchema::new(
        "price-list",
        vec![
            TargetField::new("product_code", "Product Code", FieldType::Text)
                .required()
                .max_length(50),
            TargetField::new("price_list_code", "Price List Code", FieldType::Text)
                .required()
                .max_length(50),
            TargetField::new("price", "Price", FieldType::Decimal).required(),
            TargetField::new("currency", "Currency", FieldType::Enum)
                .allowed(&["TRY", "USD", "EUR", "GBP"]),
            TargetField::new("valid_from", "Valid From", FieldType::Date),
            TargetField::new("valid_to", "Valid To", FieldType::Date),
        ],
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
