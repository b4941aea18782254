//! Test fixtures for workbook store integration tests
//!
//! Small workbooks shaped like a real pipeline: a bronze customer table, its
//! silver counterpart and a gold dimension.

use colcascade_core::{Artifact, Column, ColumnGroup};
use colcascade_store::Workbook;

/// Bronze customers with seeded columns, silver and gold without
pub fn customer_workbook() -> Workbook {
    Workbook::new()
        .with_artifact(Artifact::new("a1", "bronze_customers", "s1"))
        .with_artifact(Artifact::new("a2", "customers", "s2").with_upstream("a1", "main"))
        .with_artifact(
            Artifact::new("a3", "dim_customer", "s3")
                .with_type("dimension")
                .with_upstream("a2", "main"),
        )
        .with_columns(customer_columns())
}

/// Origin columns of the bronze customer table
pub fn customer_columns() -> Vec<Column> {
    vec![
        Column::new("a1", "customer_id", "INT", ColumnGroup::PrimaryKey)
            .with_id(1)
            .with_order(1),
        Column::new("a1", "bronze_email", "NVARCHAR(255)", ColumnGroup::Attribute)
            .with_id(2)
            .with_order(2)
            .with_business_name("Email Address"),
        Column::new("a1", "created_at", "DATETIME2", ColumnGroup::Attribute)
            .with_id(3)
            .with_order(3)
            .with_comment("Row creation time in the CRM"),
    ]
}

/// Raw JSON as written by an older tool version (legacy group tokens)
pub const LEGACY_WORKBOOK_JSON: &str = r#"{
    "stages": [
        { "id": "s1", "name": "1_bronze", "position": 1, "platform": "Azure SQL" },
        { "id": "s2", "name": "2_silver", "position": 2, "platform": "Azure SQL" }
    ],
    "artifacts": [
        { "id": "a1", "name": "orders", "stage_id": "s1" },
        { "id": "a2", "name": "orders", "stage_id": "s2", "upstream_artifact": "a1", "upstream_relation": "main" }
    ],
    "columns": [
        { "id": 10, "artifact_id": "a1", "name": "order_id", "data_type": "INT", "order": 1, "group": "Primary Key", "source_column": "order_id" },
        { "id": 11, "artifact_id": "a1", "name": "amount", "data_type": "MONEY", "order": 2, "group": "facts", "source_column": "amount" },
        { "id": 12, "artifact_id": "a1", "name": "__SourceSystem", "data_type": "STRING", "order": 3, "group": "technical fields", "source_column": "__SourceSystem" }
    ]
}"#;
