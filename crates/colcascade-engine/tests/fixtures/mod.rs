//! Test fixtures for cascading integration tests
//!
//! A small but complete pipeline: bronze customers and orders, their silver
//! copies, a gold customer dimension, a gold order fact, a mart lookup and a
//! Power BI model.

#![allow(dead_code)]

use colcascade_core::{
    Artifact, Column, ColumnGroup, Stage, TechnicalField, TypeMappingTable,
};
use colcascade_store::{MetadataStore, StoreError, Workbook};

/// Bronze customer seed columns
pub fn customer_seed() -> Vec<Column> {
    vec![
        Column::new("a1", "customer_id", "INT", ColumnGroup::PrimaryKey).with_id(1).with_order(1),
        Column::new("a1", "bronze_email", "NVARCHAR(255)", ColumnGroup::Attribute)
            .with_id(2)
            .with_order(2)
            .with_business_name("EmailAddress"),
        Column::new("a1", "segment", "VARCHAR(20)", ColumnGroup::Attribute).with_id(3).with_order(3),
        Column::new("a1", "__SourceSystem", "STRING", ColumnGroup::TechnicalField).with_id(4).with_order(4),
        Column::new("a1", "__1_bronze_insert_dt", "TIMESTAMP", ColumnGroup::TechnicalField)
            .with_id(5)
            .with_order(5),
        Column::new("a1", "__1_bronze_Partition_InsertYear", "INT", ColumnGroup::PartitionField)
            .with_id(6)
            .with_order(6),
    ]
}

/// Bronze order seed columns
pub fn order_seed() -> Vec<Column> {
    vec![
        Column::new("a4", "order_id", "INT", ColumnGroup::PrimaryKey).with_id(7).with_order(1),
        Column::new("a4", "customer_id", "INT", ColumnGroup::Attribute).with_id(8).with_order(2),
        Column::new("a4", "amount", "VARCHAR(20)", ColumnGroup::Measure).with_id(9).with_order(3),
    ]
}

/// Eight-artifact pipeline across bronze, silver, gold, mart and model stages
pub fn pipeline_workbook() -> Workbook {
    Workbook::new()
        .with_artifact(Artifact::new("a1", "customers", "s1"))
        .with_artifact(Artifact::new("a2", "customers", "s2").with_upstream("a1", "main"))
        .with_artifact(Artifact::new("a3", "dim_customer", "s3").with_upstream("a2", "main"))
        .with_artifact(Artifact::new("a4", "orders", "s1"))
        .with_artifact(Artifact::new("a5", "orders", "s2").with_upstream("a4", "main"))
        .with_artifact(Artifact::new("a6", "fact_orders", "s3").with_upstream("a5;a3", "main;get_key"))
        .with_artifact(Artifact::new("a7", "customer_lookup", "s4").with_upstream("a3", "lookup"))
        .with_artifact(Artifact::new("a8", "sales_model", "s5").with_upstream("a6", "pbi"))
        .with_columns(customer_seed())
        .with_columns(order_seed())
}

/// Column names of an artifact in order
pub fn names<S: MetadataStore + ?Sized>(store: &S, artifact_id: &str) -> Vec<String> {
    store
        .columns(Some(artifact_id))
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect()
}

/// Workbook wrapper whose appends fail after a number of successes, or for one artifact
pub struct FailingStore {
    pub inner: Workbook,
    appends_left: usize,
    rejected: Option<String>,
}

impl FailingStore {
    pub fn new(inner: Workbook, successful_appends: usize) -> Self {
        Self {
            inner,
            appends_left: successful_appends,
            rejected: None,
        }
    }

    /// Appends fail only for `artifact_id`
    pub fn rejecting(inner: Workbook, artifact_id: &str) -> Self {
        Self {
            inner,
            appends_left: usize::MAX,
            rejected: Some(artifact_id.to_string()),
        }
    }
}

impl MetadataStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    fn stages(&self) -> Result<Vec<Stage>, StoreError> {
        self.inner.stages()
    }

    fn artifacts(&self) -> Result<Vec<Artifact>, StoreError> {
        self.inner.artifacts()
    }

    fn columns(&self, artifact_id: Option<&str>) -> Result<Vec<Column>, StoreError> {
        self.inner.columns(artifact_id)
    }

    fn type_mappings(&self) -> Result<TypeMappingTable, StoreError> {
        self.inner.type_mappings()
    }

    fn technical_field_catalog(&self, stage_id: &str) -> Result<Vec<TechnicalField>, StoreError> {
        self.inner.technical_field_catalog(stage_id)
    }

    fn append_columns(&mut self, artifact_id: &str, columns: Vec<Column>) -> Result<(), StoreError> {
        if self.appends_left == 0 || self.rejected.as_deref() == Some(artifact_id) {
            return Err(StoreError::WriteRejected("disk full".to_string()));
        }
        self.appends_left -= 1;
        self.inner.append_columns(artifact_id, columns)
    }

    fn replace_columns_for_artifact(&mut self, artifact_id: &str, columns: Vec<Column>) -> Result<(), StoreError> {
        self.inner.replace_columns_for_artifact(artifact_id, columns)
    }

    fn delete_columns_for_artifact(&mut self, artifact_id: &str) -> Result<(), StoreError> {
        self.inner.delete_columns_for_artifact(artifact_id)
    }
}
