//! Metadata store boundary and the JSON workbook implementation

pub mod store;
pub mod workbook;

pub use store::{MetadataStore, StoreError};
pub use workbook::{standard_stages, Workbook};
