//! Adapters that bring tables into a session: local CSV files and the
//! open-data catalog.

pub mod catalog;
pub mod table_loader;

pub use catalog::{
    CatalogClient, CatalogEntry, CatalogQuery, ColumnMetadata, DatasetMetadata, SocrataClient,
};
pub use table_loader::{load_csv, load_csv_str, MAX_FILE_SIZE};
