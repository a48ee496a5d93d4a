//! SQLite storage implementation for import batches, their raw rows and the
//! per-account saved mappings.

mod model;
mod repository;

pub use model::{AccountMappingDB, ImportBatchDB, ImportRowDB};
pub use repository::ImportRepository;
