pub mod config;
pub mod error;
pub mod handle;
pub mod memory;
pub mod report;
pub mod r#trait;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use handle::{StoreHandle, StoreQuery};
pub use memory::MemoryStore;
pub use report::Report;
pub use r#trait::Store;
