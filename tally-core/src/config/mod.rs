//! Configuration: storage and counter settings with layered resolution.

pub mod counter_config;
pub mod storage_config;
pub mod tally_config;

pub use counter_config::CounterConfig;
pub use storage_config::{is_sql_identifier, StorageConfig};
pub use tally_config::TallyConfig;
