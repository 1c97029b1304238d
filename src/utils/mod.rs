pub mod column_mapping;

pub use column_mapping::{ColumnMapping, RawRow, SUPPORTED_MAPPING_VERSION};
