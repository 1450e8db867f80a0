/// Constants
pub mod constants;
pub mod decoder;
pub mod encoder;
/// Partitioning of the per-type field index namespace
pub mod field_idx;
/// Special field indices and offsets of the subquery namespaces
pub mod special_values;
pub mod types;
pub mod utils;

pub const VERSION: u8 = 0x02;
