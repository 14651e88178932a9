pub mod archive;
pub mod records;

pub use archive::{create_archive, open_member, DEFAULT_MAX_MEMBER_BYTES};
pub use records::{format_records, parse_records, CoercionPolicy, ParsedBatch};
