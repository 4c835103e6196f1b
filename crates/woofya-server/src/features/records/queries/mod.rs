pub mod get;
pub mod list;
pub mod stats;

pub use get::{GetRecordError, GetRecordQuery};
pub use list::{ListRecordsError, ListRecordsQuery, ListRecordsResponse};
