pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{
    CreateRecordCommand, CreateRecordError, CreateRecordResponse, DeleteRecordCommand,
    DeleteRecordError, DeleteRecordResponse, UpdateRecordCommand, UpdateRecordError,
};

pub use queries::{
    GetRecordError, GetRecordQuery, ListRecordsError, ListRecordsQuery, ListRecordsResponse,
};

pub use routes::{records_routes, stats_routes};
