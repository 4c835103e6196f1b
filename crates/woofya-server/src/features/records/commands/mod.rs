pub mod create;
pub mod delete;
pub mod update;

pub use create::{CreateRecordCommand, CreateRecordError, CreateRecordResponse};
pub use delete::{DeleteRecordCommand, DeleteRecordError, DeleteRecordResponse};
pub use update::{UpdateRecordCommand, UpdateRecordError};
