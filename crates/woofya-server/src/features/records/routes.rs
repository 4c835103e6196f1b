//! Record API routes
//!
//! Wires the record commands and queries to Axum handlers.
//!
//! # Route Structure
//!
//! - `POST /records` - Create a record (`?upsert=true` merges duplicates)
//! - `GET /records` - List records in insertion order
//! - `GET /records/:id` - Get a single record
//! - `PUT /records/:id` - Partially update a record
//! - `DELETE /records/:id` - Delete a record
//! - `GET /stats` - Total and per-location record counts
//!
//! Every error body has the shape `{ "error": "<message>" }`.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use woofya_common::store::RecordStore;
use woofya_common::types::{CanonicalRecord, RecordPatch};

use super::{
    commands::{
        CreateRecordCommand, CreateRecordError, DeleteRecordCommand, DeleteRecordError,
        UpdateRecordCommand, UpdateRecordError,
    },
    queries::{GetRecordError, GetRecordQuery, ListRecordsError, ListRecordsQuery},
};
use crate::error::{error_response, store_error_response};

// ============================================================================
// Router Configuration
// ============================================================================

pub fn records_routes() -> Router<RecordStore> {
    Router::new()
        .route("/", get(list_records).post(create_record))
        .route("/:id", get(get_record).put(update_record).delete(delete_record))
}

pub fn stats_routes() -> Router<RecordStore> {
    Router::new().route("/", get(get_stats))
}

#[derive(Debug, Default, Deserialize)]
struct CreateParams {
    #[serde(default)]
    upsert: bool,
}

fn parse_id(raw: &str) -> Result<Uuid, RecordsApiError> {
    Uuid::parse_str(raw).map_err(|_| RecordsApiError::UnknownId(raw.to_string()))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Create a record
///
/// # Endpoint
///
/// `POST /records?upsert=true`
///
/// # Request Body
///
/// ```json
/// {
///   "title": "Dog Day",
///   "location": "Sydney, NSW",
///   "date": "2024-10-01",
///   "features": ["off-leash"]
/// }
/// ```
///
/// # Response
///
/// - `201 Created` - Record stored, body carries the assigned `id`
/// - `200 OK` - Merged into an existing record (upsert only)
/// - `400 Bad Request` - Malformed body or missing title/location
/// - `409 Conflict` - A record with the same identity key exists
#[tracing::instrument(skip(store, params, payload))]
async fn create_record(
    State(store): State<RecordStore>,
    params: Result<Query<CreateParams>, QueryRejection>,
    payload: Result<Json<CanonicalRecord>, JsonRejection>,
) -> Result<Response, RecordsApiError> {
    let Query(params) = params.map_err(|e| RecordsApiError::BadRequest(e.body_text()))?;
    let Json(record) = payload.map_err(|e| RecordsApiError::BadRequest(e.body_text()))?;

    let command = CreateRecordCommand {
        record,
        upsert: params.upsert,
    };
    let response = super::commands::create::handle(store, command).await?;

    let status = if response.created {
        tracing::info!(id = %response.record.id, "Record created via API");
        StatusCode::CREATED
    } else {
        tracing::info!(id = %response.record.id, "Record merged via API");
        StatusCode::OK
    };

    Ok((status, Json(response.record)).into_response())
}

/// Partially update a record
///
/// # Endpoint
///
/// `PUT /records/:id`
///
/// # Request Body
///
/// Any subset of the record fields; `"date": null` clears the date.
///
/// # Response
///
/// - `200 OK` - Updated record
/// - `400 Bad Request` - Malformed or empty patch
/// - `404 Not Found` - Record not found
/// - `409 Conflict` - New identity key collides with another record
#[tracing::instrument(skip(store, payload), fields(id = %id))]
async fn update_record(
    State(store): State<RecordStore>,
    Path(id): Path<String>,
    payload: Result<Json<RecordPatch>, JsonRejection>,
) -> Result<Response, RecordsApiError> {
    let id = parse_id(&id)?;
    let Json(patch) = payload.map_err(|e| RecordsApiError::BadRequest(e.body_text()))?;

    let record = super::commands::update::handle(store, UpdateRecordCommand { id, patch }).await?;

    tracing::info!(id = %record.id, "Record updated via API");
    Ok((StatusCode::OK, Json(record)).into_response())
}

/// Delete a record
///
/// # Endpoint
///
/// `DELETE /records/:id`
///
/// # Response
///
/// - `200 OK` - Record deleted
/// - `404 Not Found` - Record not found
#[tracing::instrument(skip(store), fields(id = %id))]
async fn delete_record(
    State(store): State<RecordStore>,
    Path(id): Path<String>,
) -> Result<Response, RecordsApiError> {
    let id = parse_id(&id)?;
    let response = super::commands::delete::handle(store, DeleteRecordCommand { id }).await?;

    tracing::info!(id = %response.id, "Record deleted via API");
    Ok((StatusCode::OK, Json(response)).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// Get a single record
///
/// # Endpoint
///
/// `GET /records/:id`
///
/// # Response
///
/// - `200 OK` - Record found
/// - `404 Not Found` - Record not found or malformed id
#[tracing::instrument(skip(store), fields(id = %id))]
async fn get_record(
    State(store): State<RecordStore>,
    Path(id): Path<String>,
) -> Result<Response, RecordsApiError> {
    let id = parse_id(&id)?;
    let record = super::queries::get::handle(store, GetRecordQuery { id }).await?;
    Ok((StatusCode::OK, Json(record)).into_response())
}

/// List records
///
/// # Endpoint
///
/// `GET /records?location=Sydney,%20NSW&title_contains=dog`
///
/// # Response
///
/// - `200 OK` - JSON array of records in insertion order
/// - `400 Bad Request` - Blank filter value
#[tracing::instrument(skip(store, query))]
async fn list_records(
    State(store): State<RecordStore>,
    query: Result<Query<ListRecordsQuery>, QueryRejection>,
) -> Result<Response, RecordsApiError> {
    let Query(query) = query.map_err(|e| RecordsApiError::BadRequest(e.body_text()))?;
    let response = super::queries::list::handle(store, query).await?;

    tracing::debug!(count = response.total, "Records listed via API");
    Ok((StatusCode::OK, Json(response.items)).into_response())
}

/// Record counts
///
/// # Endpoint
///
/// `GET /stats`
///
/// # Response
///
/// ```json
/// { "total": 3, "by_location": { "Sydney, NSW": 2, "Melbourne, VIC": 1 } }
/// ```
async fn get_stats(State(store): State<RecordStore>) -> Response {
    let stats = super::queries::stats::handle(store).await;
    (StatusCode::OK, Json(stats)).into_response()
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for record API endpoints
#[derive(Debug)]
enum RecordsApiError {
    BadRequest(String),
    UnknownId(String),
    Create(CreateRecordError),
    Update(UpdateRecordError),
    Delete(DeleteRecordError),
    Get(GetRecordError),
    List(ListRecordsError),
}

impl From<CreateRecordError> for RecordsApiError {
    fn from(err: CreateRecordError) -> Self {
        Self::Create(err)
    }
}

impl From<UpdateRecordError> for RecordsApiError {
    fn from(err: UpdateRecordError) -> Self {
        Self::Update(err)
    }
}

impl From<DeleteRecordError> for RecordsApiError {
    fn from(err: DeleteRecordError) -> Self {
        Self::Delete(err)
    }
}

impl From<GetRecordError> for RecordsApiError {
    fn from(err: GetRecordError) -> Self {
        Self::Get(err)
    }
}

impl From<ListRecordsError> for RecordsApiError {
    fn from(err: ListRecordsError) -> Self {
        Self::List(err)
    }
}

impl IntoResponse for RecordsApiError {
    fn into_response(self) -> Response {
        match self {
            RecordsApiError::BadRequest(message) => error_response(StatusCode::BAD_REQUEST, message),
            RecordsApiError::UnknownId(raw) => {
                error_response(StatusCode::NOT_FOUND, format!("Record '{}' not found", raw))
            },

            RecordsApiError::Create(
                err @ (CreateRecordError::TitleRequired
                | CreateRecordError::LocationRequired
                | CreateRecordError::Invalid(_)),
            ) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
            RecordsApiError::Create(err @ CreateRecordError::Conflict { .. }) => {
                error_response(StatusCode::CONFLICT, err.to_string())
            },
            RecordsApiError::Create(CreateRecordError::Store(err)) => store_error_response(&err),

            RecordsApiError::Update(
                err @ (UpdateRecordError::NoFieldsToUpdate
                | UpdateRecordError::TitleEmpty
                | UpdateRecordError::LocationEmpty
                | UpdateRecordError::Invalid(_)),
            ) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
            RecordsApiError::Update(err @ UpdateRecordError::NotFound(_)) => {
                error_response(StatusCode::NOT_FOUND, err.to_string())
            },
            RecordsApiError::Update(err @ UpdateRecordError::Conflict { .. }) => {
                error_response(StatusCode::CONFLICT, err.to_string())
            },
            RecordsApiError::Update(UpdateRecordError::Store(err)) => store_error_response(&err),

            RecordsApiError::Delete(err @ DeleteRecordError::NotFound(_)) => {
                error_response(StatusCode::NOT_FOUND, err.to_string())
            },
            RecordsApiError::Delete(DeleteRecordError::Store(err)) => store_error_response(&err),

            RecordsApiError::Get(err @ GetRecordError::NotFound(_)) => {
                error_response(StatusCode::NOT_FOUND, err.to_string())
            },
            RecordsApiError::Get(GetRecordError::Store(err)) => store_error_response(&err),

            RecordsApiError::List(err) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
        }
    }
}
