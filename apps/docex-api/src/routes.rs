use axum::{
	Extension, Json, Router,
	extract::{
		Path, Query, State,
		rejection::{JsonRejection, PathRejection, QueryRejection},
	},
	http::StatusCode,
	middleware,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
	auth::{self, Caller},
	state::AppState,
};
use docex_service::{
	CreateNoteRequest, Error, IndexDocumentRequest, IndexDocumentResponse, ResearchNote,
	SearchRequest, SearchResponse, SearchResult, TimeRangeSearchRequest, UpdateNoteRequest,
	ValidateNoteRequest,
};

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
struct SimilarNotesParams {
	limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ListNotesParams {
	#[serde(default)]
	verified_only: bool,
}

#[derive(Debug, Deserialize)]
struct DocumentScopeParams {
	document_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: &'static str,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
		Self { status, error_code, message: message.into() }
	}

	pub fn unauthorized() -> Self {
		Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "A valid bearer token is required.")
	}

	fn invalid(message: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } => Self::invalid(message),
			Error::NotFound { message } => Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message),
			Error::Conflict { message } => Self::new(StatusCode::CONFLICT, "CONFLICT", message),
			Error::Provider { message } => internal("PROVIDER_FAILURE", message),
			Error::Storage { message } => internal("STORAGE_FAILURE", message),
			Error::Index { message } => internal("INDEX_FAILURE", message),
		}
	}
}
impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		Self::invalid(rejection.body_text())
	}
}
impl From<QueryRejection> for ApiError {
	fn from(rejection: QueryRejection) -> Self {
		Self::invalid(rejection.body_text())
	}
}
impl From<PathRejection> for ApiError {
	fn from(rejection: PathRejection) -> Self {
		Self::invalid(rejection.body_text())
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	let protected = Router::new()
		.route("/search/hybrid", post(hybrid_search))
		.route("/search/similar-notes/{note_id}", get(similar_notes))
		.route("/search/time-range", post(time_range_search))
		.route("/research-notes/{document_id}", post(create_note).get(list_notes))
		.route(
			"/research-notes/note/{note_id}",
			get(get_note).patch(update_note).delete(delete_note),
		)
		.route("/validation/pending", get(pending_validations))
		.route("/validation/validated", get(validated_notes))
		.route("/validation/{note_id}/submit", post(submit_for_validation))
		.route("/validation/{note_id}", post(validate_note))
		.route("/documents/{document_id}/chunks", post(index_document_chunks))
		.route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer));

	Router::new().route("/health", get(health)).merge(protected).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn hybrid_search(
	State(state): State<AppState>,
	payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Json<SearchResponse>> {
	let Json(payload) = payload?;

	Ok(Json(state.service.hybrid_search(payload).await?))
}

async fn similar_notes(
	State(state): State<AppState>,
	note_id: Result<Path<Uuid>, PathRejection>,
	params: Result<Query<SimilarNotesParams>, QueryRejection>,
) -> ApiResult<Json<Vec<SearchResult>>> {
	let Path(note_id) = note_id?;
	let Query(params) = params?;

	Ok(Json(state.service.search_similar_notes(note_id, params.limit).await?))
}

async fn time_range_search(
	State(state): State<AppState>,
	params: Result<Query<TimeRangeSearchRequest>, QueryRejection>,
) -> ApiResult<Json<SearchResponse>> {
	let Query(params) = params?;

	Ok(Json(state.service.search_by_time_range(params).await?))
}

async fn create_note(
	State(state): State<AppState>,
	Path(document_id): Path<String>,
	payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ResearchNote>)> {
	let Json(payload) = payload?;
	let note = state.service.create_note(&document_id, payload).await?;

	Ok((StatusCode::CREATED, Json(note)))
}

async fn list_notes(
	State(state): State<AppState>,
	Path(document_id): Path<String>,
	params: Result<Query<ListNotesParams>, QueryRejection>,
) -> ApiResult<Json<Vec<ResearchNote>>> {
	let Query(params) = params?;

	Ok(Json(state.service.list_notes(&document_id, params.verified_only).await?))
}

async fn get_note(
	State(state): State<AppState>,
	note_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ResearchNote>> {
	let Path(note_id) = note_id?;

	Ok(Json(state.service.get_note(note_id).await?))
}

async fn update_note(
	State(state): State<AppState>,
	note_id: Result<Path<Uuid>, PathRejection>,
	payload: Result<Json<UpdateNoteRequest>, JsonRejection>,
) -> ApiResult<Json<ResearchNote>> {
	let Path(note_id) = note_id?;
	let Json(payload) = payload?;

	Ok(Json(state.service.update_note(note_id, payload).await?))
}

async fn delete_note(
	State(state): State<AppState>,
	note_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
	let Path(note_id) = note_id?;

	state.service.delete_note(note_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn submit_for_validation(
	State(state): State<AppState>,
	note_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<ResearchNote>> {
	let Path(note_id) = note_id?;

	Ok(Json(state.service.submit_for_validation(note_id).await?))
}

async fn validate_note(
	State(state): State<AppState>,
	Extension(caller): Extension<Caller>,
	note_id: Result<Path<Uuid>, PathRejection>,
	payload: Result<Json<ValidateNoteRequest>, JsonRejection>,
) -> ApiResult<Json<ResearchNote>> {
	let Path(note_id) = note_id?;
	let Json(payload) = payload?;

	Ok(Json(state.service.validate_note(note_id, &caller.user_id, payload).await?))
}

async fn pending_validations(
	State(state): State<AppState>,
	params: Result<Query<DocumentScopeParams>, QueryRejection>,
) -> ApiResult<Json<Vec<ResearchNote>>> {
	let Query(params) = params?;

	Ok(Json(state.service.pending_validations(params.document_id.as_deref()).await?))
}

async fn validated_notes(
	State(state): State<AppState>,
	params: Result<Query<DocumentScopeParams>, QueryRejection>,
) -> ApiResult<Json<Vec<ResearchNote>>> {
	let Query(params) = params?;

	Ok(Json(state.service.validated_notes(params.document_id.as_deref()).await?))
}

async fn index_document_chunks(
	State(state): State<AppState>,
	Path(document_id): Path<String>,
	payload: Result<Json<IndexDocumentRequest>, JsonRejection>,
) -> ApiResult<Json<IndexDocumentResponse>> {
	let Json(payload) = payload?;

	Ok(Json(state.service.index_document_chunks(&document_id, payload).await?))
}

fn internal(error_code: &'static str, message: String) -> ApiError {
	tracing::error!(error_code, %message, "Request failed.");

	ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, error_code, message)
}
