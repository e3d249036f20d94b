use axum::{
	body::Body,
	extract::State,
	http::{HeaderMap, Request, header::AUTHORIZATION},
	middleware::Next,
	response::{IntoResponse, Response},
};

use crate::{routes::ApiError, state::AppState};

/// The authenticated user, inserted as a request extension by [`require_bearer`].
#[derive(Debug, Clone)]
pub struct Caller {
	pub user_id: String,
}

pub async fn require_bearer(
	State(state): State<AppState>,
	mut req: Request<Body>,
	next: Next,
) -> Response {
	let caller = read_bearer_token(req.headers())
		.and_then(|token| state.tokens.get(token))
		.map(|user_id| Caller { user_id: user_id.clone() });
	let Some(caller) = caller else {
		return ApiError::unauthorized().into_response();
	};

	req.extensions_mut().insert(caller);

	next.run(req).await
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}
