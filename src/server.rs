//! Browser-facing passthrough proxy.
//!
//! Routes:
//! - `POST /api/register`   forwards the JSON body to the backend and relays its answer
//! - `GET  /api/secureData` forwards the caller's bearer token (or the proxy's own) to the
//!   backend's `/api/secure-data`
//!
//! Any other method on these paths answers 405 with an `Allow` header. Backend rejections keep
//! their status and are reduced to `{"message": ...}`, as are unreadable request bodies;
//! everything else becomes a 500.

// crates.io
use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::{HeaderMap, Method, StatusCode, header},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{INTERNAL_SERVER_ERROR, TransportError},
	registration::RegistrationGateway,
};

/// Shared state handed to every route.
#[derive(Debug)]
pub struct AppState {
	/// Backend gateway; its token client supplies tokens when callers send none.
	pub gateway: Arc<RegistrationGateway>,
}
impl AppState {
	/// Wraps `gateway` in shareable state.
	pub fn new(gateway: Arc<RegistrationGateway>) -> Arc<Self> {
		Arc::new(Self { gateway })
	}
}

/// Failure rendered as a JSON `{"message": ...}` response.
#[derive(Debug)]
pub enum ApiError {
	/// The backend call failed.
	Upstream(Error),
	/// The incoming request body could not be read as JSON.
	BadBody(JsonRejection),
}
impl ApiError {
	fn classify(&self) -> (StatusCode, String) {
		match self {
			Self::Upstream(Error::Http(e)) => (
				StatusCode::from_u16(e.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
				e.message(),
			),
			Self::Upstream(_) =>
				(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_SERVER_ERROR.into()),
			Self::BadBody(rejection) => (rejection.status(), rejection.body_text()),
		}
	}
}
impl From<Error> for ApiError {
	fn from(e: Error) -> Self {
		Self::Upstream(e)
	}
}
impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		Self::BadBody(rejection)
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, message) = self.classify();

		match &self {
			Self::Upstream(e) =>
				tracing::error!(error = %e, status = status.as_u16(), "Upstream call failed."),
			Self::BadBody(rejection) => tracing::warn!(
				error = %rejection,
				status = status.as_u16(),
				"Rejected request body."
			),
		}

		(status, Json(serde_json::json!({ "message": message }))).into_response()
	}
}

/// Builds the proxy router.
pub fn router(state: Arc<AppState>) -> Router {
	Router::new()
		.route(
			"/api/register",
			post(register).fallback(|method: Method| async move {
				method_not_allowed(&method, "POST")
			}),
		)
		.route(
			"/api/secureData",
			get(secure_data).fallback(|method: Method| async move {
				method_not_allowed(&method, "GET")
			}),
		)
		.with_state(state)
		.layer(TraceLayer::new_for_http())
}

/// Serves the proxy on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
	let addr = listener.local_addr().map_err(TransportError::Io)?;

	tracing::info!(%addr, "Proxy listening.");

	axum::serve(listener, router(state))
		.with_graceful_shutdown(async {
			let _ = tokio::signal::ctrl_c().await;
		})
		.await
		.map_err(TransportError::Io)?;

	Ok(())
}

async fn register(
	State(state): State<Arc<AppState>>,
	payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
	let Json(payload) = payload?;

	Ok(Json(state.gateway.forward_registration(&payload).await?))
}

async fn secure_data(
	State(state): State<Arc<AppState>>,
	headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
	let token = bearer_token(&headers);

	Ok(Json(state.gateway.fetch_secure_data(token.as_ref()).await?))
}

fn method_not_allowed(method: &Method, allow: &'static str) -> Response {
	(
		StatusCode::METHOD_NOT_ALLOWED,
		[(header::ALLOW, allow)],
		format!("Method {method} Not Allowed"),
	)
		.into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<TokenSecret> {
	let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
	let (scheme, token) = value.trim().split_once(' ')?;
	let token = token.trim();

	(scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| TokenSecret::new(token))
}

#[cfg(test)]
mod tests {
	// crates.io
	use axum::http::HeaderValue;
	// self
	use super::*;
	use crate::error::HttpError;

	#[test]
	fn bearer_token_requires_scheme_and_value() {
		let mut headers = HeaderMap::new();

		assert!(bearer_token(&headers).is_none());

		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));

		assert!(bearer_token(&headers).is_none());

		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer  tok "));

		assert_eq!(bearer_token(&headers).map(|t| t.expose().to_owned()), Some("tok".into()));
	}

	#[test]
	fn api_error_keeps_backend_status() {
		let rejected =
			ApiError::from(Error::from(HttpError::new(400, br#"{"message":"email taken"}"#)));
		let broken = ApiError::from(Error::from(crate::error::AuthError::NoRefreshToken));

		assert_eq!(rejected.classify(), (StatusCode::BAD_REQUEST, "email taken".into()));
		assert_eq!(
			broken.classify(),
			(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_SERVER_ERROR.into())
		);
	}
}
