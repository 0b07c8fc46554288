//! Transport primitives shared by the token lifecycle, the registration gateway, and the proxy.
//!
//! The module exposes [`HttpTransport`] alongside [`ResponseMetadata`] and
//! [`ResponseMetadataSlot`] so callers can plug in their own HTTP stack (a recording fake in
//! tests, a tuned reqwest client in production) without losing status capture. Implementations
//! call [`ResponseMetadataSlot::take`] before dispatching a request and
//! [`ResponseMetadataSlot::store`] once an HTTP status is known, letting the token exchange
//! attach the status to acquisition failures.

// std
use std::ops::Deref;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		HeaderMap, HeaderValue, Method,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, HttpError, TransportError},
};

const APPLICATION_JSON: &str = "application/json";

/// Abstraction over HTTP transports capable of executing every outbound call the crate makes.
///
/// Callers provide an implementation (typically behind `Arc<T>`) and the crate requests
/// short-lived [`AsyncHttpClient`] handles that each carry a clone of a
/// [`ResponseMetadataSlot`]. The handles must own whatever state they need so their request
/// futures stay `Send` for the lifetime of the in-flight call.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	///
	/// # Metadata Contract
	///
	/// - Call [`ResponseMetadataSlot::take`] before submitting the request so stale information
	///   never leaks across calls.
	/// - Once a response (successful or not) arrives, save its status with
	///   [`ResponseMetadataSlot::store`].
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Captures metadata from the most recent HTTP response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token endpoints answer directly instead of redirecting, so custom clients passed through
/// [`ReqwestHttpClient::with_client`] should disable redirect following.
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that never follows redirects.
	pub fn without_redirects() -> Result<Self> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(ConfigError::from)?;

		Ok(Self(client))
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl HttpTransport for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		InstrumentedHandle::new(self.0.clone(), slot)
	}
}

struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// Handle returned by [`ReqwestHttpClient`] that records response status codes.
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
impl InstrumentedHandle {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self(Arc::new(InstrumentedHttpClient { client, slot }))
	}
}
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Appends `path` to `base`, keeping any path prefix `base` already carries.
pub fn join_url(base: &Url, path: &str) -> Result<Url, ConfigError> {
	let joined =
		format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'));

	Url::parse(&joined).map_err(|source| ConfigError::InvalidUrl { url: joined, source })
}

/// Builds a JSON request, optionally carrying a bearer token and extra headers.
///
/// The bearer token is applied last, so it replaces any `Authorization` header in `headers`.
pub(crate) fn json_request(
	method: Method,
	url: &Url,
	headers: &HeaderMap,
	body: Option<&serde_json::Value>,
	bearer: Option<&TokenSecret>,
) -> Result<HttpRequest> {
	let payload = match body {
		Some(value) => serde_json::to_vec(value).map_err(ConfigError::from)?,
		None => Vec::new(),
	};
	let mut request = oauth2::http::Request::builder()
		.method(method)
		.uri(url.as_str())
		.body(payload)
		.map_err(ConfigError::from)?;
	let request_headers = request.headers_mut();

	request_headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));

	for (name, value) in headers {
		request_headers.insert(name.clone(), value.clone());
	}

	if body.is_some() {
		request_headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
	}
	if let Some(token) = bearer {
		let value = HeaderValue::from_str(&token.bearer())
			.map_err(|e| ConfigError::from(oauth2::http::Error::from(e)))?;

		request_headers.insert(AUTHORIZATION, value);
	}

	Ok(request)
}

/// Sends `request` through a fresh transport handle.
pub(crate) async fn dispatch<C>(
	client: &C,
	request: HttpRequest,
	endpoint: &'static str,
) -> Result<HttpResponse>
where
	C: ?Sized + HttpTransport,
{
	let handle = client.with_metadata(ResponseMetadataSlot::default());

	AsyncHttpClient::call(&handle, request).await.map_err(|e| map_client_error(endpoint, e))
}

/// Converts non-success responses into [`HttpError`].
pub(crate) fn ensure_success(response: HttpResponse) -> Result<HttpResponse, HttpError> {
	let status = response.status();

	if status.is_success() {
		Ok(response)
	} else {
		Err(HttpError::new(status.as_u16(), response.body()))
	}
}

/// Decodes a JSON body, treating an empty body as `null`.
pub(crate) fn decode_json<T>(endpoint: &'static str, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let body = if body.iter().all(u8::is_ascii_whitespace) { b"null".as_slice() } else { body };
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::Decode { endpoint, source })
}

pub(crate) fn map_client_error<E>(endpoint: &'static str, err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(endpoint, *inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::network(endpoint, message).into(),
		_ => TransportError::network(endpoint, "unrecognized HTTP client failure").into(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn join_url_keeps_base_prefix() {
		let base = Url::parse("http://localhost:8000/backend/").expect("Base URL should parse.");

		assert_eq!(
			join_url(&base, "/api/register").expect("Join should succeed.").as_str(),
			"http://localhost:8000/backend/api/register"
		);

		let bare = Url::parse("http://localhost:8000").expect("Base URL should parse.");

		assert_eq!(
			join_url(&bare, "api/secure-data").expect("Join should succeed.").as_str(),
			"http://localhost:8000/api/secure-data"
		);
	}

	#[test]
	fn bearer_overrides_caller_authorization() {
		let url = Url::parse("http://localhost/api").expect("URL should parse.");
		let mut headers = HeaderMap::new();

		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
		headers.insert("x-trace", HeaderValue::from_static("1"));

		let request = json_request(
			Method::POST,
			&url,
			&headers,
			Some(&serde_json::json!({ "a": 1 })),
			Some(&TokenSecret::new("fresh")),
		)
		.expect("Request should build.");

		assert_eq!(request.headers()[AUTHORIZATION], "Bearer fresh");
		assert_eq!(request.headers()["x-trace"], "1");
		assert_eq!(request.headers()[CONTENT_TYPE], APPLICATION_JSON);
		assert_eq!(request.body(), br#"{"a":1}"#);
	}

	#[test]
	fn non_success_becomes_http_error() {
		let mut response = HttpResponse::new(br#"{"message":"email taken"}"#.to_vec());

		*response.status_mut() = oauth2::http::StatusCode::BAD_REQUEST;

		let err = ensure_success(response).expect_err("400 should be rejected.");

		assert_eq!(err.status, 400);
		assert_eq!(err.message(), "email taken");
	}

	#[test]
	fn decode_reports_path_and_accepts_empty_bodies() {
		let value: serde_json::Value =
			decode_json("test", b"").expect("Empty bodies should decode as null.");

		assert!(value.is_null());

		#[derive(Debug, Deserialize)]
		struct Shape {
			#[allow(dead_code)]
			count: u32,
		}

		let err = decode_json::<Shape>("test", br#"{"count":"x"}"#)
			.expect_err("Wrong field type should fail.");

		assert!(matches!(err, Error::Decode { endpoint: "test", .. }));
	}
}
