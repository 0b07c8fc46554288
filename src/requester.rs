//! Outbound calls that carry the session's bearer token.

// crates.io
use oauth2::http::{HeaderMap, HeaderName, HeaderValue, Method};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	flows::TokenClient,
	http::{self, HttpTransport, ReqwestHttpClient},
};

const ENDPOINT: &str = "authenticated resource";

/// Per-call options for [`AuthenticatedRequester::request`].
#[derive(Clone, Debug)]
pub struct RequestOptions {
	/// HTTP method; `GET` unless overridden.
	pub method: Method,
	/// Extra headers. An `Authorization` entry is always replaced by the session token.
	pub headers: HeaderMap,
	/// Optional JSON body.
	pub json: Option<serde_json::Value>,
}
impl RequestOptions {
	/// Options for a bodyless `GET`.
	pub fn get() -> Self {
		Self::default()
	}

	/// Options for a `POST` carrying `body` as JSON.
	pub fn post(body: &(impl Serialize + ?Sized)) -> Result<Self> {
		Self::default().method(Method::POST).json(body)
	}

	/// Overrides the HTTP method.
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;

		self
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn json(mut self, body: &(impl Serialize + ?Sized)) -> Result<Self> {
		self.json = Some(serde_json::to_value(body).map_err(ConfigError::from)?);

		Ok(self)
	}
}
impl Default for RequestOptions {
	fn default() -> Self {
		Self { method: Method::GET, headers: HeaderMap::new(), json: None }
	}
}

/// Wraps outbound HTTP calls with a valid bearer token from a [`TokenClient`].
///
/// Non-success responses fail with [`HttpError`](crate::error::HttpError) and are never
/// retried.
pub struct AuthenticatedRequester<C = ReqwestHttpClient>
where
	C: ?Sized + HttpTransport,
{
	token_client: Arc<TokenClient<C>>,
}
impl<C> AuthenticatedRequester<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a requester drawing tokens from `token_client` and sending through its transport.
	pub fn new(token_client: Arc<TokenClient<C>>) -> Self {
		Self { token_client }
	}

	/// Token client backing this requester.
	pub fn token_client(&self) -> &Arc<TokenClient<C>> {
		&self.token_client
	}

	/// Performs the call and decodes the JSON response body.
	///
	/// Use [`serde_json::Value`] as `T` for arbitrary bodies; an empty body decodes as `null`.
	pub async fn request<T>(&self, url: &Url, options: RequestOptions) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let token = self.token_client.get_valid_token().await?;
		let request = http::json_request(
			options.method,
			url,
			&options.headers,
			options.json.as_ref(),
			Some(&token),
		)?;
		let response =
			http::dispatch(self.token_client.http_client.as_ref(), request, ENDPOINT).await?;
		let response = http::ensure_success(response)?;

		http::decode_json(ENDPOINT, response.body())
	}
}
impl<C> Clone for AuthenticatedRequester<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { token_client: self.token_client.clone() }
	}
}
impl<C> Debug for AuthenticatedRequester<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedRequester").field("token_client", &self.token_client).finish()
	}
}
