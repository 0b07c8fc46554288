//! Registration backend client.
//!
//! Forwards registration payloads to `<api_base_url>/api/register` and fetches the protected
//! resource at `<api_base_url>/api/secure-data`. Error bodies are kept verbatim in
//! [`HttpError`](crate::error::HttpError); [`HttpError::message`](crate::error::HttpError::message)
//! reduces them to the uniform message shown to users.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	flows::TokenClient,
	http::{self, HttpTransport, ReqwestHttpClient},
	obs::{self, FlowKind},
	requester::{AuthenticatedRequester, RequestOptions},
};

const REGISTER_PATH: &str = "/api/register";
const SECURE_DATA_PATH: &str = "/api/secure-data";
const DEFAULT_RECEIPT_MESSAGE: &str = "User registered.";

/// Registration form payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistration {
	/// Chosen username.
	pub username: String,
	/// Contact email.
	pub email: String,
	/// Plain-text password; redacted from `Debug`.
	pub password: String,
}
impl UserRegistration {
	/// Creates a registration payload.
	pub fn new(
		username: impl Into<String>,
		email: impl Into<String>,
		password: impl Into<String>,
	) -> Self {
		Self { username: username.into(), email: email.into(), password: password.into() }
	}
}
impl Debug for UserRegistration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UserRegistration")
			.field("username", &self.username)
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Successful registration response.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegistrationReceipt {
	/// Human-readable confirmation.
	#[serde(default = "default_receipt_message")]
	pub message: String,
	/// Access token issued by the backend, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access_token: Option<String>,
	/// Refresh token issued by the backend, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	/// Token type label accompanying the issued tokens.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_type: Option<String>,
}
impl Debug for RegistrationReceipt {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RegistrationReceipt")
			.field("message", &self.message)
			.field("access_token_set", &self.access_token.is_some())
			.field("refresh_token_set", &self.refresh_token.is_some())
			.field("token_type", &self.token_type)
			.finish()
	}
}

fn default_receipt_message() -> String {
	DEFAULT_RECEIPT_MESSAGE.into()
}

/// Forwards registrations to the backend and fetches the protected resource.
pub struct RegistrationGateway<C = ReqwestHttpClient>
where
	C: ?Sized + HttpTransport,
{
	http_client: Arc<C>,
	api_base_url: Url,
	requester: Option<AuthenticatedRequester<C>>,
}
impl<C> RegistrationGateway<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates an unauthenticated gateway.
	pub fn with_http_client(api_base_url: Url, http_client: impl Into<Arc<C>>) -> Self {
		Self { http_client: http_client.into(), api_base_url, requester: None }
	}

	/// Creates a gateway that attaches bearer tokens from `token_client` and shares its
	/// transport.
	pub fn with_token_client(api_base_url: Url, token_client: Arc<TokenClient<C>>) -> Self {
		Self {
			http_client: token_client.http_client.clone(),
			api_base_url,
			requester: Some(AuthenticatedRequester::new(token_client)),
		}
	}

	/// Backend base URL.
	pub fn api_base_url(&self) -> &Url {
		&self.api_base_url
	}

	/// Token client backing authenticated calls, if any.
	pub fn token_client(&self) -> Option<&Arc<TokenClient<C>>> {
		self.requester.as_ref().map(AuthenticatedRequester::token_client)
	}

	/// Forwards `registration` to the backend.
	///
	/// A bearer token is attached when the gateway was built with a token client.
	pub async fn register(&self, registration: &UserRegistration) -> Result<RegistrationReceipt> {
		self.post_registration(registration, "register").await
	}

	/// Forwards an arbitrary JSON `payload` and returns the backend's response body as is.
	///
	/// Validation is left to the backend.
	pub async fn forward_registration(
		&self,
		payload: &serde_json::Value,
	) -> Result<serde_json::Value> {
		self.post_registration(payload, "forward_registration").await
	}

	async fn post_registration<T, P>(&self, payload: &P, stage: &'static str) -> Result<T>
	where
		T: DeserializeOwned,
		P: ?Sized + Serialize + Sync,
	{
		obs::observe(FlowKind::Registration, stage, async {
			let url = http::join_url(&self.api_base_url, REGISTER_PATH)?;
			let options = RequestOptions::post(payload)?;

			match &self.requester {
				Some(requester) => requester.request(&url, options).await,
				None => self.send(&url, options, None, "registration endpoint").await,
			}
		})
		.await
	}

	/// Fetches the protected resource.
	///
	/// An explicit `token` is forwarded as is; otherwise the gateway's token client supplies
	/// one. Without either the request goes out unauthenticated and the backend decides.
	pub async fn fetch_secure_data(
		&self,
		token: Option<&TokenSecret>,
	) -> Result<serde_json::Value> {
		obs::observe(FlowKind::SecureFetch, "fetch_secure_data", async {
			let url = http::join_url(&self.api_base_url, SECURE_DATA_PATH)?;

			match (token, &self.requester) {
				(None, Some(requester)) => requester.request(&url, RequestOptions::get()).await,
				(token, _) => self.send(&url, RequestOptions::get(), token, "secure data").await,
			}
		})
		.await
	}

	async fn send<T>(
		&self,
		url: &Url,
		options: RequestOptions,
		bearer: Option<&TokenSecret>,
		endpoint: &'static str,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let RequestOptions { method, headers, json } = options;
		let request = http::json_request(method, url, &headers, json.as_ref(), bearer)?;
		let response = http::dispatch(self.http_client.as_ref(), request, endpoint).await?;
		let response = http::ensure_success(response)?;

		http::decode_json(endpoint, response.body())
	}
}
impl RegistrationGateway<ReqwestHttpClient> {
	/// Creates an unauthenticated gateway backed by the default reqwest transport.
	pub fn new(api_base_url: Url) -> Self {
		Self::with_http_client(api_base_url, ReqwestHttpClient::default())
	}
}
impl<C> Debug for RegistrationGateway<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RegistrationGateway")
			.field("api_base_url", &self.api_base_url.as_str())
			.field("authenticated", &self.requester.is_some())
			.finish()
	}
}
