//! Client-credentials facade over the `oauth2` crate.

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{AuthorizationGrant, TokenSecret},
	error::{AuthError, ConfigError},
	http::{self, HttpTransport, ResponseMetadata, ResponseMetadataSlot},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

const ENDPOINT: &str = "authorization server";

pub(crate) trait OAuth2Facade {
	/// Runs `grant_type=client_credentials` and returns the raw grant.
	fn exchange_client_credentials(&self) -> FacadeFuture<'_, AuthorizationGrant>;
}

/// Form-encoded client-credentials exchange with the secret sent in the request body.
pub(crate) struct BasicFacade<C>
where
	C: ?Sized + HttpTransport,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	scopes: Vec<Scope>,
	redirect_uri: Option<Url>,
}
impl<C> BasicFacade<C>
where
	C: ?Sized + HttpTransport,
{
	pub(crate) fn new(
		auth_url: &Url,
		client_id: &str,
		client_secret: &TokenSecret,
		scope: &str,
		redirect_uri: Option<&Url>,
		http_client: Arc<C>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(auth_url.to_string()).map_err(|source| {
			ConfigError::InvalidUrl { url: auth_url.to_string(), source }
		})?;
		let oauth_client = BasicClient::new(ClientId::new(client_id.to_owned()))
			.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
			.set_auth_type(AuthType::RequestBody)
			.set_token_uri(token_url);
		let scopes = scope.split_whitespace().map(|s| Scope::new(s.to_owned())).collect();

		Ok(Self { oauth_client, http_client, scopes, redirect_uri: redirect_uri.cloned() })
	}
}
impl<C> OAuth2Facade for BasicFacade<C>
where
	C: ?Sized + HttpTransport,
{
	fn exchange_client_credentials(&self) -> FacadeFuture<'_, AuthorizationGrant> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let mut request =
				self.oauth_client.exchange_client_credentials().add_scopes(self.scopes.clone());

			if let Some(redirect) = &self.redirect_uri {
				request = request.add_extra_param("redirect_uri", redirect.to_string());
			}

			let response = request
				.request_async(&instrumented)
				.await
				.map_err(|err| map_request_error(meta.take(), err))?;

			Ok(map_token_response(response))
		})
	}
}

fn map_token_response(response: BasicTokenResponse) -> AuthorizationGrant {
	AuthorizationGrant {
		access_token: response.access_token().secret().to_owned(),
		token_type: Some(response.token_type().as_ref().to_owned()),
		expires_in: response.expires_in().map(|lifetime| lifetime.as_secs()),
		scope: response.scopes().map(|scopes| {
			scopes.iter().map(|scope| scope.as_str()).collect::<Vec<_>>().join(" ")
		}),
		refresh_token: response.refresh_token().map(|token| token.secret().to_owned()),
	}
}

fn map_request_error<E>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(status, response),
		RequestTokenError::Request(error) => http::map_client_error(ENDPOINT, error),
		RequestTokenError::Parse(error, _body) => AuthError::AcquisitionFailed {
			status,
			reason: format!("token response could not be parsed at {}", error.path()),
		}
		.into(),
		RequestTokenError::Other(message) =>
			AuthError::AcquisitionFailed { status, reason: message }.into(),
	}
}

fn map_server_response_error(status: Option<u16>, response: BasicErrorResponse) -> Error {
	let reason = match response.error_description() {
		Some(description) => description.clone(),
		None => response.error().as_ref().to_owned(),
	};

	AuthError::AcquisitionFailed { status, reason }.into()
}
