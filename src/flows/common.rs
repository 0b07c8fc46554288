//! Settings shared by the acquisition and refresh flows.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// What [`TokenClient::get_valid_token`](crate::flows::TokenClient::get_valid_token) does after a
/// refresh is rejected.
///
/// Either way the rejected credential is cleared first. Transport failures are never subject to
/// this policy; they propagate and leave the stored credential untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshFailurePolicy {
	/// Fall back to a fresh client-credentials acquisition.
	#[default]
	Reacquire,
	/// Surface the refresh error to the caller.
	Strict,
}

/// Endpoint and client settings for a [`TokenClient`](crate::flows::TokenClient).
#[derive(Clone, Debug)]
pub struct TokenClientSettings {
	/// Authorization server token endpoint.
	pub auth_url: Url,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret, sent in the form body.
	pub client_secret: TokenSecret,
	/// Space-delimited scopes requested on acquisition.
	pub scope: String,
	/// Redirect URI forwarded as a form parameter, when the server expects one.
	pub redirect_uri: Option<Url>,
	/// Backend refresh endpoint accepting `{"refresh_token": ...}`.
	pub refresh_url: Url,
	/// Behavior after a rejected refresh.
	pub refresh_failure: RefreshFailurePolicy,
	/// Tokens are treated as expired this long before their expiry instant.
	pub expiry_skew: Duration,
}
impl TokenClientSettings {
	/// Creates settings with defaults for every optional knob.
	pub fn new(
		auth_url: Url,
		client_id: impl Into<String>,
		client_secret: impl Into<TokenSecret>,
		refresh_url: Url,
	) -> Self {
		Self {
			auth_url,
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			scope: String::new(),
			redirect_uri: None,
			refresh_url,
			refresh_failure: RefreshFailurePolicy::default(),
			expiry_skew: Duration::ZERO,
		}
	}

	/// Sets the requested scopes.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = scope.into();

		self
	}

	/// Sets the redirect URI form parameter.
	pub fn redirect_uri(mut self, redirect_uri: Url) -> Self {
		self.redirect_uri = Some(redirect_uri);

		self
	}

	/// Overrides the refresh-failure policy.
	pub fn refresh_failure(mut self, policy: RefreshFailurePolicy) -> Self {
		self.refresh_failure = policy;

		self
	}

	/// Overrides the expiry skew; negative values clamp to zero.
	pub fn expiry_skew(mut self, skew: Duration) -> Self {
		self.expiry_skew = if skew.is_negative() { Duration::ZERO } else { skew };

		self
	}
}
