//! Token grant payloads returned by the authorization server and the refresh endpoint.

// self
use crate::{
	_prelude::*,
	auth::credential::{Credential, CredentialBuilderError},
};

/// Response of the client-credentials exchange, consumed once to populate a [`Credential`].
#[derive(Clone, Deserialize)]
pub struct AuthorizationGrant {
	/// Issued access token.
	pub access_token: String,
	/// Token type label, normally `Bearer`.
	#[serde(default)]
	pub token_type: Option<String>,
	/// Lifetime in seconds relative to issuance.
	#[serde(default)]
	pub expires_in: Option<u64>,
	/// Space-delimited granted scopes.
	#[serde(default)]
	pub scope: Option<String>,
	/// Refresh token, when the server issues one.
	#[serde(default)]
	pub refresh_token: Option<String>,
}
impl AuthorizationGrant {
	/// Builds the session credential, resolving expiry against `received_at`.
	pub fn into_credential(
		self,
		received_at: OffsetDateTime,
	) -> Result<Credential, CredentialBuilderError> {
		credential_from_parts(self.access_token, self.refresh_token, self.expires_in, received_at)
	}
}
impl Debug for AuthorizationGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationGrant")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("scope", &self.scope)
			.field("refresh_token_set", &self.refresh_token.is_some())
			.finish()
	}
}

/// Response of the refresh endpoint.
#[derive(Clone, Deserialize)]
pub struct RefreshGrant {
	/// Newly issued access token.
	pub access_token: String,
	/// Token type label, normally `bearer`.
	#[serde(default)]
	pub token_type: Option<String>,
	/// Lifetime in seconds, when the endpoint reports one.
	#[serde(default)]
	pub expires_in: Option<u64>,
	/// Rotated refresh token, when the endpoint rotates.
	#[serde(default)]
	pub refresh_token: Option<String>,
}
impl RefreshGrant {
	/// Builds a replacement credential; pair with [`Credential::rotated`] to keep the previous
	/// refresh token when none is returned.
	pub fn into_credential(
		self,
		received_at: OffsetDateTime,
	) -> Result<Credential, CredentialBuilderError> {
		credential_from_parts(self.access_token, self.refresh_token, self.expires_in, received_at)
	}
}
impl Debug for RefreshGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshGrant")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("refresh_token_set", &self.refresh_token.is_some())
			.finish()
	}
}

pub(crate) fn credential_from_parts(
	access_token: String,
	refresh_token: Option<String>,
	expires_in: Option<u64>,
	received_at: OffsetDateTime,
) -> Result<Credential, CredentialBuilderError> {
	let mut builder =
		Credential::builder(access_token).issued_at(received_at).maybe_refresh_token(refresh_token);

	// Zero lifetimes are ignored; oversized ones saturate and fail in `build`.
	let lifetime = expires_in
		.filter(|secs| *secs > 0)
		.map(|secs| i64::try_from(secs).unwrap_or(i64::MAX));

	if let Some(secs) = lifetime {
		builder = builder.expires_in(Duration::seconds(secs));
	}

	builder.build()
}
