//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use httpmock::MockServer;
use time::{Duration, OffsetDateTime};
// self
use signup_broker::{
	auth::Credential,
	clock::ManualClock,
	flows::{RefreshFailurePolicy, TokenClient, TokenClientSettings},
	store::CredentialStore,
	url::Url,
};

pub const TOKEN_PATH: &str = "/oauth2/token";
pub const REFRESH_PATH: &str = "/api/token/refresh";
pub const CLIENT_ID: &str = "signup-client";
pub const CLIENT_SECRET: &str = "signup-secret";
pub const SCOPE: &str = "api://backend/.default";
pub const REDIRECT_URI: &str = "http://localhost:3000/";

/// Builds an unsigned JWT-shaped token whose payload carries `exp`.
pub fn jwt_with_exp(exp: i64) -> String {
	let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
	let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"ada@example.com","exp":{exp}}}"#));

	format!("{header}.{payload}.signature")
}

pub fn url(value: &str) -> Url {
	Url::parse(value).expect("Fixture URL should parse.")
}

pub fn settings(server: &MockServer, policy: RefreshFailurePolicy) -> TokenClientSettings {
	TokenClientSettings::new(
		url(&server.url(TOKEN_PATH)),
		CLIENT_ID,
		CLIENT_SECRET,
		url(&server.url(REFRESH_PATH)),
	)
	.scope(SCOPE)
	.redirect_uri(url(REDIRECT_URI))
	.refresh_failure(policy)
}

pub fn token_client(
	settings: TokenClientSettings,
	store: Arc<dyn CredentialStore>,
	clock: &ManualClock,
) -> Arc<TokenClient> {
	Arc::new(TokenClient::new(store, settings).with_clock(Arc::new(clock.clone())))
}

pub fn credential(access_token: &str, refresh_token: Option<&str>, exp: i64) -> Credential {
	Credential::builder(access_token)
		.maybe_refresh_token(refresh_token)
		.expires_at(OffsetDateTime::UNIX_EPOCH + Duration::seconds(exp))
		.build()
		.expect("Fixture credential should build.")
}

pub fn token_grant(access_token: &str, expires_in: u64) -> serde_json::Value {
	serde_json::json!({
		"access_token": access_token,
		"token_type": "Bearer",
		"expires_in": expires_in,
		"scope": SCOPE,
	})
}
