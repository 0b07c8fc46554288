//! Unverified reads of self-contained bearer-token claims.
//!
//! Expiry checks run locally against the token's own `exp` claim instead of asking the
//! authorization server, so no signature verification happens here. The resource server stays
//! the authority on whether a token is actually accepted.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

/// Registered claims the client cares about.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BearerClaims {
	/// Subject the token was issued for.
	#[serde(default)]
	pub sub: Option<String>,
	/// Expiry as Unix seconds.
	#[serde(default)]
	pub exp: Option<i64>,
	/// Issued-at as Unix seconds.
	#[serde(default)]
	pub iat: Option<i64>,
}
impl BearerClaims {
	/// Decodes the payload segment of a JWT-shaped token.
	///
	/// Returns `None` for opaque tokens or payloads that are not JSON objects.
	pub fn decode(token: &str) -> Option<Self> {
		let mut segments = token.split('.');
		let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);

		if segments.next().is_some() {
			return None;
		}

		// Some issuers keep base64 padding even though RFC 7515 forbids it.
		let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;

		serde_json::from_slice(&decoded).ok()
	}

	/// Returns the `exp` claim as an instant, if present and representable.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.exp.and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok())
	}
}

/// Convenience helper returning the `exp` instant of a JWT-shaped token.
pub fn token_expiry(token: &str) -> Option<OffsetDateTime> {
	BearerClaims::decode(token)?.expires_at()
}

#[cfg(test)]
mod tests {
	// crates.io
	use base64::Engine as _;
	// self
	use super::*;

	fn encode(payload: &str) -> String {
		format!("eyJhbGciOiJIUzI1NiJ9.{}.signature", URL_SAFE_NO_PAD.encode(payload))
	}

	#[test]
	fn decodes_exp_claim() {
		let token = encode(r#"{"sub":"ada@example.com","exp":9999999999}"#);
		let claims = BearerClaims::decode(&token).expect("Claims should decode.");

		assert_eq!(claims.sub.as_deref(), Some("ada@example.com"));
		assert_eq!(claims.exp, Some(9_999_999_999));
		assert_eq!(token_expiry(&token).map(OffsetDateTime::unix_timestamp), Some(9_999_999_999));
	}

	#[test]
	fn tolerates_padded_payloads() {
		let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"exp":50}"#);
		let token = format!("h.{payload}.s");

		assert_eq!(token_expiry(&token).map(OffsetDateTime::unix_timestamp), Some(50));
	}

	#[test]
	fn opaque_tokens_have_no_claims() {
		assert_eq!(BearerClaims::decode("not-a-jwt"), None);
		assert_eq!(BearerClaims::decode("a.b"), None);
		assert_eq!(BearerClaims::decode("a.b.c.d"), None);
		assert_eq!(token_expiry(&encode("[1,2,3]")), None);
		assert_eq!(token_expiry(&encode(r#"{"sub":"x"}"#)), None);
	}
}
