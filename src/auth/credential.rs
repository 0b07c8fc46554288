//! Session credential record, lifecycle helpers, and builder.

// self
use crate::{
	_prelude::*,
	auth::{claims, secret::TokenSecret},
};

/// Current lifecycle status for a credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// Access token is still usable.
	Active,
	/// Access token reached its expiry instant.
	Expired,
}

/// Errors produced by [`CredentialBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CredentialBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (claim, absolute, or relative) could be determined.
	#[error("Expiry must come from the token's exp claim, expires_at, or expires_in.")]
	MissingExpiry,
	/// Issued when the expiry lies outside the representable date range.
	#[error("Expiry lies outside the representable date range.")]
	InvalidExpiry,
}

/// The single bearer credential held for a client session.
///
/// The record is always replaced as a whole; `expires_at` is kept at whole-second precision
/// so it serializes losslessly as Unix seconds.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if one was issued.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Expiry instant, serialized as Unix seconds.
	#[serde(rename = "expires_at_epoch_seconds", with = "time::serde::timestamp")]
	pub expires_at: OffsetDateTime,
}
impl Credential {
	/// Returns a builder for the provided access token.
	pub fn builder(access_token: impl Into<String>) -> CredentialBuilder {
		CredentialBuilder::new(access_token)
	}

	/// Expiry expressed as Unix seconds.
	pub fn expires_at_epoch_seconds(&self) -> i64 {
		self.expires_at.unix_timestamp()
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> CredentialStatus {
		if instant >= self.expires_at {
			CredentialStatus::Expired
		} else {
			CredentialStatus::Active
		}
	}

	/// Returns `true` if the access token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), CredentialStatus::Expired)
	}

	/// Returns `replacement`, keeping this credential's refresh token when `replacement` has
	/// none.
	pub fn rotated(&self, replacement: Credential) -> Credential {
		Credential {
			refresh_token: replacement.refresh_token.or_else(|| self.refresh_token.clone()),
			..replacement
		}
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`Credential`].
///
/// Expiry resolution order: an explicit [`expires_at`](Self::expires_at), then the access
/// token's own `exp` claim, then `issued_at + expires_in`.
#[derive(Clone, Debug)]
pub struct CredentialBuilder {
	access_token: TokenSecret,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl CredentialBuilder {
	fn new(access_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Sets the instant the grant was received.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides an optional refresh token value.
	pub fn maybe_refresh_token(self, token: Option<impl Into<String>>) -> Self {
		match token {
			Some(token) => self.refresh_token(token),
			None => self,
		}
	}

	/// Consumes the builder and produces a [`Credential`].
	pub fn build(self) -> Result<Credential, CredentialBuilderError> {
		if self.access_token.expose().is_empty() {
			return Err(CredentialBuilderError::MissingAccessToken);
		}

		let absolute =
			self.expires_at.or_else(|| claims::token_expiry(self.access_token.expose()));
		let expires_at = match absolute {
			Some(instant) => instant,
			None => {
				let delta = self.expires_in.ok_or(CredentialBuilderError::MissingExpiry)?;
				let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);

				issued_at.checked_add(delta).ok_or(CredentialBuilderError::InvalidExpiry)?
			},
		};

		Ok(Credential {
			access_token: self.access_token,
			refresh_token: self.refresh_token,
			expires_at: whole_seconds(expires_at),
		})
	}
}

fn whole_seconds(instant: OffsetDateTime) -> OffsetDateTime {
	instant - Duration::nanoseconds(i64::from(instant.nanosecond()))
}

#[cfg(test)]
mod tests {
	// crates.io
	use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
	use time::macros;
	// self
	use super::*;

	fn jwt(exp: i64) -> String {
		format!("h.{}.s", URL_SAFE_NO_PAD.encode(format!("{{\"exp\":{exp}}}")))
	}

	#[test]
	fn status_flips_at_expiry() {
		let credential = Credential::builder("access")
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Credential builder should succeed for status transitions.");

		assert_eq!(
			credential.status_at(macros::datetime!(2025-01-01 00:59:59 UTC)),
			CredentialStatus::Active
		);
		assert_eq!(
			credential.status_at(macros::datetime!(2025-01-01 01:00 UTC)),
			CredentialStatus::Expired
		);
	}

	#[test]
	fn exp_claim_wins_over_expires_in() {
		let credential = Credential::builder(jwt(50))
			.issued_at(OffsetDateTime::UNIX_EPOCH)
			.expires_in(Duration::hours(1))
			.build()
			.expect("Credential builder should accept JWT access tokens.");

		assert_eq!(credential.expires_at_epoch_seconds(), 50);
	}

	#[test]
	fn opaque_token_uses_relative_expiry_at_whole_seconds() {
		let credential = Credential::builder("opaque")
			.issued_at(macros::datetime!(2025-01-01 00:00:00.750 UTC))
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Credential builder should support relative expiry calculations.");

		assert_eq!(credential.expires_at, macros::datetime!(2025-01-01 00:30 UTC));
	}

	#[test]
	fn missing_expiry_is_rejected() {
		let err = Credential::builder("opaque")
			.build()
			.expect_err("Opaque tokens without expires_in have no expiry.");

		assert_eq!(err, CredentialBuilderError::MissingExpiry);
		assert_eq!(
			Credential::builder("").expires_in(Duration::MINUTE).build().expect_err("Empty token."),
			CredentialBuilderError::MissingAccessToken
		);
	}

	#[test]
	fn rotation_keeps_refresh_token_when_omitted() {
		let current = Credential::builder("old")
			.refresh_token("R")
			.expires_at(OffsetDateTime::UNIX_EPOCH)
			.build()
			.expect("Current credential should build.");
		let replacement = Credential::builder("new")
			.expires_at(OffsetDateTime::UNIX_EPOCH + Duration::HOUR)
			.build()
			.expect("Replacement credential should build.");
		let rotated = current.rotated(replacement);

		assert_eq!(rotated.access_token.expose(), "new");
		assert_eq!(rotated.refresh_token.as_ref().map(TokenSecret::expose), Some("R"));
	}

	#[test]
	fn serializes_expiry_as_epoch_seconds() {
		let credential = Credential::builder("a")
			.refresh_token("r")
			.expires_at(OffsetDateTime::UNIX_EPOCH + Duration::seconds(3600))
			.build()
			.expect("Credential should build.");
		let json = serde_json::to_value(&credential).expect("Credential should serialize.");

		assert_eq!(
			json,
			serde_json::json!({
				"access_token": "a",
				"refresh_token": "r",
				"expires_at_epoch_seconds": 3600,
			})
		);
	}

	#[test]
	fn debug_redacts_secrets() {
		let credential = Credential::builder("visible?")
			.refresh_token("hidden?")
			.expires_in(Duration::MINUTE)
			.build()
			.expect("Credential should build.");
		let rendered = format!("{credential:?}");

		assert!(!rendered.contains("visible?"));
		assert!(!rendered.contains("hidden?"));
	}
}
