//! Crate-level error types shared across flows, stores, and the proxy surface.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fallback message used when an upstream error body carries nothing usable.
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token acquisition or refresh failure.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Upstream answered with a non-success status.
	#[error(transparent)]
	Http(#[from] HttpError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// A success response carried a body that could not be decoded.
	#[error("Response from {endpoint} could not be decoded.")]
	Decode {
		/// Logical endpoint label.
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Failures raised by the token lifecycle.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// The authorization server rejected the client credentials grant or answered garbage.
	#[error("Token acquisition failed: {reason}.")]
	AcquisitionFailed {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Server- or client-supplied reason string.
		reason: String,
	},
	/// The stored credential expired and carries no refresh token.
	#[error("Stored credential has no refresh token.")]
	NoRefreshToken,
	/// The refresh endpoint rejected the refresh token or answered garbage.
	#[error("Token refresh failed: {reason}.")]
	RefreshFailed {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Server- or client-supplied reason string.
		reason: String,
	},
}
impl AuthError {
	/// Returns `true` when the refresh-failure policy may fall back to a fresh acquisition.
	pub fn is_refresh_failure(&self) -> bool {
		matches!(self, Self::NoRefreshToken | Self::RefreshFailed { .. })
	}
}

/// Non-success response from an upstream service.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Upstream responded with HTTP {status}.")]
pub struct HttpError {
	/// HTTP status code returned by the upstream.
	pub status: u16,
	/// Raw response body.
	pub body: String,
}
impl HttpError {
	/// Creates an error from a status code and raw body bytes.
	pub fn new(status: u16, body: &[u8]) -> Self {
		Self { status, body: String::from_utf8_lossy(body).into_owned() }
	}

	/// Normalizes the body into a single user-facing message.
	///
	/// Prefers a JSON `message` string, then a JSON `detail` string, and falls back to
	/// [`INTERNAL_SERVER_ERROR`].
	pub fn message(&self) -> String {
		let Ok(value) = serde_json::from_str::<serde_json::Value>(&self.body) else {
			return INTERNAL_SERVER_ERROR.into();
		};

		["message", "detail"]
			.iter()
			.find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
			.filter(|message| !message.is_empty())
			.unwrap_or(INTERNAL_SERVER_ERROR)
			.to_owned()
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A configured URL cannot be parsed or joined.
	#[error("Configured URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL or path.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody(#[from] serde_json::Error),
	/// Configuration sources could not be merged or extracted.
	#[error("Configuration could not be loaded: {0}")]
	Load(#[from] Box<figment::Error>),
	/// Credential could not be built from a grant.
	#[error("Unable to build credential.")]
	CredentialBuild(#[from] crate::auth::CredentialBuilderError),
	/// A required setting is absent or empty.
	#[error("Required setting `{key}` is missing.")]
	Missing {
		/// Dotted configuration key.
		key: &'static str,
	},
	/// A numeric setting lies outside its accepted range.
	#[error("Setting `{key}` must be at most {max}, got {value}.")]
	OutOfRange {
		/// Dotted configuration key.
		key: &'static str,
		/// Rejected value.
		value: u64,
		/// Largest accepted value.
		max: u64,
	},
	/// An explicitly requested configuration file does not exist.
	#[error("Configuration file {} does not exist.", path.display())]
	MissingFile {
		/// Requested path.
		path: std::path::PathBuf,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<figment::Error> for ConfigError {
	fn from(e: figment::Error) -> Self {
		Self::Load(Box::new(e))
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {endpoint}.")]
	Network {
		/// Logical endpoint label.
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(endpoint: &'static str, src: impl Into<BoxError>) -> Self {
		Self::Network { endpoint, source: src.into() }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn http_error_prefers_message_then_detail() {
		let with_message = HttpError::new(400, br#"{"message":"email taken","detail":"x"}"#);
		let with_detail = HttpError::new(400, br#"{"detail":"User already registered"}"#);

		assert_eq!(with_message.message(), "email taken");
		assert_eq!(with_detail.message(), "User already registered");
	}

	#[test]
	fn http_error_falls_back_for_opaque_bodies() {
		let html = HttpError::new(502, b"<html>bad gateway</html>");
		let validation = HttpError::new(422, br#"{"detail":[{"loc":["body","email"]}]}"#);
		let blank = HttpError::new(500, br#"{"message":""}"#);

		assert_eq!(html.message(), INTERNAL_SERVER_ERROR);
		assert_eq!(validation.message(), INTERNAL_SERVER_ERROR);
		assert_eq!(blank.message(), INTERNAL_SERVER_ERROR);
	}

	#[test]
	fn refresh_failures_are_classified() {
		let rejected = AuthError::RefreshFailed { status: Some(401), reason: "nope".into() };
		let acquisition = AuthError::AcquisitionFailed { status: None, reason: "nope".into() };

		assert!(AuthError::NoRefreshToken.is_refresh_failure());
		assert!(rejected.is_refresh_failure());
		assert!(!acquisition.is_refresh_failure());
	}

	#[test]
	fn store_error_converts_with_source() {
		let store_error = crate::store::StoreError::Backend { message: "disk full".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("disk full"));

		let source = StdError::source(&error).expect("Storage errors should expose their source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
