//! Token lifecycle orchestration: acquisition, local expiry checks, refresh, and adoption.

pub mod common;

mod acquisition;
mod metrics;
mod refresh;

pub use common::*;
pub use metrics::FlowMetrics;

// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret, grant},
	clock::{Clock, SystemClock},
	error::ConfigError,
	http::{HttpTransport, ReqwestHttpClient},
	store::CredentialStore,
};

/// Acquires, caches, and refreshes the bearer token of one client session.
///
/// The client owns the HTTP transport, the credential store, and the clock. Every operation
/// that may touch the network holds a single-flight guard across the whole check-then-act
/// sequence, so concurrent callers that observe an expired credential trigger exactly one
/// refresh and then read the replacement from the store.
pub struct TokenClient<C = ReqwestHttpClient>
where
	C: ?Sized + HttpTransport,
{
	/// HTTP transport used for every token request.
	pub http_client: Arc<C>,
	/// Store holding the session credential.
	pub store: Arc<dyn CredentialStore>,
	/// Endpoints, client credentials, and lifecycle knobs.
	pub settings: TokenClientSettings,
	clock: Arc<dyn Clock>,
	metrics: Arc<FlowMetrics>,
	guard: Arc<AsyncMutex<()>>,
}
impl<C> TokenClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn CredentialStore>,
		settings: TokenClientSettings,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			settings,
			clock: Arc::new(SystemClock),
			metrics: Default::default(),
			guard: Default::default(),
		}
	}

	/// Replaces the time source used for expiry checks.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Returns an access token that is unexpired at the time of the check.
	///
	/// - No stored credential: acquires one from the authorization server.
	/// - Expired credential: refreshes it; a rejected refresh clears the credential and then either
	///   re-acquires or fails, per [`RefreshFailurePolicy`].
	/// - Otherwise: returns the stored token without any network call.
	pub async fn get_valid_token(&self) -> Result<TokenSecret> {
		let _singleflight = self.guard.lock().await;
		let Some(current) = self.store.get()? else {
			return self.acquire_locked().await.map(|credential| credential.access_token);
		};

		if !self.needs_refresh(&current) {
			self.metrics.record_cache_hit();

			return Ok(current.access_token);
		}

		match self.refresh_locked(current).await {
			Ok(credential) => Ok(credential.access_token),
			Err(Error::Auth(err))
				if err.is_refresh_failure()
					&& self.settings.refresh_failure == RefreshFailurePolicy::Reacquire =>
			{
				tracing::warn!(error = %err, "Refresh rejected; acquiring a new token.");

				self.acquire_locked().await.map(|credential| credential.access_token)
			},
			Err(err) => Err(err),
		}
	}

	/// Stores a token pair issued out of band (for example by the registration backend).
	///
	/// Expiry comes from the access token's `exp` claim; tokens without one are rejected.
	pub async fn adopt(
		&self,
		access_token: impl Into<String>,
		refresh_token: Option<String>,
	) -> Result<Credential> {
		let _singleflight = self.guard.lock().await;
		let credential =
			grant::credential_from_parts(access_token.into(), refresh_token, None, self.clock.now())
				.map_err(ConfigError::from)?;

		self.store.set(credential.clone())?;

		tracing::debug!(expires_at = %credential.expires_at, "Adopted externally issued token.");

		Ok(credential)
	}

	/// Returns the stored credential without validating it.
	pub fn credential(&self) -> Result<Option<Credential>> {
		Ok(self.store.get()?)
	}

	/// Clears the stored credential.
	pub async fn logout(&self) -> Result<()> {
		let _singleflight = self.guard.lock().await;

		self.store.clear()?;

		Ok(())
	}

	/// Lifecycle counters for this client.
	pub fn metrics(&self) -> &FlowMetrics {
		&self.metrics
	}

	fn needs_refresh(&self, credential: &Credential) -> bool {
		// A skewed instant past the representable range counts as expired.
		match self.clock.now().checked_add(self.settings.expiry_skew) {
			Some(instant) => credential.is_expired_at(instant),
			None => true,
		}
	}
}
impl TokenClient<ReqwestHttpClient> {
	/// Creates a client backed by the crate's default reqwest transport.
	pub fn new(store: Arc<dyn CredentialStore>, settings: TokenClientSettings) -> Self {
		Self::with_http_client(store, settings, ReqwestHttpClient::default())
	}
}
impl<C> Clone for TokenClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			store: self.store.clone(),
			settings: self.settings.clone(),
			clock: self.clock.clone(),
			metrics: self.metrics.clone(),
			guard: self.guard.clone(),
		}
	}
}
impl<C> Debug for TokenClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenClient").field("settings", &self.settings).finish()
	}
}
