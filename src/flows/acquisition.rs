//! Client-credentials acquisition against the authorization server.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	error::AuthError,
	flows::TokenClient,
	http::HttpTransport,
	oauth::{BasicFacade, OAuth2Facade},
	obs::{self, FlowKind},
};

impl<C> TokenClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Acquires a new credential regardless of what the store holds, replacing it on success.
	pub async fn acquire(&self) -> Result<Credential> {
		let _singleflight = self.guard.lock().await;

		self.acquire_locked().await
	}

	pub(super) async fn acquire_locked(&self) -> Result<Credential> {
		let result = obs::observe(FlowKind::Acquisition, "acquire", async {
			let settings = &self.settings;
			let facade = <BasicFacade<C>>::new(
				&settings.auth_url,
				&settings.client_id,
				&settings.client_secret,
				&settings.scope,
				settings.redirect_uri.as_ref(),
				self.http_client.clone(),
			)?;
			let grant = facade.exchange_client_credentials().await?;
			let credential = grant.into_credential(self.clock.now()).map_err(|e| {
				AuthError::AcquisitionFailed { status: None, reason: e.to_string() }
			})?;

			self.store.set(credential.clone())?;

			tracing::info!(expires_at = %credential.expires_at, "Acquired access token.");

			Ok(credential)
		})
		.await;

		match &result {
			Ok(_) => self.metrics.record_acquisition(),
			Err(_) => self.metrics.record_failure(),
		}

		result
	}
}
