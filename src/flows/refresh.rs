//! Refresh of an expired credential through the backend refresh endpoint.
//!
//! The endpoint takes `{"refresh_token": ...}` as JSON and answers with a new access token,
//! optionally rotating the refresh token. The stored refresh token is kept when the response
//! omits one. A rejected refresh clears the stored credential before the error is returned, so
//! an expired token never lingers without a way to renew it.

// crates.io
use oauth2::http::{HeaderMap, Method};
// self
use crate::{
	_prelude::*,
	auth::{Credential, RefreshGrant},
	error::{AuthError, ConfigError},
	flows::TokenClient,
	http::{self, HttpTransport},
	obs::{self, FlowKind},
};

const ENDPOINT: &str = "refresh endpoint";

impl<C> TokenClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Refreshes the stored credential even if it has not expired yet.
	///
	/// Fails with [`AuthError::NoRefreshToken`] when nothing refreshable is stored. The
	/// refresh-failure policy does not apply here; rejections are always returned.
	pub async fn refresh(&self) -> Result<Credential> {
		let _singleflight = self.guard.lock().await;
		let current = self.store.get()?.ok_or(AuthError::NoRefreshToken)?;

		self.refresh_locked(current).await
	}

	pub(super) async fn refresh_locked(&self, current: Credential) -> Result<Credential> {
		let result = obs::observe(FlowKind::Refresh, "refresh", async {
			let Some(refresh_token) = current.refresh_token.clone() else {
				return self.reject_refresh(AuthError::NoRefreshToken);
			};
			let body = serde_json::json!({ "refresh_token": refresh_token.expose() });
			let request = http::json_request(
				Method::POST,
				&self.settings.refresh_url,
				&HeaderMap::new(),
				Some(&body),
				None,
			)?;
			let response = http::dispatch(self.http_client.as_ref(), request, ENDPOINT).await?;
			let status = response.status().as_u16();
			let response = match http::ensure_success(response) {
				Ok(response) => response,
				Err(e) =>
					return self.reject_refresh(AuthError::RefreshFailed {
						status: Some(e.status),
						reason: e.message(),
					}),
			};
			let replacement = match http::decode_json::<RefreshGrant>(ENDPOINT, response.body())
				.and_then(|grant| {
					grant.into_credential(self.clock.now()).map_err(|e| ConfigError::from(e).into())
				})
			{
				Ok(replacement) => replacement,
				Err(e) =>
					return self.reject_refresh(AuthError::RefreshFailed {
						status: Some(status),
						reason: e.to_string(),
					}),
			};
			let rotated = current.rotated(replacement);

			self.store.set(rotated.clone())?;

			tracing::info!(expires_at = %rotated.expires_at, "Refreshed access token.");

			Ok(rotated)
		})
		.await;

		match &result {
			Ok(_) => self.metrics.record_refresh(),
			Err(_) => self.metrics.record_failure(),
		}

		result
	}

	fn reject_refresh<T>(&self, err: AuthError) -> Result<T> {
		self.store.clear()?;

		tracing::warn!(error = %err, "Refresh rejected; cleared stored credential.");

		Err(err.into())
	}
}
