//! Form-submit orchestration: acquire a token, register, then fetch the protected resource.

// self
use crate::{
	_prelude::*,
	flows::TokenClient,
	http::{HttpTransport, ReqwestHttpClient},
	registration::{RegistrationGateway, UserRegistration},
};

/// Message shown for every failed submission, whatever the cause.
pub const REGISTRATION_FAILED: &str = "Registration failed.";

/// User-facing result of [`SignupFlow::submit`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignupOutcome {
	/// Confirmation from the backend, or [`REGISTRATION_FAILED`].
	pub message: String,
	/// `message` field of the protected resource, when it was fetched.
	pub secure_data: Option<String>,
	#[serde(skip)]
	success: bool,
}
impl SignupOutcome {
	/// Returns `true` unless the submission failed.
	pub fn is_success(&self) -> bool {
		self.success
	}

	fn succeeded(message: String, secure_data: Option<String>) -> Self {
		Self { message, secure_data, success: true }
	}

	fn failed() -> Self {
		Self { message: REGISTRATION_FAILED.into(), secure_data: None, success: false }
	}
}

/// Drives one registration submission end to end.
pub struct SignupFlow<C = ReqwestHttpClient>
where
	C: ?Sized + HttpTransport,
{
	token_client: Arc<TokenClient<C>>,
	gateway: Arc<RegistrationGateway<C>>,
}
impl<C> SignupFlow<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a flow over an authenticated gateway.
	pub fn new(token_client: Arc<TokenClient<C>>, gateway: Arc<RegistrationGateway<C>>) -> Self {
		Self { token_client, gateway }
	}

	/// Submits `registration`.
	///
	/// Failures are logged with their cause and reduced to [`REGISTRATION_FAILED`].
	pub async fn submit(&self, registration: &UserRegistration) -> SignupOutcome {
		match self.try_submit(registration).await {
			Ok(outcome) => outcome,
			Err(e) => {
				tracing::error!(
					error = %e,
					username = %registration.username,
					"Registration failed."
				);

				SignupOutcome::failed()
			},
		}
	}

	async fn try_submit(&self, registration: &UserRegistration) -> Result<SignupOutcome> {
		self.token_client.get_valid_token().await?;

		let receipt = self.gateway.register(registration).await?;

		if let Some(access_token) = receipt.access_token.clone() {
			let adopted =
				self.token_client.adopt(access_token, receipt.refresh_token.clone()).await;

			if let Err(e) = adopted {
				tracing::warn!(error = %e, "Backend-issued token was not adopted.");
			}
		}

		let secure = self.gateway.fetch_secure_data(None).await?;
		let secure_data = secure.get("message").and_then(|value| value.as_str()).map(str::to_owned);

		Ok(SignupOutcome::succeeded(receipt.message, secure_data))
	}
}
impl<C> Debug for SignupFlow<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignupFlow").field("gateway", &self.gateway).finish()
	}
}
