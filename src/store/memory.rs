//! Thread-safe in-memory [`CredentialStore`] for tests and short-lived sessions.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	store::{CredentialStore, StoreError},
};

/// Keeps the session credential in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<Credential>>>);
impl MemoryStore {
	/// Creates a store seeded with `credential`.
	pub fn with_credential(credential: Credential) -> Self {
		Self(Arc::new(RwLock::new(Some(credential))))
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self) -> Result<Option<Credential>, StoreError> {
		Ok(self.0.read().clone())
	}

	fn set(&self, credential: Credential) -> Result<(), StoreError> {
		*self.0.write() = Some(credential);

		Ok(())
	}

	fn clear(&self) -> Result<(), StoreError> {
		self.0.write().take();

		Ok(())
	}
}
