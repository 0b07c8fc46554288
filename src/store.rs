//! Credential storage contract and built-in store implementations.
//!
//! Stores hold at most one [`Credential`] per session and replace it as a whole, so readers
//! never observe a record with fields from two different grants.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::Credential};

/// Storage backend contract for the session credential.
///
/// All operations are synchronous; implementations must make `set` atomic with respect to
/// concurrent `get` calls.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the stored credential, if any.
	fn get(&self) -> Result<Option<Credential>, StoreError>;

	/// Persists or replaces the stored credential.
	fn set(&self, credential: Credential) -> Result<(), StoreError>;

	/// Removes the stored credential.
	fn clear(&self) -> Result<(), StoreError>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
