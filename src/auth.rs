//! Credential model, redacted secrets, bearer-token claims, and token grants.

pub mod claims;
pub mod credential;
pub mod grant;
pub mod secret;

pub use claims::*;
pub use credential::*;
pub use grant::*;
pub use secret::*;
