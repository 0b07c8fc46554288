//! Layered application configuration.
//!
//! Sources merge in order: built-in defaults, an optional YAML file, then environment variables
//! prefixed with `SIGNUP_` using `__` as the nesting separator (`SIGNUP_AUTH__CLIENT_SECRET`
//! sets `auth.client_secret`). Secrets belong in the environment or a `.env` file, which the
//! binary loads before building the configuration.

// std
use std::{
	net::SocketAddr,
	path::{Path, PathBuf},
};
// crates.io
use figment::{
	Figment,
	providers::{Env, Format, Serialized, Yaml},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::ConfigError,
	flows::{RefreshFailurePolicy, TokenClientSettings},
	http,
	store::{CredentialStore, FileStore, MemoryStore, StoreError},
};

const ENV_PREFIX: &str = "SIGNUP_";
const MAX_EXPIRY_SKEW_SECS: u64 = 86_400;

/// Top-level configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
	/// Proxy listener.
	#[serde(default)]
	pub server: ServerConfig,
	/// Registration backend base URL.
	#[serde(default = "default_api_base_url")]
	pub api_base_url: String,
	/// Token lifecycle settings.
	#[serde(default)]
	pub auth: AuthConfig,
	/// Credential persistence.
	#[serde(default)]
	pub credentials: CredentialsConfig,
	/// Logging.
	#[serde(default)]
	pub log: LogConfig,
}
impl AppConfig {
	/// Loads defaults, the optional YAML file at `path`, then `SIGNUP_*` environment variables.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		if let Some(path) = path.filter(|path| !path.exists()) {
			return Err(ConfigError::MissingFile { path: path.to_path_buf() });
		}

		let mut figment = Figment::from(Serialized::defaults(Self::default()));

		if let Some(path) = path {
			figment = figment.merge(Yaml::file(path));
		}

		Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")).extract()?)
	}

	/// Parses YAML merged over the defaults, ignoring the environment.
	pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
		let figment = Figment::from(Serialized::defaults(Self::default()));

		Ok(figment.merge(Yaml::string(yaml)).extract()?)
	}

	/// Parsed registration backend base URL.
	pub fn api_base_url(&self) -> Result<Url, ConfigError> {
		Url::parse(&self.api_base_url)
			.map_err(|source| ConfigError::InvalidUrl { url: self.api_base_url.clone(), source })
	}

	/// Socket address the proxy binds to.
	pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
		format!("{}:{}", self.server.host, self.server.port)
			.parse()
			.map_err(|_| ConfigError::Missing { key: "server.host" })
	}

	/// Builds token client settings, rejecting missing credentials and endpoints.
	pub fn token_client_settings(&self) -> Result<TokenClientSettings, ConfigError> {
		let auth = &self.auth;
		let auth_url = auth.auth_url.clone().ok_or(ConfigError::Missing { key: "auth.auth_url" })?;

		if auth.client_id.is_empty() {
			return Err(ConfigError::Missing { key: "auth.client_id" });
		}
		if auth.client_secret.expose().is_empty() {
			return Err(ConfigError::Missing { key: "auth.client_secret" });
		}

		let refresh_url = http::join_url(&self.api_base_url()?, &auth.refresh_path)?;
		let skew = expiry_skew(auth.expiry_skew_secs)?;
		let mut settings = TokenClientSettings::new(
			auth_url,
			auth.client_id.clone(),
			auth.client_secret.clone(),
			refresh_url,
		)
		.scope(auth.scope.clone())
		.refresh_failure(auth.refresh_failure)
		.expiry_skew(skew);

		if let Some(redirect_uri) = &auth.redirect_uri {
			settings = settings.redirect_uri(redirect_uri.clone());
		}

		Ok(settings)
	}

	/// Opens the configured credential store; in-memory when no path is set.
	pub fn credential_store(&self) -> Result<Arc<dyn CredentialStore>, StoreError> {
		Ok(match &self.credentials.path {
			Some(path) => Arc::new(FileStore::open(path)?),
			None => Arc::new(MemoryStore::default()),
		})
	}
}
impl Default for AppConfig {
	fn default() -> Self {
		Self {
			server: ServerConfig::default(),
			api_base_url: default_api_base_url(),
			auth: AuthConfig::default(),
			credentials: CredentialsConfig::default(),
			log: LogConfig::default(),
		}
	}
}

/// Proxy listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
	/// Listen address.
	#[serde(default = "default_host")]
	pub host: String,
	/// Listen port.
	#[serde(default = "default_port")]
	pub port: u16,
}
impl Default for ServerConfig {
	fn default() -> Self {
		Self { host: default_host(), port: default_port() }
	}
}

/// Authorization server and refresh settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
	/// Authorization server token endpoint.
	#[serde(default)]
	pub auth_url: Option<Url>,
	/// OAuth client identifier.
	#[serde(default)]
	pub client_id: String,
	/// OAuth client secret.
	#[serde(default = "empty_secret")]
	pub client_secret: TokenSecret,
	/// Space-delimited scopes.
	#[serde(default)]
	pub scope: String,
	/// Redirect URI form parameter.
	#[serde(default)]
	pub redirect_uri: Option<Url>,
	/// Refresh endpoint path relative to `api_base_url`.
	#[serde(default = "default_refresh_path")]
	pub refresh_path: String,
	/// Behavior after a rejected refresh.
	#[serde(default)]
	pub refresh_failure: RefreshFailurePolicy,
	/// Seconds before expiry at which tokens count as expired; at most one day.
	#[serde(default)]
	pub expiry_skew_secs: u64,
}
impl Default for AuthConfig {
	fn default() -> Self {
		Self {
			auth_url: None,
			client_id: String::new(),
			client_secret: empty_secret(),
			scope: String::new(),
			redirect_uri: None,
			refresh_path: default_refresh_path(),
			refresh_failure: RefreshFailurePolicy::default(),
			expiry_skew_secs: 0,
		}
	}
}

/// Credential persistence settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
	/// JSON file holding the session credential.
	#[serde(default)]
	pub path: Option<PathBuf>,
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogConfig {
	/// Default `EnvFilter` directive when `RUST_LOG` is unset.
	#[serde(default = "default_log_level")]
	pub level: String,
}
impl Default for LogConfig {
	fn default() -> Self {
		Self { level: default_log_level() }
	}
}

fn expiry_skew(secs: u64) -> Result<Duration, ConfigError> {
	if secs > MAX_EXPIRY_SKEW_SECS {
		return Err(ConfigError::OutOfRange {
			key: "auth.expiry_skew_secs",
			value: secs,
			max: MAX_EXPIRY_SKEW_SECS,
		});
	}

	Ok(Duration::seconds(secs as i64))
}

fn default_api_base_url() -> String {
	"http://localhost:8000".into()
}

fn default_host() -> String {
	"127.0.0.1".into()
}

fn default_port() -> u16 {
	3000
}

fn default_refresh_path() -> String {
	"/api/token/refresh".into()
}

fn default_log_level() -> String {
	"info".into()
}

fn empty_secret() -> TokenSecret {
	TokenSecret::new(String::new())
}
