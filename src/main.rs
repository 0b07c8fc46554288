//! `signup-broker` command-line entry point.

// std
use std::{path::PathBuf, sync::Arc};
// crates.io
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use signup_broker::{
	config::AppConfig,
	flows::TokenClient,
	http::ReqwestHttpClient,
	obs,
	registration::{RegistrationGateway, UserRegistration},
	server::{self, AppState},
	signup::SignupFlow,
};

#[derive(Debug, Parser)]
#[command(name = "signup-broker", version, about = "Registration client with managed tokens")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Run the browser-facing proxy.
	Serve {
		/// Path to the YAML configuration file.
		#[arg(short, long, value_name = "FILE")]
		config: Option<PathBuf>,
		/// Override the listening address.
		#[arg(long)]
		host: Option<String>,
		/// Override the listening port.
		#[arg(short, long)]
		port: Option<u16>,
	},
	/// Register a user and fetch the protected resource.
	Register {
		/// Username to register.
		#[arg(long)]
		username: String,
		/// Contact email.
		#[arg(long)]
		email: String,
		/// Password; prefer the environment over shell history.
		#[arg(long, env = "SIGNUP_PASSWORD", hide_env_values = true)]
		password: String,
		/// Path to the YAML configuration file.
		#[arg(short, long, value_name = "FILE")]
		config: Option<PathBuf>,
	},
	/// Obtain a valid token and print its expiry.
	Token {
		/// Path to the YAML configuration file.
		#[arg(short, long, value_name = "FILE")]
		config: Option<PathBuf>,
	},
	/// Clear the stored credential.
	Logout {
		/// Path to the YAML configuration file.
		#[arg(short, long, value_name = "FILE")]
		config: Option<PathBuf>,
	},
}

struct Runtime {
	config: AppConfig,
	token_client: Arc<TokenClient>,
	gateway: Arc<RegistrationGateway>,
}
impl Runtime {
	fn build(config_path: Option<PathBuf>) -> Result<Self> {
		let config = AppConfig::load(config_path.as_deref()).context("Failed to load config.")?;

		obs::init_logging(&config.log.level);

		let store = config.credential_store().context("Failed to open credential store.")?;
		let settings = config.token_client_settings().context("Invalid auth settings.")?;
		let http_client = ReqwestHttpClient::without_redirects()?;
		let token_client = Arc::new(TokenClient::with_http_client(store, settings, http_client));
		let gateway = Arc::new(RegistrationGateway::with_token_client(
			config.api_base_url()?,
			token_client.clone(),
		));

		Ok(Self { config, token_client, gateway })
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let _ = dotenvy::dotenv();
	let cli = Cli::parse();

	match cli.command {
		Command::Serve { config, host, port } => serve(config, host, port).await,
		Command::Register { username, email, password, config } =>
			register(config, UserRegistration::new(username, email, password)).await,
		Command::Token { config } => token(config).await,
		Command::Logout { config } => logout(config),
	}
}

async fn serve(config: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
	let mut runtime = Runtime::build(config)?;

	if let Some(host) = host {
		runtime.config.server.host = host;
	}
	if let Some(port) = port {
		runtime.config.server.port = port;
	}

	let addr = runtime.config.bind_addr()?;
	let listener = tokio::net::TcpListener::bind(addr)
		.await
		.with_context(|| format!("Failed to bind {addr}."))?;

	server::serve(listener, AppState::new(runtime.gateway)).await?;

	Ok(())
}

async fn register(config: Option<PathBuf>, registration: UserRegistration) -> Result<()> {
	let runtime = Runtime::build(config)?;
	let flow = SignupFlow::new(runtime.token_client, runtime.gateway);
	let outcome = flow.submit(&registration).await;

	println!("{}", outcome.message);

	if let Some(secure_data) = &outcome.secure_data {
		println!("Secure Data: {secure_data}");
	}
	if !outcome.is_success() {
		anyhow::bail!("Registration did not complete.");
	}

	Ok(())
}

async fn token(config: Option<PathBuf>) -> Result<()> {
	let runtime = Runtime::build(config)?;

	runtime.token_client.get_valid_token().await?;

	let credential = runtime
		.token_client
		.credential()?
		.context("Token client returned a token but stored no credential.")?;

	println!("Token valid until {}.", credential.expires_at);

	Ok(())
}

fn logout(config: Option<PathBuf>) -> Result<()> {
	let config = AppConfig::load(config.as_deref()).context("Failed to load config.")?;

	obs::init_logging(&config.log.level);
	config.credential_store().context("Failed to open credential store.")?.clear()?;

	println!("Stored credential cleared.");

	Ok(())
}
