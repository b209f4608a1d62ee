use crate::constants::DEFAULT_JWT_ISSUER;
use clap::{Parser, ValueEnum};
use std::{fmt, time::Duration};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Personal finance API backed by Plaid", long_about = None)]
pub struct Args {
	#[arg(long, env = "PORT", default_value_t = 8080)]
	pub port: u16,

	#[arg(
		long,
		env = "DATABASE_URL",
		help = "Full PostgreSQL URL. When absent the URL is built from the DB_* settings"
	)]
	pub database_url: Option<String>,

	#[arg(long, env = "DB_HOST", default_value = "localhost")]
	pub db_host: String,

	#[arg(long, env = "DB_PORT", default_value_t = 5432)]
	pub db_port: u16,

	#[arg(long, env = "DB_USER", default_value = "postgres")]
	pub db_user: String,

	#[arg(long, env = "DB_PASSWORD", default_value = "postgres", hide_env_values = true)]
	pub db_password: String,

	#[arg(long, env = "DB_NAME", default_value = "finance")]
	pub db_name: String,

	#[arg(long, env = "DB_SSLMODE", default_value = "disable")]
	pub db_sslmode: String,

	#[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 25)]
	pub db_max_connections: u32,

	#[arg(long, env = "DB_MIN_IDLE", default_value_t = 5)]
	pub db_min_idle: u32,

	#[arg(
		long,
		env = "DB_MAX_LIFETIME_SECS",
		default_value_t = 300,
		help = "Seconds after which a pooled connection is recycled"
	)]
	pub db_max_lifetime_secs: u64,

	#[arg(long, env = "JWT_SECRET", hide_env_values = true)]
	pub jwt_secret: String,

	#[arg(long, env = "JWT_EXPIRATION_MINUTES", default_value_t = 60)]
	pub jwt_expiration_minutes: u64,

	#[arg(long, env = "JWT_ISSUER", default_value = DEFAULT_JWT_ISSUER)]
	pub jwt_issuer: String,

	#[arg(long, env = "PLAID_CLIENT_ID", default_value = "")]
	pub plaid_client_id: String,

	#[arg(long, env = "PLAID_SECRET", default_value = "", hide_env_values = true)]
	pub plaid_secret: String,

	#[arg(long, env = "PLAID_ENV", value_enum, default_value_t = PlaidEnvironment::Sandbox)]
	pub plaid_env: PlaidEnvironment,

	#[arg(long, env = "PLAID_CLIENT_NAME", default_value = "Finance API")]
	pub plaid_client_name: String,

	#[arg(long, env = "PLAID_WEBHOOK_URL")]
	pub plaid_webhook_url: Option<String>,

	#[arg(long, env = "PLAID_BASE_URL", help = "Overrides the environment's Plaid host")]
	pub plaid_base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlaidEnvironment {
	Sandbox,
	Development,
	Production,
}

impl PlaidEnvironment {
	pub fn base_url(&self) -> &'static str {
		match self {
			PlaidEnvironment::Sandbox => "https://sandbox.plaid.com",
			PlaidEnvironment::Development => "https://development.plaid.com",
			PlaidEnvironment::Production => "https://production.plaid.com",
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			PlaidEnvironment::Sandbox => "sandbox",
			PlaidEnvironment::Development => "development",
			PlaidEnvironment::Production => "production",
		}
	}
}

impl fmt::Display for PlaidEnvironment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone)]
pub struct DatabaseConfig {
	pub url: String,
	pub max_connections: u32,
	pub min_idle: u32,
	pub max_lifetime: Duration,
}

#[derive(Clone)]
pub struct JwtConfig {
	pub secret: String,
	pub issuer: String,
	pub expiration: Duration,
}

#[derive(Clone)]
pub struct PlaidConfig {
	pub client_id: String,
	pub secret: String,
	pub environment: PlaidEnvironment,
	pub base_url: String,
	pub client_name: String,
	pub webhook_url: Option<String>,
}

/// Settings resolved once at startup and handed to every constructor.
#[derive(Clone)]
pub struct AppConfig {
	pub port: u16,
	pub database: DatabaseConfig,
	pub jwt: JwtConfig,
	pub plaid: PlaidConfig,
}

impl AppConfig {
	pub fn load() -> Self {
		dotenvy::dotenv().ok();
		Self::from(Args::parse())
	}
}

impl From<Args> for AppConfig {
	fn from(args: Args) -> Self {
		let url = args.database_url.clone().unwrap_or_else(|| {
			format!(
				"postgres://{}:{}@{}:{}/{}?sslmode={}",
				args.db_user,
				args.db_password,
				args.db_host,
				args.db_port,
				args.db_name,
				args.db_sslmode
			)
		});
		let base_url = args
			.plaid_base_url
			.clone()
			.unwrap_or_else(|| args.plaid_env.base_url().to_string());

		Self {
			port: args.port,
			database: DatabaseConfig {
				url,
				max_connections: args.db_max_connections,
				min_idle: args.db_min_idle.min(args.db_max_connections),
				max_lifetime: Duration::from_secs(args.db_max_lifetime_secs),
			},
			jwt: JwtConfig {
				secret: args.jwt_secret,
				issuer: args.jwt_issuer,
				expiration: Duration::from_secs(args.jwt_expiration_minutes * 60),
			},
			plaid: PlaidConfig {
				client_id: args.plaid_client_id,
				secret: args.plaid_secret,
				environment: args.plaid_env,
				base_url: base_url.trim_end_matches('/').to_string(),
				client_name: args.plaid_client_name,
				webhook_url: args.plaid_webhook_url,
			},
		}
	}
}
