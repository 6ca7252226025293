//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::jwt::{ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS};
use crate::password::DEFAULT_COST;
use clap::Parser;
use rand::{Rng, distr::Alphanumeric};
use tracing::{error, info, warn};
use url::Url;

const MIN_SECRET_LENGTH: usize = 32;

/// Length of ephemeral secrets generated in dev mode.
const EPHEMERAL_SECRET_LENGTH: usize = 48;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Keywarden",
    about = "Credential and session issuance with rotating refresh tokens"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7300")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "keywarden.db")]
    pub database: String,

    /// Public origin the service is reached at (decides the cookie Secure flag)
    #[arg(long, default_value = "http://localhost:7300")]
    pub public_origin: String,

    /// Access token lifetime in seconds
    #[arg(long, env = "JWT_ACCESS_TTL_SECS", default_value_t = ACCESS_TOKEN_TTL_SECS)]
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "JWT_REFRESH_TTL_SECS", default_value_t = REFRESH_TOKEN_TTL_SECS)]
    pub refresh_ttl_secs: u64,

    /// bcrypt work factor for password hashing
    #[arg(long, default_value_t = DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// Path to file containing the access token secret.
    /// Prefer using the JWT_ACCESS_SECRET env var instead
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret.
    /// Prefer using the JWT_REFRESH_SECRET env var instead
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Development mode: generate ephemeral signing secrets when none are
    /// configured. Never use in production
    #[arg(long)]
    pub dev: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load one signing secret from an environment variable or file.
fn load_secret(env_var: &str, file: Option<&str>, dev: bool) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else if dev {
        warn!(
            "{} not set, generating an ephemeral secret. Sessions will not survive a restart",
            env_var
        );
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(EPHEMERAL_SECRET_LENGTH)
            .map(char::from)
            .collect()
    } else {
        error!(
            "{} is required. Set the environment variable (recommended), use a secret file, or pass --dev",
            env_var
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_var, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load both signing secrets. The access and refresh secrets must differ so
/// one token class can never verify as the other.
pub fn load_secrets(args: &Args) -> Option<(Vec<u8>, Vec<u8>)> {
    let access = load_secret(
        "JWT_ACCESS_SECRET",
        args.access_secret_file.as_deref(),
        args.dev,
    )?;
    let refresh = load_secret(
        "JWT_REFRESH_SECRET",
        args.refresh_secret_file.as_deref(),
        args.dev,
    )?;

    if access == refresh {
        error!("Access and refresh secrets must not be identical");
        return None;
    }

    Some((access.into_bytes(), refresh.into_bytes()))
}

/// Parse and validate the public origin URL.
/// Returns None and logs an error if validation fails.
pub fn validate_public_origin(public_origin: &str) -> Option<Url> {
    let url = match Url::parse(public_origin) {
        Ok(url) => url,
        Err(e) => {
            error!(origin = %public_origin, error = %e, "Invalid public-origin URL");
            return None;
        }
    };

    let is_https = url.scheme() == "https";
    let is_localhost = url.host_str() == Some("localhost");

    if !is_https && !is_localhost {
        error!("public-origin must use HTTPS for non-localhost deployments");
        return None;
    }

    Some(url)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    public_origin: &Url,
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
) -> ServerConfig {
    let secure_cookies = public_origin.scheme() == "https";

    ServerConfig {
        db,
        access_secret,
        refresh_secret,
        access_ttl_secs: args.access_ttl_secs,
        refresh_ttl_secs: args.refresh_ttl_secs,
        bcrypt_cost: args.bcrypt_cost,
        secure_cookies,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
