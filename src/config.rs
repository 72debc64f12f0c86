//! Configuration for Grove
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;

use crate::auth::JwtValidator;
use crate::types::GroveError;

/// Grove - farm profile service
#[derive(Parser, Debug, Clone)]
#[command(name = "grove")]
#[command(about = "Farm profile service for irrigation scheduling")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Enable development mode (dev JWT secret, in-memory store fallback)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "grove")]
    pub mongodb_db: String,

    /// Keep profiles in memory only; nothing survives a restart
    #[arg(long, env = "MEMORY_STORE", default_value = "false")]
    pub memory_store: bool,

    /// JWT secret for token verification (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Print a signed token for an account id
    MintToken {
        #[arg(long)]
        user_id: String,
    },
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Subcommand to run; `serve` when none was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    /// Token validator for the configured secret.
    ///
    /// Dev mode without a secret falls back to the built-in dev key.
    pub fn jwt_validator(&self) -> Result<JwtValidator, GroveError> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone(), self.jwt_expiry_seconds),
            (None, true) => Ok(JwtValidator::new_dev()),
            (None, false) => Err(GroveError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }
}
