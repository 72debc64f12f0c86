//! Grove - farm profile service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grove::{
    auth::TokenInput,
    config::{Args, Command},
    db::MongoClient,
    server::{self, AppState},
    store::{MemoryProfileStore, MongoProfileStore, ProfileStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(&args);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let jwt = args.jwt_validator()?;

    if let Command::MintToken { user_id } = args.command() {
        let token = jwt.generate_token(TokenInput { user_id })?;
        println!("{}", token);
        return Ok(());
    }

    info!("======================================");
    info!("  Grove - farm profile service");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} (db '{}')", args.mongodb_uri, args.mongodb_db);
    info!("Token expiry: {}s", jwt.expiry_seconds());
    info!("======================================");

    let store = open_store(&args).await?;
    let state = Arc::new(AppState::new(args, jwt, store));

    server::run(state).await?;
    Ok(())
}

fn init_tracing(args: &Args) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("grove={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// MongoDB unless memory-only is requested; dev mode falls back to memory
/// when MongoDB cannot be reached.
async fn open_store(args: &Args) -> anyhow::Result<Arc<dyn ProfileStore>> {
    if args.memory_store {
        return Ok(Arc::new(MemoryProfileStore::new()));
    }

    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => client,
        Err(e) if args.dev_mode => {
            warn!("MongoDB connection failed (dev mode, continuing in memory): {}", e);
            return Ok(Arc::new(MemoryProfileStore::new()));
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            return Err(e.into());
        }
    };

    info!("MongoDB connected successfully (db '{}')", mongo.db_name());
    Ok(Arc::new(MongoProfileStore::new(&mongo).await?))
}
