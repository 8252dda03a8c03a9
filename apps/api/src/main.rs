mod analysis;
mod auth;
mod config;
mod db;
mod errors;
mod images;
mod llm_client;
mod models;
mod outfits;
mod recommendation;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::directory::{MemoryUserDirectory, PgUserDirectory, UserDirectory};
use crate::auth::events::{spawn_audit_log, AuthEvents};
use crate::auth::tokens::TokenIssuer;
use crate::auth::Identity;
use crate::config::{Config, S3Config};
use crate::db::create_pool;
use crate::images::{ImageStore, LocalImageStore, S3ImageStore};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{MemoryOutfitStore, OutfitStore, PgOutfitStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting wardrobe API v{}", env!("CARGO_PKG_VERSION"));

    // Outfit store and user directory share one backend
    let outfit_store: Arc<dyn OutfitStore>;
    let directory: Arc<dyn UserDirectory>;
    match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            outfit_store = Arc::new(PgOutfitStore::new(pool.clone()));
            directory = Arc::new(PgUserDirectory::new(pool));
        }
        None => {
            warn!("DATABASE_URL not set: using in-memory storage, data is lost on restart");
            outfit_store = Arc::new(MemoryOutfitStore::new());
            directory = Arc::new(MemoryUserDirectory::new());
        }
    }

    // Identity (optional: unconfigured means 503 on auth routes)
    let events = AuthEvents::default();
    let _audit_log = spawn_audit_log(&events);
    let identity = match &config.jwt_secret {
        Some(secret) => Some(Identity::new(
            directory,
            TokenIssuer::new(secret, config.token_ttl_hours),
            events,
        )),
        None => {
            warn!("JWT_SECRET not set: identity provider unconfigured, sign-in is disabled");
            None
        }
    };

    // Photo storage
    let images: Arc<dyn ImageStore>;
    let mut local_dir = None;
    match &config.s3 {
        Some(s3) => {
            let client = build_s3_client(s3).await;
            info!("S3 client initialized (bucket: {})", s3.bucket);
            images = Arc::new(S3ImageStore::new(client, s3.bucket.clone()));
        }
        None => {
            info!("Storing photos under {}", config.upload_dir);
            images = Arc::new(LocalImageStore::new(&config.upload_dir));
            local_dir = Some(config.upload_dir.clone());
        }
    }

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    if llm.is_configured() {
        info!("LLM client initialized (model: {})", llm_client::MODEL);
    } else {
        warn!("ANTHROPIC_API_KEY not set: uploads will fail analysis, recommendations use fallback ranking");
    }

    let state = AppState {
        identity,
        outfits: outfit_store,
        images,
        analyzer: Arc::new(llm),
        recommendation_timeout: Duration::from_secs(config.recommendation_timeout_secs),
    };

    let mut app = build_router(state);
    if let Some(dir) = local_dir {
        app = app.nest_service("/uploads", ServeDir::new(dir));
    }
    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &S3Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.access_key_id,
        &config.secret_access_key,
        None,
        None,
        "wardrobe-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
