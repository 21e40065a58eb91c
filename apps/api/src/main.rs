mod artifacts;
mod config;
mod db;
mod errors;
mod latex;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod session;
mod state;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::artifacts::{ArtifactWriter, InMemoryArtifactStore, S3ArtifactStore};
use crate::config::{ArtifactBackend, Config, S3Settings, SessionBackend};
use crate::db::{create_pool, ensure_schema};
use crate::latex::TemplateLoader;
use crate::llm_client::{LlmClient, ModelTier};
use crate::routes::build_router;
use crate::session::store::{InMemorySessionStore, RedisSessionStore, SessionStore};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
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

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    let sessions = build_session_store(&config.sessions)?;
    let artifacts = build_artifact_writer(&config.artifacts).await?;

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!(
        "LLM client initialized (models: {}, {})",
        ModelTier::Standard.model_name(),
        ModelTier::Lite.model_name()
    );

    let templates = TemplateLoader::new(config.template_path.clone());
    if !templates.path().is_file() {
        // Not fatal: runs fail at the template step with a clear notice.
        warn!("LaTeX template not found at {}", templates.path().display());
    }

    // Build app state
    let state = AppState {
        llm: Arc::new(llm),
        sessions,
        templates,
        artifacts,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS origins once a web client exists

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_session_store(backend: &SessionBackend) -> Result<Arc<dyn SessionStore>> {
    Ok(match backend {
        SessionBackend::Memory { ttl_secs } => {
            info!("Session store: in-memory (ttl {ttl_secs}s)");
            Arc::new(InMemorySessionStore::new(Duration::from_secs(*ttl_secs)))
        }
        SessionBackend::Redis { url, ttl_secs } => {
            let client = redis::Client::open(url.as_str())?;
            info!("Session store: Redis (ttl {ttl_secs}s)");
            Arc::new(RedisSessionStore::new(client, *ttl_secs))
        }
    })
}

async fn build_artifact_writer(backend: &ArtifactBackend) -> Result<ArtifactWriter> {
    Ok(match backend {
        ArtifactBackend::Memory => {
            info!("Artifact store: in-memory");
            ArtifactWriter::new(Arc::new(InMemoryArtifactStore::new()))
        }
        ArtifactBackend::S3(settings) => {
            let pool = create_pool(&settings.database_url).await?;
            ensure_schema(&pool).await?;
            let s3 = build_s3_client(settings).await;
            info!("Artifact store: S3 bucket {}", settings.bucket);
            ArtifactWriter::new(Arc::new(S3ArtifactStore::new(
                pool,
                s3,
                settings.bucket.clone(),
            )))
        }
        ArtifactBackend::Disabled => {
            warn!("Artifact store disabled; generated LaTeX is returned inline");
            ArtifactWriter::disabled()
        }
    })
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(settings: &S3Settings) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &settings.access_key_id,
        &settings.secret_access_key,
        None,
        None,
        "tailor-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&settings.endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
