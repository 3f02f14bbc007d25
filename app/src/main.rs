use clap::{Parser, Subcommand};
use fg_config::{Config, StorageConfig};
use fg_core::telemetry;
use fg_db::Db;
use fg_obs::{Metrics, ObsState};
use fg_storage::{BucketStore, EvidenceStore};
use fg_web::{auth::JwtAuth, models::Role, AppState, UploadLimits};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fairgo", version, about = "Story submission and moderation service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the API and observability servers (default)
    Serve,
    /// Print a signed moderator token for the configured secret
    IssueToken {
        /// Moderator identifier stored in the token subject
        #[arg(long)]
        subject: String,
        /// admin or viewer
        #[arg(long, default_value = "admin")]
        role: String,
        #[arg(long, default_value_t = 24)]
        ttl_hours: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration - exit with non-zero if invalid
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::IssueToken {
            subject,
            role,
            ttl_hours,
        } => issue_token(&config, &subject, &role, ttl_hours),
    }
}

fn issue_token(config: &Config, subject: &str, role: &str, ttl_hours: u64) {
    let role = match role.parse::<Role>() {
        Ok(role) => role,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    match JwtAuth::create_token_with_ttl(
        subject,
        role,
        &config.security.jwt_secret,
        ttl_hours.saturating_mul(3600),
    ) {
        Ok(token) => println!("{}", token),
        Err(e) => {
            eprintln!("Failed to issue token: {}", e);
            process::exit(1);
        }
    }
}

fn build_evidence_store(storage: &StorageConfig) -> fg_core::Result<Arc<dyn EvidenceStore>> {
    let store = match storage.backend.as_str() {
        "local" => BucketStore::local(
            &storage.local_dir,
            &storage.bucket,
            &storage.public_base_url,
        )?,
        "memory" => {
            tracing::warn!("Using in-memory evidence storage; uploads are lost on restart");
            BucketStore::in_memory(&storage.bucket)
        }
        _ => BucketStore::gcs(
            &storage.bucket,
            storage.service_account_path.as_deref(),
            &storage.public_base_url,
        )?,
    };
    Ok(Arc::new(store))
}

async fn serve(config: Config) {
    telemetry::init_tracing(&config.server.environment, "fairgo");
    tracing::info!("fairgo starting");
    tracing::debug!(?config, "Configuration loaded successfully");

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        obs_port = %config.server.obs_port,
        db_path = %config.database.path,
        storage_backend = %config.storage.backend,
        bucket = %config.storage.bucket,
        "Application configured"
    );

    // Initialize database with migrations
    let db = match Db::new(&config.database.path, config.database.pool_size).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to initialize database: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = db.health_check().await {
        tracing::error!("Database health check failed: {}", e);
        process::exit(1);
    }

    let evidence = match build_evidence_store(&config.storage) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to initialize evidence storage: {}", e);
            process::exit(1);
        }
    };

    let metrics = Arc::new(Metrics::new());
    let obs_state = ObsState::new(Arc::clone(&metrics));
    obs_state.readiness.set_ready(true);

    let web_app_state = AppState {
        db: db.clone(),
        evidence,
        metrics,
        jwt_secret: config.security.jwt_secret.clone(),
        upload_limits: UploadLimits {
            max_file_bytes: config.uploads.max_file_bytes,
            max_field_bytes: config.uploads.max_field_bytes,
        },
        json_limit: config.server.json_limit,
    };

    let obs_bind_addr = format!("0.0.0.0:{}", config.server.obs_port);
    let web_bind_addr = format!("{}:{}", config.server.host, config.server.port);

    // Run both servers concurrently
    let obs_future = fg_obs::start_server(&obs_bind_addr, obs_state);
    let web_future = fg_web::start_server(&web_bind_addr, web_app_state);

    let result = tokio::select! {
        obs_result = obs_future => {
            tracing::error!("Observability server exited");
            obs_result
        }
        web_result = web_future => {
            tracing::error!("Web server exited");
            web_result
        }
    };

    db.close().await;

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        process::exit(1);
    }
}
