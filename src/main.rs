//! Loopline server binary.
//!
//! Wires configuration, the database, the notification worker, and the
//! HTTP API together, then serves until SIGTERM or Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use loopline_api::{build_router, AppState};
use loopline_auth::{JwtDecoder, JwtEncoder, PasswordHasher};
use loopline_core::config::AppConfig;
use loopline_core::error::AppError;
use loopline_database::repositories::{
    ConnectionRepository, JobRepository, MessageRepository, StoryRepository, UserRepository,
};
use loopline_database::traits::{ConnectionStore, JobStore, MessageStore, StoryStore, UserStore};
use loopline_database::{migration, DatabasePool};
use loopline_mailer::{MailTransport, SmtpMailer};
use loopline_realtime::{ChannelRegistry, LiveDispatcher};
use loopline_service::{
    AuthService, ConnectionService, LocalMediaStore, MediaStore, MessageService, StoryService,
};
use loopline_worker::jobs::{
    ConnectionMailHandler, ConnectionReminderHandler, DigestSendHandler, StoryExpiryHandler,
    UnseenDigestHandler,
};
use loopline_worker::{CronScheduler, JobExecutor, JobQueue, WorkerRunner};

#[tokio::main]
async fn main() {
    let env = std::env::var("LOOPLINE_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server exited with an error");
        std::process::exit(1);
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    let config = Arc::new(config);

    tracing::info!("Connecting to database");
    let db = DatabasePool::connect(&config.database).await?;
    migration::run_migrations(db.pool()).await?;

    let users: Arc<dyn UserStore> = Arc::new(UserRepository::new(db.pool().clone()));
    let messages: Arc<dyn MessageStore> = Arc::new(MessageRepository::new(db.pool().clone()));
    let connections: Arc<dyn ConnectionStore> =
        Arc::new(ConnectionRepository::new(db.pool().clone()));
    let stories: Arc<dyn StoryStore> = Arc::new(StoryRepository::new(db.pool().clone()));
    let jobs: Arc<dyn JobStore> = Arc::new(JobRepository::new(db.pool().clone()));

    let hasher = PasswordHasher::new();
    let jwt_encoder = JwtEncoder::new(&config.auth);
    let jwt_decoder = Arc::new(JwtDecoder::new(&config.auth));

    let mailer: Arc<dyn MailTransport> = Arc::new(SmtpMailer::new(&config.mailer)?);
    let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::new(&config.media).await?);

    let registry = Arc::new(ChannelRegistry::new());
    let dispatcher = LiveDispatcher::new(registry.clone());

    let auth_service = AuthService::new(users.clone(), hasher, jwt_encoder);
    let message_service =
        MessageService::new(messages.clone(), users.clone(), media.clone(), dispatcher);
    let connection_service =
        ConnectionService::new(connections.clone(), users.clone(), jobs.clone());
    let story_service = StoryService::new(
        stories.clone(),
        jobs.clone(),
        media,
        config.worker.story_ttl_hours,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut worker_handle = None;
    let mut scheduler = None;
    if config.worker.enabled {
        let worker_id = format!("worker-{}", &Uuid::new_v4().to_string()[..8]);
        let queue = Arc::new(JobQueue::new(jobs.clone(), worker_id));
        let frontend_url = config.mailer.frontend_url.clone();

        let mut executor = JobExecutor::new();
        executor.register(Arc::new(ConnectionMailHandler::new(
            connections.clone(),
            mailer.clone(),
            queue.clone(),
            frontend_url.clone(),
            config.worker.connection_reminder_hours,
        )));
        executor.register(Arc::new(ConnectionReminderHandler::new(
            connections.clone(),
            mailer.clone(),
            frontend_url.clone(),
        )));
        executor.register(Arc::new(StoryExpiryHandler::new(stories.clone())));
        executor.register(Arc::new(UnseenDigestHandler::new(
            messages.clone(),
            queue.clone(),
        )));
        executor.register(Arc::new(DigestSendHandler::new(
            users.clone(),
            mailer.clone(),
            frontend_url,
        )));

        let runner = WorkerRunner::new(queue.clone(), Arc::new(executor), config.worker.clone());
        let rx = shutdown_rx.clone();
        worker_handle = Some(tokio::spawn(async move { runner.run(rx).await }));

        let cron = CronScheduler::new(queue).await?;
        cron.register_unseen_digest(&config.worker.digest_cron)
            .await?;
        cron.start().await?;
        scheduler = Some(cron);

        tracing::info!(concurrency = config.worker.concurrency, "Worker started");
    }

    let state = AppState {
        config: config.clone(),
        db: db.clone(),
        users,
        auth: auth_service,
        messages: message_service,
        connections: connection_service,
        stories: story_service,
        registry,
        jwt_decoder,
    };

    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::configuration(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    if let Some(handle) = worker_handle {
        let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Worker did not drain in time, aborting");
        }
    }
    if let Some(mut cron) = scheduler {
        cron.shutdown().await?;
    }

    db.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
