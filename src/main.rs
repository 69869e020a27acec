use std::sync::Arc;

use linksentry::cli::Cli;
use linksentry::config::ConfigStore;
use linksentry::core::notifier::TelegramNotifier;
use linksentry::core::scheduler::Scheduler;
use linksentry::error::AppError;
use linksentry::http_api::{build_router, ApiState};
use linksentry::logging::Logger;

/// Single `current_thread` Tokio runtime, per the teacher's own
/// cooperative-concurrency entrypoint: one executor, every subsystem
/// (scheduler, daily-report task, optional HTTP API) runs as a task on it
/// rather than on dedicated threads.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("linksentry: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    let config_store = ConfigStore::load(&config_path)
        .await
        .map_err(|e| AppError::Startup(format!("failed to load config from {}: {e}", config_path.display())))?;

    let logger = Logger::new(cli.log_path().unwrap_or_else(Logger::default_path));
    logger.info("main", "startup", &format!("loaded config from {}", config_path.display()));

    let config = config_store.snapshot().await;
    if config.telegram.bot_token.is_empty() {
        return Err(AppError::Startup("telegram.bot_token is required".to_string()));
    }

    let notifier = Arc::new(
        TelegramNotifier::new(config.telegram.bot_token.clone())
            .map_err(|e| AppError::Startup(format!("failed to build telegram client: {e}")))?,
    );

    let scheduler = Arc::new(Scheduler::new(
        config_store.clone(),
        logger.clone(),
        Arc::clone(&notifier),
        config.check.max_concurrent,
    ));

    if cli.once {
        scheduler.send_daily_report().await;
        return Ok(());
    }

    let mut tasks = tokio::task::JoinSet::new();

    {
        let scheduler = Arc::clone(&scheduler);
        tasks.spawn(async move { scheduler.run().await });
    }
    {
        let scheduler = Arc::clone(&scheduler);
        tasks.spawn(async move { scheduler.run_daily_report_task().await });
    }

    if config.http_api.enabled {
        let state = Arc::new(ApiState::new(
            config_store.clone(),
            Arc::clone(&notifier),
            config.telegram.chat_id.clone(),
        ));
        let router = build_router(state);
        let addr = format!("{}:{}", config.http_api.host, config.http_api.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::Startup(format!("failed to bind HTTP API on {addr}: {e}")))?;
        logger.info("main", "http_api_listening", &addr);
        tasks.spawn(async move {
            let _ = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
            )
            .await;
        });
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            logger.info("main", "shutdown", "received ctrl-c, exiting");
        }
    }

    Ok(())
}
