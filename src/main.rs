use std::sync::Arc;
use std::time::Duration;

use discount_engine::{
    config::AppConfig,
    create_router, db,
    discounts::{InMemoryRuleRepository, PerformanceMetrics, PgRuleRepository, RuleRepository},
    AppState,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Discount Engine - Starting...");

    let config = AppConfig::from_env().expect("Invalid configuration");
    let metrics = PerformanceMetrics::new();

    let repository: Arc<dyn RuleRepository> = match config.database_url {
        Some(ref database_url) => {
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(
                database_url,
                config.db_max_connections,
                config.db_acquire_timeout,
            )
            .await
            .expect("Failed to create database pool");

            db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");

            Arc::new(PgRuleRepository::with_metrics(
                pool,
                config.rule_cache_ttl,
                metrics.clone(),
            ))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; rules are kept in memory and lost on restart");
            Arc::new(InMemoryRuleRepository::new())
        }
    };

    let reporter = metrics.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        interval.tick().await;
        loop {
            interval.tick().await;
            reporter.log_summary();
        }
    });

    let app = create_router(AppState::new(repository, metrics));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Discount Engine is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}
