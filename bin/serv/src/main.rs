use axum::{Router, middleware, routing::get};
use ghq_api::{config::ApiConfig, metrics, state::ApiState};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment variables
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env()?;

    ghq_api::tracing::init_tracing(&config.env);

    // Database pool + embedded migrations (includes the level/achievement seed)
    let pool = ghq_db::create_pool(&config.database_url, 10).await?;
    ghq_db::ensure_db_and_migrate(&config.database_url, &pool).await?;

    // Prometheus recorder; the handle renders the /metrics endpoint
    let metrics_handle = metrics::init_metrics()?;

    let state = ApiState::new(&config, pool);

    let app = ghq_api::router::router()
        .with_state(state)
        .merge(
            Router::new()
                .route("/metrics", get(metrics::metrics_handler))
                .with_state(metrics_handle),
        )
        .layer(middleware::from_fn(metrics::track_metrics))
        .layer(middleware::from_fn(
            ghq_api::middleware::request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
