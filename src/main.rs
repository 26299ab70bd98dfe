use anyhow::{Context, Result};
use std::{convert::Infallible, sync::Arc, time::Instant};
use tracing::info;
use vozreach::{
    config::Config,
    logging,
    pipeline::{response, Collaborators, Pipeline},
};
use warp::{http::StatusCode, reject::Rejection, reply::Reply, Filter};

async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "vozreach"
    })))
}

/// Runs the whole job once; the request itself carries nothing we need.
async fn trigger(pipeline: Arc<Pipeline>) -> Result<impl Reply, Rejection> {
    let start = Instant::now();
    let result = pipeline.run().await;
    let (message, status) = response(&result);
    info!(
        status,
        elapsed = ?start.elapsed(),
        "run finished: {}",
        message
    );

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok(warp::reply::with_status(message, status))
}

fn with_pipeline(
    pipeline: Arc<Pipeline>,
) -> impl Filter<Extract = (Arc<Pipeline>,), Error = Infallible> + Clone {
    warp::any().map(move || pipeline.clone())
}

fn trigger_route(
    pipeline: Arc<Pipeline>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path::end()
        .and(with_pipeline(pipeline))
        .and_then(trigger)
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    logging::init();
    info!("Starting overnight programs reach job service");

    // ─── 2) config + collaborators, built once ───────────────────────
    let config = Config::from_env().context("loading configuration")?;
    let port = config.port;
    info!(
        bucket = %config.gcs_bucket,
        table = %config.destination_table,
        table_2 = %config.destination_table_2,
        project = %config.project_id,
        "configuration loaded"
    );
    let services = Collaborators::live(&config)
        .await
        .context("initializing cloud clients")?;
    let pipeline = Arc::new(Pipeline::new(config, services));

    // ─── 3) routes ───────────────────────────────────────────────────
    let health = warp::path("health").and(warp::get()).and_then(health_check);
    let routes = health.or(trigger_route(pipeline));

    info!("Server starting on port {}", port);
    info!("Trigger: http://localhost:{}/", port);
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;

    Ok(())
}
