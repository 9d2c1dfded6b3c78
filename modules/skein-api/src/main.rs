use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use skein_common::Config;
use skein_graph::{GraphClient, GraphReader};
use skein_pipeline::Dispatcher;

mod auth;
mod routes;

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub reader: GraphReader,
    pub trigger_secret: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("skein_api=info".parse()?))
        .init();

    let config = Config::from_env();

    let pool = skein_store::connect(&config.database_url).await?;
    skein_store::migrate(&pool).await?;

    let graph =
        GraphClient::connect(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password)
            .await?;
    skein_graph::migrate::migrate(&graph).await?;

    let state = Arc::new(AppState {
        dispatcher: Dispatcher::from_parts(&config, pool, graph.clone()),
        reader: GraphReader::new(graph),
        trigger_secret: config.trigger_secret.clone(),
    });

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/internal/run", post(routes::run_jobs))
        .route("/users/{user_id}/concept-map", get(routes::concept_map))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!(addr, "skein-api listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
