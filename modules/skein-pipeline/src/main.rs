use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use skein_common::Config;
use skein_graph::GraphClient;
use skein_pipeline::Dispatcher;

#[derive(Parser)]
#[command(name = "skein-pipeline", about = "Run the skein background pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one dispatcher batch and exit.
    Run,
    /// Apply Postgres and Neo4j schema migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("skein_pipeline=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let pool = skein_store::connect(&config.database_url).await?;
    let graph =
        GraphClient::connect(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password)
            .await?;

    match cli.command {
        Command::Migrate => {
            skein_store::migrate(&pool).await?;
            skein_graph::migrate::migrate(&graph).await?;
            info!("Migrations complete");
        }
        Command::Run => {
            let dispatcher = Dispatcher::from_parts(&config, pool, graph);
            let (report, stats) = dispatcher.run_batch().await?;
            println!("{report}");
            println!(
                "queue: pending={} running={} completed={} failed={}",
                stats.pending, stats.running, stats.completed, stats.failed
            );
        }
    }

    Ok(())
}
