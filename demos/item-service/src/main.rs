use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::routing::get;
use clap::{Parser, Subcommand};
use item_service::build_framework;
use route_kit::FrameworkConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "item-service", version, about = "Item catalogue API")]
struct Cli {
    /// TOML file with the framework configuration.
    #[arg(long, global = true, env = "ITEM_SERVICE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the API.
    Serve {
        #[arg(long, env = "ITEM_SERVICE_ADDR", default_value = "0.0.0.0:3000")]
        addr: SocketAddr,
    },
    /// Print the registered routes.
    Routes,
    /// Print the OpenAPI document, or write it to the configured doc file.
    Openapi {
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => FrameworkConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => FrameworkConfig::default(),
    };
    let mut framework = build_framework(config).context("failed to register controllers")?;

    match cli.command {
        Command::Serve { addr } => {
            framework.bind_route("/healthz", get(|| async { "ok" }));
            framework.print_routes();
            let router = framework.into_router();
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            info!(%addr, "item-service listening");
            axum::serve(listener, router).await?;
        }
        Command::Routes => framework.print_routes(),
        Command::Openapi { write: true } => {
            framework.save_openapi_json()?;
            info!(file = %framework.config().doc_file, "wrote OpenAPI document");
        }
        Command::Openapi { write: false } => println!("{}", framework.openapi_json()?),
    }
    Ok(())
}
