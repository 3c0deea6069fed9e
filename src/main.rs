//! aichat command line
//!
//! Console chat demos and the bill upload form server

use aichat::cli::{ChatOptions, CliContext};
use aichat::config::Settings;
use aichat::handlers::{create_router, health};
use aichat::providers::backend_from_settings;
use aichat::services::ModelCatalog;
use aichat::utils::{files::delete_files_in_folder, logging::init_logging};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;

#[derive(Parser)]
#[command(name = "aichat", version, about = "Chat completion demos with tools, usage accounting and structured output")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a single question
    Ask {
        prompt: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Chat with the French culture tutor
    Chat {
        #[arg(long)]
        model: Option<String>,
        /// Do not keep conversation history
        #[arg(long)]
        stateless: bool,
        /// Let the model toggle token display and report usage
        #[arg(long)]
        tools: bool,
    },
    /// Ask the French weather and fashion expert
    Weather { question: Option<String> },
    /// Step by step math solution as structured output
    Math {
        question: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Serve the bill upload form
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::new().context("Failed to load settings")?;
    init_logging(&settings.logging);

    let catalog = Arc::new(ModelCatalog::load_default().context("Failed to load model catalog")?);
    let backend = backend_from_settings(&settings)?;
    info!(backend = backend.name(), models = catalog.profiles().len(), "{}", aichat::version_info());

    if let Command::Serve = cli.command {
        return serve(settings, catalog, backend).await;
    }

    let ctx = CliContext {
        settings,
        catalog,
        backend,
    };
    let mut stdout = std::io::stdout();
    let stdin = BufReader::new(tokio::io::stdin());

    match cli.command {
        Command::Ask { prompt, model } => ctx.ask(prompt, model, &mut stdout).await,
        Command::Chat {
            model,
            stateless,
            tools,
        } => {
            let options = ChatOptions {
                model,
                stateless,
                tools,
            };
            ctx.chat(options, stdin, &mut stdout).await
        }
        Command::Weather { question } => ctx.weather(question, stdin, &mut stdout).await,
        Command::Math { question, model } => ctx.math(question, model, &mut stdout).await,
        Command::Serve => Ok(()),
    }
}

async fn serve(
    settings: Settings,
    catalog: Arc<ModelCatalog>,
    backend: Arc<dyn aichat::CompletionBackend>,
) -> Result<()> {
    health::mark_started();

    let upload_folder = settings.server.upload_folder.clone();
    tokio::fs::create_dir_all(&upload_folder)
        .await
        .with_context(|| format!("Failed to create {}", upload_folder.display()))?;
    delete_files_in_folder(&upload_folder).await?;

    let addr = settings.server_addr();
    let app = create_router(settings, backend, catalog).await?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🚀 Bill upload form started at http://{}/", addr);
    info!("📝 Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start server: {}", e))?;

    Ok(())
}
