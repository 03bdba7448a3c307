use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod app;

#[derive(Parser)]
#[command(name = "studymate")]
#[command(about = "StudyMate - ask questions about your documents")]
#[command(version)]
struct Cli {
    /// Run a single prompt and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Attach a document before the first prompt (repeatable)
    #[arg(short, long)]
    attach: Vec<PathBuf>,

    /// Override the backend base URL
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut settings = studymate_core::Settings::load();
    if let Some(ref base_url) = cli.base_url {
        settings.backend.base_url = base_url.clone();
    }

    if let Some(prompt) = cli.prompt {
        app::run_single_prompt(&settings, &prompt, &cli.attach).await?;
    } else {
        app::run_repl(settings, &cli.attach).await?;
    }

    Ok(())
}
