// remote-blame: line blame and age heat-map for files in a remote GitHub workspace.

mod app;
mod auth;
mod blame;
mod config;
mod controller;
mod error;
mod github;
mod logging;
mod print;
mod state;
mod ui;
mod workspace;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::app::App;
use crate::auth::{CredentialProvider, EnvToken};
use crate::blame::{BlameFetcher, HeatRenderer, HoverFormatter};
use crate::config::Config;
use crate::controller::BlameController;
use crate::github::GitHubClient;
use crate::workspace::{FileIdentity, GitHubWorkspace};

/// Blame heat-map for files served from GitHub
#[derive(Parser)]
#[command(name = "remote-blame", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse a file with the blame overlay toggled by `b`/`B`
    View {
        /// `owner/repo/path` or a `vfs://github/...` identity
        file: String,
        /// Branch, tag, or commit (defaults to the repository's default branch)
        #[arg(short, long = "ref", value_name = "REF")]
        revision: Option<String>,
    },
    /// Print a file annotated with heat buckets
    Print {
        /// `owner/repo/path` or a `vfs://github/...` identity
        file: String,
        /// Branch, tag, or commit (defaults to the repository's default branch)
        #[arg(short, long = "ref", value_name = "REF")]
        revision: Option<String>,
        /// Also print the hover text of every blame range
        #[arg(long)]
        hover: bool,
    },
}

fn file_identity(file: &str, revision: Option<&str>) -> FileIdentity {
    if file.starts_with("vfs://") {
        FileIdentity::new(file)
    } else {
        FileIdentity::github(file, revision)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let _logging = logging::init(&config.logging)?;

    let client = Arc::new(GitHubClient::new(&config.github)?);
    let credentials: Arc<dyn CredentialProvider> = Arc::new(EnvToken);
    let workspace = Arc::new(GitHubWorkspace::new(
        Arc::clone(&client),
        Arc::clone(&credentials),
    ));
    let fetcher = BlameFetcher::new(workspace.clone(), credentials, client.clone());
    let controller = BlameController::new(
        fetcher,
        HeatRenderer::new(config.heat.palette.clone()),
        HoverFormatter::new(config.github.web_url.clone()),
    );

    match cli.command {
        Commands::View { file, revision } => {
            let file = file_identity(&file, revision.as_deref());
            tracing::info!(%file, "Opening viewer");
            let mut app = App::new(file, controller, workspace, client);
            let mut terminal = ratatui::init();
            let result = app.run(&mut terminal).await;
            ratatui::restore();
            result?;
        }
        Commands::Print {
            file,
            revision,
            hover,
        } => {
            let file = file_identity(&file, revision.as_deref());
            print::run(controller, workspace, file, hover).await?;
        }
    }

    Ok(())
}
