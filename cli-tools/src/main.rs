//! equipment-viz - command-line client for the equipment parameter visualizer
//!
//! Signs in against the analytics service, uploads CSV datasets, browses the
//! most recent uploads and downloads generated PDF reports.

mod client;
mod config;
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dataset_session::{DatasetSessionController, Phase, SessionStore};
use serde::Serialize;
use shared::{ApiClientConfig, DatasetId};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use client::NativeApiClient;
use config::Overrides;

type Controller = DatasetSessionController<NativeApiClient>;

#[derive(Parser)]
#[command(name = "equipment-viz")]
#[command(about = "Upload and explore equipment parameter datasets", long_about = None)]
struct Cli {
    /// API base URL
    #[arg(short, long, env = "EQUIPMENT_API_URL")]
    server: Option<String>,

    /// Where the sign-in is persisted
    #[arg(long, env = "EQUIPMENT_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Directory reports are saved into
    #[arg(long, env = "EQUIPMENT_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the credential
    Login {
        #[arg(short, long)]
        username: String,
        /// Prompted for when not given
        #[arg(short, long, env = "EQUIPMENT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored credential
    Logout,

    /// Show whether a credential is stored
    Status,

    /// Show the most recent dataset with charts
    Dashboard,

    /// List the most recent uploads
    History,

    /// Show a dataset from history
    Show {
        /// Dataset ID
        id: DatasetId,
    },

    /// Upload a CSV file
    Upload {
        file: PathBuf,
        /// Display name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Download the PDF report of a dataset
    Report {
        /// Dataset ID (defaults to the most recent upload)
        #[arg(long)]
        id: Option<DatasetId>,
        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    authenticated: bool,
    username: Option<String>,
    server_url: &'a str,
    session_file: String,
}

#[derive(Serialize)]
struct ReportOutput {
    dataset_id: Option<DatasetId>,
    path: Option<PathBuf>,
}

fn read_password() -> Result<String> {
    print!("Password: ");
    std::io::stdout().flush()?;
    let mut password = String::new();
    std::io::stdin()
        .read_line(&mut password)
        .context("Failed to read password")?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}

/// Resume the stored sign-in, bailing when there is none
async fn require_session(controller: &Controller) -> Result<()> {
    let phase = controller
        .restore()
        .await
        .context("Failed to restore session")?;
    if phase == Phase::Unauthenticated {
        ui::print_not_signed_in();
        bail!("Not signed in");
    }
    Ok(())
}

fn render(controller: &Controller, format: OutputFormat, with_history: bool) -> Result<()> {
    let snapshot = controller.snapshot();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Table => ui::print_tables(&snapshot, with_history),
        OutputFormat::Pretty => ui::print_dashboard(&snapshot, with_history),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let report_dir = match &cli.command {
        Commands::Report { out, .. } => out.clone(),
        _ => None,
    };
    let settings = config::load_config().resolve(Overrides {
        server_url: cli.server.clone(),
        download_dir: report_dir.or(cli.download_dir.clone()),
        session_file: cli.session_file.clone(),
    });

    let store = Arc::new(match &settings.session_file {
        Some(path) => SessionStore::open(path.clone()),
        None => SessionStore::open_default().context("Failed to locate session file")?,
    });
    let api_config = ApiClientConfig::new(&settings.server_url);
    let client = NativeApiClient::new(api_config, store.clone())
        .context("Failed to build HTTP client")?;
    let controller = DatasetSessionController::new(client, store, settings.download_dir.clone());

    match cli.command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            controller.sign_in(&username, &password).await?;
            match cli.format {
                OutputFormat::Json => render(&controller, cli.format, true)?,
                OutputFormat::Pretty | OutputFormat::Table => {
                    ui::print_signed_in(&username);
                    println!();
                    render(&controller, cli.format, true)?;
                }
            }
        }

        Commands::Logout => {
            controller.sign_out().context("Failed to sign out")?;
            if !matches!(cli.format, OutputFormat::Json) {
                ui::print_signed_out();
            }
        }

        Commands::Status => {
            let store = controller.store();
            let username = store.username();
            let session_file = store.path().display().to_string();
            match cli.format {
                OutputFormat::Json => {
                    let status = StatusOutput {
                        authenticated: store.is_authenticated(),
                        username,
                        server_url: controller.api().config().base_url.as_str(),
                        session_file,
                    };
                    println!("{}", serde_json::to_string_pretty(&status)?);
                }
                OutputFormat::Pretty | OutputFormat::Table => {
                    let username = store.is_authenticated().then(|| {
                        username.unwrap_or_else(|| "unknown user".to_string())
                    });
                    ui::print_status(
                        username.as_deref(),
                        &controller.api().config().base_url,
                        &session_file,
                    );
                }
            }
        }

        Commands::Dashboard => {
            require_session(&controller).await?;
            render(&controller, cli.format, true)?;
        }

        Commands::History => {
            require_session(&controller).await?;
            let snapshot = controller.snapshot();
            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&snapshot.history)?)
                }
                OutputFormat::Table => ui::print_history_table(&snapshot),
                OutputFormat::Pretty => ui::print_history(&snapshot),
            }
        }

        Commands::Show { id } => {
            if !controller.store().is_authenticated() {
                ui::print_not_signed_in();
                bail!("Not signed in");
            }
            controller.select_history(id).await?;
            render(&controller, cli.format, false)?;
        }

        Commands::Upload { file, name } => {
            if !controller.store().is_authenticated() {
                ui::print_not_signed_in();
                bail!("Not signed in");
            }
            if !matches!(cli.format, OutputFormat::Json) {
                println!("{} Uploading {}...", "→".blue(), file.display());
            }
            controller.upload_file(&file, name.as_deref()).await?;
            render(&controller, cli.format, true)?;
        }

        Commands::Report { id, .. } => {
            match id {
                Some(id) => {
                    if !controller.store().is_authenticated() {
                        ui::print_not_signed_in();
                        bail!("Not signed in");
                    }
                    // The report only needs the selection, not its summary
                    if let Err(e) = controller.select_history(id).await {
                        tracing::debug!("Summary for dataset {} unavailable: {}", id, e);
                        controller.dismiss_error();
                    }
                }
                None => require_session(&controller).await?,
            }

            let snapshot = controller.snapshot();
            let dataset_id = snapshot
                .view
                .fresh_dataset_id()
                .or(snapshot.selected_history_id)
                .or(snapshot.view.active_dataset_id);
            let path = controller.download_report().await?;
            match cli.format {
                OutputFormat::Json => {
                    let output = ReportOutput { dataset_id, path };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Pretty | OutputFormat::Table => match path {
                    Some(path) => println!(
                        "{} Saved report to {}",
                        "✓".green(),
                        path.display().to_string().cyan()
                    ),
                    None => println!("{} No dataset to report on", "✗".red()),
                },
            }
        }
    }

    Ok(())
}
