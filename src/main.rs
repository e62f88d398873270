//! FasilBot CLI entry point.
//!
//! Provides `start`, `console`, `prompt`, and `check` subcommands for running
//! the Telegram bot, chatting from a terminal, printing the persona prompt,
//! or validating configuration.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use fasilbot::bot::{ChatForwarder, Dispatcher};
use fasilbot::config::{self, Config, RuntimePaths};
use fasilbot::console::{self, ConsoleSender};
use fasilbot::credentials::{self, Credentials};
use fasilbot::persona::{PersonaBuilder, PersonaParams};
use fasilbot::providers;
use fasilbot::recap::HttpRecapService;
use fasilbot::store::memory::MemoryWorksheet;
use fasilbot::store::sheets::{ServiceAccountKey, SheetsClient};
use fasilbot::store::{ReportQuery, StoreError, UserDirectory, Worksheet};

/// FasilBot: assistant for field facilitators.
#[derive(Parser)]
#[command(name = "fasilbot", version, about)]
struct Cli {
    /// Path to config.toml (default: ~/.fasilbot/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the Telegram bot.
    Start,
    /// Chat with the bot from stdin/stdout.
    Console {
        /// Sender identifier to act as.
        #[arg(long, default_value = "console")]
        sender_id: String,
        /// Display name to register with.
        #[arg(long, default_value = "Console")]
        name: String,
        /// Use empty in-memory worksheets instead of Google Sheets.
        #[arg(long)]
        offline: bool,
    },
    /// Print the persona prompt for a name (or the fallback).
    Prompt {
        /// Facilitator display name.
        #[arg(long)]
        name: Option<String>,
    },
    /// Validate configuration and credentials, then exit.
    Check,
}

/// Everything loaded before collaborators are built.
struct Runtime {
    config: Config,
    paths: RuntimePaths,
    credentials: Credentials,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Start => handle_start(cli.config).await,
        Command::Console {
            sender_id,
            name,
            offline,
        } => handle_console(cli.config, sender_id, name, offline).await,
        Command::Prompt { name } => handle_prompt(cli.config, name.as_deref()),
        Command::Check => handle_check(cli.config).await,
    }
}

/// Run the Telegram bot until Ctrl+C.
async fn handle_start(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let runtime = load_runtime(config_path)?;
    let _logging_guard = fasilbot::logging::init_production(&runtime.paths.logs_dir)?;

    let bot_token = runtime
        .credentials
        .require(&runtime.config.channels.telegram.bot_token_env)?;
    let (directory, reports) = build_stores(&runtime, false)?;
    match verify_worksheets(&directory, &reports).await {
        Ok(()) => {}
        Err(e @ StoreError::MissingColumn { .. }) => {
            return Err(e).context("worksheet layout rejected");
        }
        Err(e) => warn!(error = %e, "could not verify worksheet layout, continuing"),
    }
    let dispatcher = Arc::new(build_dispatcher(&runtime, directory, reports)?);

    info!(
        model = %runtime.config.models.default,
        spreadsheet = %runtime.config.sheets.spreadsheet_id,
        "fasilbot starting"
    );
    fasilbot::telegram::run_telegram(&bot_token, dispatcher).await
}

/// Chat from the terminal.
async fn handle_console(
    config_path: Option<PathBuf>,
    sender_id: String,
    name: String,
    offline: bool,
) -> anyhow::Result<()> {
    fasilbot::logging::init_cli()?;
    let runtime = load_runtime(config_path)?;
    let (directory, reports) = build_stores(&runtime, offline)?;
    let dispatcher = build_dispatcher(&runtime, directory, reports)?;

    let sender = ConsoleSender {
        sender_id,
        display_name: name,
    };
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let handled = console::run_console(&dispatcher, &sender, stdin, tokio::io::stdout()).await?;
    info!(handled, "console session finished");
    Ok(())
}

/// Print the rendered persona prompt.
fn handle_prompt(config_path: Option<PathBuf>, name: Option<&str>) -> anyhow::Result<()> {
    fasilbot::logging::init_cli()?;
    let path = resolve_config_path(config_path)?;
    let params = if path.exists() {
        let config = config::load_config(&path)?;
        PersonaParams::from_config(&config.bot, &config.persona)
    } else {
        info!(path = %path.display(), "no config file, using default persona parameters");
        PersonaParams::from_config(&Default::default(), &Default::default())
    };

    let builder = PersonaBuilder::new(params);
    println!("{}", builder.build(name));
    Ok(())
}

/// Validate configuration, credentials and worksheet headers without
/// starting anything.
async fn handle_check(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    fasilbot::logging::init_cli()?;
    let runtime = load_runtime(config_path)?;
    let config = &runtime.config;

    let telegram = runtime
        .credentials
        .get(&config.channels.telegram.bot_token_env)
        .is_some();
    let provider = providers::from_config(&config.models, &runtime.credentials)?;
    let key_path = runtime.paths.resolve(&config.sheets.service_account_path);
    let key = ServiceAccountKey::from_file(&key_path)?;

    println!("config:          ok");
    println!("model:           {}", provider.model_id());
    println!(
        "telegram token:  {}",
        if telegram { "present" } else { "MISSING" }
    );
    println!("service account: {}", key.client_email);
    println!(
        "worksheets:      {} / {}",
        config.sheets.user_worksheet, config.sheets.report_worksheet
    );
    println!("recap endpoint:  {}", config.recap.url);

    let (directory, reports) = build_stores(&runtime, false)?;
    verify_worksheets(&directory, &reports)
        .await
        .context("worksheet layout check failed")?;
    println!("headers:         ok");

    if !telegram {
        anyhow::bail!(
            "telegram token env '{}' is not set",
            config.channels.telegram.bot_token_env
        );
    }
    Ok(())
}

fn resolve_config_path(config_path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    Ok(config::runtime_paths_for(config_path.as_deref())?.config_toml)
}

fn load_runtime(config_path: Option<PathBuf>) -> anyhow::Result<Runtime> {
    let paths = config::runtime_paths_for(config_path.as_deref())?;
    let config = config::load_config(&paths.config_toml)
        .with_context(|| format!("failed to load {}", paths.config_toml.display()))?;

    let credentials = credentials::load_optional_credentials(&paths.env_file)
        .with_context(|| format!("failed to load {}", paths.env_file.display()))?
        .with_env_overrides(&[
            config.channels.telegram.bot_token_env.as_str(),
            config.models.api_key_env.as_str(),
        ]);

    Ok(Runtime {
        config,
        paths,
        credentials,
    })
}

/// Both worksheet headers must carry their configured columns.
async fn verify_worksheets(
    directory: &UserDirectory,
    reports: &ReportQuery,
) -> Result<(), StoreError> {
    directory.verify_layout().await?;
    reports.verify_layout().await
}

/// The user directory and report query, backed by Google Sheets or, when
/// `offline`, by empty in-memory worksheets.
fn build_stores(runtime: &Runtime, offline: bool) -> anyhow::Result<(UserDirectory, ReportQuery)> {
    let config = &runtime.config;
    let columns = &config.sheets.columns;

    let (user_sheet, report_sheet): (Arc<dyn Worksheet>, Arc<dyn Worksheet>) = if offline {
        info!("offline mode: using in-memory worksheets");
        (
            Arc::new(MemoryWorksheet::new(
                &config.sheets.user_worksheet,
                &[columns.identifier.as_str(), columns.name.as_str()],
            )),
            Arc::new(MemoryWorksheet::new(
                &config.sheets.report_worksheet,
                &[
                    columns.name.as_str(),
                    columns.date.as_str(),
                    columns.participants.as_str(),
                    columns.validation.as_str(),
                    columns.remark.as_str(),
                ],
            )),
        )
    } else {
        let key_path = runtime.paths.resolve(&config.sheets.service_account_path);
        let key = ServiceAccountKey::from_file(&key_path)?;
        let client = Arc::new(SheetsClient::new(config.sheets.spreadsheet_id.clone(), key)?);
        (
            Arc::new(client.worksheet(&config.sheets.user_worksheet)),
            Arc::new(client.worksheet(&config.sheets.report_worksheet)),
        )
    };

    Ok((
        UserDirectory::new(user_sheet, columns),
        ReportQuery::new(report_sheet, columns.clone()),
    ))
}

/// Construct the remaining collaborators and hand everything to the
/// dispatcher.
fn build_dispatcher(
    runtime: &Runtime,
    directory: UserDirectory,
    reports: ReportQuery,
) -> anyhow::Result<Dispatcher> {
    let config = &runtime.config;
    let recap = Arc::new(
        HttpRecapService::from_config(&config.recap).context("failed to build recap client")?,
    );
    let provider = providers::from_config(&config.models, &runtime.credentials)
        .context("failed to create completion provider")?;
    let persona = PersonaBuilder::new(PersonaParams::from_config(&config.bot, &config.persona));

    let forwarder = ChatForwarder::new(persona, provider);
    Ok(Dispatcher::new(directory, reports, recap, forwarder)
        .with_auto_register(config.bot.auto_register_on_chat))
}
