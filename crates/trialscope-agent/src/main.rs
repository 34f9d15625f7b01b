//! Trialscope: clinical-trial retrieval and PK/PD classification.
//! Entry point for the `trialscope` binary.

mod config;
mod display;
mod session;
mod shell;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Password;
use secrecy::SecretString;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trialscope_common::SandboxClient;
use trialscope_ingestion::export::export_csv;
use trialscope_ingestion::sources::clinicaltrials::ClinicalTrialsClient;
use trialscope_ingestion::StudyFilter;
use trialscope_llm::backend::{HuggingFaceBackend, LlmBackend, OllamaBackend, OpenAiCompatibleBackend};
use trialscope_llm::query::{DatasetQueryService, QueryOptions};
use trialscope_security::SqlCredentialStore;

use config::{Config, LlmBackendKind};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Parser)]
#[command(name = "trialscope", version, about = "Fetch and classify clinical trials")]
struct Cli {
    /// Config file (defaults to ./trialscope.toml)
    #[arg(long, global = true, env = "TRIALSCOPE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive login, fetch, filter and query loop (default)
    Shell,
    /// Create an account in the credential store
    Register {
        #[arg(long)]
        username: Option<String>,
    },
    /// Log in, then fetch and classify trials
    Fetch {
        /// Account to log in as; the password is prompted for
        #[arg(long, short = 'u')]
        username: String,
        /// Condition to search for; repeat for several
        #[arg(long = "condition", short = 'c', required = true)]
        conditions: Vec<String>,
        /// Rows to show: all, pd, pk or safety
        #[arg(long, default_value = "all")]
        filter: StudyFilter,
        /// Also write the dataset as CSV to the export directory
        #[arg(long)]
        export: bool,
    },
}

fn build_source(config: &Config) -> anyhow::Result<ClinicalTrialsClient> {
    let mut client = SandboxClient::with_timeout(Duration::from_secs(config.registry.timeout_secs))?;
    client.allow_url_host(&config.registry.base_url);
    Ok(ClinicalTrialsClient::with_client(client, config.registry.base_url.clone()))
}

fn build_llm_backend(config: &Config) -> anyhow::Result<Arc<dyn LlmBackend>> {
    let llm = &config.llm;
    let backend: Arc<dyn LlmBackend> = match llm.backend {
        LlmBackendKind::HuggingFace => {
            let key = llm.effective_api_key();
            if key.is_none() {
                tracing::warn!("No HuggingFace API key found (set llm.api_key or TRIALSCOPE_LLM_API_KEY)");
            }
            let backend = HuggingFaceBackend::new(key, llm.model.clone())?;
            match &llm.base_url {
                Some(url) => Arc::new(backend.with_base_url(url.clone())),
                None => Arc::new(backend),
            }
        }
        LlmBackendKind::Ollama => Arc::new(OllamaBackend::new(
            llm.base_url.clone().unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            llm.model.clone(),
        )?),
        LlmBackendKind::OpenAiCompatible => {
            let Some(url) = llm.base_url.clone() else {
                anyhow::bail!("llm.base_url is required for the openai_compatible backend");
            };
            Arc::new(OpenAiCompatibleBackend::new(url, llm.model.clone(), llm.effective_api_key())?)
        }
    };
    Ok(backend)
}

fn build_query_service(config: &Config) -> anyhow::Result<DatasetQueryService> {
    let options = QueryOptions {
        temperature: config.llm.temperature,
        max_new_tokens: config.llm.max_new_tokens,
        max_context_rows: config.llm.max_context_rows,
    };
    Ok(DatasetQueryService::new(build_llm_backend(config)?, options))
}

async fn connect_store(config: &Config) -> anyhow::Result<SqlCredentialStore> {
    let store = SqlCredentialStore::connect(
        &config.credentials.database_url,
        config.credentials.password_scheme,
    )
    .await?;
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("trialscope=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("Trialscope {}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!(
        registry = %config.registry.base_url,
        llm_backend = ?config.llm.backend,
        scheme = config.credentials.password_scheme.as_str(),
        "Configuration loaded"
    );

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => {
            let source = build_source(&config)?;
            let query = build_query_service(&config)?;
            let store = connect_store(&config).await?;
            shell::Shell { config: &config, source: &source, store: &store, query: &query }
                .run()
                .await?;
        }
        Command::Register { username } => {
            let store = connect_store(&config).await?;
            let theme = ColorfulTheme::default();
            if !shell::register_prompt(&theme, &store, username).await? {
                anyhow::bail!("Registration did not complete");
            }
        }
        Command::Fetch { username, conditions, filter, export } => {
            let store = connect_store(&config).await?;
            let source = build_source(&config)?;
            let password = SecretString::from(
                Password::with_theme(&ColorfulTheme::default())
                    .with_prompt(format!("Password for {username}"))
                    .interact()?,
            );

            let spinner = shell::spinner("Fetching trials...")?;
            let result = shell::fetch_as(
                &store,
                &source,
                &username,
                &password,
                &conditions,
                &display::ConsoleNotifier,
            )
            .await;
            spinner.finish_and_clear();
            let result = result?;

            let dataset = &result.dataset;
            println!("{}", style(display::summary_line(dataset)).green());
            let rows = dataset.filter(filter);
            println!("{} ({} rows)", style(filter).bold(), rows.len());
            print!("{}", display::render_table(&rows));

            if export {
                let path = export_csv(dataset, &config.export.directory)?;
                println!("{} {}", style("Saved").green(), path.display());
            }
            if result.failed_conditions() == conditions.len() && !conditions.is_empty() {
                anyhow::bail!("Every condition failed to fetch");
            }
        }
    }

    Ok(())
}
