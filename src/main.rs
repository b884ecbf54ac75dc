//! Parley - chat with your MySQL database in plain English.

use db_parley::chat::ChatSession;
use db_parley::cli::Cli;
use db_parley::config::{Config, ConnectionConfig, LlmConfig};
use db_parley::connection::ConnectionManager;
use db_parley::error::{ParleyError, Result};
use db_parley::llm::{create_client, LlmProvider};
use db_parley::repl::{self, Shell};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Logs go to stderr so they never interleave with chat output on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let provider = resolve_provider(&cli, &config)?;
    let llm_config = resolve_llm_config(&cli, &config);
    let connection = resolve_connection(&cli, &config)?;

    let mut manager = ConnectionManager::new();
    let session = ChatSession::new();

    if cli.mock {
        info!("Using in-memory mock database");
        manager.install(repl::demo_handle());
    } else if let Some(conn) = &connection {
        let llm = create_client(provider, &llm_config)?;
        match manager.connect(conn, llm).await {
            Ok(()) => println!("Connected to {}.", conn.display_string()),
            Err(e) => {
                // Not fatal: the user can fix settings and /connect again
                warn!("Initial connection failed: {e}");
                println!("Connection failed: {e}");
            }
        }
    } else {
        println!("No database connection configured. See --help for usage.");
    }

    if let Some(question) = cli.question.clone() {
        return run_one_shot(manager, session, &question).await;
    }

    let mut shell = Shell::new(manager, session, connection, provider, llm_config, cli.mock);
    shell.run().await
}

/// Asks a single question and exits; errors set a non-zero exit code.
async fn run_one_shot(
    mut manager: ConnectionManager,
    mut session: ChatSession,
    question: &str,
) -> Result<()> {
    let result = session.ask(manager.handle(), question).await;

    match result {
        Ok(turn) => {
            println!("{}", turn.text);
            if let Some(table) = &turn.table {
                println!();
                println!("{}", repl::format_table(table));
            }
            manager.close().await;
            Ok(())
        }
        Err(e) => {
            manager.close().await;
            Err(e.into())
        }
    }
}

/// Picks the LLM provider from CLI override, then config.
fn resolve_provider(cli: &Cli, config: &Config) -> Result<LlmProvider> {
    if cli.mock {
        return Ok(LlmProvider::Mock);
    }
    let name = cli.llm.as_deref().unwrap_or(&config.llm.provider);
    name.parse().map_err(ParleyError::Config)
}

/// Applies CLI overrides on top of the config file's LLM settings.
fn resolve_llm_config(cli: &Cli, config: &Config) -> LlmConfig {
    let mut llm = config.llm.clone();
    if let Some(model) = &cli.model {
        llm.model = model.clone();
    }
    if let Some(key) = &cli.api_key {
        llm.api_key = Some(key.clone());
    }
    llm
}

/// Resolves the final connection configuration from CLI args, config file,
/// and environment.
fn resolve_connection(cli: &Cli, config: &Config) -> Result<Option<ConnectionConfig>> {
    // Precedence:
    // 1. CLI arguments (highest)
    // 2. Named connection from config
    // 3. Default connection from config
    // 4. Environment variables
    let mut connection = cli.to_connection_config()?;

    if connection.is_none() {
        if let Some(name) = cli.connection_name() {
            connection = config.get_connection(Some(name)).cloned();
            if connection.is_none() {
                return Err(ParleyError::config(format!(
                    "Connection '{name}' not found in config file"
                )));
            }
        }
    }

    if connection.is_none() {
        connection = config.get_connection(None).cloned();
    }

    if let Some(ref mut conn) = connection {
        conn.apply_env_defaults();
    }

    Ok(connection)
}
