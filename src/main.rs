//! SQLFlow - chat with your SQL database.

use sqlflow::chat::{Orchestrator, Session, TurnOutcome};
use sqlflow::cli::Cli;
use sqlflow::config::Config;
use sqlflow::error::Result;
use sqlflow::llm::{create_client, PromptSet};
use sqlflow::logging;
use sqlflow::repl::Repl;
use tokio::io::BufReader;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();

    if cli.log_stderr || cli.execute.is_some() {
        logging::init_stderr_logging();
    } else {
        logging::init_file_logging();
    }

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{}: {}", e.category(), e);
            eprintln!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;

    if let Some(provider) = &cli.provider {
        config.llm.provider = provider.clone();
    }
    if let Some(model) = &cli.model {
        config.llm.model = Some(model.clone());
    }

    let prompts = PromptSet::from_config(&config.prompts)?;
    let mut session = Session::new();

    match create_client(&config.llm, cli.api_key.clone(), config.chat.llm_timeout()) {
        Ok(client) => {
            info!(provider = %config.llm.provider, "LLM client configured");
            session.set_llm(client);
        }
        Err(e) => warn!("LLM not configured: {}", e),
    }

    match cli.resolve_connection(&config)? {
        Some(conn) => {
            info!("Connection: {}", conn.display_string());
            if let Err(e) = session.connect(conn, config.chat.query_timeout()).await {
                warn!("{}: {}", e.category(), e);
                eprintln!("{}: {}", e.category(), e);
            }
        }
        None => warn!("No database connection configured"),
    }

    let orchestrator = Orchestrator::new(prompts, &config.chat);
    let mut repl = Repl::new(session, orchestrator, config.llm, config.chat);

    if let Some(question) = &cli.execute {
        let (outcome, text) = repl.ask(question).await?;
        println!("{text}");
        return Ok(match outcome {
            TurnOutcome::Answered { .. } => 0,
            TurnOutcome::Ignored | TurnOutcome::Blocked { .. } | TurnOutcome::Failed { .. } => 1,
        });
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    repl.run(stdin, &mut stdout).await?;
    Ok(0)
}
