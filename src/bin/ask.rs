//! One-shot command-line client: answers a single question and prints the result as JSON.
use anyhow::{Context, Result, bail};
use clap::Parser;
use mto_rag::{
    config::{BackendKind, Config},
    logging::{self, LogTarget},
    rag::{QueryOptions, QueryOrchestrator, ValidationError, validate_question},
};

#[derive(Parser)]
#[command(
    name = "mto-rag-ask",
    about = "Ask a question about Ontario driving rules"
)]
struct Cli {
    /// Question to answer.
    question: String,
    /// Maximum number of handbook excerpts to return.
    #[arg(long, default_value_t = 5)]
    max_sources: usize,
    /// Sampling temperature forwarded to the backend.
    #[arg(long, default_value_t = 0.1)]
    temperature: f32,
    /// Use the built-in keyword backend instead of the external engine.
    #[arg(long)]
    mock: bool,
}

impl Cli {
    /// Validate the question and build the options forwarded to the orchestrator.
    fn query_options(&self) -> Result<QueryOptions, ValidationError> {
        validate_question(&self.question)?;
        let options = QueryOptions {
            max_sources: self.max_sources,
            temperature: self.temperature,
            ..QueryOptions::default()
        };
        options.validate()?;
        Ok(options)
    }

    /// Backend to use: `--mock` overrides whatever the environment selected.
    fn backend(&self, configured: BackendKind) -> BackendKind {
        if self.mock {
            BackendKind::Mock
        } else {
            configured
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    logging::init_tracing_with(LogTarget::StderrAndFile);

    let mut config = Config::from_env().context("failed to load configuration")?;
    config.log_summary();
    config.backend = cli.backend(config.backend);
    let options = cli.query_options()?;

    let orchestrator = QueryOrchestrator::from_config(&config).await;
    let result = match orchestrator.query(&cli.question, options).await {
        Ok(result) => result,
        Err(err) => bail!("{}: {err}", err.code()),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("failed to encode result")?
    );
    Ok(())
}
