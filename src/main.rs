use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;
use redraft::eval::{EvalSuite, run_suite};
use redraft::guardrail::Guardrail;
use redraft::history::ConversationHistory;
use redraft::llm::{AnthropicClient, LlmClient, Message, Usage};
use redraft::revision::{EventWriter, OutgoingEvent, RevisionRunner};
use redraft::server::{AppState, Server};

fn setup_logging(level: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("redraft")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("redraft.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_client(config: &Config) -> Result<Arc<dyn LlmClient>> {
    let client = AnthropicClient::new(config.llm.to_anthropic()).context("Failed to create LLM client")?;
    Ok(Arc::new(client))
}

fn build_runner(config: &Config, client: Arc<dyn LlmClient>, rounds: Option<u32>) -> Result<RevisionRunner> {
    let prompts = config.prompts.compile().context("Failed to compile prompt templates")?;
    let mut revision = config.revision.to_revision_config();
    if let Some(rounds) = rounds {
        revision.rounds = rounds;
    }
    Ok(RevisionRunner::new(client, prompts).with_config(revision))
}

fn print_usage(usage: Usage, model: &str) {
    println!(
        "{} {} input / {} output tokens (${:.4})",
        "Usage:".dimmed(),
        usage.input_tokens,
        usage.output_tokens,
        usage.cost_usd(model)
    );
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Serve { port } => handle_serve_command(*port, config).await,
        Commands::Revise { message, rounds } => handle_revise_command(message, *rounds, config).await,
        Commands::Eval { suite } => handle_eval_command(suite, config).await,
    }
}

async fn handle_serve_command(port: Option<u16>, config: &Config) -> Result<()> {
    let client = build_client(config)?;
    let runner = build_runner(config, Arc::clone(&client), None)?;

    let mut state = AppState::new(runner).with_channel_capacity(config.revision.channel_capacity);
    if config.guardrail.enabled {
        info!("Guardrail enabled");
        state = state.with_guardrail(
            Guardrail::new(client)
                .with_system_prompt(&config.guardrail.system_prompt)
                .with_refusal(&config.guardrail.refusal),
        );
    }

    let server = Server::new(config.server.to_server_config(port), state);
    println!("{} http://{}", "Listening on".green(), server.addr());
    server.start().await.context("Server failed")?;
    Ok(())
}

async fn handle_revise_command(message: &str, rounds: Option<u32>, config: &Config) -> Result<()> {
    info!("Revising message ({} chars)", message.len());

    let client = build_client(config)?;
    let runner = Arc::new(build_runner(config, client, rounds)?);
    let history = ConversationHistory::from(vec![Message::user(message)]);

    let (writer, mut rx) = EventWriter::channel(config.revision.channel_capacity);
    let task = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move { runner.run(&history, &writer).await })
    };

    // Events carry accumulated text; print only what is new for each part
    let mut printed: HashMap<String, usize> = HashMap::new();
    let mut round = 0;
    let mut stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        match &event {
            OutgoingEvent::DraftDelta { id, text } | OutgoingEvent::FeedbackDelta { id, text } => {
                let seen = printed.entry(id.clone()).or_insert_with(|| {
                    if matches!(event, OutgoingEvent::DraftDelta { .. }) {
                        round += 1;
                        println!("\n{}", format!("Draft (round {})", round).cyan().bold());
                    } else {
                        println!("\n{}", "Feedback".yellow().bold());
                    }
                    0
                });
                print!("{}", &text[*seen..]);
                *seen = text.len();
                stdout.flush().ok();
            }
            OutgoingEvent::TextDelta { delta, .. } => {
                println!("\n\n{}\n{}", "Final".green().bold(), delta);
            }
            OutgoingEvent::Start | OutgoingEvent::TextStart { .. } | OutgoingEvent::TextEnd { .. } | OutgoingEvent::Finish => {}
        }
    }

    let outcome = task.await.context("Revision task panicked")?.context("Revision failed")?;
    info!("Revision {} completed in {} rounds", outcome.run_id, outcome.rounds);

    println!();
    print_usage(runner.usage(), runner.model());
    Ok(())
}

async fn handle_eval_command(path: &Path, config: &Config) -> Result<()> {
    let suite = EvalSuite::load(path).context(format!("Failed to load eval suite {}", path.display()))?;
    info!("Running eval suite '{}' ({} cases)", suite.name, suite.cases.len());

    let client = build_client(config)?;
    let report = run_suite(client.as_ref(), &suite).await.context("Eval run failed")?;

    println!("{} {}", "Suite:".green(), report.suite.bold());
    for (i, case) in report.cases.iter().enumerate() {
        println!("\n{} {}", format!("Case {}:", i + 1).cyan(), case.input);
        for score in &case.scores {
            let value = format!("{:.2}", score.value);
            let value = if score.value >= 1.0 { value.green() } else { value.red() };
            println!("  {:<30} {}", score.scorer, value);
        }
    }

    println!("\n{}", "Averages".bold());
    for average in &report.averages {
        println!("  {:<30} {:.2}", average.scorer, average.value);
    }
    println!("  {:<30} {:.2}", "Overall", report.overall());

    print_usage(client.usage(), client.model());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let level = if cli.is_verbose() {
        "debug"
    } else {
        config.log_level.as_deref().unwrap_or("info")
    };
    setup_logging(level).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
