//! Parley - command-line LLM agent
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use parley::cli::{self, AskOptions};
use parley::core::{AgentConfig, Config, ModelSpec, Role};
use parley::llm::create_provider;

/// Parley - ask a language model, with tools and persistent history
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a question and print the answer
    Ask {
        /// The question; may contain {name} placeholders
        question: String,

        /// File with system instructions (placeholders are resolved too)
        #[arg(long)]
        instructions: Option<PathBuf>,

        /// Role of the message: user, system or assistant
        #[arg(long, default_value = "user")]
        role: Role,

        /// History file to resume from and write to
        #[arg(long)]
        history: Option<PathBuf>,

        /// JSON file mapping answer fields to descriptions
        #[arg(long)]
        output_schema: Option<PathBuf>,

        /// Comma-separated image files to attach
        #[arg(long)]
        image: Option<String>,

        /// Read extra context from stdin
        #[arg(long)]
        context: bool,

        /// Model as JSON: {"type": "openai", "config": {...}}
        #[arg(long)]
        model: Option<String>,

        /// Template parameter, key=value or key=@file (repeatable)
        #[arg(long = "param", short = 'p')]
        params: Vec<String>,

        /// Enable debug output
        #[arg(long, short = 'd')]
        debug: bool,
    },

    /// Print a history file
    History {
        /// History file to show
        file: PathBuf,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug { "parley=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logging starts before the config file is read so parse failures are reported
    let _ = dotenvy::dotenv();
    let debug =
        matches!(args.command, Command::Ask { debug: true, .. }) || AgentConfig::default().debug;
    init_tracing(debug);

    let mut config = Config::load();
    config.agent.debug |= debug;

    match args.command {
        Command::Ask {
            question,
            instructions,
            role,
            history,
            output_schema,
            image,
            context,
            model,
            params,
            ..
        } => {
            let spec = match model.as_deref() {
                Some(json) => ModelSpec::from_json(json, &config.model)?,
                None => config.model.clone(),
            };
            let provider = create_provider(&spec)?;

            let context = if context {
                Some(cli::read_stdin().await.context("Failed to read stdin")?)
            } else {
                None
            };

            let options = AskOptions {
                question,
                role: Some(role),
                instructions,
                history,
                output_schema,
                image,
                context,
                model,
                params,
            };

            cli::run_ask(options, &config, provider, |answer| {
                println!("{}", answer.trim());
            })
            .await?;
        }

        Command::History { file } => {
            let rendered = cli::render_history(&file).await?;
            print!("{}", rendered);
        }
    }

    Ok(())
}
