//! quizforge CLI — validate, render, and grade question banks.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(
    name = "quizforge",
    version,
    about = "Parameterized quiz question engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate question bank TOML files
    Validate {
        /// Path to a bank file or directory (default: banks_dir from config)
        #[arg(long)]
        bank: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Render a question as a student would see it
    Render {
        /// Path to the bank file
        #[arg(long)]
        bank: PathBuf,

        /// Question id
        #[arg(long)]
        question: String,

        /// Parameter assignment as a JSON object (random if omitted)
        #[arg(long)]
        params: Option<String>,
    },

    /// Grade an answer to a question
    Grade {
        /// Path to the bank file
        #[arg(long)]
        bank: PathBuf,

        /// Question id
        #[arg(long)]
        question: String,

        /// Answer as JSON, e.g. '{"lot_item_id": "A"}'
        #[arg(long)]
        answer: String,

        /// Parameter assignment the question was rendered with, as JSON
        #[arg(long)]
        params: Option<String>,

        /// Enable partial credit (overrides config)
        #[arg(long)]
        partial: bool,

        /// Save an attempt report to the output directory
        #[arg(long)]
        save: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example question bank
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quizforge=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { bank, config } => commands::validate::execute(bank, config),
        Commands::Render {
            bank,
            question,
            params,
        } => commands::render::execute(bank, question, params),
        Commands::Grade {
            bank,
            question,
            answer,
            params,
            partial,
            save,
            config,
        } => commands::grade::execute(commands::grade::GradeArgs {
            bank,
            question,
            answer,
            params,
            partial,
            save,
            config,
        }),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
