//! Picto CLI entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use picto_cli::commands::{
    cmd_batch, cmd_evaluate, cmd_index_add, cmd_index_build, cmd_index_inspect, cmd_index_reset,
};
use picto_cli::config::load_settings;
use picto_cli::App;

#[derive(Parser)]
#[command(
    name = "picto-cli",
    about = "Picto: AI photo evaluation with PDF-backed shooting guidance",
    version
)]
struct Cli {
    /// Path to a picto.toml settings file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive shell (default).
    Shell,

    /// Analyse every photo listed in a JSON file and write the results back.
    Batch {
        /// JSON array of records with a numeric `photo_id`.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Where to write the updated records.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate a single image and print the analysis with guidance.
    Evaluate {
        /// Image file to analyse.
        image: PathBuf,

        /// Request text passed to the model; defaults to the evaluate keyword.
        #[arg(short, long)]
        request: Option<String>,
    },

    /// Manage the guidance index.
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   picto-cli completions bash > ~/.local/share/bash-completion/completions/picto-cli
    ///   picto-cli completions zsh > ~/.zfunc/_picto-cli
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Build the index from a PDF, or open it if it already exists.
    Build {
        /// PDF to index; defaults to the configured guidance PDF.
        pdf: Option<PathBuf>,
    },

    /// Add another PDF to an existing index.
    Add {
        pdf: PathBuf,
    },

    /// Delete the index directory.
    Reset,

    /// Show the number of indexed pages and their source files.
    Inspect {
        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Shell);

    // Keep the conversation readable: the shell only logs warnings by default.
    let default_level = match command {
        Commands::Shell => "warn",
        _ => "info",
    };
    let level = cli.log_level.as_deref().unwrap_or(default_level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config;
    let settings = || load_settings(config.as_deref());

    match command {
        Commands::Shell => {
            let mut app = App::new(settings()?)?;
            picto_cli::repl::run(&mut app).await?;
        }

        Commands::Batch { input, output } => {
            cmd_batch(settings()?, input, output).await?;
        }

        Commands::Evaluate { image, request } => {
            cmd_evaluate(settings()?, image, request).await?;
        }

        Commands::Index { action } => match action {
            IndexAction::Build { pdf } => cmd_index_build(settings()?, pdf).await?,
            IndexAction::Add { pdf } => cmd_index_add(settings()?, pdf).await?,
            IndexAction::Reset => cmd_index_reset(&settings()?)?,
            IndexAction::Inspect { json } => cmd_index_inspect(&settings()?, json).await?,
        },

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "picto-cli", &mut std::io::stdout());
        }
    }

    Ok(())
}
