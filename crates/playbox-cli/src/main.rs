//! Playbox CLI
//!
//! A command-line tool and HTTP front end for running playground code.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use playbox::{
    Config, EXAMPLE_CONFIG, ExecutionRequest, Gateway, ResourceLimits, find_in_path,
};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

mod serve;

#[derive(Parser)]
#[command(name = "playbox")]
#[command(about = "Run untrusted playground code with real toolchains")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: playbox.toml)
        #[arg(short, long, default_value = "playbox.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run a program (compile if needed, then execute)
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID or alias (e.g., python, java)
        #[arg(short, long)]
        language: String,

        /// Wall time limit in seconds for the run step
        #[arg(short, long)]
        time_limit: Option<f64>,
    },

    /// List available languages
    Languages,

    /// Show effective configuration
    ShowConfig,

    /// Serve the execution endpoint over HTTP
    Serve {
        /// Address to bind (default: from configuration)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
    } else {
        debug!("using default configuration");
    }
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Run {
            source,
            language,
            time_limit,
        } => run_execute(config, &source, &language, time_limit).await,
        Commands::Languages => {
            list_languages(&config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            serve::serve(config, &bind).await
        }
    }
}

async fn run_execute(
    mut config: Config,
    source: &Path,
    language_tag: &str,
    time_limit: Option<f64>,
) -> Result<()> {
    let source_content = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    // Only the run step is overridden; compile limits stay as configured
    if let Some(seconds) = time_limit {
        let id = config
            .resolve_language(language_tag)
            .map(|(id, _)| id.to_owned());
        if let Some(language) = id.and_then(|id| config.languages.get_mut(&id)) {
            let limits = language
                .run
                .limits
                .get_or_insert_with(ResourceLimits::unset);
            limits.wall_time_limit = Some(seconds);
        }
    }

    let gateway = Gateway::new(config).context("failed to prepare scratch directory")?;

    info!(language = %language_tag, "running program");
    let result = gateway
        .execute(&ExecutionRequest::new(language_tag, source_content))
        .await;

    info!(outcome = %result.outcome, "execution result");

    if result.is_success() {
        print!("{}", result.text);
        Ok(())
    } else {
        eprintln!("{}", result.text);
        std::process::exit(1);
    }
}

fn list_languages(config: &Config) {
    println!("Available languages:\n");

    let mut languages: Vec<_> = config.languages.iter().collect();
    languages.sort_by_key(|(id, _)| *id);

    for (id, lang) in languages {
        let available = match lang.toolchain_program() {
            _ if lang.is_delegated() => "remote",
            Some(program) if find_in_path(program).is_some() => "installed",
            Some(_) => "missing",
            None => "-",
        };
        let aliases = if lang.aliases.is_empty() {
            String::new()
        } else {
            format!(" [{}]", lang.aliases.join(", "))
        };
        println!(
            "  {:<15} {} ({}, {}){}",
            id,
            lang.name,
            lang.kind(),
            available,
            aliases
        );
    }
}

fn show_config(config: &Config) {
    println!("Default resource limits:");
    println!(
        "  Wall time limit: {:?} s",
        config.default_limits.wall_time_limit
    );
    println!("  Max output: {:?} KB", config.default_limits.max_output);
    println!();
    println!("Scratch root: {}", config.scratch_root.display());
    println!("Server bind: {}", config.server.bind);
    println!("GitHub API: {}", config.github.api_base);
    println!();
    println!("Languages configured: {}", config.languages.len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
