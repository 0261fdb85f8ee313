use anyhow::{Context, Result};
use chunkscribe::cli::{Cli, Commands, ConfigAction, RecognizeArgs};
use chunkscribe::config::Config;
use chunkscribe::diagnostics::check_dependencies;
use chunkscribe::logging::init_tracing;
use chunkscribe::options::RecognitionOptions;
use chunkscribe::output::render;
use chunkscribe::pipeline::Recognizer;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use std::path::Path;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Recognize(args) => {
            let config = load_config(cli.config.as_deref())?;
            run_recognize(config, args).await?;
        }
        Commands::Check => {
            let config = load_config(cli.config.as_deref())?;
            if !check_dependencies(&config) {
                std::process::exit(1);
            }
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "chunkscribe",
                &mut std::io::stdout(),
            );
        }
    }
    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config), which must exist
/// 2. Default config path (~/.config/chunkscribe/config.toml)
/// 3. Built-in defaults
///
/// Environment variable overrides are applied last.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    Ok(config.with_env_overrides())
}

async fn run_recognize(mut config: Config, args: RecognizeArgs) -> Result<()> {
    if let Some(key) = &args.api_key {
        config.service.api_key = Some(key.clone());
    }
    if let Some(timeout) = args.timeout {
        config.service.timeout_secs = timeout;
    }

    let recognition = config.recognition.merge(&args.overrides());
    let mut options = RecognitionOptions::with_config(&args.file, &recognition);
    if let Some(splits) = args.split.clone() {
        options = options.with_splits(splits);
    }

    let recognizer = Recognizer::from_config(&config)?;
    let transcript = recognizer
        .recognize(options)
        .await
        .with_context(|| format!("Failed to transcribe {}", args.file.display()))?;

    println!("{}", render(&transcript, args.format)?);
    Ok(())
}

/// Handle configuration commands.
fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let config_path = custom_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Show => {
            let mut config = Config::load_or_default(&config_path)?.with_env_overrides();
            if config.service.api_key.is_some() {
                config.service.api_key = Some("<redacted>".to_string());
            }
            print!("{}", config.to_toml_string()?);
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }
    Ok(())
}
