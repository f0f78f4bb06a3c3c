//! Mein Mutiger Weg - career inspirations in the terminal
//!
//! Collects three answers, asks the configured chat model for five job ideas
//! and keeps the conversation going with follow-up questions.

mod app;
mod handler;
mod tui;
mod ui;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mutiger_weg_core::{CompletionClient, Config, ConversationController, Provider};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::App;
use tui::EventHandler;

/// Mein Mutiger Weg - Berufsinspirationen 🎯
#[derive(Parser, Debug)]
#[command(name = "mutiger-weg")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Chat provider (openai, claude, ollama); overrides the config file
    #[arg(short, long, env = "MUTIGER_WEG_PROVIDER")]
    pub provider: Option<Provider>,

    /// Model name; defaults to the configured or provider default model
    #[arg(short, long, env = "MUTIGER_WEG_MODEL")]
    pub model: Option<String>,

    /// Enable debug logging (equivalent to RUST_LOG=debug)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Enable verbose logging (equivalent to RUST_LOG=trace)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Print the models available for the provider and exit
    #[arg(long)]
    pub list_models: bool,
}

fn log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("mutiger-weg")
        .join("tui.log")
}

/// Log to a file; the terminal belongs to the UI
fn init_logging(args: &Args) -> Result<PathBuf> {
    let path = log_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    let default_filter = if args.verbose {
        "trace"
    } else if args.debug {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(log_file)),
        )
        .init();

    Ok(path)
}

/// The model to talk to: flag, then config (if it is for this provider), then the provider default
fn resolve_model(args: &Args, config: &Config, provider: Provider) -> String {
    if let Some(model) = args.model.as_ref().filter(|m| !m.trim().is_empty()) {
        return model.clone();
    }
    if config.provider() == provider {
        config.model_for(provider)
    } else {
        provider.default_model().to_string()
    }
}

fn build_client(config: &Config, provider: Provider) -> Result<CompletionClient> {
    CompletionClient::from_config(config, provider).with_context(|| match provider.api_key_env() {
        Some(var) => format!(
            "Set {} or add a key to {}",
            var,
            Config::get_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "the config file".to_string())
        ),
        None => format!("Could not set up {}", provider.display_name()),
    })
}

async fn list_models(client: &CompletionClient) -> Result<()> {
    let models = match client {
        CompletionClient::Ollama(ollama) => ollama
            .list_models()
            .await
            .context("Is Ollama running?")?,
        other => other.provider().known_models(),
    };
    for model in models {
        println!("{}", model);
    }
    Ok(())
}

async fn run(mut app: App) -> Result<()> {
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(Duration::from_millis(250));

    while !app.should_quit {
        app.poll_task().await;
        app.refresh();
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event)?,
            None => break,
        }
    }

    if let Some(task) = app.task.take() {
        task.abort();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_path = init_logging(&args)?;

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read config, using defaults");
        Config::new()
    });
    let provider = args.provider.unwrap_or_else(|| config.provider());
    let model = resolve_model(&args, &config, provider);
    let client = build_client(&config, provider)?;

    if args.list_models {
        return list_models(&client).await;
    }

    tracing::info!(
        provider = %provider,
        model = %model,
        log = %log_path.display(),
        "starting"
    );

    let controller = ConversationController::new(Arc::new(client), model)
        .with_failed_turn_policy(config.failed_turn_policy());
    let app = App::new(controller, provider);

    tui::install_panic_hook();
    let result = run(app).await;
    tui::restore()?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cli: &[&str]) -> Args {
        let mut argv = vec!["mutiger-weg"];
        argv.extend_from_slice(cli);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_args_parse_provider_alias() {
        let parsed = args(&["--provider", "anthropic", "--debug"]);
        assert_eq!(parsed.provider, Some(Provider::Claude));
        assert!(parsed.debug);
    }

    #[test]
    fn test_args_reject_unknown_provider() {
        assert!(Args::try_parse_from(["mutiger-weg", "--provider", "gemini"]).is_err());
    }

    #[test]
    fn test_model_flag_wins() {
        let config = Config::new();
        let parsed = args(&["--model", "gpt-4o"]);
        assert_eq!(resolve_model(&parsed, &config, Provider::OpenAI), "gpt-4o");
    }

    #[test]
    fn test_config_model_only_for_its_provider() {
        let config = Config {
            provider: Some("openai".to_string()),
            default_model: Some("gpt-4-turbo".to_string()),
            ..Config::default()
        };
        let parsed = args(&[]);
        assert_eq!(resolve_model(&parsed, &config, Provider::OpenAI), "gpt-4-turbo");
        assert_eq!(
            resolve_model(&parsed, &config, Provider::Ollama),
            Provider::Ollama.default_model()
        );
    }
}
