use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use medcalc_api::config::MedcalcConfig;
use medcalc_api::tracing_setup::init_tracing;
use medcalc_api::{AppState, build_catalog, create_app};
use medcalc_core::{CalculatorCatalog, EvaluationContext, Evaluator, Locale, round_for_display};
use serde_json::{Map, Value};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "medcalc", version, about = "Medical calculator formula engine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// List the calculators in the catalog
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        locale: Option<Locale>,
    },
    /// Run one calculator
    Calc {
        id: String,
        /// Input value as name=value, repeatable
        #[arg(short, long = "input", value_parser = parse_input)]
        inputs: Vec<(String, String)>,
        #[arg(long)]
        locale: Option<Locale>,
    },
    /// Evaluate a formula template
    Eval {
        formula: String,
        #[arg(short, long = "input", value_parser = parse_input)]
        inputs: Vec<(String, String)>,
    },
    /// Check a JSON file of calculator definitions without serving it
    Check { file: PathBuf },
}

fn parse_input(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = MedcalcConfig::load()?.apply_env_overrides();
    init_tracing(&config.logging)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::List { category, locale } => {
            let catalog = build_catalog(&config)?;
            let locale = locale.unwrap_or(config.locale.default_locale);
            for calculator in catalog.list(category.as_deref()) {
                let definition = calculator.definition();
                println!(
                    "{:<28} {:<18} {}",
                    definition.id,
                    definition.category,
                    definition.display_name(locale)
                );
            }
            Ok(())
        }
        Command::Calc { id, inputs, locale } => {
            let catalog = build_catalog(&config)?;
            let locale = locale.unwrap_or(config.locale.default_locale);
            let raw: Map<String, Value> =
                inputs.into_iter().map(|(name, value)| (name, Value::String(value))).collect();
            let calculation = catalog.require(&id)?.calculate_raw(&raw, locale)?;
            println!("{}", serde_json::to_string_pretty(&calculation)?);
            Ok(())
        }
        Command::Eval { formula, inputs } => {
            let mut context = EvaluationContext::new();
            for (name, value) in inputs {
                let value: f64 =
                    value.parse().with_context(|| format!("Input '{}' is not a number", name))?;
                context.insert(name, value);
            }
            let evaluator = Evaluator::new(config.evaluation_limits());
            let result = evaluator.evaluate(&formula, &context)?;
            println!("{}", round_for_display(result));
            Ok(())
        }
        Command::Check { file } => check_definitions(&config, &file),
    }
}

async fn serve(config: &MedcalcConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let app = create_app(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, "MedCalc server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("MedCalc server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        // Without a signal handler, keep serving until the process is killed
        std::future::pending::<()>().await;
    }
}

fn check_definitions(config: &MedcalcConfig, file: &Path) -> anyhow::Result<()> {
    let catalog = CalculatorCatalog::new(Evaluator::new(config.evaluation_limits()));
    let loaded = catalog
        .load_file(file)
        .map_err(|e| anyhow!("{}: {}", file.display(), e))?;

    let mut warnings = 0;
    for calculator in catalog.list(None) {
        for diagnostic in calculator.diagnostics() {
            warnings += 1;
            println!("{}: {}", calculator.id(), diagnostic);
        }
    }
    println!("{} calculators OK, {} rule warnings", loaded, warnings);
    Ok(())
}
