//! MedCalc HTTP API
//!
//! Serves the calculator catalog over HTTP: listing and describing calculators,
//! performing calculations and recording them, and evaluating ad hoc formulas.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use medcalc_core::{CalculatorCatalog, Evaluator, Locale};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

pub mod config;
pub mod error;
pub mod handlers;
pub mod store;
pub mod tracing_setup;
pub mod types;

use config::MedcalcConfig;
use store::{CalculationStore, InMemoryCalculationStore};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CalculatorCatalog>,
    pub store: Arc<dyn CalculationStore>,
    pub default_locale: Locale,
    pub max_body_bytes: usize,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(catalog: Arc<CalculatorCatalog>, store: Arc<dyn CalculationStore>) -> Self {
        Self {
            catalog,
            store,
            default_locale: Locale::default(),
            max_body_bytes: MedcalcConfig::default().max_body_bytes(),
            start_time: Utc::now(),
        }
    }

    /// Build the catalog and an in-memory store from configuration
    pub fn from_config(config: &MedcalcConfig) -> anyhow::Result<Self> {
        let catalog = build_catalog(config)?;
        let store = InMemoryCalculationStore::with_capacity_limit(config.store.max_records);
        let mut state = Self::new(Arc::new(catalog), Arc::new(store));
        state.default_locale = config.locale.default_locale;
        state.max_body_bytes = config.max_body_bytes();
        Ok(state)
    }

    pub fn elapsed(&self) -> Duration {
        (Utc::now() - self.start_time).to_std().unwrap_or_default()
    }
}

/// Built-in calculators (when enabled) plus the configured definitions file
pub fn build_catalog(config: &MedcalcConfig) -> anyhow::Result<CalculatorCatalog> {
    let evaluator = Evaluator::new(config.evaluation_limits());
    let catalog = if config.catalog.include_builtins {
        CalculatorCatalog::with_builtins(evaluator).context("Failed to load built-in calculators")?
    } else {
        CalculatorCatalog::new(evaluator)
    };

    if let Some(path) = &config.catalog.definitions_path {
        let loaded = catalog
            .load_file(path)
            .with_context(|| format!("Failed to load calculators from '{}'", path.display()))?;
        info!(path = %path.display(), loaded, "Loaded calculator definitions");
    }

    info!(calculators = catalog.len(), "Calculator catalog ready");
    Ok(catalog)
}

/// Build the router with tracing, body limit and CORS middleware
pub fn create_app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(state.max_body_bytes))
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/health", get(handlers::health))
        .route("/calculators", get(handlers::list_calculators))
        .route("/calculators/{id}", get(handlers::get_calculator))
        .route("/calculators/{id}/calculate", post(handlers::calculate))
        .route("/evaluate", post(handlers::evaluate_formula))
        .route("/calculation_results", get(handlers::list_results))
        .route("/calculation_results/{id}", get(handlers::get_result))
        .layer(middleware)
        .with_state(state)
}

/// Router over the built-in catalog with default settings
pub fn create_default_app() -> anyhow::Result<Router> {
    Ok(create_app(AppState::from_config(&MedcalcConfig::default())?))
}
