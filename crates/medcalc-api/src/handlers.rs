//! HTTP handlers

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::store::{CalculationRecord, RecordFilter};
use crate::types::*;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use medcalc_core::{EvaluationContext, RuleSet, round_for_display, validate_inputs};
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.elapsed().as_secs(),
        calculators: state.catalog.len(),
    })
}

pub async fn list_calculators(
    State(state): State<AppState>,
    Query(query): Query<ListCalculatorsQuery>,
) -> Json<Vec<CalculatorSummary>> {
    let locale = query.locale.unwrap_or(state.default_locale);
    let summaries = state
        .catalog
        .list(query.category.as_deref())
        .iter()
        .map(|calculator| CalculatorSummary::from_calculator(calculator, locale))
        .collect();
    Json(summaries)
}

pub async fn get_calculator(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CalculatorDetail>> {
    let calculator = state.catalog.require(&id)?;
    Ok(Json(CalculatorDetail {
        definition: calculator.definition().clone(),
        diagnostics: calculator.diagnostics(),
    }))
}

/// Validate, evaluate and interpret, then record the outcome
#[instrument(skip_all, fields(calculator = %id))]
pub async fn calculate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CalculateRequest>,
) -> ApiResult<(StatusCode, Json<CalculationRecord>)> {
    let calculator = state.catalog.require(&id)?;
    let locale = request.locale.unwrap_or(state.default_locale);

    let context = validate_inputs(calculator.definition(), &request.inputs)?;
    let calculation = calculator.calculate(&context, locale)?;

    let record = CalculationRecord::new(calculator.id(), &context, calculation, locale);
    state.store.record(record.clone()).await?;

    info!(
        record = %record.id,
        result = record.result,
        matched_rule = ?record.matched_rule,
        "Calculation performed"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// Evaluate an ad hoc formula; nothing is recorded
pub async fn evaluate_formula(
    State(state): State<AppState>,
    Json(request): Json<EvaluateRequest>,
) -> ApiResult<Json<EvaluateResponse>> {
    let context: EvaluationContext = request.inputs.into_iter().collect();
    let result = state.catalog.evaluator().evaluate(&request.formula, &context)?;

    let interpretation = if request.rules.is_empty() {
        None
    } else {
        let locale = request.locale.unwrap_or(state.default_locale);
        Some(RuleSet::compile(&request.rules).interpret(result, locale))
    };

    debug!(formula = %request.formula, result, "Formula evaluated");
    Ok(Json(EvaluateResponse { result, rounded: round_for_display(result), interpretation }))
}

pub async fn list_results(
    State(state): State<AppState>,
    Query(query): Query<ResultsQuery>,
) -> ApiResult<Json<Vec<CalculationRecord>>> {
    let records = state
        .store
        .list(RecordFilter { calculator_id: query.calculator_id, limit: query.limit })
        .await?;
    Ok(Json(records))
}

pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CalculationRecord>> {
    state
        .store
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("calculation result '{}'", id)))
}
