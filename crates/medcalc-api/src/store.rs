//! Persistence of calculation results
//!
//! The engine itself is stateless; recording what was calculated is a collaborator
//! concern behind [`CalculationStore`]. The bundled implementation keeps records in
//! memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medcalc_core::{Calculation, EvaluationContext};
use medcalc_types::Locale;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One persisted calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRecord {
    pub id: Uuid,
    pub calculator_id: String,
    pub inputs: BTreeMap<String, f64>,
    pub result: f64,
    pub rounded: f64,
    pub interpretation: String,
    pub matched_rule: Option<usize>,
    pub locale: Locale,
    pub performed_at: DateTime<Utc>,
}

impl CalculationRecord {
    pub fn new(
        calculator_id: impl Into<String>,
        context: &EvaluationContext,
        calculation: Calculation,
        locale: Locale,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            calculator_id: calculator_id.into(),
            inputs: context.iter().map(|(name, value)| (name.to_string(), value)).collect(),
            result: calculation.result,
            rounded: calculation.rounded,
            interpretation: calculation.interpretation,
            matched_rule: calculation.matched_rule,
            locale,
            performed_at: Utc::now(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Calculation store unavailable: {0}")]
    Unavailable(String),
}

/// Filter for listing records
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub calculator_id: Option<String>,
    pub limit: Option<usize>,
}

#[async_trait]
pub trait CalculationStore: Send + Sync {
    async fn record(&self, record: CalculationRecord) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<CalculationRecord>, StoreError>;

    /// Matching records, newest first
    async fn list(&self, filter: RecordFilter) -> Result<Vec<CalculationRecord>, StoreError>;
}

/// Process-local store, optionally bounded to the most recent `capacity` records
#[derive(Debug, Default)]
pub struct InMemoryCalculationStore {
    records: RwLock<Vec<CalculationRecord>>,
    capacity: Option<usize>,
}

impl InMemoryCalculationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self { records: RwLock::new(Vec::new()), capacity: Some(capacity) }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl CalculationStore for InMemoryCalculationStore {
    async fn record(&self, record: CalculationRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.push(record);
        if let Some(capacity) = self.capacity {
            let excess = records.len().saturating_sub(capacity);
            records.drain(..excess);
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<CalculationRecord>, StoreError> {
        Ok(self.records.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, filter: RecordFilter) -> Result<Vec<CalculationRecord>, StoreError> {
        let records = self.records.read().await;
        let matching = records
            .iter()
            .rev()
            .filter(|r| filter.calculator_id.as_deref().is_none_or(|id| r.calculator_id == id))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(calculator_id: &str, result: f64) -> CalculationRecord {
        let context: EvaluationContext = [("x", result)].into_iter().collect();
        let calculation = Calculation {
            result,
            rounded: result,
            interpretation: "Result calculated".to_string(),
            matched_rule: None,
        };
        CalculationRecord::new(calculator_id, &context, calculation, Locale::En)
    }

    #[tokio::test]
    async fn records_are_listed_newest_first() {
        let store = InMemoryCalculationStore::new();
        for i in 0..5 {
            store.record(record(if i % 2 == 0 { "bmi" } else { "gcs" }, i as f64)).await.unwrap();
        }

        let all = store.list(RecordFilter::default()).await.unwrap();
        assert_eq!(all.iter().map(|r| r.result).collect::<Vec<_>>(), vec![4.0, 3.0, 2.0, 1.0, 0.0]);

        let bmi = store
            .list(RecordFilter { calculator_id: Some("bmi".to_string()), limit: Some(2) })
            .await
            .unwrap();
        assert_eq!(bmi.iter().map(|r| r.result).collect::<Vec<_>>(), vec![4.0, 2.0]);
    }

    #[tokio::test]
    async fn get_by_id() {
        let store = InMemoryCalculationStore::new();
        let stored = record("bmi", 22.0);
        let id = stored.id;
        store.record(stored.clone()).await.unwrap();

        assert_eq!(store.get(id).await.unwrap(), Some(stored));
        assert_eq!(store.get(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn capacity_limit_drops_oldest() {
        let store = InMemoryCalculationStore::with_capacity_limit(3);
        for i in 0..5 {
            store.record(record("bmi", i as f64)).await.unwrap();
        }
        assert_eq!(store.len().await, 3);
        let results: Vec<f64> =
            store.list(RecordFilter::default()).await.unwrap().iter().map(|r| r.result).collect();
        assert_eq!(results, vec![4.0, 3.0, 2.0]);
    }
}
