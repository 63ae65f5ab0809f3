use std::collections::VecDeque;

use parking_lot::RwLock;

use crate::models::PredictionRecord;

/// Store-and-query interface for issued predictions.
pub trait PredictionStore: Send + Sync {
    fn save(&self, record: PredictionRecord);

    /// Most recent records first, optionally restricted to one symbol.
    fn recent(&self, symbol: Option<&str>, limit: usize) -> Vec<PredictionRecord>;
}

/// Records kept by `InMemoryPredictionStore::new`.
pub const DEFAULT_MAX_RECORDS: usize = 1000;

/// Process-local store; records are kept oldest first and the oldest are
/// dropped once `max_records` is exceeded.
pub struct InMemoryPredictionStore {
    records: RwLock<VecDeque<PredictionRecord>>,
    max_records: usize,
}

impl Default for InMemoryPredictionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPredictionStore {
    pub fn new() -> Self {
        Self::with_max_records(DEFAULT_MAX_RECORDS)
    }

    pub fn with_max_records(max_records: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            max_records: max_records.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl PredictionStore for InMemoryPredictionStore {
    fn save(&self, record: PredictionRecord) {
        let mut records = self.records.write();
        records.push_back(record);
        while records.len() > self.max_records {
            records.pop_front();
        }
    }

    fn recent(&self, symbol: Option<&str>, limit: usize) -> Vec<PredictionRecord> {
        let symbol = symbol.map(|s| s.trim().to_uppercase());

        self.records
            .read()
            .iter()
            .rev()
            .filter(|r| symbol.as_deref().map_or(true, |s| r.symbol == s))
            .take(limit)
            .cloned()
            .collect()
    }
}
