// Process-lifetime store of sentence explanations.
// Unbounded and never evicted; concurrent writes to one key are last-write-wins.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::utils::inference::Prediction;

#[derive(Default)]
pub struct SentenceCache {
    entries: RwLock<HashMap<String, Prediction>>,
}

impl SentenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sentence: &str) -> Option<Prediction> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(sentence)
            .cloned()
    }

    pub fn insert(&self, sentence: String, explanation: Prediction) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(sentence, explanation);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Up to `limit` keys in sorted order, for debugging output.
    pub fn sample_keys(&self, limit: usize) -> Vec<String> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys.truncate(limit);
        keys
    }
}
